// Test mocks for the engine pipelines.
//
// Three mocks matching the three provider seams:
// - MockSearch (WebSearch) - query→hits map with substring fallback
// - MockScraper (Scrape) - url→page map
// - MockChat (ChatModel) - canned completions + schema-keyed extractions
//
// All three count calls so tests can assert "providers called 0 times".
// Plus fixture builders for Services, prospects, and pages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{
    ApprovalStatus, ContactInfo, DiscoveredProspect, ProspectScores, Segment,
};
use leadscout_realtime::Realtime;
use leadscout_store::MemoryStore;

use crate::budget::BudgetTracker;
use crate::deps::{FixedClock, NoRand, Services};
use crate::providers::{
    ChatModel, PageContent, ProviderSet, Result, Scrape, ScrapeOpts, SearchHit, SearchOpts,
    WebSearch,
};

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSearch {
    exact: HashMap<String, Vec<SearchHit>>,
    substring: Vec<(String, Vec<SearchHit>)>,
    pub calls: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.exact.insert(query.to_string(), hits);
        self
    }

    /// Match any query containing `needle`. Checked after exact matches.
    pub fn on_query_containing(mut self, needle: &str, hits: Vec<SearchHit>) -> Self {
        self.substring.push((needle.to_string(), hits));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    async fn query(&self, q: &str, _opts: &SearchOpts) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hits) = self.exact.get(q) {
            return Ok(hits.clone());
        }
        for (needle, hits) in &self.substring {
            if q.contains(needle.as_str()) {
                return Ok(hits.clone());
            }
        }
        Ok(Vec::new())
    }
}

pub fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockScraper {
    pages: HashMap<String, PageContent>,
    pub calls: AtomicUsize,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, page: PageContent) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scrape for MockScraper {
    async fn fetch(&self, url: &str, _opts: &ScrapeOpts) -> Result<PageContent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| LeadScoutError::Permanent(format!("no page registered for {url}")))
    }
}

pub fn page(url: &str, html: &str, text: &str) -> PageContent {
    PageContent {
        url: url.to_string(),
        html: html.to_string(),
        text: text.to_string(),
        status: 200,
        title: None,
        og_site_name: None,
    }
}

// ---------------------------------------------------------------------------
// MockChat
// ---------------------------------------------------------------------------

/// Completions are served in registration order (then the last one
/// repeats); extractions are keyed by schema name.
#[derive(Default)]
pub struct MockChat {
    completions: std::sync::Mutex<Vec<String>>,
    served: AtomicUsize,
    extractions: HashMap<String, serde_json::Value>,
    pub calls: AtomicUsize,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_complete(self, response: &str) -> Self {
        self.completions.lock().unwrap().push(response.to_string());
        self
    }

    pub fn on_extract(mut self, schema_name: &str, value: serde_json::Value) -> Self {
        self.extractions.insert(schema_name.to_string(), value);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let completions = self.completions.lock().unwrap();
        if completions.is_empty() {
            return Err(LeadScoutError::Permanent(
                "MockChat: no completions registered".to_string(),
            ));
        }
        let index = self
            .served
            .fetch_add(1, Ordering::SeqCst)
            .min(completions.len() - 1);
        Ok(completions[index].clone())
    }

    async fn extract_value(
        &self,
        _system: &str,
        _user: &str,
        schema_name: &str,
        _schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.extractions.get(schema_name).cloned().ok_or_else(|| {
            LeadScoutError::Permanent(format!(
                "MockChat: no extraction registered for schema {schema_name}"
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A fixed instant all deterministic tests share.
pub fn test_now() -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339("2026-07-27T09:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Services over a fresh in-memory store, a fixed clock, and zero jitter.
pub fn test_services(providers: ProviderSet) -> (Services, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let services = Services {
        store: store.clone(),
        providers: Arc::new(providers),
        realtime: Arc::new(Realtime::new(store.clone())),
        clock: Arc::new(FixedClock(test_now())),
        rand: Arc::new(NoRand),
        budget: Arc::new(BudgetTracker::new(0)),
        batch_mode: false,
    };
    (services, store)
}

pub fn provider_set() -> ProviderSet {
    ProviderSet::new(Arc::new(BudgetTracker::new(0)))
}

pub fn make_prospect(id: &str, user_id: &str) -> DiscoveredProspect {
    DiscoveredProspect {
        prospect_id: id.to_string(),
        user_id: user_id.to_string(),
        name: "Jane Smith".to_string(),
        organization: Some("Acme Counseling Group".to_string()),
        job_title: Some("Clinical Director".to_string()),
        source_url: "https://example.com/team".to_string(),
        source: "serper".to_string(),
        category: "psychologists".to_string(),
        contact: ContactInfo {
            email: Some("jane@acme.com".to_string()),
            phone: None,
        },
        influence_score: 70.0,
        segment: Some(Segment::ReferralNetwork),
        approval_status: ApprovalStatus::Approved,
        scores: ProspectScores {
            fit: 0.7,
            referral_capacity: 0.7,
            signal_strength: 0.6,
        },
        created_at: test_now(),
        updated_at: test_now(),
    }
}
