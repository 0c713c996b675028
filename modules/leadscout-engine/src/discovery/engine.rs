use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use leadscout_common::error::LeadScoutError;
use leadscout_common::types::{ActivityEvent, ActivityType, ApprovalStatus, ContactInfo, DiscoveredProspect};

use crate::deps::Services;
use crate::providers::{ScrapeOpts, SearchOpts};

use super::extract::base::canonical_url;
use super::extract::{ExtractorRegistry, ProspectDraft};
use super::queries::build_queries;
use super::score::{component_scores, influence_score};
use super::validate::{validate_for_save, RejectReason};

/// Outer deadline for a discovery workflow.
const DISCOVERY_DEADLINE: Duration = Duration::from_secs(120);
/// Queries executed per category.
const MAX_QUERIES_PER_CATEGORY: usize = 3;
/// Search hits requested per query.
const HITS_PER_QUERY: u32 = 10;
/// Profile links followed per listing page (the second hop).
const PROFILES_PER_LISTING: usize = 10;

#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub user_id: String,
    pub categories: Vec<String>,
    pub location: Option<String>,
    pub max_results: usize,
}

/// The persisted summary of one discovery batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryEnvelope {
    pub categories: Vec<String>,
    pub queries_run: usize,
    pub urls_considered: usize,
    pub pages_scraped: usize,
    pub prospects_extracted: usize,
    pub prospects_saved: usize,
    pub rejected_invalid_name: usize,
    pub rejected_no_contact: usize,
    pub rejected_blocked_org: usize,
    pub per_category_saved: BTreeMap<String, usize>,
    pub failures: Vec<String>,
    pub cancelled: bool,
}

#[derive(Default)]
struct RunState {
    envelope: DiscoveryEnvelope,
    seen_urls: HashSet<String>,
    seen_prospects: HashSet<(String, String)>,
}

impl RunState {
    fn record_reject(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::InvalidName => self.envelope.rejected_invalid_name += 1,
            RejectReason::NoContactOrOrg => self.envelope.rejected_no_contact += 1,
            RejectReason::BlockedOrganization => self.envelope.rejected_blocked_org += 1,
        }
    }
}

pub struct DiscoveryEngine {
    services: Services,
    registry: Arc<ExtractorRegistry>,
}

impl DiscoveryEngine {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            registry: Arc::new(ExtractorRegistry::new()),
        }
    }

    /// Run the full discovery workflow: per-category search fan-out, URL
    /// intake, extractor dispatch, two-hop scrape, validation, scoring,
    /// persistence. Partial results stay committed on timeout; the envelope
    /// records `cancelled` instead of failing.
    pub async fn discover(
        &self,
        request: DiscoveryRequest,
    ) -> Result<DiscoveryEnvelope, LeadScoutError> {
        if request.categories.is_empty() {
            return Err(LeadScoutError::Validation("no categories given".to_string()));
        }
        if !self.services.providers.has_search() {
            return Err(LeadScoutError::Unavailable("web search disabled".to_string()));
        }
        if !self.services.providers.has_scrape() {
            return Err(LeadScoutError::Unavailable("scraping disabled".to_string()));
        }

        info!(
            user_id = %request.user_id,
            categories = ?request.categories,
            location = request.location.as_deref().unwrap_or(""),
            max_results = request.max_results,
            "Discovery workflow started"
        );

        let state = Arc::new(Mutex::new(RunState {
            envelope: DiscoveryEnvelope {
                categories: request.categories.clone(),
                ..Default::default()
            },
            ..Default::default()
        }));

        let run = self.run_categories(&request, state.clone());
        let timed_out = tokio::time::timeout(DISCOVERY_DEADLINE, run).await.is_err();

        let mut envelope = {
            let state = state.lock().await;
            state.envelope.clone()
        };
        envelope.cancelled = timed_out;

        info!(
            user_id = %request.user_id,
            saved = envelope.prospects_saved,
            extracted = envelope.prospects_extracted,
            rejected_invalid_name = envelope.rejected_invalid_name,
            rejected_no_contact = envelope.rejected_no_contact,
            rejected_blocked_org = envelope.rejected_blocked_org,
            per_category = ?envelope.per_category_saved,
            cancelled = envelope.cancelled,
            "[SAVE SUMMARY] discovery batch complete"
        );

        self.publish_envelope(&request, &envelope).await;
        Ok(envelope)
    }

    async fn run_categories(&self, request: &DiscoveryRequest, state: Arc<Mutex<RunState>>) {
        // Search fan-out: every category queries independently - a merged
        // multi-category query returns measurably worse results.
        let searches = request.categories.iter().map(|category| {
            let state = state.clone();
            async move {
                let urls = self.search_category(category, request, state).await;
                (category.clone(), urls)
            }
        });
        let per_category_urls: Vec<(String, Vec<String>)> =
            futures::future::join_all(searches).await;

        // Scrape + extract. Categories run concurrently; the scrape
        // semaphore and per-host pacing bound the real parallelism, and
        // every await is a yield point so slow categories never starve
        // fast ones.
        let scrapes = per_category_urls.into_iter().map(|(category, urls)| {
            let state = state.clone();
            async move {
                self.scrape_category(&category, urls, request, state).await;
            }
        });
        futures::future::join_all(scrapes).await;
    }

    /// Search one category and return its deduplicated result URLs.
    async fn search_category(
        &self,
        category: &str,
        request: &DiscoveryRequest,
        state: Arc<Mutex<RunState>>,
    ) -> Vec<String> {
        let queries = build_queries(category, request.location.as_deref());
        let mut urls = Vec::new();

        for query in queries.into_iter().take(MAX_QUERIES_PER_CATEGORY) {
            let opts = SearchOpts {
                num: Some(HITS_PER_QUERY),
                site: None,
                location: request.location.clone(),
            };
            match self.services.providers.search(&query, &opts).await {
                Ok(hits) => {
                    let mut state = state.lock().await;
                    state.envelope.queries_run += 1;
                    for hit in hits {
                        let canonical = canonical_url(&hit.url);
                        if state.seen_urls.insert(canonical.clone()) {
                            state.envelope.urls_considered += 1;
                            urls.push(canonical);
                        }
                    }
                }
                Err(LeadScoutError::Quota(msg)) => {
                    warn!(category, error = %msg, "Search quota exhausted, degrading");
                    let mut state = state.lock().await;
                    state.envelope.failures.push(format!("{category}: quota: {msg}"));
                    break;
                }
                Err(e) => {
                    warn!(category, query = %query, error = %e, "Search query failed");
                    let mut state = state.lock().await;
                    state.envelope.failures.push(format!("{category}: {e}"));
                }
            }
        }

        urls
    }

    /// Scrape a category's URLs, dispatch extractors, follow profile links,
    /// validate and persist.
    async fn scrape_category(
        &self,
        category: &str,
        urls: Vec<String>,
        request: &DiscoveryRequest,
        state: Arc<Mutex<RunState>>,
    ) {
        for url in urls {
            if self.saved_enough(request, &state).await {
                return;
            }

            let Some(page) = self.fetch_page(&url, category, &state).await else {
                continue;
            };

            let extractor = self.registry.dispatch(&url, &page.text);
            let extraction = extractor.extract(&page, category);

            for draft in extraction.prospects {
                self.save_draft(draft, category, request, &state).await;
            }

            // Second hop: listing pages hand back profile URLs with no
            // contacts; the profile scrape completes them.
            for profile_url in extraction.profile_urls.into_iter().take(PROFILES_PER_LISTING) {
                if self.saved_enough(request, &state).await {
                    return;
                }
                let canonical = canonical_url(&profile_url);
                {
                    let mut state = state.lock().await;
                    if !state.seen_urls.insert(canonical.clone()) {
                        continue;
                    }
                }
                let Some(profile_page) = self.fetch_page(&canonical, category, &state).await
                else {
                    continue;
                };
                let profile_extraction = extractor.extract(&profile_page, category);
                for draft in profile_extraction.prospects {
                    self.save_draft(draft, category, request, &state).await;
                }
            }

            tokio::task::yield_now().await;
        }
    }

    async fn saved_enough(&self, request: &DiscoveryRequest, state: &Arc<Mutex<RunState>>) -> bool {
        let state = state.lock().await;
        state.envelope.prospects_saved >= request.max_results
    }

    async fn fetch_page(
        &self,
        url: &str,
        category: &str,
        state: &Arc<Mutex<RunState>>,
    ) -> Option<crate::providers::PageContent> {
        let opts = ScrapeOpts {
            wait_ms: None,
            stealth: false,
            main_content_only: false,
        };
        match self.services.providers.scrape(url, &opts).await {
            Ok(mut page) => {
                // Some scrapes return HTML only; extractors want text too.
                if page.text.trim().is_empty() && !page.html.is_empty() {
                    page.text = html2text::from_read(page.html.as_bytes(), 120).unwrap_or_default();
                }
                let mut state = state.lock().await;
                state.envelope.pages_scraped += 1;
                Some(page)
            }
            Err(e) => {
                warn!(url, category, error = %e, "Scrape failed, skipping URL");
                let mut state = state.lock().await;
                state.envelope.failures.push(format!("{category}: {url}: {e}"));
                None
            }
        }
    }

    /// Validate, score, and persist one draft. The invoking category tags
    /// the prospect - never a category inferred from content.
    async fn save_draft(
        &self,
        draft: ProspectDraft,
        category: &str,
        request: &DiscoveryRequest,
        state: &Arc<Mutex<RunState>>,
    ) {
        {
            let mut state = state.lock().await;
            state.envelope.prospects_extracted += 1;
        }

        let name = match validate_for_save(&draft) {
            Ok(name) => name,
            Err(reason) => {
                let mut state = state.lock().await;
                state.record_reject(reason);
                return;
            }
        };

        let dedup_key = (
            name.to_lowercase(),
            draft
                .organization
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
        );

        {
            let mut state = state.lock().await;
            if state.envelope.prospects_saved >= request.max_results {
                return;
            }
            if !state.seen_prospects.insert(dedup_key) {
                return;
            }
        }

        let now = self.services.clock.now();
        let prospect = DiscoveredProspect {
            prospect_id: uuid::Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            name,
            organization: draft.organization.clone(),
            job_title: draft.job_title.clone(),
            source_url: draft.source_url.clone(),
            source: "serper".to_string(),
            category: category.to_string(),
            contact: ContactInfo {
                email: draft.email.clone(),
                phone: draft.phone.clone(),
            },
            influence_score: influence_score(&draft, category),
            segment: None,
            approval_status: ApprovalStatus::Pending,
            scores: component_scores(&draft, category),
            created_at: now,
            updated_at: now,
        };

        let user = self.services.user_store(&request.user_id);
        match user.save_prospect(&prospect).await {
            Ok(()) => {
                let mut state = state.lock().await;
                state.envelope.prospects_saved += 1;
                *state
                    .envelope
                    .per_category_saved
                    .entry(category.to_string())
                    .or_insert(0) += 1;
            }
            Err(e) => {
                warn!(prospect = %prospect.name, error = %e, "Failed to persist prospect");
                let mut state = state.lock().await;
                state.envelope.failures.push(format!("save {}: {e}", prospect.name));
            }
        }
    }

    /// Set approval status on a batch of prospects. Unknown ids are skipped;
    /// the count of updated prospects is returned.
    pub async fn approve(
        &self,
        user_id: &str,
        prospect_ids: &[String],
        status: ApprovalStatus,
    ) -> Result<usize, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let mut updated = 0;
        for id in prospect_ids {
            let Some(mut prospect) = user.get_prospect(id).await? else {
                warn!(prospect_id = %id, "Approval skipped unknown prospect");
                continue;
            };
            prospect.approval_status = status;
            prospect.updated_at = self.services.clock.now();
            user.save_prospect(&prospect).await?;
            updated += 1;
        }
        info!(user_id, updated, status = ?status, "Prospect approval updated");
        Ok(updated)
    }

    /// Recompute influence and component scores from stored fields.
    /// Deterministic, so re-scoring an unchanged prospect is a no-op.
    pub async fn rescore(
        &self,
        user_id: &str,
        prospect_ids: &[String],
    ) -> Result<usize, LeadScoutError> {
        let user = self.services.user_store(user_id);
        let mut updated = 0;
        for id in prospect_ids {
            let Some(mut prospect) = user.get_prospect(id).await? else {
                continue;
            };
            let draft = ProspectDraft {
                name: prospect.name.clone(),
                organization: prospect.organization.clone(),
                job_title: prospect.job_title.clone(),
                email: prospect.contact.email.clone(),
                phone: prospect.contact.phone.clone(),
                source_url: prospect.source_url.clone(),
                profile_url: None,
            };
            let influence = influence_score(&draft, &prospect.category);
            let scores = component_scores(&draft, &prospect.category);
            if (influence - prospect.influence_score).abs() > f64::EPSILON {
                prospect.influence_score = influence;
                prospect.scores = scores;
                prospect.updated_at = self.services.clock.now();
                user.save_prospect(&prospect).await?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn publish_envelope(&self, request: &DiscoveryRequest, envelope: &DiscoveryEnvelope) {
        let now = self.services.clock.now();
        let event = ActivityEvent::new(
            &request.user_id,
            ActivityType::Prospect,
            "Prospect discovery complete",
            &format!(
                "Discovered {} prospects across {} categories",
                envelope.prospects_saved,
                envelope.categories.len()
            ),
            now,
        )
        .with_metadata(
            "envelope",
            serde_json::to_value(envelope).unwrap_or_default(),
        );

        if let Err(e) = self.services.realtime.publish(event).await {
            warn!(user_id = %request.user_id, error = %e, "Failed to publish discovery activity");
        }
    }
}
