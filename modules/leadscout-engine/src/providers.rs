// Provider trait boundary for the engines.
//
// WebSearch / Scrape / ChatModel are the three seams the pipelines call
// through. Concrete impls bind the client crates; mocks bind fixtures.
// ProviderSet owns the concurrency model: per-provider semaphores, per-host
// scrape pacing, and budget gating. A provider whose key is missing is
// simply absent - callers get `Unavailable` and degrade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use ai_client::{Claude, OpenAi};
use leadscout_common::error::LeadScoutError;

use crate::budget::{BudgetTracker, OperationCost};

pub type Result<T> = std::result::Result<T, LeadScoutError>;

// --- Wire types at the boundary ---

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOpts {
    pub num: Option<u32>,
    pub site: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub html: String,
    pub text: String,
    pub status: u16,
    pub title: Option<String>,
    pub og_site_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOpts {
    pub wait_ms: Option<u64>,
    pub stealth: bool,
    pub main_content_only: bool,
}

// --- Traits ---

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn query(&self, q: &str, opts: &SearchOpts) -> Result<Vec<SearchHit>>;
}

#[async_trait]
pub trait Scrape: Send + Sync {
    async fn fetch(&self, url: &str, opts: &ScrapeOpts) -> Result<PageContent>;
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Schema-enforced extraction returning the raw value; use
    /// `extract_typed` for the typed layer.
    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value>;
}

// --- Typed extraction ---

/// How deep schema normalization descends. Self-referential types would
/// otherwise loop through their own definition forever.
const SCHEMA_MAX_DEPTH: usize = 64;

/// Derive the strict schema both providers accept for enforced output:
/// every object closed (`additionalProperties: false`), every property
/// required (nullable ones included), and `definitions` references resolved
/// inline. Returns `(schema_name, schema)`.
pub fn strict_schema_for<T: JsonSchema>() -> (String, Value) {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();

    let definitions = schema
        .as_object_mut()
        .and_then(|root| root.remove("definitions"))
        .unwrap_or(Value::Null);
    if let Some(root) = schema.as_object_mut() {
        root.remove("$schema");
    }

    tighten(&mut schema, &definitions, 0);
    (T::schema_name(), schema)
}

fn tighten(node: &mut Value, definitions: &Value, depth: usize) {
    if depth > SCHEMA_MAX_DEPTH {
        return;
    }

    // Unwrap schemars indirections in place: a `$ref` into definitions and a
    // single-element `allOf` both stand for the schema they point at, and
    // one can wrap the other. Bounded, since a definition may reference
    // itself.
    for _ in 0..8 {
        let Some(map) = node.as_object() else { break };
        let replacement = if let Some(path) = map.get("$ref").and_then(Value::as_str) {
            path.rsplit('/').next().and_then(|name| definitions.get(name)).cloned()
        } else if let Some(Value::Array(inner)) = map.get("allOf") {
            (inner.len() == 1).then(|| inner[0].clone())
        } else {
            None
        };
        match replacement {
            Some(resolved) => *node = resolved,
            None => break,
        }
    }

    match node {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                if let Some(Value::Object(properties)) = map.get("properties") {
                    let all: Vec<Value> =
                        properties.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all));
                }
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for child in map.values_mut() {
                tighten(child, definitions, depth + 1);
            }
        }
        Value::Array(items) => {
            for child in items {
                tighten(child, definitions, depth + 1);
            }
        }
        _ => {}
    }
}

/// Typed extraction over any `ChatModel`: derive the strict schema, run the
/// enforced-output call, deserialize. A local mismatch gets one reprompt
/// with the parse error spelled out, then the failure surfaces as
/// `Validation`.
pub async fn extract_typed<T: JsonSchema + DeserializeOwned>(
    model: &dyn ChatModel,
    system: &str,
    user: &str,
) -> Result<T> {
    let (name, schema) = strict_schema_for::<T>();

    let first = model
        .extract_value(system, user, &name, schema.clone())
        .await?;
    let parse_err = match serde_json::from_value::<T>(first) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    warn!(schema = %name, error = %parse_err, "Extraction missed the schema, reprompting once");
    let retry_user = format!(
        "{user}\n\nThe previous response did not match the required schema \
         ({parse_err}). Respond again, matching the schema exactly."
    );
    let second = model.extract_value(system, &retry_user, &name, schema).await?;
    serde_json::from_value(second)
        .map_err(|e| LeadScoutError::Validation(format!("LLM output failed schema: {e}")))
}

// --- Concrete bindings ---

pub struct SerperSearch {
    client: serper_client::SerperClient,
}

impl SerperSearch {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: serper_client::SerperClient::new(api_key),
        }
    }
}

#[async_trait]
impl WebSearch for SerperSearch {
    async fn query(&self, q: &str, opts: &SearchOpts) -> Result<Vec<SearchHit>> {
        let options = serper_client::SearchOptions {
            num: opts.num,
            site: opts.site.clone(),
            location: opts.location.clone(),
        };
        let hits = self
            .client
            .search(q, &options)
            .await
            .map_err(map_serper_error)?;
        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                title: h.title,
                url: h.url,
                snippet: h.snippet,
            })
            .collect())
    }
}

fn map_serper_error(err: serper_client::SerperError) -> LeadScoutError {
    use serper_client::SerperError as E;
    match err {
        E::QuotaExhausted => LeadScoutError::Quota("serper".to_string()),
        E::RateLimited { .. } => LeadScoutError::Transient("serper rate limited".to_string()),
        E::Network(msg) => LeadScoutError::Transient(msg),
        E::Api { status, message } if status >= 500 => {
            LeadScoutError::Transient(format!("serper {status}: {message}"))
        }
        E::Api { status, message } => {
            LeadScoutError::Permanent(format!("serper {status}: {message}"))
        }
        E::Parse(msg) => LeadScoutError::Permanent(format!("serper parse: {msg}")),
    }
}

pub struct FirecrawlScrape {
    client: firecrawl_client::FirecrawlClient,
}

impl FirecrawlScrape {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: firecrawl_client::FirecrawlClient::new(api_key),
        }
    }
}

#[async_trait]
impl Scrape for FirecrawlScrape {
    async fn fetch(&self, url: &str, opts: &ScrapeOpts) -> Result<PageContent> {
        let options = firecrawl_client::FetchOptions {
            wait_ms: opts.wait_ms,
            stealth: opts.stealth,
            main_content_only: opts.main_content_only,
        };
        let page = self
            .client
            .fetch(url, &options)
            .await
            .map_err(map_firecrawl_error)?;
        Ok(PageContent {
            url: page.url,
            html: page.content_html,
            text: page.content_text,
            status: page.status,
            title: page.title,
            og_site_name: page.og_site_name,
        })
    }
}

fn map_firecrawl_error(err: firecrawl_client::FirecrawlError) -> LeadScoutError {
    use firecrawl_client::FirecrawlError as E;
    match err {
        E::CircuitOpen { host, .. } => {
            LeadScoutError::Unavailable(format!("scrape circuit open for {host}"))
        }
        E::Network(msg) => LeadScoutError::Transient(msg),
        E::Api { status, message } if status == 429 || status >= 500 => {
            LeadScoutError::Transient(format!("firecrawl {status}: {message}"))
        }
        E::Api { status, message } => {
            LeadScoutError::Permanent(format!("firecrawl {status}: {message}"))
        }
        E::EmptyContent { url } => LeadScoutError::Permanent(format!("empty content for {url}")),
        E::InvalidUrl(url) => LeadScoutError::Validation(format!("invalid url: {url}")),
        E::Parse(msg) => LeadScoutError::Permanent(format!("firecrawl parse: {msg}")),
    }
}

pub struct ClaudeChat {
    client: Claude,
}

impl ClaudeChat {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Claude::new(api_key, model),
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.client
            .chat_completion(system, user)
            .await
            .map_err(|e| LeadScoutError::Transient(e.to_string()))
    }

    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        _schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.client
            .extract_value(system, user, schema)
            .await
            .map_err(|e| LeadScoutError::Transient(e.to_string()))
    }
}

pub struct OpenAiChat {
    client: OpenAi,
}

impl OpenAiChat {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: OpenAi::new(api_key, model),
        }
    }

    /// Point at an OpenAI-compatible endpoint (Perplexity for the research
    /// source).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.client
            .chat_completion(system, user)
            .await
            .map_err(|e| LeadScoutError::Transient(e.to_string()))
    }

    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.client
            .extract_value(system, user, schema_name.to_string(), schema)
            .await
            .map_err(|e| LeadScoutError::Transient(e.to_string()))
    }
}

// --- ProviderSet ---

/// Per-provider concurrency caps.
const SEARCH_CONCURRENCY: usize = 4;
const SCRAPE_CONCURRENCY: usize = 2;
const LLM_CONCURRENCY: usize = 4;

/// Minimum gap between consecutive requests to the same host.
const PER_HOST_GAP: Duration = Duration::from_millis(500);

pub struct ProviderSet {
    search: Option<Arc<dyn WebSearch>>,
    scrape: Option<Arc<dyn Scrape>>,
    /// Extraction/synthesis model.
    chat: Option<Arc<dyn ChatModel>>,
    /// Web-grounded research model (the "perplexity" source).
    researcher: Option<Arc<dyn ChatModel>>,

    search_sem: Semaphore,
    scrape_sem: Semaphore,
    llm_sem: Semaphore,

    /// Per-host gate: cap 1 in flight + minimum spacing.
    host_gates: Mutex<HashMap<String, Arc<Mutex<Option<Instant>>>>>,

    budget: Arc<BudgetTracker>,
}

impl ProviderSet {
    pub fn new(budget: Arc<BudgetTracker>) -> Self {
        Self {
            search: None,
            scrape: None,
            chat: None,
            researcher: None,
            search_sem: Semaphore::new(SEARCH_CONCURRENCY),
            scrape_sem: Semaphore::new(SCRAPE_CONCURRENCY),
            llm_sem: Semaphore::new(LLM_CONCURRENCY),
            host_gates: Mutex::new(HashMap::new()),
            budget,
        }
    }

    /// Wire up providers from config; missing keys leave the slot empty.
    pub fn from_config(config: &leadscout_common::Config, budget: Arc<BudgetTracker>) -> Self {
        let mut set = Self::new(budget);
        if config.has_search() {
            set = set.with_search(Arc::new(SerperSearch::new(&config.serper_api_key)));
        }
        if config.has_scrape() {
            set = set.with_scrape(Arc::new(FirecrawlScrape::new(&config.firecrawl_api_key)));
        }
        if !config.anthropic_api_key.is_empty() {
            set = set.with_chat(Arc::new(ClaudeChat::new(
                &config.anthropic_api_key,
                "claude-haiku-4-5-20251001",
            )));
        }
        if !config.openai_api_key.is_empty() {
            set = set.with_researcher(Arc::new(
                OpenAiChat::new(&config.openai_api_key, "sonar-pro")
                    .with_base_url("https://api.perplexity.ai"),
            ));
        }
        set
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_scrape(mut self, scrape: Arc<dyn Scrape>) -> Self {
        self.scrape = Some(scrape);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatModel>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_researcher(mut self, researcher: Arc<dyn ChatModel>) -> Self {
        self.researcher = Some(researcher);
        self
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn has_scrape(&self) -> bool {
        self.scrape.is_some()
    }

    pub fn has_chat(&self) -> bool {
        self.chat.is_some()
    }

    pub fn has_researcher(&self) -> bool {
        self.researcher.is_some()
    }

    pub async fn search(&self, q: &str, opts: &SearchOpts) -> Result<Vec<SearchHit>> {
        let provider = self
            .search
            .as_ref()
            .ok_or_else(|| LeadScoutError::Unavailable("web search disabled".to_string()))?;
        if !self.budget.has_budget(OperationCost::SEARCH_QUERY) {
            return Err(LeadScoutError::Quota("daily budget exhausted".to_string()));
        }
        let _permit = self
            .search_sem
            .acquire()
            .await
            .map_err(|_| LeadScoutError::Cancelled)?;
        self.budget.spend(OperationCost::SEARCH_QUERY);
        provider.query(q, opts).await
    }

    /// Scrape with per-host pacing: at most one in-flight request per host
    /// and ≥500 ms between consecutive requests to the same host.
    pub async fn scrape(&self, url: &str, opts: &ScrapeOpts) -> Result<PageContent> {
        let provider = self
            .scrape
            .as_ref()
            .ok_or_else(|| LeadScoutError::Unavailable("scraping disabled".to_string()))?;
        let cost = if opts.stealth {
            OperationCost::STEALTH_SCRAPE
        } else {
            OperationCost::PAGE_SCRAPE
        };
        if !self.budget.has_budget(cost) {
            return Err(LeadScoutError::Quota("daily budget exhausted".to_string()));
        }

        let host = host_of(url);
        let gate = {
            let mut gates = self.host_gates.lock().await;
            gates.entry(host.clone()).or_default().clone()
        };

        let _permit = self
            .scrape_sem
            .acquire()
            .await
            .map_err(|_| LeadScoutError::Cancelled)?;

        // Held across the provider call: per-host cap of 1.
        let mut last = gate.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < PER_HOST_GAP {
                debug!(host = %host, "Pacing scrape to respect per-host gap");
                tokio::time::sleep(PER_HOST_GAP - elapsed).await;
            }
        }

        self.budget.spend(cost);
        let result = provider.fetch(url, opts).await;
        *last = Some(Instant::now());
        result
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let provider = self
            .chat
            .as_ref()
            .ok_or_else(|| LeadScoutError::Unavailable("llm disabled".to_string()))?;
        if !self.budget.has_budget(OperationCost::LLM_SYNTHESIS) {
            return Err(LeadScoutError::Quota("daily budget exhausted".to_string()));
        }
        let _permit = self
            .llm_sem
            .acquire()
            .await
            .map_err(|_| LeadScoutError::Cancelled)?;
        self.budget.spend(OperationCost::LLM_SYNTHESIS);
        provider.complete(system, user).await
    }

    pub async fn extract<T: JsonSchema + DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let provider = self
            .chat
            .as_ref()
            .ok_or_else(|| LeadScoutError::Unavailable("llm disabled".to_string()))?;
        if !self.budget.has_budget(OperationCost::LLM_EXTRACTION) {
            return Err(LeadScoutError::Quota("daily budget exhausted".to_string()));
        }
        let _permit = self
            .llm_sem
            .acquire()
            .await
            .map_err(|_| LeadScoutError::Cancelled)?;
        self.budget.spend(OperationCost::LLM_EXTRACTION);
        extract_typed(provider.as_ref(), system, user).await
    }

    /// Web-grounded research completion (distinct provider slot from
    /// extraction so the two can be keyed independently).
    pub async fn research(&self, system: &str, user: &str) -> Result<String> {
        let provider = self
            .researcher
            .as_ref()
            .ok_or_else(|| LeadScoutError::Unavailable("research llm disabled".to_string()))?;
        if !self.budget.has_budget(OperationCost::LLM_RESEARCH) {
            return Err(LeadScoutError::Quota("daily budget exhausted".to_string()));
        }
        let _permit = self
            .llm_sem
            .acquire()
            .await
            .map_err(|_| LeadScoutError::Cancelled)?;
        self.budget.spend(OperationCost::LLM_RESEARCH);
        provider.complete(system, user).await
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction_falls_back_to_input() {
        assert_eq!(host_of("https://Example.com/x"), "example.com");
        assert_eq!(host_of("garbage"), "garbage");
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let set = ProviderSet::new(Arc::new(BudgetTracker::new(0)));
        let err = set.search("q", &SearchOpts::default()).await.unwrap_err();
        assert!(matches!(err, LeadScoutError::Unavailable(_)));
        let err = set
            .scrape("https://example.com", &ScrapeOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LeadScoutError::Unavailable(_)));
        let err = set.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LeadScoutError::Unavailable(_)));
    }

    #[tokio::test]
    async fn exhausted_budget_is_quota() {
        struct NullSearch;
        #[async_trait]
        impl WebSearch for NullSearch {
            async fn query(&self, _q: &str, _opts: &SearchOpts) -> Result<Vec<SearchHit>> {
                Ok(Vec::new())
            }
        }

        let budget = Arc::new(BudgetTracker::new(1));
        budget.spend(1);
        let set = ProviderSet::new(budget).with_search(Arc::new(NullSearch));
        let err = set.search("q", &SearchOpts::default()).await.unwrap_err();
        assert!(matches!(err, LeadScoutError::Quota(_)));
    }

    // --- strict_schema_for ---

    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct CandidateContact {
        email: Option<String>,
        phone: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Candidate {
        name: String,
        contact: CandidateContact,
    }

    #[derive(Deserialize, JsonSchema)]
    struct CandidateList {
        candidates: Vec<Candidate>,
    }

    #[test]
    fn schema_has_no_definitions_or_meta() {
        let (name, schema) = strict_schema_for::<CandidateList>();
        assert_eq!(name, "CandidateList");
        let root = schema.as_object().unwrap();
        assert!(!root.contains_key("definitions"));
        assert!(!root.contains_key("$schema"));
        assert_eq!(root.get("additionalProperties"), Some(&Value::Bool(false)));
    }

    #[test]
    fn nullable_fields_are_still_required() {
        let (_, schema) = strict_schema_for::<CandidateContact>();
        let required = schema["required"].as_array().unwrap();
        let names: Vec<&str> = required.iter().filter_map(Value::as_str).collect();
        assert!(names.contains(&"email"));
        assert!(names.contains(&"phone"));
    }

    #[test]
    fn nested_refs_resolve_inline_and_close() {
        let (_, schema) = strict_schema_for::<CandidateList>();
        let item = &schema["properties"]["candidates"]["items"];
        assert!(item.get("$ref").is_none());
        assert_eq!(item["type"], "object");

        let contact = &item["properties"]["contact"];
        assert!(contact.get("$ref").is_none());
        assert_eq!(contact["additionalProperties"], Value::Bool(false));
    }
}
