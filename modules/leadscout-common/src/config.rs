use std::env;

/// Application configuration loaded from environment variables.
///
/// Provider keys are optional everywhere: a missing key disables that
/// provider path and the pipeline degrades instead of crashing.
#[derive(Debug, Clone)]
pub struct Config {
    // LLM providers
    pub anthropic_api_key: String,
    pub openai_api_key: String,

    // Search / scraping
    pub serper_api_key: String,
    pub firecrawl_api_key: String,

    // Store (external collaborator; passed through to the backend adapter)
    pub store_project_id: String,
    pub store_credentials_path: String,

    // Auth plumbing for the server crate sitting above the core
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,

    // Optional Redis for the realtime fan-out in multi-process deployments
    pub redis_url: Option<String>,

    // Cost throttling
    /// Daily provider budget in cents. 0 = unlimited.
    pub daily_budget_cents: u64,
    /// Free-tier batch mode: cap provider fan-out and stagger starts.
    pub batch_mode: bool,
}

impl Config {
    /// Load config for the engine (research/discovery/outreach workers).
    pub fn engine_from_env() -> Self {
        Self {
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            serper_api_key: env::var("SERPER_API_KEY").unwrap_or_default(),
            firecrawl_api_key: env::var("FIRECRAWL_API_KEY").unwrap_or_default(),
            store_project_id: env::var("STORE_PROJECT_ID").unwrap_or_default(),
            store_credentials_path: env::var("STORE_CREDENTIALS_PATH").unwrap_or_default(),
            jwt_secret: String::new(),
            cors_origins: Vec::new(),
            redis_url: None,
            daily_budget_cents: env::var("DAILY_BUDGET_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            batch_mode: env::var("BATCH_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Load config for the realtime process (WS hub + webhook dispatcher).
    pub fn realtime_from_env() -> Self {
        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            serper_api_key: String::new(),
            firecrawl_api_key: String::new(),
            store_project_id: env::var("STORE_PROJECT_ID").unwrap_or_default(),
            store_credentials_path: env::var("STORE_CREDENTIALS_PATH").unwrap_or_default(),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_default(),
            cors_origins,
            redis_url: env::var("REDIS_URL").ok(),
            daily_budget_cents: 0,
            batch_mode: false,
        }
    }

    pub fn has_llm(&self) -> bool {
        !self.anthropic_api_key.is_empty() || !self.openai_api_key.is_empty()
    }

    pub fn has_search(&self) -> bool {
        !self.serper_api_key.is_empty()
    }

    pub fn has_scrape(&self) -> bool {
        !self.firecrawl_api_key.is_empty()
    }

    /// Log presence/length of each sensitive env var without leaking values.
    pub fn log_redacted(&self) {
        let vars = [
            ("ANTHROPIC_API_KEY", &self.anthropic_api_key),
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("SERPER_API_KEY", &self.serper_api_key),
            ("FIRECRAWL_API_KEY", &self.firecrawl_api_key),
            ("STORE_PROJECT_ID", &self.store_project_id),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({} chars)", value.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_disable_providers() {
        let config = Config {
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            serper_api_key: String::new(),
            firecrawl_api_key: "fc-key".to_string(),
            store_project_id: String::new(),
            store_credentials_path: String::new(),
            jwt_secret: String::new(),
            cors_origins: Vec::new(),
            redis_url: None,
            daily_budget_cents: 0,
            batch_mode: false,
        };
        assert!(!config.has_llm());
        assert!(!config.has_search());
        assert!(config.has_scrape());
    }
}
