use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<String>,
    #[serde(rename = "onlyMainContent")]
    pub only_main_content: bool,
    #[serde(rename = "waitFor", skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,
    /// "stealth" routes through residential proxies — slower and pricier,
    /// so only the escalated path sets it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeData {
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub metadata: Option<ScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeMetadata {
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub title: Option<String>,
    #[serde(rename = "ogSiteName")]
    pub og_site_name: Option<String>,
}

/// A fetched page, ready for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub content_html: String,
    pub content_text: String,
    pub status: u16,
    pub title: Option<String>,
    pub og_site_name: Option<String>,
}

/// Options for a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Milliseconds to wait for JS rendering before capture.
    pub wait_ms: Option<u64>,
    /// Skip the cheap path and go straight to stealth. Normally left false —
    /// escalation happens automatically after a cheap-path failure.
    pub stealth: bool,
    pub main_content_only: bool,
}
