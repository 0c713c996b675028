use serde::{Deserialize, Serialize};

/// Request body for the Serper /search endpoint. Only the fields we need —
/// the API defaults the rest, which keeps response payloads small.
#[derive(Debug, Serialize)]
pub struct SearchRequest {
    pub q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gl: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: u32,
}

/// A normalized search hit, provider-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl From<OrganicResult> for SearchHit {
    fn from(r: OrganicResult) -> Self {
        Self {
            title: r.title,
            url: r.link,
            snippet: r.snippet,
        }
    }
}

/// Options for a search call.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Max results to request (API caps at 100).
    pub num: Option<u32>,
    /// Restrict to one site (`site:` operator prepended to the query).
    pub site: Option<String>,
    /// Location bias, e.g. "Washington, DC".
    pub location: Option<String>,
}
