use tracing::debug;

use super::base::{mine_emails, mine_name_role_pairs, mine_phones, resolve_organization};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Embassy and consulate staff pages. Hostname-matched: the official sites
/// follow recognizable naming ("usembassy.gov", "embassyofx.org",
/// "consulate-...").
pub struct EmbassyExtractor;

const HOST_MARKERS: &[&str] = &["embassy", "consulate", "emb."];

const ROLE_KEYWORDS: &[&str] = &[
    "ambassador",
    "consul",
    "attaché",
    "attache",
    "secretary",
    "counselor",
    "chargé",
    "charge d'affaires",
    "cultural affairs",
    "education officer",
    "liaison",
];

impl SiteExtractor for EmbassyExtractor {
    fn name(&self) -> &'static str {
        "embassy"
    }

    fn matches(&self, url: &str) -> bool {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();
        HOST_MARKERS.iter().any(|m| host.contains(m))
    }

    fn extract(&self, page: &PageContent, _category: &str) -> Extraction {
        let organization = resolve_organization(
            page.og_site_name.as_deref(),
            &page.html,
            &page.text,
            &page.url,
        );

        let office_email = mine_emails(&page.html, &page.text).into_iter().next();
        let office_phone = mine_phones(&page.text).into_iter().next();

        let pairs = mine_name_role_pairs(&page.text, ROLE_KEYWORDS);
        debug!(url = %page.url, staff = pairs.len(), "Embassy staff page parsed");

        let prospects = pairs
            .into_iter()
            .map(|(name, role)| ProspectDraft {
                name,
                organization: organization.clone(),
                job_title: Some(role),
                email: office_email.clone(),
                phone: office_phone.clone(),
                source_url: page.url.clone(),
                profile_url: None,
            })
            .collect();

        Extraction {
            prospects,
            profile_urls: Vec::new(),
        }
    }
}
