use scraper::Html;
use tracing::debug;

use super::base::{
    extract_links, mine_emails, mine_phones, resolve_organization, select_first_text,
    select_texts, validate_person_name,
};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Medical directories: Healthgrades, Zocdoc, Vitals, WebMD, DocSpot. They
/// share a shape - listing pages of cards linking to physician profiles —
/// but each uses its own profile path prefix.
pub struct DoctorDirectoryExtractor;

const HOSTS: &[&str] = &[
    "healthgrades.com",
    "zocdoc.com",
    "vitals.com",
    "webmd.com",
    "docspot",
];

/// Profile path markers per host family.
const PROFILE_PATTERNS: &[&str] = &["/physician/", "/doctor/", "/doctors/", "/providers/"];

impl DoctorDirectoryExtractor {
    fn is_profile(url: &str) -> bool {
        PROFILE_PATTERNS.iter().any(|p| url.contains(p))
    }
}

impl SiteExtractor for DoctorDirectoryExtractor {
    fn name(&self) -> &'static str {
        "doctor_directory"
    }

    fn matches(&self, url: &str) -> bool {
        HOSTS.iter().any(|h| url.contains(h))
    }

    fn extract(&self, page: &PageContent, _category: &str) -> Extraction {
        if Self::is_profile(&page.url) {
            extract_profile(page)
        } else {
            extract_listing(page)
        }
    }
}

fn extract_listing(page: &PageContent) -> Extraction {
    let mut profile_urls = Vec::new();
    for pattern in PROFILE_PATTERNS {
        profile_urls.extend(extract_links(&page.html, &page.url, pattern));
    }
    profile_urls.dedup();

    debug!(url = %page.url, profiles = profile_urls.len(), "Doctor directory listing parsed");

    Extraction {
        prospects: Vec::new(),
        profile_urls,
    }
}

fn extract_profile(page: &PageContent) -> Extraction {
    let doc = Html::parse_document(&page.html);

    let Some(name) = select_first_text(&doc, "h1").and_then(|raw| validate_person_name(&raw))
    else {
        return Extraction::default();
    };

    let job_title = select_texts(&doc, "h2, .specialty, .provider-specialty")
        .into_iter()
        .find(|t| {
            let lower = t.to_lowercase();
            [
                "psychiatr", "psycholog", "pediatric", "physician", "doctor", "medicine",
                "therapist", "practitioner",
            ]
            .iter()
            .any(|k| lower.contains(k))
        });

    // Directory pages name the practice in the body; the directory brand
    // itself is discarded by the resolution chain.
    let organization = resolve_organization(
        page.og_site_name.as_deref(),
        &page.html,
        &page.text,
        &page.url,
    );

    let draft = ProspectDraft {
        name,
        organization,
        job_title,
        email: mine_emails(&page.html, &page.text).into_iter().next(),
        phone: mine_phones(&page.text).into_iter().next(),
        source_url: page.url.clone(),
        profile_url: None,
    };

    Extraction {
        prospects: vec![draft],
        profile_urls: Vec::new(),
    }
}
