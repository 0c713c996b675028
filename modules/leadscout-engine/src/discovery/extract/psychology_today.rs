use scraper::Html;
use tracing::debug;

use super::base::{
    extract_links, mine_emails, mine_phones, resolve_organization, select_first_text,
    select_texts, validate_person_name,
};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Psychology Today's therapist directory. Listing pages link to profile
/// pages whose final path segment is a numeric profile id.
pub struct PsychologyTodayExtractor;

impl PsychologyTodayExtractor {
    fn is_profile(url: &str) -> bool {
        url.split('/')
            .next_back()
            .map(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }
}

impl SiteExtractor for PsychologyTodayExtractor {
    fn name(&self) -> &'static str {
        "psychology_today"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("psychologytoday.com") && url.contains("/therapists")
    }

    fn extract(&self, page: &PageContent, category: &str) -> Extraction {
        if Self::is_profile(&page.url) {
            extract_profile(page, category)
        } else {
            extract_listing(page)
        }
    }
}

fn extract_listing(page: &PageContent) -> Extraction {
    let profile_urls = extract_links(&page.html, &page.url, "/us/therapists/")
        .into_iter()
        .filter(|u| PsychologyTodayExtractor::is_profile(u))
        .collect::<Vec<_>>();

    debug!(
        url = %page.url,
        profiles = profile_urls.len(),
        "Psychology Today listing parsed"
    );

    Extraction {
        prospects: Vec::new(),
        profile_urls,
    }
}

fn extract_profile(page: &PageContent, _category: &str) -> Extraction {
    let doc = Html::parse_document(&page.html);

    let name = select_first_text(&doc, "h1")
        .and_then(|raw| validate_person_name(&raw));
    let Some(name) = name else {
        return Extraction::default();
    };

    // The statement block usually names the practice; titles carry the
    // clinician's discipline.
    let job_title = select_texts(&doc, ".profile-title, .suffix, h2")
        .into_iter()
        .find(|t| {
            let lower = t.to_lowercase();
            ["psychologist", "therapist", "counselor", "social worker", "psychiatrist"]
                .iter()
                .any(|k| lower.contains(k))
        });

    let organization = resolve_organization(
        page.og_site_name.as_deref(),
        &page.html,
        &page.text,
        &page.url,
    );

    let emails = mine_emails(&page.html, &page.text);
    let phones = mine_phones(&page.text);

    let draft = ProspectDraft {
        name,
        organization,
        job_title,
        email: emails.into_iter().next(),
        phone: phones.into_iter().next(),
        source_url: page.url.clone(),
        profile_url: None,
    };

    Extraction {
        prospects: vec![draft],
        profile_urls: Vec::new(),
    }
}
