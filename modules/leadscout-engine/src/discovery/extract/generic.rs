use scraper::Html;
use tracing::debug;

use super::base::{
    mine_emails, mine_name_role_pairs, mine_phones, resolve_organization, select_first_text,
    validate_person_name,
};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Fallback extractor for any page no specialist claims. Mines name/role
/// pairs from text with a broad role vocabulary, and falls back to the page
/// heading when the page is clearly a single person's profile.
pub struct GenericExtractor;

const ROLE_KEYWORDS: &[&str] = &[
    "director", "founder", "ceo", "president", "principal", "head", "manager", "coordinator",
    "therapist", "counselor", "psychologist", "psychiatrist", "consultant", "officer",
    "admissions", "dean", "superintendent", "owner", "partner", "teacher", "educator",
];

impl SiteExtractor for GenericExtractor {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn matches(&self, _url: &str) -> bool {
        true
    }

    fn extract(&self, page: &PageContent, _category: &str) -> Extraction {
        let organization = resolve_organization(
            page.og_site_name.as_deref(),
            &page.html,
            &page.text,
            &page.url,
        );

        let emails = mine_emails(&page.html, &page.text);
        let phones = mine_phones(&page.text);

        let mut prospects: Vec<ProspectDraft> =
            mine_name_role_pairs(&page.text, ROLE_KEYWORDS)
                .into_iter()
                .map(|(name, role)| ProspectDraft {
                    name,
                    organization: organization.clone(),
                    job_title: Some(role),
                    email: None,
                    phone: None,
                    source_url: page.url.clone(),
                    profile_url: None,
                })
                .collect();

        // Single-profile page: one h1 that validates as a person name.
        if prospects.is_empty() {
            let doc = Html::parse_document(&page.html);
            if let Some(name) =
                select_first_text(&doc, "h1").and_then(|raw| validate_person_name(&raw))
            {
                prospects.push(ProspectDraft {
                    name,
                    organization: organization.clone(),
                    job_title: None,
                    email: None,
                    phone: None,
                    source_url: page.url.clone(),
                    profile_url: None,
                });
            }
        }

        // Page-level contacts attach only when they're unambiguous.
        if prospects.len() == 1 {
            prospects[0].email = emails.into_iter().next();
            prospects[0].phone = phones.into_iter().next();
        }

        debug!(url = %page.url, prospects = prospects.len(), "Generic extraction complete");

        Extraction {
            prospects,
            profile_urls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: &str, text: &str) -> PageContent {
        PageContent {
            url: url.to_string(),
            html: html.to_string(),
            text: text.to_string(),
            status: 200,
            title: None,
            og_site_name: None,
        }
    }

    #[test]
    fn roster_text_yields_multiple_prospects_without_contacts() {
        let text = "About Us\n\
                    Jane Smith, Executive Director\n\
                    Bob Jones, Admissions Counselor\n\
                    Email info@school.org or call (202) 555-0100.";
        let e = GenericExtractor;
        let result = e.extract(&page("https://school.org/about", "", text), "private_schools");

        assert_eq!(result.prospects.len(), 2);
        // Shared page contacts stay off multi-person rosters.
        assert!(result.prospects[0].email.is_none());
        assert!(result.prospects[0].phone.is_none());
    }

    #[test]
    fn single_profile_gets_page_contacts() {
        let html = "<h1>Jane Smith</h1>";
        let text = "Jane Smith\nReach me: jane@practice.com or (202) 555-0123";
        let e = GenericExtractor;
        let result = e.extract(&page("https://janesmith.com", html, text), "psychologists");

        assert_eq!(result.prospects.len(), 1);
        assert_eq!(result.prospects[0].email.as_deref(), Some("jane@practice.com"));
        assert_eq!(result.prospects[0].phone.as_deref(), Some("+12025550123"));
    }

    #[test]
    fn chrome_only_page_yields_nothing() {
        let e = GenericExtractor;
        let result = e.extract(
            &page(
                "https://example.com",
                "<h1>Welcome Home</h1>",
                "Privacy Policy\nTerms of Service",
            ),
            "psychologists",
        );
        assert!(result.prospects.is_empty());
    }
}
