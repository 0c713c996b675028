use tracing::debug;

use super::base::{mine_emails, mine_name_role_pairs, mine_phones, resolve_organization};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Residential/outpatient treatment centers. There is no directory here —
/// the signal is a team/leadership page on the center's own site whose body
/// carries levels-of-care vocabulary (RTC, PHP, IOP).
pub struct TreatmentCenterExtractor;

const TEAM_PATHS: &[&str] = &[
    "/team", "/staff", "/leadership", "/our-team", "/about-us", "/about", "/clinical-team",
];

const CARE_VOCABULARY: &[&str] = &[
    "rtc",
    "php",
    "iop",
    "residential treatment",
    "partial hospitalization",
    "intensive outpatient",
    "levels of care",
    "detox",
    "inpatient",
];

const ROLE_KEYWORDS: &[&str] = &[
    "director", "admissions", "clinical", "therapist", "counselor", "founder", "executive",
    "coordinator", "outreach", "psychiatrist", "program",
];

impl SiteExtractor for TreatmentCenterExtractor {
    fn name(&self) -> &'static str {
        "treatment_center"
    }

    fn matches(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        TEAM_PATHS.iter().any(|p| lower.contains(p))
            && ["treatment", "recovery", "behavioral", "residential"]
                .iter()
                .any(|k| lower.contains(k))
    }

    fn matches_content(&self, url: &str, text: &str) -> bool {
        if self.matches(url) {
            return true;
        }
        let lower_url = url.to_lowercase();
        if !TEAM_PATHS.iter().any(|p| lower_url.contains(p)) {
            return false;
        }
        let lower = text.to_lowercase();
        CARE_VOCABULARY.iter().filter(|v| lower.contains(*v)).count() >= 2
    }

    fn extract(&self, page: &PageContent, _category: &str) -> Extraction {
        let organization = resolve_organization(
            page.og_site_name.as_deref(),
            &page.html,
            &page.text,
            &page.url,
        );

        // Shared center contacts apply to every listed staff member; a
        // personal email would need a per-person page we don't have here.
        let center_email = mine_emails(&page.html, &page.text).into_iter().next();
        let center_phone = mine_phones(&page.text).into_iter().next();

        let pairs = mine_name_role_pairs(&page.text, ROLE_KEYWORDS);
        debug!(url = %page.url, staff = pairs.len(), "Treatment center team page parsed");

        let prospects = pairs
            .into_iter()
            .map(|(name, role)| ProspectDraft {
                name,
                organization: organization.clone(),
                job_title: Some(role),
                email: center_email.clone(),
                phone: center_phone.clone(),
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
            og_site_name: Some("Serenity Ridge Recovery Center".to_string()),
        }
    }

    #[test]
    fn content_match_requires_care_vocabulary() {
        let e = TreatmentCenterExtractor;
        assert!(e.matches_content(
            "https://serenityridge.org/our-team",
            "We offer RTC and PHP levels of care for adolescents."
        ));
        assert!(!e.matches_content(
            "https://serenityridge.org/our-team",
            "We are a marketing agency."
        ));
        assert!(!e.matches_content(
            "https://serenityridge.org/blog",
            "RTC PHP IOP everywhere but not a team page."
        ));
    }

    #[test]
    fn team_page_yields_staff_with_shared_contacts() {
        let text = "Our Team\n\
                    Jane Smith, Clinical Director\n\
                    Bob Jones, Director of Admissions\n\
                    Our PHP and IOP programs accept referrals.\n\
                    Call (202) 555-0111 or email admissions@serenityridge.org";
        let e = TreatmentCenterExtractor;
        let result = e.extract(
            &page("https://serenityridge.org/our-team", "<html></html>", text),
            "treatment_centers",
        );

        assert_eq!(result.prospects.len(), 2);
        for p in &result.prospects {
            assert_eq!(
                p.organization.as_deref(),
                Some("Serenity Ridge Recovery Center")
            );
            assert_eq!(p.phone.as_deref(), Some("+12025550111"));
        }
        assert_eq!(result.prospects[0].name, "Jane Smith");
        assert_eq!(
            result.prospects[1].job_title.as_deref(),
            Some("Director of Admissions")
        );
    }
}
