use tracing::debug;

use super::base::{mine_emails, mine_name_role_pairs, mine_phones, resolve_organization};
use super::{Extraction, ProspectDraft, SiteExtractor};
use crate::providers::PageContent;

/// Youth sports clubs and academies: coach rosters under `/coaches` or
/// `/team` on sites with sport vocabulary in the URL.
pub struct YouthSportsExtractor;

const ROSTER_PATHS: &[&str] = &["/coaches", "/team", "/staff", "/our-coaches"];

const SPORT_MARKERS: &[&str] = &[
    "soccer", "football", "basketball", "baseball", "lacrosse", "hockey", "swim", "tennis",
    "volleyball", "athletic", "academy", "club", "sports", "fc", "united",
];

const ROLE_KEYWORDS: &[&str] = &[
    "coach", "director of coaching", "trainer", "athletic director", "program director",
    "manager",
];

impl SiteExtractor for YouthSportsExtractor {
    fn name(&self) -> &'static str {
        "youth_sports"
    }

    fn matches(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        ROSTER_PATHS.iter().any(|p| lower.contains(p))
            && SPORT_MARKERS.iter().any(|m| lower.contains(m))
    }

    fn extract(&self, page: &PageContent, _category: &str) -> Extraction {
        let organization = resolve_organization(
            page.og_site_name.as_deref(),
            &page.html,
            &page.text,
            &page.url,
        );

        let club_email = mine_emails(&page.html, &page.text).into_iter().next();
        let club_phone = mine_phones(&page.text).into_iter().next();

        let pairs = mine_name_role_pairs(&page.text, ROLE_KEYWORDS);
        debug!(url = %page.url, coaches = pairs.len(), "Coach roster parsed");

        let prospects = pairs
            .into_iter()
            .map(|(name, role)| ProspectDraft {
                name,
                organization: organization.clone(),
                job_title: Some(role),
                email: club_email.clone(),
                phone: club_phone.clone(),
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

    #[test]
    fn matches_rosters_on_sport_sites() {
        let e = YouthSportsExtractor;
        assert!(e.matches("https://dcunited-academy.com/coaches"));
        assert!(e.matches("https://capitalsoccerclub.org/team"));
        assert!(!e.matches("https://capitalsoccerclub.org/schedule"));
        assert!(!e.matches("https://lawfirm.com/team"));
    }

    #[test]
    fn roster_yields_coaches() {
        let text = "Meet the Coaches\n\
                    Sam Rivera, Head Coach\n\
                    Dana Lee, Director of Coaching\n\
                    Email office@capitalsoccer.org";
        let e = YouthSportsExtractor;
        let page = PageContent {
            url: "https://capitalsoccerclub.org/coaches".to_string(),
            html: String::new(),
            text: text.to_string(),
            status: 200,
            title: None,
            og_site_name: Some("Capital Soccer Club".to_string()),
        };
        let result = e.extract(&page, "youth_sports");

        assert_eq!(result.prospects.len(), 2);
        assert_eq!(result.prospects[0].name, "Sam Rivera");
        assert_eq!(result.prospects[0].job_title.as_deref(), Some("Head Coach"));
        assert_eq!(
            result.prospects[0].organization.as_deref(),
            Some("Capital Soccer Club")
        );
        assert_eq!(result.prospects[0].email.as_deref(), Some("office@capitalsoccer.org"));
    }
}
