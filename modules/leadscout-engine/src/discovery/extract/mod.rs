// Site-specialized extractors behind a URL-pattern factory.
//
// An extractor is a capability set - `matches` + `extract` - not a class
// hierarchy. The registry dispatches each URL to the first matching
// extractor and falls back to Generic. The invoking category is passed
// through so prospects carry the category that discovered them, never one
// inferred from page content.

pub mod base;
mod doctor_directory;
mod embassy;
mod generic;
mod psychology_today;
mod treatment_center;
mod youth_sports;

pub use doctor_directory::DoctorDirectoryExtractor;
pub use embassy::EmbassyExtractor;
pub use generic::GenericExtractor;
pub use psychology_today::PsychologyTodayExtractor;
pub use treatment_center::TreatmentCenterExtractor;
pub use youth_sports::YouthSportsExtractor;

use crate::providers::PageContent;

/// A partially-extracted prospect. Listing pages yield drafts with a
/// `profile_url` and no contacts; the second hop fills the rest. The
/// save-time validator decides what persists.
#[derive(Debug, Clone, Default)]
pub struct ProspectDraft {
    pub name: String,
    pub organization: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source_url: String,
    /// Set when a profile page should be scraped to complete this draft.
    pub profile_url: Option<String>,
}

/// What one extractor call produced: completed drafts plus profile URLs for
/// the second hop.
#[derive(Debug, Default)]
pub struct Extraction {
    pub prospects: Vec<ProspectDraft>,
    pub profile_urls: Vec<String>,
}

pub trait SiteExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// URL-pattern match. Cheap; runs before any scraping.
    fn matches(&self, url: &str) -> bool;

    /// Content-aware match for extractors whose signal lives in the page
    /// body (treatment centers). Defaults to the URL match.
    fn matches_content(&self, url: &str, _text: &str) -> bool {
        self.matches(url)
    }

    fn extract(&self, page: &PageContent, category: &str) -> Extraction;
}

/// URL→extractor dispatch. Order matters: specialized extractors first,
/// Generic always matches last.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SiteExtractor>>,
    generic: GenericExtractor,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(PsychologyTodayExtractor),
                Box::new(DoctorDirectoryExtractor),
                Box::new(EmbassyExtractor),
                Box::new(YouthSportsExtractor),
                Box::new(TreatmentCenterExtractor),
            ],
            generic: GenericExtractor,
        }
    }

    /// Pick the extractor for a fetched page. Content-aware matchers get the
    /// page text so a team page full of RTC/PHP/IOP vocabulary routes to the
    /// treatment-center extractor even on an unknown domain.
    pub fn dispatch(&self, url: &str, text: &str) -> &dyn SiteExtractor {
        for extractor in &self.extractors {
            if extractor.matches_content(url, text) {
                return extractor.as_ref();
            }
        }
        &self.generic
    }

    /// URL-only routing, used before the page is fetched.
    pub fn dispatch_by_url(&self, url: &str) -> Option<&dyn SiteExtractor> {
        self.extractors
            .iter()
            .find(|e| e.matches(url))
            .map(|e| e.as_ref())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_routes_by_url_pattern() {
        let registry = ExtractorRegistry::new();
        assert_eq!(
            registry
                .dispatch("https://www.psychologytoday.com/us/therapists/dc", "")
                .name(),
            "psychology_today"
        );
        assert_eq!(
            registry
                .dispatch("https://www.healthgrades.com/physician/dr-jane", "")
                .name(),
            "doctor_directory"
        );
        assert_eq!(
            registry
                .dispatch("https://fr.usembassy.gov/embassy/staff", "")
                .name(),
            "embassy"
        );
        assert_eq!(
            registry
                .dispatch("https://dcunited-academy.com/coaches", "")
                .name(),
            "youth_sports"
        );
    }

    #[test]
    fn unknown_urls_fall_back_to_generic() {
        let registry = ExtractorRegistry::new();
        assert_eq!(
            registry.dispatch("https://example.com/people", "").name(),
            "generic"
        );
    }

    #[test]
    fn treatment_center_matches_on_content_vocabulary() {
        let registry = ExtractorRegistry::new();
        let extractor = registry.dispatch(
            "https://serenityrecovery.org/our-team",
            "Our residential treatment center offers RTC, PHP and IOP programs.",
        );
        assert_eq!(extractor.name(), "treatment_center");
    }
}
