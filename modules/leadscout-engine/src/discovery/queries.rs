//! Per-category search configuration. Each category fans out independently —
//! merging categories into one query measurably degrades result quality, so
//! the engine never does it.

/// Search configuration for one prospect category.
pub struct CategoryProfile {
    pub key: &'static str,
    /// Directory/authority sites searched with a `site:` restriction.
    pub seed_sites: Vec<&'static str>,
    /// Generic query stems, combined with the location.
    pub query_terms: Vec<String>,
    /// Category weight for influence scoring, in [0, 1].
    pub weight: f64,
}

fn terms(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// All known categories. Unknown category keys fall back to a generic
/// profile built from the key itself.
pub fn category_profile(key: &str) -> CategoryProfile {
    match key {
        "psychologists" => CategoryProfile {
            key: "psychologists",
            seed_sites: vec!["psychologytoday.com"],
            query_terms: terms(&["psychologists", "therapists private practice"]),
            weight: 1.0,
        },
        "psychiatrists" => CategoryProfile {
            key: "psychiatrists",
            seed_sites: vec!["healthgrades.com", "zocdoc.com"],
            query_terms: terms(&["psychiatrists", "child adolescent psychiatrist"]),
            weight: 1.0,
        },
        "therapists" => CategoryProfile {
            key: "therapists",
            seed_sites: vec!["psychologytoday.com"],
            query_terms: terms(&["family therapists", "licensed counselors"]),
            weight: 0.9,
        },
        "treatment_centers" => CategoryProfile {
            key: "treatment_centers",
            seed_sites: vec![],
            query_terms: terms(&[
                "residential treatment center adolescents staff",
                "IOP PHP program clinical team",
            ]),
            weight: 0.9,
        },
        "private_schools" => CategoryProfile {
            key: "private_schools",
            seed_sites: vec![],
            query_terms: terms(&[
                "private school admissions director",
                "independent school head of school",
            ]),
            weight: 0.8,
        },
        "school_counselors" => CategoryProfile {
            key: "school_counselors",
            seed_sites: vec![],
            query_terms: terms(&["school counselor directory", "school counseling department staff"]),
            weight: 0.7,
        },
        "embassies" => CategoryProfile {
            key: "embassies",
            seed_sites: vec![],
            query_terms: terms(&[
                "embassy education officer",
                "embassy cultural affairs staff",
            ]),
            weight: 0.6,
        },
        "youth_sports" => CategoryProfile {
            key: "youth_sports",
            seed_sites: vec![],
            query_terms: terms(&["youth soccer club coaches", "sports academy coaching staff"]),
            weight: 0.5,
        },
        other => CategoryProfile {
            key: "generic",
            seed_sites: vec![],
            query_terms: vec![format!("{} directory", other.replace('_', " "))],
            weight: 0.5,
        },
    }
}

/// Build the structured queries for one category: one per seed site plus the
/// generic stems, each localized.
pub fn build_queries(category: &str, location: Option<&str>) -> Vec<String> {
    let profile = category_profile(category);
    let locale = location.unwrap_or("");
    let mut queries = Vec::new();

    for site in &profile.seed_sites {
        for term in &profile.query_terms {
            queries.push(format!("site:{site} {term} {locale}").trim().to_string());
            break; // one query per seed site keeps fan-out bounded
        }
    }
    for term in &profile.query_terms {
        queries.push(format!("{term} {locale}").trim().to_string());
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_have_profiles() {
        assert_eq!(category_profile("psychologists").weight, 1.0);
        assert!(category_profile("psychologists")
            .seed_sites
            .contains(&"psychologytoday.com"));
    }

    #[test]
    fn unknown_category_degrades_to_generic() {
        let profile = category_profile("alpaca_farmers");
        assert_eq!(profile.key, "generic");
        assert_eq!(profile.weight, 0.5);
    }

    #[test]
    fn queries_localize_and_site_restrict() {
        let queries = build_queries("psychologists", Some("Washington DC"));
        assert!(queries
            .iter()
            .any(|q| q.starts_with("site:psychologytoday.com") && q.ends_with("Washington DC")));
        assert!(queries.iter().any(|q| q == "psychologists Washington DC"));
    }

    #[test]
    fn queries_without_location_have_no_trailing_space() {
        let queries = build_queries("psychologists", None);
        assert!(queries.iter().all(|q| q == q.trim()));
    }
}
