// Two-hop prospect discovery against a fixture directory: one listing page
// linking three therapist profiles.

use std::sync::Arc;

use leadscout_common::types::ApprovalStatus;
use leadscout_engine::discovery::DiscoveryRequest;
use leadscout_engine::testing::{hit, page, provider_set, test_services, MockScraper, MockSearch};
use leadscout_engine::DiscoveryEngine;
use leadscout_store::UserStore;

const LISTING_URL: &str = "https://www.psychologytoday.com/us/therapists/dc";

fn directory_mocks() -> (Arc<MockSearch>, Arc<MockScraper>) {
    let search = Arc::new(MockSearch::new().on_query_containing(
        "psychologists",
        vec![hit(
            "Therapists in Washington DC",
            LISTING_URL,
            "Find a therapist in Washington, DC",
        )],
    ));

    let listing_html = r#"
        <div class="results">
          <a href="/us/therapists/jane-smith-washington-dc/111">Jane Smith</a>
          <a href="/us/therapists/bob-jones-washington-dc/222">Bob Jones</a>
          <a href="/us/therapists/ana-garcia-washington-dc/333">Ana Garcia</a>
        </div>
    "#;

    let profile = |name: &str, org: &str, phone: &str| {
        format!(
            "<h1>{name}</h1><h2>Psychologist, PhD</h2><div>{org}</div><p>Call {phone}</p>"
        )
    };

    let scraper = Arc::new(
        MockScraper::new()
            .on_page(page(LISTING_URL, listing_html, "Find a therapist in Washington, DC"))
            .on_page(page(
                "https://www.psychologytoday.com/us/therapists/jane-smith-washington-dc/111",
                &profile("Jane Smith", "Riverside Therapy Group", "(202) 555-0101"),
                "Jane Smith Psychologist PhD Riverside Therapy Group Call (202) 555-0101",
            ))
            .on_page(page(
                "https://www.psychologytoday.com/us/therapists/bob-jones-washington-dc/222",
                &profile("Bob Jones", "Capitol Counseling Associates", "(202) 555-0102"),
                "Bob Jones Psychologist PhD Capitol Counseling Associates Call (202) 555-0102",
            ))
            .on_page(page(
                "https://www.psychologytoday.com/us/therapists/ana-garcia-washington-dc/333",
                &profile("Ana Garcia", "Dupont Wellness Center", "(202) 555-0103"),
                "Ana Garcia Psychologist PhD Dupont Wellness Center Call (202) 555-0103",
            )),
    );

    (search, scraper)
}

#[tokio::test]
async fn listing_fans_out_to_profiles_and_persists_validated_prospects() {
    let (search, scraper) = directory_mocks();
    let providers = provider_set()
        .with_search(search)
        .with_scrape(scraper.clone());
    let (services, store) = test_services(providers);

    let engine = DiscoveryEngine::new(services);
    let envelope = engine
        .discover(DiscoveryRequest {
            user_id: "u1".to_string(),
            categories: vec!["psychologists".to_string()],
            location: Some("Washington DC".to_string()),
            max_results: 5,
        })
        .await
        .unwrap();

    // Listing + 3 profiles scraped.
    assert_eq!(envelope.pages_scraped, 4);
    assert!(envelope.prospects_saved >= 2, "envelope: {envelope:?}");
    assert!(!envelope.cancelled);

    let user = UserStore::new(store, "u1");
    let prospects = user.list_prospects(None, 50).await.unwrap();
    assert!(prospects.len() >= 2);
    for prospect in &prospects {
        assert_eq!(prospect.category, "psychologists");
        assert_eq!(prospect.approval_status, ApprovalStatus::Pending);
        assert!(
            prospect.organization.as_deref().is_some_and(|o| !o.is_empty()),
            "{} has no organization",
            prospect.name
        );
        assert!(prospect.contact.phone.is_some());
        assert!(prospect.influence_score > 0.0);
        assert!(prospect.segment.is_none(), "segment is assigned by outreach, not discovery");
    }
}

#[tokio::test]
async fn discovery_envelope_is_published_as_prospect_activity() {
    let (search, scraper) = directory_mocks();
    let providers = provider_set()
        .with_search(search)
        .with_scrape(scraper);
    let (services, store) = test_services(providers);

    let engine = DiscoveryEngine::new(services);
    engine
        .discover(DiscoveryRequest {
            user_id: "u1".to_string(),
            categories: vec!["psychologists".to_string()],
            location: Some("Washington DC".to_string()),
            max_results: 5,
        })
        .await
        .unwrap();

    let user = UserStore::new(store, "u1");
    let activities = user.list_activities(20).await.unwrap();
    let envelope_activity = activities
        .iter()
        .find(|a| a.title == "Prospect discovery complete")
        .expect("discovery envelope activity");
    assert!(envelope_activity.metadata.contains_key("envelope"));
}

#[tokio::test]
async fn max_results_caps_persistence() {
    let (search, scraper) = directory_mocks();
    let providers = provider_set()
        .with_search(search)
        .with_scrape(scraper);
    let (services, store) = test_services(providers);

    let engine = DiscoveryEngine::new(services);
    let envelope = engine
        .discover(DiscoveryRequest {
            user_id: "u1".to_string(),
            categories: vec!["psychologists".to_string()],
            location: Some("Washington DC".to_string()),
            max_results: 1,
        })
        .await
        .unwrap();

    assert_eq!(envelope.prospects_saved, 1);
    let user = UserStore::new(store, "u1");
    assert_eq!(user.list_prospects(None, 50).await.unwrap().len(), 1);
}

#[tokio::test]
async fn zero_results_is_a_successful_empty_discovery() {
    let providers = provider_set()
        .with_search(Arc::new(MockSearch::new()))
        .with_scrape(Arc::new(MockScraper::new()));
    let (services, _store) = test_services(providers);

    let engine = DiscoveryEngine::new(services);
    let envelope = engine
        .discover(DiscoveryRequest {
            user_id: "u1".to_string(),
            categories: vec!["embassies".to_string()],
            location: None,
            max_results: 10,
        })
        .await
        .unwrap();

    assert_eq!(envelope.prospects_saved, 0);
    assert!(!envelope.cancelled);
}

#[tokio::test]
async fn urls_are_deduplicated_across_queries() {
    // Both category queries surface the same listing; it is scraped once.
    let search = Arc::new(
        MockSearch::new()
            .on_query_containing(
                "psychologists",
                vec![hit("Therapists DC", LISTING_URL, "directory")],
            )
            .on_query_containing(
                "therapists",
                vec![hit("Therapists DC (dup)", LISTING_URL, "directory")],
            ),
    );
    let (_, scraper) = directory_mocks();
    let providers = provider_set()
        .with_search(search)
        .with_scrape(scraper.clone());
    let (services, _store) = test_services(providers);

    let engine = DiscoveryEngine::new(services);
    let envelope = engine
        .discover(DiscoveryRequest {
            user_id: "u1".to_string(),
            categories: vec!["psychologists".to_string()],
            location: Some("Washington DC".to_string()),
            max_results: 10,
        })
        .await
        .unwrap();

    assert_eq!(envelope.urls_considered, 1);
    assert_eq!(envelope.pages_scraped, 4);
}
