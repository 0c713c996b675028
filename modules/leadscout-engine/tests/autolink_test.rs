// Content-generation auto-linking over the store: pillar/topic discovery,
// the ready-status invariant, and explicit-override filtering.

use chrono::Utc;

use leadscout_common::types::{Insight, InsightStatus, Pillar};
use leadscout_engine::research::ContentLinker;
use leadscout_engine::testing::{provider_set, test_services};
use leadscout_store::UserStore;

async fn seed_insight(
    user: &UserStore,
    id: &str,
    pillar: Pillar,
    tags: &[&str],
    status: InsightStatus,
    relevance: f64,
) {
    let mut insight = Insight::new("u1", "seed topic", pillar, &format!("hash-{id}"), Utc::now());
    insight.insight_id = id.to_string();
    insight.tags = tags.iter().map(|s| s.to_string()).collect();
    insight.status = status;
    insight.engagement_signals.relevance_score = relevance;
    user.save_insight(&insight).await.unwrap();
}

#[tokio::test]
async fn draft_links_ready_insights_matching_pillar_and_topic() {
    let (services, store) = test_services(provider_set());
    let user = UserStore::new(store, "u1");

    seed_insight(
        &user,
        "i1",
        Pillar::ThoughtLeadership,
        &["ai", "tutoring"],
        InsightStatus::ReadyForContentGeneration,
        0.9,
    )
    .await;
    seed_insight(
        &user,
        "i2",
        Pillar::ThoughtLeadership,
        &["finance"],
        InsightStatus::ReadyForContentGeneration,
        0.8,
    )
    .await;
    seed_insight(
        &user,
        "i3",
        Pillar::Referral,
        &["ai"],
        InsightStatus::ReadyForContentGeneration,
        0.7,
    )
    .await;

    let linker = ContentLinker::new(services);
    let draft = linker
        .create_draft("u1", Pillar::ThoughtLeadership, "AI tutoring", "template-1", None)
        .await
        .unwrap();

    assert_eq!(draft.linked_research_ids, vec!["i1"]);
    assert_eq!(draft.pillar, Pillar::ThoughtLeadership);
    assert!(!draft.suggested_hashtags.is_empty());
}

#[tokio::test]
async fn non_ready_insights_are_never_linked() {
    let (services, store) = test_services(provider_set());
    let user = UserStore::new(store, "u1");

    seed_insight(
        &user,
        "collecting",
        Pillar::Referral,
        &["therapy"],
        InsightStatus::Collecting,
        0.9,
    )
    .await;

    let linker = ContentLinker::new(services);
    let draft = linker
        .create_draft("u1", Pillar::Referral, "therapy referrals", "template-1", None)
        .await
        .unwrap();

    assert!(draft.linked_research_ids.is_empty());
}

#[tokio::test]
async fn explicit_links_override_discovery_but_stay_filtered() {
    let (services, store) = test_services(provider_set());
    let user = UserStore::new(store, "u1");

    seed_insight(
        &user,
        "ready",
        Pillar::Referral,
        &[],
        InsightStatus::ReadyForContentGeneration,
        0.5,
    )
    .await;
    seed_insight(&user, "failed", Pillar::Referral, &[], InsightStatus::Failed, 0.5).await;

    let linker = ContentLinker::new(services);
    let explicit = vec![
        "ready".to_string(),
        "failed".to_string(),
        "missing".to_string(),
    ];
    let draft = linker
        .create_draft("u1", Pillar::Referral, "anything", "template-1", Some(&explicit))
        .await
        .unwrap();

    assert_eq!(draft.linked_research_ids, vec!["ready"]);
}

#[tokio::test]
async fn auto_discover_filters_by_audience_tags() {
    let (services, store) = test_services(provider_set());
    let user = UserStore::new(store, "u1");

    seed_insight(
        &user,
        "tl",
        Pillar::ThoughtLeadership,
        &["ai"],
        InsightStatus::ReadyForContentGeneration,
        0.9,
    )
    .await;
    seed_insight(
        &user,
        "ref",
        Pillar::Referral,
        &["ai"],
        InsightStatus::ReadyForContentGeneration,
        0.8,
    )
    .await;

    let linker = ContentLinker::new(services);
    let audiences = vec!["educators".to_string()];
    let found = linker
        .auto_discover("u1", None, None, Some(&audiences), 10)
        .await
        .unwrap();

    // Only thought-leadership insights carry the "educators" audience.
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].insight_id, "tl");
}
