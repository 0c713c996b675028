// End-to-end webhook delivery against a real local endpoint.
//
// The fixture server counts every POST and answers with a fixed status, so
// the retry ladder and the auto-disable rule are observable from the wire.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use chrono::Utc;

use leadscout_common::types::{ActivityEvent, ActivityType, Webhook};
use leadscout_realtime::{sign_body, DeliveryOutcome, WebhookDispatcher};
use leadscout_store::{MemoryStore, UserStore};

struct Fixture {
    hits: AtomicU32,
    status: StatusCode,
    last_signature: std::sync::Mutex<Option<String>>,
    last_body: std::sync::Mutex<Vec<u8>>,
}

async fn hook_endpoint(
    State(fixture): State<Arc<Fixture>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> StatusCode {
    fixture.hits.fetch_add(1, Ordering::SeqCst);
    *fixture.last_signature.lock().unwrap() = headers
        .get("X-Signature")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *fixture.last_body.lock().unwrap() = body.to_vec();
    fixture.status
}

async fn spawn_endpoint(status: StatusCode) -> (String, Arc<Fixture>) {
    let fixture = Arc::new(Fixture {
        hits: AtomicU32::new(0),
        status,
        last_signature: std::sync::Mutex::new(None),
        last_body: std::sync::Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/hook", post(hook_endpoint))
        .with_state(fixture.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/hook"), fixture)
}

fn make_event(n: u32) -> ActivityEvent {
    ActivityEvent::new(
        "u1",
        ActivityType::Prospect,
        &format!("event-{n}"),
        "discovered prospects",
        Utc::now(),
    )
}

#[tokio::test]
async fn failing_endpoint_gets_five_attempts_per_event_then_disables() {
    let (url, fixture) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;

    let store = Arc::new(MemoryStore::new());
    let user = UserStore::new(store.clone(), "u1");
    let webhook = Webhook::new("u1", &url, vec![ActivityType::Prospect], Utc::now());
    user.save_webhook(&webhook).await.unwrap();

    let dispatcher = WebhookDispatcher::new(store.clone())
        .with_retry_delays(vec![std::time::Duration::from_millis(1); 5]);

    // 5 consecutive failing events: each gets exactly 5 attempts.
    for n in 0..5 {
        let outcomes = dispatcher.deliver_event(&make_event(n)).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0], DeliveryOutcome::Failed { attempts: 5 });
    }

    assert_eq!(fixture.hits.load(Ordering::SeqCst), 25, "5 events x 5 attempts");

    let stored = user.get_webhook(&webhook.id).await.unwrap().unwrap();
    assert_eq!(stored.consecutive_failures, 5);
    assert!(!stored.active, "webhook flips inactive at the threshold");

    // A sixth event is no longer delivered at all.
    let outcomes = dispatcher.deliver_event(&make_event(6)).await.unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(fixture.hits.load(Ordering::SeqCst), 25);
}

#[tokio::test]
async fn successful_delivery_resets_failure_count() {
    let (url, fixture) = spawn_endpoint(StatusCode::OK).await;

    let store = Arc::new(MemoryStore::new());
    let user = UserStore::new(store.clone(), "u1");
    let mut webhook = Webhook::new("u1", &url, vec![ActivityType::Prospect], Utc::now());
    webhook.consecutive_failures = 3;
    user.save_webhook(&webhook).await.unwrap();

    let dispatcher = WebhookDispatcher::new(store.clone()).with_retry_delays(vec![]);
    let outcomes = dispatcher.deliver_event(&make_event(0)).await.unwrap();

    assert_eq!(outcomes, vec![DeliveryOutcome::Delivered { attempts: 1 }]);
    assert_eq!(fixture.hits.load(Ordering::SeqCst), 1);

    let stored = user.get_webhook(&webhook.id).await.unwrap().unwrap();
    assert_eq!(stored.consecutive_failures, 0);
    assert!(stored.active);
}

#[tokio::test]
async fn signed_webhook_carries_verifiable_signature() {
    let (url, fixture) = spawn_endpoint(StatusCode::OK).await;

    let store = Arc::new(MemoryStore::new());
    let user = UserStore::new(store.clone(), "u1");
    let mut webhook = Webhook::new("u1", &url, vec![ActivityType::Prospect], Utc::now());
    webhook.secret = Some("wh-secret".to_string());
    user.save_webhook(&webhook).await.unwrap();

    let dispatcher = WebhookDispatcher::new(store).with_retry_delays(vec![]);
    dispatcher.deliver_event(&make_event(0)).await.unwrap();

    let signature = fixture.last_signature.lock().unwrap().clone().unwrap();
    let body = fixture.last_body.lock().unwrap().clone();
    assert_eq!(signature, sign_body("wh-secret", &body));

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["event"], "prospect");
    assert_eq!(payload["payload"]["title"], "event-0");
}

#[tokio::test]
async fn unsigned_webhook_omits_signature_header() {
    let (url, fixture) = spawn_endpoint(StatusCode::OK).await;

    let store = Arc::new(MemoryStore::new());
    let user = UserStore::new(store.clone(), "u1");
    let webhook = Webhook::new("u1", &url, vec![ActivityType::Prospect], Utc::now());
    user.save_webhook(&webhook).await.unwrap();

    let dispatcher = WebhookDispatcher::new(store).with_retry_delays(vec![]);
    dispatcher.deliver_event(&make_event(0)).await.unwrap();

    assert!(fixture.last_signature.lock().unwrap().is_none());
}
