//! Store flows driven through the real HTTP client.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use serde_json::json;
use sorteohub_client::auth::{AuthAction, AuthEnvironment, AuthReducer, AuthState, AuthStore};
use sorteohub_client::raffles::{
    ListStatus, RaffleAction, RaffleEnvironment, RaffleReducer, RaffleStore, RaffleStoreState,
};
use sorteohub_client::selection::SelectionState;
use sorteohub_client::storage::keys;
use sorteohub_client::types::{Credentials, RaffleFilters};
use sorteohub_client::{ApiClient, AppSignal, ClientConfig, ElementLabel, InMemorySignalBus, Money, RaffleId};
use sorteohub_core::environment::KeyValueStore;
use sorteohub_testing::{InMemoryKeyValueStore, init_test_tracing};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(2);

async fn backend(storage: &InMemoryKeyValueStore) -> (MockServer, Arc<ApiClient>) {
    init_test_tracing();
    let server = MockServer::start().await;
    let config = ClientConfig::new(format!("{}/api", server.uri())).unwrap();
    let client = ApiClient::new(&config, Arc::new(storage.clone())).unwrap();
    (server, Arc::new(client))
}

fn raffle_store(api: Arc<ApiClient>) -> RaffleStore {
    RaffleStore::new(
        RaffleStoreState::default(),
        RaffleReducer::new(),
        RaffleEnvironment::new(api, Arc::new(InMemorySignalBus::<AppSignal>::new())),
    )
}

fn auth_store(api: Arc<ApiClient>, storage: &InMemoryKeyValueStore) -> AuthStore {
    AuthStore::new(
        AuthState::default(),
        AuthReducer::new(),
        AuthEnvironment::new(api, Arc::new(storage.clone())),
    )
}

fn user_json() -> serde_json::Value {
    json!({ "_id": "u1", "nombre": "Ana", "email": "ana@example.com", "rol": "organizador" })
}

#[tokio::test]
async fn login_then_organizer_listing_uses_new_token() {
    let storage = InMemoryKeyValueStore::new();
    let (server, api) = backend(&storage).await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-1", "user": user_json() })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rifas/my"))
        .and(header("authorization", "Bearer jwt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let auth = auth_store(Arc::clone(&api), &storage);
    let credentials = Credentials {
        email: "ana@example.com".to_string(),
        password: "secreto".to_string(),
    };
    let mut handle = auth.send(AuthAction::Login { credentials }).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    assert!(auth.state(AuthState::can_create_raffles).await);
    assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("jwt-1"));

    let raffles = raffle_store(api);
    let mut handle = raffles.send(RaffleAction::LoadMine).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();
    assert_eq!(raffles.state(|s| s.mine.status.clone()).await, ListStatus::Empty);
}

#[tokio::test]
async fn expired_session_is_cleared_on_restore() {
    let storage = InMemoryKeyValueStore::with_entries([(keys::TOKEN, "old")]);
    storage.set(keys::USER, &user_json().to_string());
    let (server, api) = backend(&storage).await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token expirado" })))
        .mount(&server)
        .await;

    let auth = auth_store(api, &storage);
    let mut handle = auth.send(AuthAction::Restore).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    assert!(!auth.state(AuthState::is_authenticated).await);
    assert!(storage.is_empty());
}

#[tokio::test]
async fn slower_earlier_detail_does_not_overwrite_later_one() {
    let storage = InMemoryKeyValueStore::new();
    let (server, api) = backend(&storage).await;

    Mock::given(method("GET"))
        .and(path("/api/rifas/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "_id": "slow", "titulo": "Lenta" }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rifas/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "fast", "titulo": "Rápida" })))
        .mount(&server)
        .await;

    let store = raffle_store(api);
    let mut slow = store.send(RaffleAction::LoadDetail { id: RaffleId::new("slow") }).await.unwrap();
    let mut fast = store.send(RaffleAction::LoadDetail { id: RaffleId::new("fast") }).await.unwrap();
    fast.wait_with_timeout(WAIT).await.unwrap();
    slow.wait_with_timeout(WAIT).await.unwrap();

    let detail = store.state(|s| s.detail.raffle.clone()).await.unwrap();
    assert_eq!(detail.id, RaffleId::new("fast"));
}

#[tokio::test]
async fn listing_failure_is_not_an_empty_result() {
    let storage = InMemoryKeyValueStore::new();
    let (server, api) = backend(&storage).await;

    Mock::given(method("GET"))
        .and(path("/api/rifas"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = raffle_store(api);
    let mut handle = store
        .send(RaffleAction::LoadList { filters: RaffleFilters::default() })
        .await
        .unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();

    let status = store.state(|s| s.list.status.clone()).await;
    assert!(matches!(status, ListStatus::Failed(ref e) if e.is_transient()));
}

#[tokio::test]
async fn fetched_raffle_drives_selection() {
    let storage = InMemoryKeyValueStore::new();
    let (server, api) = backend(&storage).await;
    let pool: Vec<i64> = (1..=100).collect();

    Mock::given(method("GET"))
        .and(path("/api/rifas/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "r1",
            "titulo": "Rifa del 100",
            "numerosDisponibles": pool,
            "numerosVendidos": [5, "17"],
            "numerosReservados": ["42"],
            "precio": "50"
        })))
        .mount(&server)
        .await;

    let store = raffle_store(api);
    let mut handle = store.send(RaffleAction::LoadDetail { id: RaffleId::new("r1") }).await.unwrap();
    handle.wait_with_timeout(WAIT).await.unwrap();
    let raffle = store.state(|s| s.detail.raffle.clone()).await.unwrap();

    let mut selection = SelectionState::for_raffle(&raffle);
    assert_eq!(selection.partition().counts().free, 97);

    selection.toggle(&ElementLabel::Number(17));
    selection.toggle(&ElementLabel::from("3"));
    selection.toggle(&ElementLabel::Number(4));
    assert_eq!(selection.count(), 2);
    assert_eq!(selection.total_price(), Money::from_units(100));
}
