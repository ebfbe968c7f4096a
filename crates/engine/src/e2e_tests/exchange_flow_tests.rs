//! Exchange create/query and health check flows.

use bytes::Bytes;
use krazyplanet_shared::{
    subjects, CreateExchangeRequest, ExchangeCreatedData, ExchangeFoundData, ExchangeListData,
    HealthData, ResponseStatus,
};
use serde_json::json;

use crate::test_fixtures::{test_now, FakeTurso, TestEngine};

#[tokio::test]
async fn created_exchange_can_be_queried_back() {
    let engine = TestEngine::start().await;

    let created = engine
        .client
        .create_exchange(CreateExchangeRequest::new("o'neil", "bob", "ace", "king"))
        .await
        .unwrap();
    assert_eq!(created.status_code, ResponseStatus::Success);
    let created: ExchangeCreatedData = created.data_as().unwrap();
    assert_eq!(created.exchange_id, 1);
    assert_eq!(created.created_at, test_now());

    let found = engine.client.query_exchange(created.exchange_id).await.unwrap();
    assert_eq!(found.status_code, ResponseStatus::Success);
    let found: ExchangeFoundData = found.data_as().unwrap();
    assert_eq!(found.exchange.opener, "o'neil");
    assert_eq!(found.exchange.follower, "bob");
    assert_eq!(found.exchange.opener_card, "ace");
    assert_eq!(found.exchange.follower_card, "king");
    assert_eq!(found.exchange.date, test_now());

    let rows = engine.store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, "2024-07-14 18:30:05");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_players_are_rejected_before_the_store() {
    let engine = TestEngine::start().await;
    let before = engine.store.request_count();

    let response = engine
        .client
        .create_exchange(CreateExchangeRequest::new("alice", "", "ace", "king"))
        .await
        .unwrap();

    assert_eq!(response.status_code, ResponseStatus::InvalidData);
    assert_eq!(response.message, "Missing required fields: opener and follower");
    assert_eq!(engine.store.request_count(), before);
    assert!(engine.store.rows().is_empty());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let engine = TestEngine::start().await;

    let response = engine.client.query_exchange(42).await.unwrap();

    assert_eq!(response.status_code, ResponseStatus::NotFound);
    assert_eq!(response.message, "Exchange not found");
    assert!(response.data.is_none());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn query_without_id_lists_newest_first() {
    let store = FakeTurso::new();
    store.seed("alice", "bob", "2024-07-01 09:00:00");
    store.seed("carol", "dave", "2024-07-02 09:00:00");
    let engine = TestEngine::start_with(store).await;

    let response = engine.client.query_exchanges().await.unwrap();

    assert_eq!(response.status_code, ResponseStatus::Success);
    assert_eq!(response.message, "Found 2 exchanges");
    let list: ExchangeListData = response.data_as().unwrap();
    assert_eq!(list.exchanges.len(), 2);
    assert_eq!(list.exchanges[0].opener, "carol");
    assert_eq!(list.exchanges[1].opener, "alice");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_check_reports_running_service() {
    let engine = TestEngine::start().await;
    let before = engine.store.request_count();

    let response = engine.client.health_check().await.unwrap();

    assert_eq!(response.status_code, ResponseStatus::Success);
    assert_eq!(response.message, "Service is healthy");
    let health: HealthData = response.data_as().unwrap();
    assert_eq!(health.service, "TursoConnector");
    assert_eq!(health.status, "running");
    assert!(health.nats_connected);
    assert_eq!(engine.store.request_count(), before);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_message_gets_bad_request_with_fresh_id() {
    let engine = TestEngine::start().await;

    let response = engine
        .client
        .send_raw(subjects::EXCHANGE_CREATE, Bytes::from_static(b"{\"messageId\": "))
        .await
        .unwrap();

    assert_eq!(response.status_code, ResponseStatus::BadRequest);
    assert_eq!(response.message, "Invalid message format");
    assert!(uuid::Uuid::parse_str(&response.message_id).is_ok());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn numeric_player_names_are_accepted_as_text() {
    let engine = TestEngine::start().await;

    let body = json!({
        "messageId": "m-77",
        "messageType": "exchange.create",
        "playerId": "player-1",
        "data": { "opener": 1001, "follower": true }
    });
    let response = engine
        .client
        .send_raw(
            subjects::EXCHANGE_CREATE,
            Bytes::from(serde_json::to_vec(&body).unwrap()),
        )
        .await
        .unwrap();

    assert_eq!(response.status_code, ResponseStatus::Success);
    assert_eq!(response.message_id, "m-77");
    let rows = engine.store.rows();
    assert_eq!(rows[0].opener, "1001");
    assert_eq!(rows[0].follower, "true");
    assert_eq!(rows[0].opener_card, "");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn store_outage_is_reported_as_database_error() {
    let engine = TestEngine::start().await;
    engine.store.set_down(true);
    let before = engine.store.request_count();

    let response = engine
        .client
        .create_exchange(CreateExchangeRequest::new("alice", "bob", "", ""))
        .await
        .unwrap();

    assert_eq!(response.status_code, ResponseStatus::DatabaseError);
    assert_eq!(response.message, "Failed to create exchange in database");
    assert_eq!(engine.store.request_count() - before, 3);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn listing_during_store_outage_is_an_empty_success() {
    let store = FakeTurso::new();
    let engine = TestEngine::start_with(store.clone()).await;
    store.seed("alice", "bob", "2024-07-01 09:00:00");
    store.set_down(true);

    let response = engine.client.query_exchanges().await.unwrap();

    assert_eq!(response.status_code, ResponseStatus::Success);
    assert_eq!(response.message, "Found 0 exchanges");
    let list: ExchangeListData = response.data_as().unwrap();
    assert!(list.exchanges.is_empty());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn query_by_id_during_store_outage_is_not_found() {
    let store = FakeTurso::new();
    let id = store.seed("alice", "bob", "2024-07-01 09:00:00");
    let engine = TestEngine::start_with(store).await;
    engine.store.set_down(true);

    let response = engine.client.query_exchange(id).await.unwrap();

    assert_eq!(response.status_code, ResponseStatus::NotFound);
    assert_eq!(response.message, "Exchange not found");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_creates_all_get_distinct_ids() {
    let engine = TestEngine::start().await;

    let requests = (0..8).map(|n| {
        engine
            .client
            .create_exchange(CreateExchangeRequest::new(format!("p{}", n), "bob", "", ""))
    });
    let responses = futures_util::future::join_all(requests).await;

    let mut ids: Vec<i64> = responses
        .into_iter()
        .map(|r| r.unwrap().data_as::<ExchangeCreatedData>().unwrap().exchange_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(engine.store.rows().len(), 8);

    engine.shutdown().await.unwrap();
}
