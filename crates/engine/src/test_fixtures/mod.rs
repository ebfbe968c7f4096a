//! Shared helpers for tests that need a running engine.
//!
//! [`TestEngine`] wires the real composition root against a fake Turso server
//! and the in-memory bus, so tests exercise the same path production does
//! minus the network.

pub mod fake_turso;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

pub use fake_turso::{FakeTurso, StoredExchange};

use crate::api::{GameClient, GatewayError, GatewayState};
use crate::app::App;
use crate::infrastructure::bus::InMemoryBus;
use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::ports::MessageBus;
use krazyplanet_shared::subjects;

/// Time every test engine reports as "now".
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 14, 18, 30, 5).unwrap()
}

/// Configuration pointing at `database_url` with fast retries.
pub fn test_config(database_url: &str) -> AppConfig {
    let database_url = database_url.to_string();
    AppConfig::from_lookup(move |key| match key {
        "TURSO_DATABASE_URL" => Some(database_url.clone()),
        "TURSO_AUTH_TOKEN" => Some("test-token".to_string()),
        "RETRY_BASE_DELAY_MS" => Some("1".to_string()),
        "DB_REQUEST_TIMEOUT_SECONDS" => Some("5".to_string()),
        "HEALTH_MEMORY_ENABLED" => Some("false".to_string()),
        _ => None,
    })
    .unwrap()
}

pub struct TestEngine {
    pub store: FakeTurso,
    pub server: MockServer,
    pub bus: Arc<InMemoryBus>,
    pub app: Arc<App>,
    pub client: GameClient,
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), GatewayError>>,
}

impl TestEngine {
    /// Build, prepare and start an engine; returns once it is listening.
    pub async fn start() -> Self {
        Self::start_with(FakeTurso::new()).await
    }

    pub async fn start_with(store: FakeTurso) -> Self {
        let server = store.start().await;
        let bus = Arc::new(InMemoryBus::new());
        let dyn_bus: Arc<dyn MessageBus> = bus.clone();

        let app = Arc::new(
            App::build(
                &test_config(&server.uri()),
                Arc::clone(&dyn_bus),
                Arc::new(FixedClock(test_now())),
            )
            .unwrap(),
        );
        app.prepare().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = {
            let app = Arc::clone(&app);
            let cancel = cancel.clone();
            tokio::spawn(async move { app.run(cancel).await })
        };

        let mut states = app.gateway.state_changes();
        states
            .wait_for(|s| *s == GatewayState::Listening)
            .await
            .unwrap();
        while subjects::ALL.iter().any(|s| bus.subscriber_count(s) == 0) {
            tokio::task::yield_now().await;
        }

        let client = GameClient::new(dyn_bus, "player-1").with_timeout(Duration::from_secs(5));

        Self {
            store,
            server,
            bus,
            app,
            client,
            cancel,
            handle,
        }
    }

    /// Cancel the engine and wait for it to stop.
    pub async fn shutdown(self) -> Result<(), GatewayError> {
        self.cancel.cancel();
        self.handle.await.unwrap()
    }
}
