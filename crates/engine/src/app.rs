//! Application state and composition.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{GatewayError, MessageGateway, MessageRouter};
use crate::infrastructure::{
    config::AppConfig,
    health::{DatabaseHealthCheck, HealthAggregator, HealthReport, MemoryHealthCheck},
    ports::{ClockPort, ExchangeRepo, MessageBus, RepoError, SqlError, SqlExecutor},
    resilient_http::ResilientExecutor,
    throttle::ConnectionThrottle,
    turso::{TursoClient, TursoExchangeRepo},
};
use crate::repositories::ExchangeRepository;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database connection test failed")]
    DatabaseUnavailable,
    #[error("Failed to prepare exchange table: {0}")]
    Schema(#[from] RepoError),
}

/// Main application state.
///
/// Built once at startup from configuration and a connected bus; owns the
/// gateway and everything behind it.
pub struct App {
    pub bus: Arc<dyn MessageBus>,
    pub sql: Arc<dyn SqlExecutor>,
    pub exchanges: Arc<ExchangeRepository>,
    pub gateway: Arc<MessageGateway>,
    pub health: Arc<HealthAggregator>,
    health_interval: Duration,
}

impl App {
    /// Wire up throttle, executor, data access, repository and gateway.
    pub fn build(
        config: &AppConfig,
        bus: Arc<dyn MessageBus>,
        clock: Arc<dyn ClockPort>,
    ) -> Result<Self, SqlError> {
        let throttle = Arc::new(ConnectionThrottle::new(config.database.max_connections));
        let executor = Arc::new(ResilientExecutor::new(config.retry.clone()));
        tracing::info!(
            max_attempts = config.retry.max_attempts,
            base_delay_ms = config.retry.base_delay_ms,
            max_connections = config.database.max_connections,
            "Database client configured"
        );

        let sql: Arc<dyn SqlExecutor> = Arc::new(TursoClient::new(
            &config.turso_settings(),
            throttle,
            executor,
        )?);
        Ok(Self::with_sql(config, bus, clock, sql))
    }

    /// Compose the app over an existing SQL executor.
    pub fn with_sql(
        config: &AppConfig,
        bus: Arc<dyn MessageBus>,
        clock: Arc<dyn ClockPort>,
        sql: Arc<dyn SqlExecutor>,
    ) -> Self {
        let repo: Arc<dyn ExchangeRepo> = Arc::new(TursoExchangeRepo::new(Arc::clone(&sql)));
        let exchanges = Arc::new(ExchangeRepository::new(repo));

        let router = Arc::new(MessageRouter::new(
            Arc::clone(&exchanges),
            clock,
            Arc::clone(&bus),
            config.service_name.clone(),
        ));
        let gateway = Arc::new(MessageGateway::new(Arc::clone(&bus), router));

        let mut health = HealthAggregator::new(Duration::from_secs(config.health.timeout_seconds));
        if config.health.database_enabled {
            health = health.with_check(Arc::new(DatabaseHealthCheck::new(Arc::clone(&sql))));
        }
        if config.health.memory_enabled {
            health = health.with_check(Arc::new(MemoryHealthCheck::new(
                config.health.memory_threshold_mb,
            )));
        }

        Self {
            bus,
            sql,
            exchanges,
            gateway,
            health: Arc::new(health),
            health_interval: Duration::from_secs(config.health.interval_seconds),
        }
    }

    /// Verify the store and prepare the schema. Nothing is served before this.
    pub async fn prepare(&self) -> Result<HealthReport, StartupError> {
        if !self.sql.test_connection().await {
            return Err(StartupError::DatabaseUnavailable);
        }
        tracing::info!("Database connection verified");

        self.exchanges.ensure_schema().await?;

        let report = self.health.evaluate().await;
        for (name, check) in &report.checks {
            tracing::info!(check = %name, status = ?check.status, detail = %check.detail, "Initial health");
        }
        Ok(report)
    }

    /// Serve requests until `cancel` fires, with health reports in the background.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), GatewayError> {
        let monitor_cancel = cancel.child_token();
        let monitor = Arc::clone(&self.health).spawn_monitor(self.health_interval, monitor_cancel.clone());

        let result = self.gateway.run(cancel).await;

        monitor_cancel.cancel();
        if let Err(e) = monitor.await {
            tracing::warn!(error = %e, "Health monitor ended abnormally");
        }

        let metrics = self.sql.metrics().await;
        tracing::info!(
            cached_queries = metrics.cached_queries,
            available_connections = metrics.available_connections,
            "Shutdown complete"
        );
        result
    }
}
