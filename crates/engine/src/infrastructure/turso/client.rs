//! Turso HTTP client - the engine's data access layer.
//!
//! Every statement goes through the same path: connection throttle, resilient
//! executor, one POST to the pipeline endpoint. Read results are recorded in
//! the query cache. Operational failures are logged and reported as an absent
//! result so callers only branch on "answered or not".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use super::wire::{PipelineRequest, PipelineResponse};
use crate::infrastructure::cache::QueryCache;
use crate::infrastructure::ports::{DatabaseMetrics, SqlError, SqlExecutor};
use crate::infrastructure::resilient_http::{AttemptOutcome, ResilientExecutor, TransientFault};
use crate::infrastructure::throttle::ConnectionThrottle;

pub const USER_AGENT: &str = "KrazyPlanetSurvivor/1.0";

/// Connection settings for the Turso database
#[derive(Debug)]
pub struct TursoSettings {
    /// `libsql://` or `https://` database URL
    pub database_url: String,
    pub auth_token: SecretString,
    pub request_timeout: Duration,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
}

/// Pipeline endpoint for a database URL.
///
/// `libsql://` is served over HTTPS; trailing slashes are dropped.
pub fn pipeline_url(database_url: &str) -> String {
    let trimmed = database_url.trim();
    let base = match trimmed.strip_prefix("libsql://") {
        Some(host) => format!("https://{}", host),
        None => trimmed.to_string(),
    };
    format!("{}/v2/pipeline", base.trim_end_matches('/'))
}

impl AttemptOutcome for reqwest::Response {
    fn is_success(&self) -> bool {
        self.status().is_success()
    }
}

impl TransientFault for reqwest::Error {
    fn is_transient(&self) -> bool {
        self.is_timeout() || self.is_connect() || self.is_request() || self.is_body()
    }
}

pub struct TursoClient {
    http: reqwest::Client,
    pipeline_url: String,
    database_url: String,
    throttle: Arc<ConnectionThrottle>,
    executor: Arc<ResilientExecutor>,
    cache: Option<QueryCache<PipelineResponse>>,
}

impl TursoClient {
    pub fn new(
        settings: &TursoSettings,
        throttle: Arc<ConnectionThrottle>,
        executor: Arc<ResilientExecutor>,
    ) -> Result<Self, SqlError> {
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            settings.auth_token.expose_secret()
        ))
        .map_err(|_| SqlError::ClientSetup("auth token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| SqlError::ClientSetup(e.to_string()))?;

        let pipeline_url = pipeline_url(&settings.database_url);
        tracing::info!(
            url = %pipeline_url,
            timeout_secs = settings.request_timeout.as_secs(),
            max_connections = throttle.capacity(),
            cache_enabled = settings.cache_enabled,
            "Turso client configured"
        );

        Ok(Self {
            http,
            pipeline_url,
            database_url: settings.database_url.clone(),
            throttle,
            executor,
            cache: settings
                .cache_enabled
                .then(|| QueryCache::new(settings.cache_max_entries)),
        })
    }

    async fn send(&self, sql: &str) -> Option<PipelineResponse> {
        let body = PipelineRequest::execute(sql);
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(json) = serde_json::to_string(&body) {
                tracing::debug!(payload = %json, "Turso request payload");
            }
        }

        let sent = self
            .executor
            .execute("turso.execute", || {
                self.http.post(&self.pipeline_url).json(&body).send()
            })
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "Turso request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, sql = %sql, "Turso returned HTTP error");
            return None;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "Failed to read Turso response body");
                return None;
            }
        };
        tracing::debug!(body = %text, "Turso response received");

        match serde_json::from_str::<PipelineResponse>(&text) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::error!(error = %e, sql = %sql, "Failed to decode Turso response");
                None
            }
        }
    }
}

#[async_trait]
impl SqlExecutor for TursoClient {
    async fn execute(&self, sql: &str) -> Result<Option<PipelineResponse>, SqlError> {
        if sql.trim().is_empty() {
            return Err(SqlError::EmptyStatement);
        }

        let _slot = self.throttle.acquire().await?;
        tracing::debug!(sql = %sql, "Executing SQL statement");

        let Some(response) = self.send(sql).await else {
            return Ok(None);
        };

        if let Some(cache) = &self.cache {
            cache.record(sql, response.clone()).await;
        }
        Ok(Some(response))
    }

    async fn test_connection(&self) -> bool {
        tracing::info!("Testing database connection...");
        let healthy = matches!(self.execute("SELECT 1").await, Ok(Some(ref r)) if r.has_results());
        if healthy {
            tracing::info!("Database connection test successful");
        } else {
            tracing::error!("Database connection test failed - no results returned");
        }
        healthy
    }

    async fn metrics(&self) -> DatabaseMetrics {
        let cached_queries = match &self.cache {
            Some(cache) => cache.len().await,
            None => 0,
        };
        DatabaseMetrics {
            cached_queries,
            available_connections: self.throttle.available(),
            database_url: self.database_url.clone(),
        }
    }
}
