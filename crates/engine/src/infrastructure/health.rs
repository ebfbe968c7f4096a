//! Health checks and their aggregation.
//!
//! Each named check reports Healthy or Unhealthy with a detail line. The
//! aggregator runs all checks concurrently, each under a timeout, and folds
//! the results: the service is healthy only if every check is. A check that
//! errors, panics or times out counts as unhealthy; nothing escapes
//! [`HealthAggregator::evaluate`].

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::error_sanitizer::panic_message;
use crate::infrastructure::ports::SqlExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub status: HealthState,
    pub detail: String,
}

impl CheckResult {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            detail: detail.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall: HealthState,
    pub checks: BTreeMap<String, CheckResult>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.overall == HealthState::Healthy
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HealthCheckError {
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> Result<CheckResult, HealthCheckError>;
}

// =============================================================================
// Checks
// =============================================================================

/// Store reachability via `SELECT 1`.
pub struct DatabaseHealthCheck {
    sql: Arc<dyn SqlExecutor>,
}

impl DatabaseHealthCheck {
    pub fn new(sql: Arc<dyn SqlExecutor>) -> Self {
        Self { sql }
    }
}

#[async_trait]
impl HealthCheck for DatabaseHealthCheck {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> Result<CheckResult, HealthCheckError> {
        if self.sql.test_connection().await {
            Ok(CheckResult::healthy("Database connection is healthy"))
        } else {
            Ok(CheckResult::unhealthy("Database connection failed"))
        }
    }
}

type MemorySampler = Box<dyn Fn() -> Option<u64> + Send + Sync>;

/// Resident memory of this process against a threshold in MB.
pub struct MemoryHealthCheck {
    threshold_mb: u64,
    sampler: MemorySampler,
}

impl MemoryHealthCheck {
    pub fn new(threshold_mb: u64) -> Self {
        Self::with_sampler(threshold_mb, Box::new(process_memory_mb))
    }

    pub fn with_sampler(threshold_mb: u64, sampler: MemorySampler) -> Self {
        Self {
            threshold_mb,
            sampler,
        }
    }
}

fn process_memory_mb() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.memory() / (1024 * 1024))
}

#[async_trait]
impl HealthCheck for MemoryHealthCheck {
    fn name(&self) -> &str {
        "memory"
    }

    async fn check(&self) -> Result<CheckResult, HealthCheckError> {
        let used_mb = (self.sampler)()
            .ok_or_else(|| HealthCheckError::Failed("Process memory unavailable".into()))?;

        if used_mb > self.threshold_mb {
            Ok(CheckResult::unhealthy(format!(
                "Memory usage too high: {}MB",
                used_mb
            )))
        } else {
            Ok(CheckResult::healthy(format!(
                "Memory usage normal: {}MB",
                used_mb
            )))
        }
    }
}

// =============================================================================
// Aggregator
// =============================================================================

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HealthAggregator {
    checks: Vec<Arc<dyn HealthCheck>>,
    timeout: Duration,
}

impl HealthAggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            checks: Vec::new(),
            timeout,
        }
    }

    /// Register a check. Names key the report, so a second check under a
    /// name already registered is refused and the first one kept.
    pub fn with_check(mut self, check: Arc<dyn HealthCheck>) -> Self {
        if self.checks.iter().any(|c| c.name() == check.name()) {
            tracing::warn!(check = %check.name(), "Duplicate health check name, ignoring");
            return self;
        }
        self.checks.push(check);
        self
    }

    /// Run every check and fold the results.
    pub async fn evaluate(&self) -> HealthReport {
        let results = join_all(self.checks.iter().map(|check| self.run_check(check))).await;

        let checks: BTreeMap<String, CheckResult> = results.into_iter().collect();
        let overall = if checks.values().all(CheckResult::is_healthy) {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };

        HealthReport {
            overall,
            checks,
            checked_at: Utc::now(),
        }
    }

    async fn run_check(&self, check: &Arc<dyn HealthCheck>) -> (String, CheckResult) {
        let name = check.name().to_string();
        let guarded = AssertUnwindSafe(check.check()).catch_unwind();

        let result = match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => CheckResult::unhealthy(e.to_string()),
            Ok(Err(panic)) => CheckResult::unhealthy(format!(
                "Health check panicked: {}",
                panic_message(panic.as_ref())
            )),
            Err(_) => CheckResult::unhealthy(format!(
                "Health check timed out after {}s",
                self.timeout.as_secs()
            )),
        };

        if !result.is_healthy() {
            tracing::warn!(check = %name, detail = %result.detail, "Health check failed");
        }
        (name, result)
    }

    /// Log a report every `interval` until `cancel` fires.
    pub fn spawn_monitor(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let report = self.evaluate().await;
                if report.is_healthy() {
                    tracing::info!(checks = report.checks.len(), "Health check passed");
                } else {
                    let failing: Vec<&str> = report
                        .checks
                        .iter()
                        .filter(|(_, r)| !r.is_healthy())
                        .map(|(name, _)| name.as_str())
                        .collect();
                    tracing::warn!(failing = ?failing, "Health check reported unhealthy service");
                }
            }
            tracing::debug!("Health monitor stopped");
        })
    }
}
