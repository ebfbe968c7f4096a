//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Stored data could not be turned into domain values.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// True when the store itself failed, as opposed to a data problem.
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database { .. })
    }
}

/// Contract violations of the SQL executor.
///
/// Operational failures (HTTP errors, timeouts, undecodable bodies) are not
/// errors: the executor logs them and reports an absent result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SqlError {
    #[error("SQL statement cannot be empty")]
    EmptyStatement,
    #[error("Connection throttle closed")]
    ThrottleClosed,
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

/// Message bus failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    #[error("Failed to connect to message bus at {url}: {message}")]
    Connect { url: String, message: String },
    #[error("Failed to subscribe to {subject}: {message}")]
    Subscribe { subject: String, message: String },
    #[error("Failed to publish to {subject}: {message}")]
    Publish { subject: String, message: String },
    #[error("Request on {subject} failed: {message}")]
    Request { subject: String, message: String },
    #[error("Request on {subject} timed out after {timeout_ms}ms")]
    Timeout { subject: String, timeout_ms: u64 },
    #[error("Message bus connection is closed")]
    Closed,
}

impl BusError {
    pub fn subscribe(subject: impl Into<String>, message: impl ToString) -> Self {
        Self::Subscribe {
            subject: subject.into(),
            message: message.to_string(),
        }
    }

    pub fn publish(subject: impl Into<String>, message: impl ToString) -> Self {
        Self::Publish {
            subject: subject.into(),
            message: message.to_string(),
        }
    }

    pub fn request(subject: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            subject: subject.into(),
            message: message.to_string(),
        }
    }
}
