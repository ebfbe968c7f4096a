//! Turso pipeline API wire types (Hrana over HTTP, `/v2/pipeline`).
//!
//! Only the parts the gateway reads are modelled; unknown fields are ignored.

use krazyplanet_shared::de::lenient_i64;
use serde::{Deserialize, Serialize};

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRequest {
    pub requests: Vec<PipelineStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStep {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub stmt: Statement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub sql: String,
}

impl PipelineRequest {
    /// A pipeline with a single `execute` step
    pub fn execute(sql: impl Into<String>) -> Self {
        Self {
            requests: vec![PipelineStep {
                kind: "execute",
                stmt: Statement { sql: sql.into() },
            }],
        }
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    #[serde(default)]
    pub results: Vec<StepResult>,
}

/// Outcome of one pipeline step: `type` is `"ok"` or `"error"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<StepResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecuteResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    #[serde(default)]
    pub cols: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
    #[serde(default)]
    pub affected_row_count: u64,
    #[serde(
        default,
        deserialize_with = "lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_insert_rowid: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decltype: Option<String>,
}

/// One value in a row. Integers and text arrive as strings, floats as JSON
/// numbers, `null` without a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            value: Some(serde_json::Value::String(value.into())),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            kind: "integer".to_string(),
            value: Some(serde_json::Value::String(value.to_string())),
        }
    }

    /// The cell as text, whatever its wire type. `None` for SQL NULL.
    pub fn as_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl PipelineResponse {
    /// True when the store returned at least one step result.
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Error of the first step, if it failed.
    pub fn first_error(&self) -> Option<&StepError> {
        self.results.first().and_then(|r| r.error.as_ref())
    }

    /// Result set of the first step.
    pub fn first_result(&self) -> Option<&ExecuteResult> {
        self.results
            .first()
            .and_then(|r| r.response.as_ref())
            .and_then(|r| r.result.as_ref())
    }

    /// Rows of the first step; empty when there are none.
    pub fn rows(&self) -> &[Vec<Cell>] {
        self.first_result().map(|r| r.rows.as_slice()).unwrap_or(&[])
    }

    pub fn last_insert_rowid(&self) -> Option<i64> {
        self.first_result().and_then(|r| r.last_insert_rowid)
    }
}
