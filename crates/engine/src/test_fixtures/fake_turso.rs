//! In-memory stand-in for a Turso pipeline endpoint.
//!
//! Understands exactly the statements the exchange repository sends: the
//! table DDL, the exchange INSERT, the two SELECTs and `SELECT 1`. Anything
//! else is answered with a step error, like an unknown table would be.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredExchange {
    pub id: i64,
    pub opener: String,
    pub follower: String,
    pub opener_card: String,
    pub follower_card: String,
    pub date: String,
}

#[derive(Default)]
struct State {
    rows: Vec<StoredExchange>,
    next_id: i64,
}

/// Shared handle to the fake store; clones see the same rows.
#[derive(Clone, Default)]
pub struct FakeTurso {
    state: Arc<Mutex<State>>,
    down: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl FakeTurso {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a mock server answering `/v2/pipeline` from this store.
    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/pipeline"))
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    /// While down, every request gets HTTP 503.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<StoredExchange> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Put a row in place without going through the endpoint.
    pub fn seed(&self, opener: &str, follower: &str, date: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.push(StoredExchange {
            id,
            opener: opener.to_string(),
            follower: follower.to_string(),
            opener_card: String::new(),
            follower_card: String::new(),
            date: date.to_string(),
        });
        id
    }

    fn execute(&self, sql: &str) -> Value {
        let sql = sql.trim();
        let mut state = self.state.lock().unwrap();

        if sql.starts_with("CREATE TABLE IF NOT EXISTS ExchangeTable") {
            return ok_step(vec![], None);
        }
        if sql == "SELECT 1" {
            return ok_step(vec![vec![cell_int(1)]], None);
        }
        if sql.starts_with("INSERT INTO ExchangeTable") {
            let values = quoted_values(sql);
            if values.len() != 5 {
                return error_step("malformed INSERT");
            }
            state.next_id += 1;
            let id = state.next_id;
            state.rows.push(StoredExchange {
                id,
                opener: values[0].clone(),
                follower: values[1].clone(),
                opener_card: values[2].clone(),
                follower_card: values[3].clone(),
                date: values[4].clone(),
            });
            return ok_step(vec![], Some(id));
        }
        if sql.starts_with("SELECT id, requestOpener") {
            let mut rows: Vec<&StoredExchange> = match sql.split_once("WHERE id = ") {
                Some((_, id)) => {
                    let id: i64 = id.trim().parse().unwrap_or(-1);
                    state.rows.iter().filter(|r| r.id == id).collect()
                }
                None => state.rows.iter().collect(),
            };
            if sql.ends_with("ORDER BY date DESC") {
                rows.sort_by(|a, b| b.date.cmp(&a.date));
            }
            return ok_step(rows.into_iter().map(row_cells).collect(), None);
        }
        error_step("unsupported statement")
    }
}

impl Respond for FakeTurso {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return ResponseTemplate::new(503);
        }

        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let results: Vec<Value> = body["requests"]
            .as_array()
            .map(|steps| {
                steps
                    .iter()
                    .map(|step| self.execute(step["stmt"]["sql"].as_str().unwrap_or_default()))
                    .collect()
            })
            .unwrap_or_default();

        ResponseTemplate::new(200).set_body_json(json!({ "baton": null, "results": results }))
    }
}

fn ok_step(rows: Vec<Vec<Value>>, last_insert_rowid: Option<i64>) -> Value {
    let affected = u64::from(last_insert_rowid.is_some());
    json!({
        "type": "ok",
        "response": {
            "type": "execute",
            "result": {
                "cols": [],
                "rows": rows,
                "affected_row_count": affected,
                "last_insert_rowid": last_insert_rowid.map(|id| id.to_string()),
            }
        }
    })
}

fn error_step(message: &str) -> Value {
    json!({ "type": "error", "error": { "message": message } })
}

fn cell_int(value: i64) -> Value {
    json!({ "type": "integer", "value": value.to_string() })
}

fn cell_text(value: &str) -> Value {
    json!({ "type": "text", "value": value })
}

fn row_cells(row: &StoredExchange) -> Vec<Value> {
    vec![
        cell_int(row.id),
        cell_text(&row.opener),
        cell_text(&row.follower),
        cell_text(&row.opener_card),
        cell_text(&row.follower_card),
        cell_text(&row.date),
    ]
}

/// Single-quoted literals of a statement, with `''` unescaped.
fn quoted_values(sql: &str) -> Vec<String> {
    let Some((_, tail)) = sql.split_once("VALUES") else {
        return Vec::new();
    };

    let mut values = Vec::new();
    let mut chars = tail.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut value = String::new();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        values.push(value);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_values_unescape_quotes() {
        let values = quoted_values("INSERT INTO t (a, b) VALUES ('o''neil', 'x, y')");
        assert_eq!(values, vec!["o'neil".to_string(), "x, y".to_string()]);
    }
}
