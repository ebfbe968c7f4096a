//! Turso exchange repository implementation.
//!
//! Exchanges live in `ExchangeTable`. Column names are kept as existing game
//! databases have them: the players are `requestOpener`/`requestFollower` and
//! the time of the exchange is `date`.

use std::sync::Arc;

use async_trait::async_trait;
use krazyplanet_domain::{Exchange, ExchangeId};

use super::helpers::{format_timestamp, parse_timestamp, sql_literal, RowExt};
use super::wire::{Cell, PipelineResponse};
use crate::infrastructure::ports::{ExchangeRepo, RepoError, SqlExecutor};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS ExchangeTable (\
id INTEGER PRIMARY KEY AUTOINCREMENT, \
requestOpener TEXT NOT NULL, \
requestFollower TEXT NOT NULL, \
openerCard TEXT NOT NULL, \
followerCard TEXT NOT NULL, \
date TEXT NOT NULL)";

const SELECT_COLUMNS: &str =
    "SELECT id, requestOpener, requestFollower, openerCard, followerCard, date FROM ExchangeTable";

/// Cells every exchange row must have.
const ROW_WIDTH: usize = 6;

pub struct TursoExchangeRepo {
    sql: Arc<dyn SqlExecutor>,
}

impl TursoExchangeRepo {
    pub fn new(sql: Arc<dyn SqlExecutor>) -> Self {
        Self { sql }
    }

    /// Run a statement; an absent or failed answer is a database error.
    async fn run(&self, operation: &'static str, sql: &str) -> Result<PipelineResponse, RepoError> {
        let response = self
            .sql
            .execute(sql)
            .await
            .map_err(|e| RepoError::database(operation, e))?
            .ok_or_else(|| RepoError::database(operation, "store unavailable"))?;

        if let Some(error) = response.first_error() {
            return Err(RepoError::database(operation, &error.message));
        }
        if !response.has_results() {
            return Err(RepoError::database(operation, "store returned no results"));
        }
        Ok(response)
    }

    /// Run a read. A store that is unavailable or rejects the statement reads
    /// as an empty table; only contract faults from the executor are errors.
    async fn select(&self, operation: &'static str, sql: &str) -> Result<Vec<Exchange>, RepoError> {
        let Some(response) = self
            .sql
            .execute(sql)
            .await
            .map_err(|e| RepoError::database(operation, e))?
        else {
            tracing::warn!(operation, "Store unavailable, reading as empty");
            return Ok(Vec::new());
        };

        if let Some(error) = response.first_error() {
            tracing::warn!(operation, error = %error.message, "Store rejected read, reading as empty");
            return Ok(Vec::new());
        }

        Ok(response
            .rows()
            .iter()
            .filter_map(|row| row_to_exchange(row))
            .collect())
    }
}

fn row_to_exchange(row: &[Cell]) -> Option<Exchange> {
    if row.len() < ROW_WIDTH {
        tracing::warn!(cells = row.len(), "Skipping malformed exchange row");
        return None;
    }

    Some(Exchange::from_stored(
        ExchangeId::new(row.i64_at(0)),
        row.text_at(1),
        row.text_at(2),
        row.text_at(3),
        row.text_at(4),
        parse_timestamp(&row.text_at(5)),
    ))
}

fn insert_sql(exchange: &Exchange) -> String {
    format!(
        "INSERT INTO ExchangeTable (requestOpener, requestFollower, openerCard, followerCard, date) \
         VALUES ({}, {}, {}, {}, {})",
        sql_literal(exchange.opener()),
        sql_literal(exchange.follower()),
        sql_literal(exchange.opener_card()),
        sql_literal(exchange.follower_card()),
        sql_literal(&format_timestamp(exchange.occurred_at())),
    )
}

#[async_trait]
impl ExchangeRepo for TursoExchangeRepo {
    async fn create_table(&self) -> Result<(), RepoError> {
        self.run("create_table", CREATE_TABLE_SQL).await?;
        tracing::info!("Exchange table ready");
        Ok(())
    }

    async fn insert(&self, exchange: &Exchange) -> Result<Exchange, RepoError> {
        let response = self.run("insert_exchange", &insert_sql(exchange)).await?;

        let id = match response.last_insert_rowid() {
            Some(id) => ExchangeId::new(id),
            None => {
                tracing::warn!("Store did not report an id for the inserted exchange");
                ExchangeId::UNASSIGNED
            }
        };

        tracing::debug!(exchange_id = %id, opener = %exchange.opener(), "Exchange inserted");
        Ok(exchange.clone().with_id(id))
    }

    async fn fetch_all(&self) -> Result<Vec<Exchange>, RepoError> {
        let sql = format!("{} ORDER BY date DESC", SELECT_COLUMNS);
        self.select("fetch_exchanges", &sql).await
    }

    async fn fetch_by_id(&self, id: ExchangeId) -> Result<Option<Exchange>, RepoError> {
        let sql = format!("{} WHERE id = {}", SELECT_COLUMNS, id.as_i64());
        let mut rows = self.select("fetch_exchange", &sql).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}
