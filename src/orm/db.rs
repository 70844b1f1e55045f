//! Query execution against PostgreSQL through a pooled connection.

use crate::config::DbConfig;
use crate::error::ApiError;
use crate::orm::params::SqlArg;
use crate::orm::record::Record;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::PgPool;

/// Owned pool handle, passed down to everything that touches the database.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

/// Translate universal `?` placeholders to PostgreSQL's `$n` markers.
/// Markers inside single-quoted literals are left alone.
pub fn expand_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut in_literal = false;
    for c in sql.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

impl Db {
    /// Create the connection pool. Sizing is fixed at startup.
    pub async fn connect(cfg: &DbConfig) -> Result<Db, ApiError> {
        tracing::info!(host = %cfg.host, database = %cfg.database, "creating database connection pool");
        let pool = PgPoolOptions::new()
            .min_connections(cfg.min_connections)
            .max_connections(cfg.max_connections)
            .connect(&cfg.url())
            .await?;
        Ok(Db { pool })
    }

    pub fn from_pool(pool: PgPool) -> Db {
        Db { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run an INSERT/UPDATE/DELETE; returns the affected-row count. With
    /// `autocommit` false the statement runs inside an explicit transaction,
    /// rolled back (and the original failure re-raised) on any error.
    pub async fn execute(&self, sql: &str, args: &[SqlArg], autocommit: bool) -> Result<u64, ApiError> {
        let expanded = expand_placeholders(sql);
        tracing::debug!(sql = %expanded, args = ?args, "execute");
        if autocommit {
            let mut query = sqlx::query(&expanded);
            for a in args {
                query = query.bind(a.clone());
            }
            let res = query.execute(&self.pool).await?;
            return Ok(res.rows_affected());
        }
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&expanded);
        for a in args {
            query = query.bind(a.clone());
        }
        match query.execute(&mut *tx).await {
            Ok(res) => {
                tx.commit().await?;
                Ok(res.rows_affected())
            }
            Err(e) => {
                if let Err(rb) = tx.rollback().await {
                    tracing::warn!(error = %rb, "rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// Run a read query; returns up to `limit` rows (all when `None`) as
    /// ordered field-name to value records.
    pub async fn select(
        &self,
        sql: &str,
        args: &[SqlArg],
        limit: Option<usize>,
    ) -> Result<Vec<Record>, ApiError> {
        let expanded = expand_placeholders(sql);
        tracing::debug!(sql = %expanded, args = ?args, "select");
        let mut query = sqlx::query(&expanded);
        for a in args {
            query = query.bind(a.clone());
        }
        let mut rows = query.fetch_all(&self.pool).await?;
        if let Some(n) = limit {
            rows.truncate(n);
        }
        tracing::debug!(rows = rows.len(), "rows returned");
        Ok(rows.iter().map(row_to_record).collect())
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::{Column, Row};
    let mut rec = Record::new();
    for col in row.columns() {
        let name = col.name();
        rec.set(name, cell_to_value(row, name));
    }
    rec
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_expand_in_order() {
        assert_eq!(
            expand_placeholders("insert into \"t\" (\"a\", \"b\") values (?, ?)"),
            "insert into \"t\" (\"a\", \"b\") values ($1, $2)"
        );
        assert_eq!(expand_placeholders("select 1"), "select 1");
    }

    #[test]
    fn quoted_literals_are_left_alone() {
        assert_eq!(
            expand_placeholders("select * from t where a = '?' and b = ?"),
            "select * from t where a = '?' and b = $1"
        );
    }
}
