//! PostgreSQL store: one sqlx transaction per session, SQL built from the record type.

use super::{Filter, Page, Session, Store};
use crate::error::StoreError;
use crate::record::Record;
use crate::registry::{format_timestamp, RecordType};
use crate::sql::{self, bind_text, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Postgres, Transaction};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_optional(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_error)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PgSession {
    tx: Transaction<'static, Postgres>,
}

impl PgSession {
    async fn fetch_all(&mut self, q: &QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(bind_text(p));
        }
        let rows = query.fetch_all(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn fetch_optional(&mut self, q: &QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(bind_text(p));
        }
        let row = query.fetch_optional(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(row.as_ref().map(row_to_record))
    }
}

#[async_trait]
impl Session for PgSession {
    async fn select(
        &mut self,
        ty: &RecordType,
        filters: &[Filter],
        page: Page,
    ) -> Result<Vec<Record>, StoreError> {
        let q = sql::select(ty, filters, page);
        self.fetch_all(&q).await
    }

    async fn insert(&mut self, ty: &RecordType, row: &Record) -> Result<Record, StoreError> {
        let q = sql::insert(ty, row);
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("insert into {} returned no row", ty.table_name)))
    }

    async fn update(
        &mut self,
        ty: &RecordType,
        key: &Value,
        changes: &Record,
    ) -> Result<Option<Record>, StoreError> {
        let q = sql::update(ty, key, changes);
        self.fetch_optional(&q).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_db_error)
    }
}

/// Classify a sqlx error: unique violations are conflicts, other integrity
/// violations (foreign key, not-null, check) are constraint failures.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.constraint().unwrap_or("unique").to_string());
        }
        if db.is_foreign_key_violation() || db.is_check_violation() || db.code().as_deref() == Some("23502") {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.name())))
        .collect()
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(format_timestamp(d));
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(format_timestamp(d.and_utc()));
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// Create the target database if missing, connecting to the `postgres` admin database.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Backend(format!("invalid database url: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(map_db_error)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(map_db_error)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(map_db_error)?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Backend("database url has no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_targets_postgres_database() {
        let (admin, name) =
            parse_db_name_from_url("postgres://u:p@localhost:5432/backend_service?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "backend_service");
    }
}
