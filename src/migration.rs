//! Schema bootstrap: DDL for enum types and tables generated from the registry.
//! Tables are created in registration order, so referenced tables come first.

use crate::error::StoreError;
use crate::registry::{FieldDef, FieldKind, Generated, RecordType, Registry};
use crate::sql::quoted;
use serde_json::Value;
use sqlx::PgPool;

fn column_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Uuid => "UUID".into(),
        FieldKind::Text | FieldKind::Email => "TEXT".into(),
        FieldKind::Bool => "BOOLEAN".into(),
        FieldKind::Timestamp => "TIMESTAMPTZ".into(),
        FieldKind::JsonArray => "JSONB".into(),
        FieldKind::Enum { type_name, .. } => quoted(type_name),
    }
}

fn literal(v: &Value) -> String {
    match v {
        Value::Null => "NULL".into(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'::jsonb", other.to_string().replace('\'', "''")),
    }
}

fn column_def(ty: &RecordType, f: &FieldDef) -> String {
    let mut def = format!("{} {}", quoted(f.name), column_type(&f.kind));
    if f.name == ty.primary_key {
        def.push_str(" PRIMARY KEY");
    } else if !f.nullable {
        def.push_str(" NOT NULL");
    }
    match &f.on_insert {
        Some(Generated::Uuid) => def.push_str(" DEFAULT gen_random_uuid()"),
        Some(Generated::Now) => def.push_str(" DEFAULT NOW()"),
        Some(Generated::Literal(v)) => {
            def.push_str(" DEFAULT ");
            def.push_str(&literal(v));
        }
        None => {}
    }
    if f.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(r) = &f.references {
        def.push_str(&format!(" REFERENCES {} ({})", quoted(r.table), quoted(r.column)));
        if r.cascade_delete {
            def.push_str(" ON DELETE CASCADE");
        }
    }
    def
}

/// `CREATE TYPE ... AS ENUM` for each enum field of `ty`.
pub fn enum_ddl(ty: &RecordType) -> Vec<String> {
    ty.fields
        .iter()
        .filter_map(|f| match &f.kind {
            FieldKind::Enum { type_name, values } => {
                let values: Vec<String> = values.iter().map(|v| literal(&Value::String(v.to_string()))).collect();
                Some(format!("CREATE TYPE {} AS ENUM ({})", quoted(type_name), values.join(", ")))
            }
            _ => None,
        })
        .collect()
}

pub fn table_ddl(ty: &RecordType) -> String {
    let cols: Vec<String> = ty.fields.iter().map(|f| column_def(ty, f)).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(ty.table_name),
        cols.join(",\n  ")
    )
}

/// Create enum types and tables for every registered record type. Idempotent:
/// existing types are left alone, tables use IF NOT EXISTS.
pub async fn apply_migrations(pool: &PgPool, registry: &Registry) -> Result<(), StoreError> {
    for ty in registry.types() {
        for sql in enum_ddl(ty) {
            if let Err(e) = sqlx::query(&sql).execute(pool).await {
                tracing::debug!(error = %e, "enum type not created");
            }
        }
    }
    for ty in registry.types() {
        let sql = table_ddl(ty);
        tracing::debug!(table = ty.table_name, %sql, "ensure table");
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::Backend(format!("create table {}: {}", ty.table_name, e)))?;
    }
    tracing::info!(tables = registry.types().len(), "schema ready");
    Ok(())
}
