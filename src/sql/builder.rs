//! Builds parameterized SELECT, INSERT, UPDATE from a record type.

use crate::record::Record;
use crate::registry::{FieldKind, RecordType};
use crate::store::{Filter, FilterOp, Page};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from registered record types).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// PostgreSQL type a text parameter is cast to for this kind; `None` for plain text.
pub fn pg_cast(kind: &FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Uuid => Some("uuid"),
        FieldKind::Timestamp => Some("timestamptz"),
        FieldKind::Bool => Some("boolean"),
        FieldKind::JsonArray => Some("jsonb"),
        FieldKind::Enum { type_name, .. } => Some(*type_name),
        FieldKind::Text | FieldKind::Email => None,
    }
}

fn placeholder(n: usize, kind: &FieldKind) -> String {
    pg_cast(kind)
        .map(|t| format!("${}::{}", n, t))
        .unwrap_or_else(|| format!("${}", n))
}

/// SELECT list: each column as-is, except enum columns as col::text so sqlx returns String.
fn select_column_list(ty: &RecordType) -> String {
    ty.fields
        .iter()
        .map(|f| {
            let q = quoted(f.name);
            match f.kind {
                FieldKind::Enum { .. } => format!("{}::text AS {}", q, q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(ty: &RecordType, filters: &[Filter], q: &mut QueryBuf) -> String {
    let mut parts = Vec::new();
    for f in filters {
        let Some(field) = ty.field(f.field) else { continue };
        let col = quoted(field.name);
        match f.op {
            FilterOp::Eq if f.value.is_null() => parts.push(format!("{} IS NULL", col)),
            FilterOp::Eq => {
                let n = q.push_param(f.value.clone());
                parts.push(format!("{} = {}", col, placeholder(n, &field.kind)));
            }
            FilterOp::Contains => {
                let n = q.push_param(Value::Array(vec![f.value.clone()]));
                parts.push(format!("{} @> ${}::jsonb", col, n));
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT with exact-match filters (AND), ORDER BY pk, optional LIMIT/OFFSET.
pub fn select(ty: &RecordType, filters: &[Filter], page: Page) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(ty, filters, &mut q);
    let order_clause = format!(" ORDER BY {}", quoted(ty.primary_key));
    let limit_clause = page.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = page.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(ty),
        quoted(ty.table_name),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// INSERT of the columns present in `row`, RETURNING every column.
pub fn insert(ty: &RecordType, row: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &ty.fields {
        let Some(val) = row.get(f.name) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(f.name));
        placeholders.push(placeholder(n, &f.kind));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(ty.table_name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(ty)
    );
    q
}

/// UPDATE by primary key: SET only known, non-key columns present in `changes`.
/// With nothing to set this degrades to a SELECT of the row.
pub fn update(ty: &RecordType, key: &Value, changes: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = ty.primary_key;
    let pk_kind = ty
        .primary_key_field()
        .map(|f| f.kind.clone())
        .unwrap_or(FieldKind::Text);
    let mut sets = Vec::new();
    for f in &ty.fields {
        if f.name == pk {
            continue;
        }
        let Some(val) = changes.get(f.name) else { continue };
        let n = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(f.name), placeholder(n, &f.kind)));
    }
    let id_param = q.push_param(key.clone());
    let cols = select_column_list(ty);
    if sets.is_empty() {
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            cols,
            quoted(ty.table_name),
            quoted(pk),
            placeholder(id_param, &pk_kind)
        );
        return q;
    }
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(ty.table_name),
        sets.join(", "),
        quoted(pk),
        placeholder(id_param, &pk_kind),
        cols
    );
    q
}
