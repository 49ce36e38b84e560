//! Process-local store. Sessions stage their writes and apply them on commit,
//! re-checking unique and reference constraints against the committed tables.
//! Updates stage only the columns they set, so concurrent updates of different
//! columns of one row both survive.

use super::{Filter, Page, Session, Store};
use crate::error::StoreError;
use crate::record::Record;
use crate::registry::RecordType;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Tables = HashMap<String, Vec<Record>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of `table`, in insertion order.
    pub fn committed_rows(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        Ok(lock(&self.tables)?.get(table).cloned().unwrap_or_default())
    }
}

fn lock(tables: &Mutex<Tables>) -> Result<MutexGuard<'_, Tables>, StoreError> {
    tables
        .lock()
        .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(MemorySession {
            tables: Arc::clone(&self.tables),
            staged: Vec::new(),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        lock(&self.tables).map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[derive(Clone, Debug)]
enum Write {
    Insert(Record),
    Update { key: Value, changes: Record },
}

#[derive(Clone, Debug)]
struct Staged {
    ty: RecordType,
    write: Write,
}

struct MemorySession {
    tables: Arc<Mutex<Tables>>,
    staged: Vec<Staged>,
}

impl MemorySession {
    /// Committed rows overlaid with this session's staged writes.
    fn view(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        let mut rows = lock(&self.tables)?.get(table).cloned().unwrap_or_default();
        for staged in self.staged.iter().filter(|s| s.ty.table_name == table) {
            apply(&mut rows, staged);
        }
        Ok(rows)
    }

    fn stage(&mut self, ty: &RecordType, write: Write) {
        self.staged.push(Staged { ty: ty.clone(), write });
    }
}

fn apply(rows: &mut Vec<Record>, staged: &Staged) {
    let pk = staged.ty.primary_key;
    match &staged.write {
        Write::Insert(row) => rows.push(row.clone()),
        Write::Update { key, changes } => {
            if let Some(existing) = rows.iter_mut().find(|r| r.get(pk) == Some(key)) {
                existing.merge(changes);
            }
        }
    }
}

/// The row `staged` leaves behind in `rows`, or `None` for an update whose row is gone.
fn resulting_row(rows: &[Record], staged: &Staged) -> Option<(Record, bool)> {
    match &staged.write {
        Write::Insert(row) => Some((row.clone(), false)),
        Write::Update { key, changes } => {
            let mut row = rows
                .iter()
                .find(|r| r.get(staged.ty.primary_key) == Some(key))?
                .clone();
            row.merge(changes);
            Some((row, true))
        }
    }
}

/// Unique fields (including the primary key) and non-null fields of `row`,
/// checked against `rows`; the row sharing `row`'s primary key is skipped for updates.
fn check_row(ty: &RecordType, row: &Record, rows: &[Record], is_update: bool) -> Result<(), StoreError> {
    let pk = ty.primary_key;
    for field in &ty.fields {
        let value = row.get(field.name).unwrap_or(&Value::Null);
        if value.is_null() {
            if !field.nullable {
                return Err(StoreError::Constraint(format!(
                    "null value in {}.{} violates not-null constraint",
                    ty.table_name, field.name
                )));
            }
            continue;
        }
        if !(field.unique || field.name == pk) {
            continue;
        }
        let clash = rows
            .iter()
            .filter(|other| !(is_update && other.get(pk) == row.get(pk)))
            .any(|other| other.get(field.name) == Some(value));
        if clash {
            return Err(StoreError::Conflict(format!("{}.{}", ty.table_name, field.name)));
        }
    }
    Ok(())
}

fn check_references<F>(ty: &RecordType, row: &Record, mut rows_of: F) -> Result<(), StoreError>
where
    F: FnMut(&str) -> Result<Vec<Record>, StoreError>,
{
    for field in &ty.fields {
        let Some(reference) = &field.references else { continue };
        let value = row.get(field.name).unwrap_or(&Value::Null);
        if value.is_null() {
            continue;
        }
        let target = rows_of(reference.table)?;
        if !target.iter().any(|r| r.get(reference.column) == Some(value)) {
            return Err(StoreError::Constraint(format!(
                "{}.{} references a missing {} row",
                ty.table_name, field.name, reference.table
            )));
        }
    }
    Ok(())
}

fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(Value::as_str), b.and_then(Value::as_str)) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.map(Value::to_string).cmp(&b.map(Value::to_string)),
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn select(
        &mut self,
        ty: &RecordType,
        filters: &[Filter],
        page: Page,
    ) -> Result<Vec<Record>, StoreError> {
        let mut rows: Vec<Record> = self
            .view(ty.table_name)?
            .into_iter()
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .collect();
        rows.sort_by(|a, b| compare_keys(a.get(ty.primary_key), b.get(ty.primary_key)));
        let offset = page.offset.unwrap_or(0) as usize;
        let limit = page.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&mut self, ty: &RecordType, row: &Record) -> Result<Record, StoreError> {
        let rows = self.view(ty.table_name)?;
        check_row(ty, row, &rows, false)?;
        check_references(ty, row, |t| self.view(t))?;
        tracing::debug!(table = ty.table_name, "memory insert staged");
        self.stage(ty, Write::Insert(row.clone()));
        Ok(row.clone())
    }

    async fn update(
        &mut self,
        ty: &RecordType,
        key: &Value,
        changes: &Record,
    ) -> Result<Option<Record>, StoreError> {
        let rows = self.view(ty.table_name)?;
        let Some(current) = rows.iter().find(|r| r.get(ty.primary_key) == Some(key)) else {
            return Ok(None);
        };
        let mut set = changes.clone();
        set.remove(ty.primary_key);
        let mut updated = current.clone();
        updated.merge(&set);
        check_row(ty, &updated, &rows, true)?;
        check_references(ty, &updated, |t| self.view(t))?;
        tracing::debug!(table = ty.table_name, "memory update staged");
        self.stage(
            ty,
            Write::Update {
                key: key.clone(),
                changes: set,
            },
        );
        Ok(Some(updated))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut guard = lock(&self.tables)?;
        let mut next = guard.clone();
        for staged in &self.staged {
            let ty = &staged.ty;
            let rows = next.get(ty.table_name).cloned().unwrap_or_default();
            let Some((row, is_update)) = resulting_row(&rows, staged) else {
                continue;
            };
            check_row(ty, &row, &rows, is_update)?;
            check_references(ty, &row, |t| Ok(next.get(t).cloned().unwrap_or_default()))?;
            apply(next.entry(ty.table_name.to_string()).or_default(), staged);
        }
        *guard = next;
        Ok(())
    }
}
