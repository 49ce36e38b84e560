//! Store backends and the per-request unit of work.
//!
//! A [`Store`] hands out sessions; each session is one transaction. Writes made
//! through a session become visible to other sessions only after
//! [`UnitOfWork::commit`]. Dropping an uncommitted unit of work rolls it back.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::StoreError;
use crate::record::Record;
use crate::registry::RecordType;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    /// Exact equality; a null value matches null fields.
    Eq,
    /// The field's JSON array contains the value.
    Contains,
}

/// One conjunct of a WHERE clause. Field names are already checked against the record type.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &'static str, value: Value) -> Self {
        Filter {
            field,
            op: FilterOp::Eq,
            value,
        }
    }

    pub fn contains(field: &'static str, value: Value) -> Self {
        Filter {
            field,
            op: FilterOp::Contains,
            value,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Contains => actual
                .as_array()
                .map(|items| items.contains(&self.value))
                .unwrap_or(false),
        }
    }
}

/// Offset is applied before limit; `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn first(offset: Option<u32>) -> Self {
        Page {
            limit: Some(1),
            offset,
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError>;

    /// Cheap connectivity check behind `/ready`.
    async fn ping(&self) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}

/// One open transaction. Rows come back in primary-key order.
#[async_trait]
pub trait Session: Send {
    async fn select(
        &mut self,
        ty: &RecordType,
        filters: &[Filter],
        page: Page,
    ) -> Result<Vec<Record>, StoreError>;

    /// Insert a fully populated row and return it as stored.
    async fn insert(&mut self, ty: &RecordType, row: &Record) -> Result<Record, StoreError>;

    /// Overwrite `changes` on the row whose primary key equals `key`; `None` when no such row.
    async fn update(
        &mut self,
        ty: &RecordType,
        key: &Value,
        changes: &Record,
    ) -> Result<Option<Record>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

pub struct UnitOfWork {
    session: Box<dyn Session>,
}

impl UnitOfWork {
    pub async fn begin(store: &dyn Store) -> Result<Self, StoreError> {
        Ok(UnitOfWork {
            session: store.begin().await?,
        })
    }

    pub fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.session.commit().await
    }

    /// Discard all staged writes.
    pub fn rollback(self) {
        drop(self);
    }
}
