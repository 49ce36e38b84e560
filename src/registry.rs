//! Record registry: table name -> record type descriptor.
//!
//! Each entity registers its descriptor once at startup; the built registry is
//! immutable and shared read-only between requests.

use crate::error::RegistryError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Semantic type of a field. Drives value coercion and the SQL cast used when binding.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Uuid,
    Text,
    Email,
    Bool,
    /// RFC 3339 timestamp, stored in UTC.
    Timestamp,
    /// JSON array of strings.
    JsonArray,
    Enum {
        type_name: &'static str,
        values: &'static [&'static str],
    },
}

/// How a field is filled when an insert does not supply it.
#[derive(Clone, Debug, PartialEq)]
pub enum Generated {
    Uuid,
    Now,
    Literal(Value),
}

impl Generated {
    pub fn produce(&self) -> Value {
        match self {
            Generated::Uuid => Value::String(Uuid::new_v4().to_string()),
            Generated::Now => Value::String(now_rfc3339()),
            Generated::Literal(v) => v.clone(),
        }
    }
}

/// Current time in the canonical timestamp form (UTC, microsecond precision).
pub fn now_rfc3339() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Foreign key to another table's column.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub table: &'static str,
    pub column: &'static str,
    pub cascade_delete: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    pub on_insert: Option<Generated>,
    /// Refreshed with the current time on every update.
    pub on_update: bool,
    /// Set at insert and never changed by an update.
    pub immutable: bool,
    pub references: Option<Reference>,
}

impl FieldDef {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            kind,
            nullable: false,
            unique: false,
            on_insert: None,
            on_update: false,
            immutable: false,
            references: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn generated(mut self, rule: Generated) -> Self {
        self.on_insert = Some(rule);
        self
    }

    pub fn refreshed_on_update(mut self) -> Self {
        self.on_update = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(Reference {
            table,
            column,
            cascade_delete: true,
        });
        self
    }

    /// Absent from an insert and nothing fills it in.
    pub fn is_required(&self) -> bool {
        !self.nullable && self.on_insert.is_none()
    }
}

impl FieldKind {
    /// Check `value` against this kind and return its canonical form.
    /// `field` is only used for the error message.
    pub fn coerce(&self, field: &str, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(|u| Value::String(u.to_string()))
                .ok_or_else(|| format!("{} must be a valid UUID", field)),
            FieldKind::Text => value
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| format!("{} must be a string", field)),
            FieldKind::Email => match value.as_str() {
                Some(s) if is_valid_email(s) => Ok(Value::String(s.to_string())),
                _ => Err(format!("{} must be a valid email", field)),
            },
            FieldKind::Bool => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| format!("{} must be a boolean", field)),
            FieldKind::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| Value::String(format_timestamp(d.with_timezone(&Utc))))
                .ok_or_else(|| format!("{} must be an RFC 3339 timestamp", field)),
            FieldKind::JsonArray => match value {
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(value.clone()),
                _ => Err(format!("{} must be an array of strings", field)),
            },
            FieldKind::Enum { values, .. } => match value.as_str() {
                Some(s) if values.contains(&s) => Ok(Value::String(s.to_string())),
                _ => Err(format!("{} must be one of: {}", field, values.join(", "))),
            },
        }
    }
}

/// Minimal email shape: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(s: &str) -> bool {
    if s.len() < 3 || s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordType {
    pub table_name: &'static str,
    pub fields: Vec<FieldDef>,
    pub primary_key: &'static str,
}

impl RecordType {
    pub fn new(table_name: &'static str, primary_key: &'static str, fields: Vec<FieldDef>) -> Self {
        RecordType {
            table_name,
            fields,
            primary_key,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_field(&self) -> Option<&FieldDef> {
        self.field(self.primary_key)
    }
}

/// A typed record that can be registered under its table name.
pub trait Entity {
    const TABLE: &'static str;

    fn record_type() -> RecordType;
}

#[derive(Clone, Debug)]
pub struct Registry {
    types: Vec<RecordType>,
    by_table: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { types: Vec::new() }
    }

    pub fn resolve(&self, table_name: &str) -> Result<&RecordType, RegistryError> {
        self.by_table
            .get(table_name)
            .map(|&i| &self.types[i])
            .ok_or_else(|| RegistryError::UnknownTable(table_name.to_string()))
    }

    /// Types in registration order (referenced tables are registered first).
    pub fn types(&self) -> &[RecordType] {
        &self.types
    }
}

pub struct RegistryBuilder {
    types: Vec<RecordType>,
}

impl RegistryBuilder {
    pub fn register<E: Entity>(self) -> Self {
        self.add(E::record_type())
    }

    pub fn add(mut self, ty: RecordType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut by_table = HashMap::new();
        for (i, ty) in self.types.iter().enumerate() {
            if ty.primary_key_field().is_none() {
                return Err(RegistryError::InvalidPrimaryKey {
                    table: ty.table_name.to_string(),
                    column: ty.primary_key.to_string(),
                });
            }
            if by_table.insert(ty.table_name, i).is_some() {
                return Err(RegistryError::DuplicateTable(ty.table_name.to_string()));
            }
        }
        Ok(Registry {
            types: self.types,
            by_table,
        })
    }
}
