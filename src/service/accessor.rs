//! Generic record accessor: table-name-driven query, create and update inside a unit of work.
//!
//! Every endpoint goes through this type instead of per-entity repositories. The
//! table name is resolved through the [`Registry`]; an unknown table reads as
//! [`AccessError::NotFound`], exactly like a missing row.

use crate::error::AccessError;
use crate::record::Record;
use crate::registry::{FieldKind, Generated, RecordType, Registry};
use crate::store::{Filter, Page, UnitOfWork};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub single_row: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl QueryOptions {
    pub fn single() -> Self {
        QueryOptions {
            single_row: true,
            ..Default::default()
        }
    }

    pub fn many(limit: Option<u32>, offset: Option<u32>) -> Self {
        QueryOptions {
            single_row: false,
            limit,
            offset,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    Row(Record),
    Rows(Vec<Record>),
}

pub struct Accessor<'a> {
    registry: &'a Registry,
    uow: &'a mut UnitOfWork,
}

impl<'a> Accessor<'a> {
    pub fn new(registry: &'a Registry, uow: &'a mut UnitOfWork) -> Self {
        Accessor { registry, uow }
    }

    fn resolve(&self, table: &str) -> Result<&'a RecordType, AccessError> {
        let registry: &'a Registry = self.registry;
        registry
            .resolve(table)
            .map_err(|e| AccessError::NotFound(e.to_string()))
    }

    /// Filtered read. Unknown filter keys are ignored; see [`build_filters`].
    pub async fn query(
        &mut self,
        table: &str,
        filters: &Record,
        options: QueryOptions,
    ) -> Result<QueryOutput, AccessError> {
        let ty = self.resolve(table)?;
        let filters = build_filters(ty, filters)?;
        if options.single_row {
            let rows = self
                .uow
                .session()
                .select(ty, &filters, Page::first(options.offset))
                .await?;
            return rows
                .into_iter()
                .next()
                .map(QueryOutput::Row)
                .ok_or_else(|| AccessError::NotFound(format!("no matching {} row", table)));
        }
        let page = Page {
            limit: options.limit,
            offset: options.offset,
        };
        let rows = self.uow.session().select(ty, &filters, page).await?;
        Ok(QueryOutput::Rows(rows))
    }

    /// First row matching `filters`, or `NotFound`.
    pub async fn find_one(&mut self, table: &str, filters: &Record) -> Result<Record, AccessError> {
        match self.query(table, filters, QueryOptions::single()).await? {
            QueryOutput::Row(row) => Ok(row),
            QueryOutput::Rows(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| AccessError::NotFound(format!("no matching {} row", table))),
        }
    }

    /// All rows matching `filters`, possibly none.
    pub async fn find_many(
        &mut self,
        table: &str,
        filters: &Record,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Record>, AccessError> {
        match self.query(table, filters, QueryOptions::many(limit, offset)).await? {
            QueryOutput::Rows(rows) => Ok(rows),
            QueryOutput::Row(row) => Ok(vec![row]),
        }
    }

    /// Insert `data`, filling generated fields, and return the row as stored.
    pub async fn create(&mut self, table: &str, data: &Record) -> Result<Record, AccessError> {
        let ty = self.resolve(table)?;
        let mut row = Record::new();
        for field in &ty.fields {
            let value = match data.get(field.name) {
                Some(v) if !v.is_null() => field.kind.coerce(field.name, v).map_err(AccessError::Validation)?,
                _ => match &field.on_insert {
                    Some(rule) => rule.produce(),
                    None if field.nullable => Value::Null,
                    None => return Err(AccessError::Validation(format!("{} is required", field.name))),
                },
            };
            row.insert(field.name, value);
        }
        let created = self.uow.session().insert(ty, &row).await.map_err(|e| {
            tracing::warn!(table = ty.table_name, error = %e, "create rejected");
            AccessError::from(e)
        })?;
        Ok(created)
    }

    /// Overwrite `changes` on the first row matching `identifier`. The primary key and
    /// immutable fields are skipped. Fields refreshed on update are stamped with the
    /// current time even when `changes` is empty.
    pub async fn update(
        &mut self,
        table: &str,
        identifier: &Record,
        changes: &Record,
    ) -> Result<Record, AccessError> {
        let ty = self.resolve(table)?;
        let filters = build_filters(ty, identifier)?;
        let target = self
            .uow
            .session()
            .select(ty, &filters, Page::first(None))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AccessError::NotFound(format!("no matching {} row", table)))?;
        let key = target
            .get(ty.primary_key)
            .cloned()
            .ok_or_else(|| AccessError::Internal(format!("{} row without primary key", table)))?;

        let mut set = Record::new();
        for (name, value) in changes.iter() {
            let Some(field) = ty.field(name) else { continue };
            if field.name == ty.primary_key || field.immutable {
                continue;
            }
            let value = if value.is_null() {
                if !field.nullable {
                    return Err(AccessError::Validation(format!("{} must not be null", field.name)));
                }
                Value::Null
            } else {
                field.kind.coerce(field.name, value).map_err(AccessError::Validation)?
            };
            set.insert(field.name, value);
        }
        for field in ty.fields.iter().filter(|f| f.on_update) {
            set.insert(field.name, Generated::Now.produce());
        }

        self.uow
            .session()
            .update(ty, &key, &set)
            .await
            .map_err(|e| {
                tracing::warn!(table = ty.table_name, error = %e, "update rejected");
                AccessError::from(e)
            })?
            .ok_or_else(|| AccessError::NotFound(format!("no matching {} row", table)))
    }
}

/// Turn a field -> value mapping into store filters. Keys naming no field are
/// skipped so callers can pass optional filters; values are coerced to the field
/// type. A scalar against a JSON array field means "array contains".
pub fn build_filters(ty: &RecordType, filters: &Record) -> Result<Vec<Filter>, AccessError> {
    let mut out = Vec::new();
    for (name, value) in filters.iter() {
        let Some(field) = ty.field(name) else {
            tracing::debug!(table = ty.table_name, field = %name, "ignoring unknown filter");
            continue;
        };
        if value.is_null() {
            out.push(Filter::eq(field.name, Value::Null));
            continue;
        }
        let filter = match (&field.kind, value) {
            (FieldKind::JsonArray, Value::String(_)) => Filter::contains(field.name, value.clone()),
            (FieldKind::JsonArray, _) => Filter::eq(
                field.name,
                field.kind.coerce(field.name, value).map_err(AccessError::Validation)?,
            ),
            (kind, _) => Filter::eq(
                field.name,
                kind.coerce(field.name, value).map_err(AccessError::Validation)?,
            ),
        };
        out.push(filter);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{self, Application, Candidate, User};
    use crate::registry::Entity;
    use crate::store::{MemoryStore, Store};
    use serde_json::json;

    async fn begin(store: &MemoryStore) -> UnitOfWork {
        UnitOfWork::begin(store).await.unwrap()
    }

    fn alice() -> Record {
        Record::new()
            .with("full_name", "Alice")
            .with("email", "alice@x.com")
            .with("skills", json!(["python"]))
    }

    #[tokio::test]
    async fn create_fills_generated_fields_and_reads_back() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);

        let created = db.create(Candidate::TABLE, &alice()).await.unwrap();
        assert!(created.get_uuid("id").is_some());
        assert!(created.get_str("created_at").is_some());
        assert_eq!(created.get("phone"), Some(&Value::Null));

        let id = Record::new().with("id", created.get("id").cloned().unwrap());
        let fetched = db.find_one(Candidate::TABLE, &id).await.unwrap();
        assert_eq!(fetched, created);
        let typed: Candidate = fetched.into_typed().unwrap();
        assert_eq!(typed.skills, Some(vec!["python".to_string()]));
    }

    #[tokio::test]
    async fn unknown_table_reads_as_not_found() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);

        let err = db.query("interviews", &Record::new(), QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound(_)));
        assert!(matches!(
            db.create("interviews", &Record::new()).await,
            Err(AccessError::NotFound(_))
        ));
        assert!(matches!(
            db.update("interviews", &Record::new(), &Record::new()).await,
            Err(AccessError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn single_row_query_without_match_is_not_found() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);

        let filters = Record::new().with("email", "nobody@x.com");
        assert!(matches!(
            db.query(User::TABLE, &filters, QueryOptions::single()).await,
            Err(AccessError::NotFound(_))
        ));
        assert_eq!(
            db.query(User::TABLE, &filters, QueryOptions::default()).await.unwrap(),
            QueryOutput::Rows(vec![])
        );
    }

    #[tokio::test]
    async fn unknown_filter_keys_are_ignored() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        db.create(Candidate::TABLE, &alice()).await.unwrap();

        let filters = Record::new().with("full_name", "Alice").with("nickname", "Al");
        let rows = db.find_many(Candidate::TABLE, &filters, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn skill_filter_matches_array_membership() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        db.create(Candidate::TABLE, &alice()).await.unwrap();
        let bob = Record::new()
            .with("full_name", "Bob")
            .with("email", "bob@x.com")
            .with("skills", json!(["java"]));
        db.create(Candidate::TABLE, &bob).await.unwrap();

        let python = Record::new().with("skills", "python");
        let rows = db.find_many(Candidate::TABLE, &python, None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("full_name"), Some("Alice"));

        let exact = Record::new().with("skills", json!(["java"]));
        let rows = db.find_many(Candidate::TABLE, &exact, None, None).await.unwrap();
        assert_eq!(rows[0].get_str("full_name"), Some("Bob"));
    }

    #[tokio::test]
    async fn offset_applies_before_limit() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        for i in 0..5 {
            let data = Record::new()
                .with("full_name", format!("C{}", i))
                .with("email", format!("c{}@x.com", i));
            db.create(Candidate::TABLE, &data).await.unwrap();
        }
        let all = db.find_many(Candidate::TABLE, &Record::new(), None, None).await.unwrap();
        let page = db.find_many(Candidate::TABLE, &Record::new(), Some(2), Some(3)).await.unwrap();
        assert_eq!(page, all[3..5].to_vec());
    }

    #[tokio::test]
    async fn create_requires_non_generated_fields() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);

        let missing_name = Record::new().with("email", "a@x.com");
        assert_eq!(
            db.create(Candidate::TABLE, &missing_name).await,
            Err(AccessError::Validation("full_name is required".into()))
        );
        let bad_status = Record::new()
            .with("candidate_id", uuid::Uuid::new_v4().to_string())
            .with("job_title", "Engineer")
            .with("status", "NOT_A_STATUS");
        assert!(matches!(
            db.create(Application::TABLE, &bad_status).await,
            Err(AccessError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        db.create(Candidate::TABLE, &alice()).await.unwrap();
        assert!(matches!(
            db.create(Candidate::TABLE, &alice()).await,
            Err(AccessError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn application_needs_existing_candidate() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        let data = Record::new()
            .with("candidate_id", uuid::Uuid::new_v4().to_string())
            .with("job_title", "Engineer");
        assert!(matches!(
            db.create(Application::TABLE, &data).await,
            Err(AccessError::Constraint(_))
        ));

        let candidate = db.create(Candidate::TABLE, &alice()).await.unwrap();
        let data = Record::new()
            .with("candidate_id", candidate.get("id").cloned().unwrap())
            .with("job_title", "Engineer");
        let application = db.create(Application::TABLE, &data).await.unwrap();
        assert_eq!(application.get_str("status"), Some("APPLIED"));
    }

    #[tokio::test]
    async fn update_overwrites_named_fields_only_and_is_idempotent() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        let created = db.create(Candidate::TABLE, &alice()).await.unwrap();
        let id = Record::new().with("id", created.get("id").cloned().unwrap());
        let changes = Record::new().with("phone", "555-0100").with("unknown", 1);

        let first = db.update(Candidate::TABLE, &id, &changes).await.unwrap();
        assert_eq!(first.get_str("phone"), Some("555-0100"));
        assert_eq!(first.get("full_name"), created.get("full_name"));
        assert_eq!(first.get("created_at"), created.get("created_at"));
        assert!(first.get("unknown").is_none());

        let second = db.update(Candidate::TABLE, &id, &changes).await.unwrap();
        let mut a = first.clone();
        let mut b = second.clone();
        a.remove("updated_at");
        b.remove("updated_at");
        assert_eq!(a, b);
        assert!(second.get_str("updated_at") >= first.get_str("updated_at"));
    }

    #[tokio::test]
    async fn update_skips_immutable_fields() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        let created = db.create(Candidate::TABLE, &alice()).await.unwrap();
        let id = Record::new().with("id", created.get("id").cloned().unwrap());
        let changes = Record::new()
            .with("created_at", "2000-01-01T00:00:00Z")
            .with("full_name", "Alicia");

        let updated = db.update(Candidate::TABLE, &id, &changes).await.unwrap();
        assert_eq!(updated.get_str("full_name"), Some("Alicia"));
        assert_eq!(updated.get("created_at"), created.get("created_at"));
    }

    #[tokio::test]
    async fn update_without_match_is_not_found() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let mut db = Accessor::new(&registry, &mut uow);
        let id = Record::new().with("id", uuid::Uuid::new_v4().to_string());
        let changes = Record::new().with("status", "HIRED");
        assert!(matches!(
            db.update(Application::TABLE, &id, &changes).await,
            Err(AccessError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn committed_create_is_visible_to_later_units_of_work() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        let created = Accessor::new(&registry, &mut uow)
            .create(Candidate::TABLE, &alice())
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = begin(&store).await;
        let id = Record::new().with("id", created.get("id").cloned().unwrap());
        let fetched = Accessor::new(&registry, &mut uow)
            .find_one(Candidate::TABLE, &id)
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn rolled_back_create_is_not_visible() {
        let registry = models::registry().unwrap();
        let store = MemoryStore::new();
        let mut uow = begin(&store).await;
        Accessor::new(&registry, &mut uow)
            .create(Candidate::TABLE, &alice())
            .await
            .unwrap();
        uow.rollback();

        let mut uow = begin(&store).await;
        let rows = Accessor::new(&registry, &mut uow)
            .find_many(Candidate::TABLE, &Record::new(), None, None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_yield_one_conflict() {
        let registry = std::sync::Arc::new(models::registry().unwrap());
        let store = MemoryStore::new();
        let user = |hash: &str| {
            Record::new()
                .with("email", "a@x.com")
                .with("hashed_password", hash.to_string())
        };

        let mut tasks = Vec::new();
        for hash in ["h1", "h2"] {
            let registry = registry.clone();
            let store = store.clone();
            let data = user(hash);
            tasks.push(tokio::spawn(async move {
                let mut uow = UnitOfWork::begin(&store).await?;
                Accessor::new(&registry, &mut uow).create(User::TABLE, &data).await?;
                uow.commit().await?;
                Ok::<_, AccessError>(())
            }));
        }
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, Err(AccessError::Conflict(_))))
                .count(),
            1
        );
        assert_eq!(store.committed_rows(User::TABLE).unwrap().len(), 1);
        assert!(store.ping().await.is_ok());
    }
}
