use crate::registry::{Entity, FieldDef, FieldKind, Generated, RecordType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub skills: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Candidate {
    const TABLE: &'static str = "candidates";

    fn record_type() -> RecordType {
        RecordType::new(
            Self::TABLE,
            "id",
            vec![
                FieldDef::new("id", FieldKind::Uuid).generated(Generated::Uuid),
                FieldDef::new("full_name", FieldKind::Text),
                FieldDef::new("email", FieldKind::Email).unique(),
                FieldDef::new("phone", FieldKind::Text).nullable(),
                FieldDef::new("skills", FieldKind::JsonArray).nullable(),
                FieldDef::new("created_at", FieldKind::Timestamp)
                    .generated(Generated::Now)
                    .immutable(),
                FieldDef::new("updated_at", FieldKind::Timestamp)
                    .generated(Generated::Now)
                    .refreshed_on_update(),
            ],
        )
    }
}
