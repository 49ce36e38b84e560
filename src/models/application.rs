use crate::error::AppError;
use crate::registry::{Entity, FieldDef, FieldKind, Generated, RecordType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Applied,
    Interviewing,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const VALUES: &'static [&'static str] = &["APPLIED", "INTERVIEWING", "REJECTED", "HIRED"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Interviewing => "INTERVIEWING",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Hired => "HIRED",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPLIED" => Ok(ApplicationStatus::Applied),
            "INTERVIEWING" => Ok(ApplicationStatus::Interviewing),
            "REJECTED" => Ok(ApplicationStatus::Rejected),
            "HIRED" => Ok(ApplicationStatus::Hired),
            _ => Err(AppError::Validation(format!("Invalid application status: {}", s))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_title: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl Entity for Application {
    const TABLE: &'static str = "applications";

    fn record_type() -> RecordType {
        RecordType::new(
            Self::TABLE,
            "id",
            vec![
                FieldDef::new("id", FieldKind::Uuid).generated(Generated::Uuid),
                FieldDef::new("candidate_id", FieldKind::Uuid).references("candidates", "id"),
                FieldDef::new("job_title", FieldKind::Text),
                FieldDef::new(
                    "status",
                    FieldKind::Enum {
                        type_name: "application_status",
                        values: ApplicationStatus::VALUES,
                    },
                )
                .generated(Generated::Literal(Value::String(ApplicationStatus::Applied.as_str().into()))),
                FieldDef::new("applied_at", FieldKind::Timestamp)
                    .generated(Generated::Now)
                    .immutable(),
            ],
        )
    }
}
