use crate::registry::{Entity, FieldDef, FieldKind, Generated, RecordType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Account record. `hashed_password` is never serialized into responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn record_type() -> RecordType {
        RecordType::new(
            Self::TABLE,
            "id",
            vec![
                FieldDef::new("id", FieldKind::Uuid).generated(Generated::Uuid),
                FieldDef::new("email", FieldKind::Email).unique(),
                FieldDef::new("hashed_password", FieldKind::Text),
                FieldDef::new("is_active", FieldKind::Bool).generated(Generated::Literal(Value::Bool(true))),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_is_not_serialized() {
        let user = User {
            id: Uuid::nil(),
            email: "a@x.com".into(),
            hashed_password: "$2b$04$secret".into(),
            is_active: true,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["is_active"], true);
    }
}
