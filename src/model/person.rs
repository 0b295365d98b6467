use crate::{errors::AppError, model::role::Role, utils::clock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "identity_token": "6f1c2a4e-8d0b-4c6e-9f3a-2b7d5e1c0a94",
        "name": "Juan Dela Cruz",
        "role": "Teacher",
        "id_number": "2021-00001",
        "department": "Computer Science",
        "contact_number": "+639171234567",
        "registered_at": "2026-01-05T08:00:00Z"
    })
)]
pub struct Person {
    /// Opaque token embedded in the person's QR code.
    pub identity_token: String,
    pub name: String,
    pub role: Role,
    pub id_number: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub registered_at: DateTime<Utc>,
}

/// Registration data. `role` is kept as text so unknown roles surface as
/// `InvalidInput` instead of a deserialization failure.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPerson {
    #[schema(example = "Maria Santos")]
    pub name: String,
    #[schema(example = "Student")]
    pub role: String,
    #[schema(example = "2021-00042", nullable = true)]
    pub id_number: Option<String>,
    #[schema(example = "Computer Science", nullable = true)]
    pub department: Option<String>,
    #[schema(example = "+639171234567", nullable = true)]
    pub contact_number: Option<String>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role: role.to_string(),
            id_number: None,
            department: None,
            contact_number: None,
        }
    }
}

/// Registration data after validation.
#[derive(Debug, Clone)]
pub struct ValidPerson {
    pub name: String,
    pub role: Role,
    pub id_number: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
}

impl TryFrom<NewPerson> for ValidPerson {
    type Error = AppError;

    fn try_from(input: NewPerson) -> Result<Self, Self::Error> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid("name must not be empty"));
        }

        let role = Role::from_str(input.role.trim())
            .map_err(|_| AppError::invalid(format!("unrecognized role: {:?}", input.role)))?;

        Ok(Self {
            name: name.to_string(),
            role,
            id_number: non_blank(input.id_number),
            department: non_blank(input.department),
            contact_number: non_blank(input.contact_number),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, sqlx::FromRow)]
pub struct PersonRow {
    pub identity_token: String,
    pub name: String,
    pub role: String,
    pub id_number: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    pub registered_at: i64,
}

impl TryFrom<PersonRow> for Person {
    type Error = AppError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|e| AppError::StorageUnavailable(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Self {
            identity_token: row.identity_token,
            name: row.name,
            role,
            id_number: row.id_number,
            department: row.department,
            contact_number: row.contact_number,
            registered_at: clock::from_unix(row.registered_at)?,
        })
    }
}
