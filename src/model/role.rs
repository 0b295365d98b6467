use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Kind of registered person. Stored as its variant name.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum Role {
    Student,
    Teacher,
    Guest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn stored_names_parse_back() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(role.as_ref()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(Role::from_str("Admin").is_err());
        assert!(Role::from_str("student").is_err());
        assert!(Role::from_str("").is_err());
    }
}
