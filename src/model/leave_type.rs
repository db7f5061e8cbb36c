use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::profile::Gender;

/// Which staff a leave type is offered to.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum LeaveGender {
    Male,
    Female,
    #[default]
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Annual",
    "default_days": 21,
    "gender": "All",
    "description": null,
    "is_active": true,
    "created_at": "2026-01-01T00:00:00Z",
    "updated_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveType {
    pub id: u64,
    pub name: String,
    pub default_days: i32,
    pub gender: LeaveGender,
    pub description: Option<String>,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl LeaveType {
    /// Whether staff of `gender` may hold and request this leave type.
    ///
    /// Besides the explicit gender restriction, maternity leave is never
    /// offered to men and paternity leave never to women, even when the
    /// catalog entry was left open to all.
    pub fn applies_to(&self, gender: Gender) -> bool {
        let by_gender = match self.gender {
            LeaveGender::All => true,
            LeaveGender::Male => gender == Gender::Male,
            LeaveGender::Female => gender == Gender::Female,
        };
        let by_name = match gender {
            Gender::Male => !self.name.eq_ignore_ascii_case("maternity"),
            Gender::Female => !self.name.eq_ignore_ascii_case("paternity"),
        };
        by_gender && by_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave_type(name: &str, gender: LeaveGender) -> LeaveType {
        LeaveType {
            id: 1,
            name: name.to_string(),
            default_days: 10,
            gender,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gender_restriction() {
        let maternity = leave_type("Maternity", LeaveGender::Female);
        assert!(maternity.applies_to(Gender::Female));
        assert!(!maternity.applies_to(Gender::Male));

        let annual = leave_type("Annual", LeaveGender::All);
        assert!(annual.applies_to(Gender::Male));
        assert!(annual.applies_to(Gender::Female));
    }

    #[test]
    fn name_exclusion_applies_to_open_types() {
        let paternity = leave_type("paternity", LeaveGender::All);
        assert!(paternity.applies_to(Gender::Male));
        assert!(!paternity.applies_to(Gender::Female));

        let maternity = leave_type("MATERNITY", LeaveGender::All);
        assert!(!maternity.applies_to(Gender::Male));
    }
}
