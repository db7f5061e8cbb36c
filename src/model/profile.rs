use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::role::Role;

/// Offset added to the numeric user id when deriving the employee id.
pub const EMPLOYEE_ID_OFFSET: u64 = 1000;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "EMP_1001")]
    pub employee_id: String,
    pub id_number: String,
    pub phone_number: String,
    pub gender: Gender,
    pub department: Option<String>,
    pub role: Role,
    pub profile_photo: Option<String>,
}

pub fn employee_code(user_id: u64) -> String {
    format!("EMP_{}", user_id + EMPLOYEE_ID_OFFSET)
}

/// Department stored for a role; executives never keep one.
pub fn department_for(role: Role, department: Option<String>) -> Option<String> {
    if !role.has_department() {
        return None;
    }
    department
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_code_is_offset_from_user_id() {
        assert_eq!(employee_code(1), "EMP_1001");
        assert_eq!(employee_code(42), "EMP_1042");
    }

    #[test]
    fn executives_lose_their_department() {
        assert_eq!(department_for(Role::Coo, Some("Finance".into())), None);
        assert_eq!(
            department_for(Role::Staff, Some(" Finance ".into())),
            Some("Finance".to_string())
        );
        assert_eq!(department_for(Role::LineManager, Some("  ".into())), None);
    }
}
