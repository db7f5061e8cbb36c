use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum Role {
    #[default]
    Staff,
    #[serde(rename = "Line Manager")]
    #[strum(serialize = "Line Manager")]
    LineManager,
    #[serde(rename = "COO")]
    #[strum(serialize = "COO")]
    Coo,
    #[serde(rename = "CEO")]
    #[strum(serialize = "CEO")]
    Ceo,
    Admin,
}

impl Role {
    /// Roles that can approve or reject leave requests.
    pub fn is_approver(self) -> bool {
        matches!(self, Role::LineManager | Role::Coo | Role::Ceo)
    }

    /// Roles allowed into the admin dashboard and employee listing.
    pub fn is_executive(self) -> bool {
        matches!(self, Role::Admin | Role::Ceo | Role::Coo)
    }

    /// COO, CEO and Admin sit above departments.
    pub fn has_department(self) -> bool {
        matches!(self, Role::Staff | Role::LineManager)
    }
}
