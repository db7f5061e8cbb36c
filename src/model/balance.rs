use serde::Serialize;
use utoipa::ToSchema;

/// One user's allowance and usage for one leave type.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveBalance {
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub allowed_days: i32,
    pub days_taken: i32,
    pub remaining_days: i64,
}

impl LeaveBalance {
    pub fn new(
        leave_type_id: u64,
        leave_type_name: String,
        allowed_days: i32,
        days_taken: i32,
    ) -> Self {
        Self {
            leave_type_id,
            leave_type_name,
            allowed_days,
            days_taken,
            remaining_days: i64::from(allowed_days) - i64::from(days_taken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_can_go_negative() {
        assert_eq!(LeaveBalance::new(1, "Annual".into(), 21, 5).remaining_days, 16);
        assert_eq!(LeaveBalance::new(1, "Annual".into(), 21, 25).remaining_days, -4);
    }
}
