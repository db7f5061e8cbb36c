use crate::api::dashboard::{AdminDashboard, Dashboard};
use crate::api::employee::{SetAllowance, UpdateEmployment};
use crate::api::leave_request::{
    AttachmentRef, CreateLeave, LeaveDetail, LeaveFilter, LeaveListResponse, RejectLeave,
};
use crate::api::leave_type::{CreateLeaveType, UpdateLeaveType};
use crate::api::notification::NotificationList;
use crate::api::profile::UpdateProfile;
use crate::model::{
    balance::LeaveBalance,
    leave_request::{ApprovalLevel, LeaveAttachment, LeaveRecord, LeaveRequest, LeaveStatus},
    leave_type::{LeaveGender, LeaveType},
    notification::Notification,
    profile::{Gender, Profile},
    role::Role,
    user::{Account, User},
};
use crate::models::{LoginReqDto, PasswordResetConfirm, PasswordResetReq, RegisterReq, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Desk API",
        version = "1.0.0",
        description = r#"
## Leave Management

Staff apply for leave against per-type allowances. Requests climb an
approval chain (Line Manager, then COO, then CEO) and the allowance is
debited once, when the CEO signs off.

### Security
Endpoints under the API prefix require a **JWT Bearer** access token from
`/auth/login`. Refresh tokens rotate through `/auth/refresh`.

### Response Format
JSON bodies; errors are `{"error": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::password_reset_request,
        crate::auth::handlers::password_reset_confirm,

        crate::api::dashboard::dashboard,
        crate::api::dashboard::admin_dashboard,

        crate::api::leave_request::apply_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::leave_balances,
        crate::api::leave_request::leave_records,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approval_queue,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::update_leave_type,

        crate::api::employee::list_employees,
        crate::api::employee::update_employment,
        crate::api::employee::delete_account,
        crate::api::employee::fix_allowances,
        crate::api::employee::set_allowance,

        crate::api::profile::get_profile,
        crate::api::profile::update_profile,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            PasswordResetReq,
            PasswordResetConfirm,
            Dashboard,
            AdminDashboard,
            AttachmentRef,
            CreateLeave,
            RejectLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveDetail,
            CreateLeaveType,
            UpdateLeaveType,
            UpdateEmployment,
            SetAllowance,
            UpdateProfile,
            NotificationList,
            Account,
            User,
            Profile,
            Gender,
            Role,
            LeaveType,
            LeaveGender,
            LeaveRequest,
            LeaveRecord,
            LeaveAttachment,
            LeaveStatus,
            ApprovalLevel,
            LeaveBalance,
            Notification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Dashboard", description = "Personal and admin overviews"),
        (name = "Leave", description = "Leave requests and the approval chain"),
        (name = "Leave Types", description = "Leave catalog"),
        (name = "Employee", description = "Directory and allowance administration"),
        (name = "Profile", description = "Own profile"),
        (name = "Notifications", description = "In-app notifications"),
    )
)]
pub struct ApiDoc;
