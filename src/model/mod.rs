pub mod balance;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
pub mod profile;
pub mod role;
pub mod token;
pub mod user;
