use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Something went wrong. Please contact the system admin.")]
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::not_found("Record not found."),
            StoreError::Stale => ApiError::Conflict(e.to_string()),
            StoreError::Conflict(field) => ApiError::Validation(format!("This {field} is already registered.")),
            StoreError::Corrupt(_) | StoreError::Database(_) => {
                error!(error = %e, "Store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::DepartmentRequired
            | WorkflowError::InvalidDateRange
            | WorkflowError::LeaveTypeRequired
            | WorkflowError::UnknownLeaveType(_)
            | WorkflowError::LeaveTypeUnavailable(_)
            | WorkflowError::InsufficientBalance { .. } => ApiError::Validation(e.to_string()),
            WorkflowError::NotAnApprover(_) => ApiError::Forbidden(e.to_string()),
            WorkflowError::LevelMismatch { .. } | WorkflowError::Finalized(_) | WorkflowError::Stale => {
                ApiError::Conflict(e.to_string())
            }
            WorkflowError::NotFound => ApiError::NotFound(e.to_string()),
            WorkflowError::Store(inner) => inner.into(),
        }
    }
}
