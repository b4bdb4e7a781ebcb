//! Error types for the maintenance manager
//!
//! Every variant carries enough detail (offending id, conflicting windows) for
//! the web layer to build a precise message and pick a status code.

use axum::http::StatusCode;
use thiserror::Error;

use crate::window::MaintenanceWindow;

/// Main error type for maintenance window operations
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// Malformed or missing fields, bad time bounds, empty device set,
    /// attempts to set server-owned fields
    #[error("{0}")]
    Validation(String),

    /// The candidate window conflicts with one or more existing windows
    #[error("Maintenance Window {window} interferes with the following windows: [{}]", format_windows(.conflicts))]
    Overlap {
        window: Box<MaintenanceWindow>,
        conflicts: Vec<MaintenanceWindow>,
    },

    /// Unique constraint violation on insert
    #[error("Window with id: {0} already exists")]
    DuplicateId(String),

    /// Operation on an unknown window id
    #[error("Maintenance with id {0} not found")]
    NotFound(String),

    /// Lifecycle transition that is not legal from the current status
    #[error("Invalid transition for maintenance '{id}': {reason}")]
    InvalidTransition { id: String, reason: String },

    /// Storage failure (non-transient, or transient with retries exhausted)
    #[error("Storage error: {0}")]
    Store(String),

    /// Timer facility failure
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

pub type Result<T> = std::result::Result<T, MaintenanceError>;

impl MaintenanceError {
    pub fn invalid_transition(id: impl Into<String>, reason: impl Into<String>) -> Self {
        MaintenanceError::InvalidTransition {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn overlap(window: MaintenanceWindow, conflicts: Vec<MaintenanceWindow>) -> Self {
        MaintenanceError::Overlap {
            window: Box::new(window),
            conflicts,
        }
    }

    /// HTTP status used by the REST layer for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            MaintenanceError::Validation(_)
            | MaintenanceError::Overlap { .. }
            | MaintenanceError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            MaintenanceError::NotFound(_) => StatusCode::NOT_FOUND,
            MaintenanceError::DuplicateId(_) => StatusCode::CONFLICT,
            MaintenanceError::Store(_) | MaintenanceError::Scheduler(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn format_windows(windows: &[MaintenanceWindow]) -> String {
    windows
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<sqlx::Error> for MaintenanceError {
    fn from(err: sqlx::Error) -> Self {
        MaintenanceError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for MaintenanceError {
    fn from(err: serde_json::Error) -> Self {
        MaintenanceError::Store(format!("Serialization error: {}", err))
    }
}

impl From<tokio_cron_scheduler::JobSchedulerError> for MaintenanceError {
    fn from(err: tokio_cron_scheduler::JobSchedulerError) -> Self {
        MaintenanceError::Scheduler(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            MaintenanceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MaintenanceError::invalid_transition("mw", "running").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MaintenanceError::NotFound("mw".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MaintenanceError::DuplicateId("mw".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MaintenanceError::Store("locked".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_message() {
        let err = MaintenanceError::DuplicateId("1234".into());
        assert_eq!(err.to_string(), "Window with id: 1234 already exists");
    }
}
