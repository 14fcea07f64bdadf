mod features;
mod groups;
mod users;

pub use features::*;
pub use groups::*;
pub use users::*;

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::db::Database;
use crate::error::{ErrorKind, ToggleError};

// ============================================================
// Error Handling
// ============================================================

/// Translate an engine error into a response.
///
/// Caller-facing errors are returned with their message. Storage errors are
/// logged server-side and answered with a generic message so internal details
/// don't leak.
fn error_response(e: ToggleError) -> (StatusCode, String) {
    let status = match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::CycleDetected | ErrorKind::InvalidOperation => {
            StatusCode::CONFLICT
        }
        ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Invalid => StatusCode::BAD_REQUEST,
        ErrorKind::Storage => {
            tracing::error!("Internal error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    tracing::warn!("Request rejected: {}", e);
    (status, e.to_string())
}

/// Resolve the user id to act as, registering authenticated callers on first contact.
fn resolve_caller(db: &Database, user_id: Option<String>) -> Result<Option<String>, ToggleError> {
    match user_id {
        Some(id) => Ok(Some(db.get_or_create_user(&id)?.id)),
        None => Ok(None),
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
