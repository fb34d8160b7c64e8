use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failures surfaced at the HTTP boundary. Store and internal detail is logged
/// here and never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("already taken: {}", .fields.join(", "))]
    DuplicateKey { fields: Vec<&'static str> },

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("service unavailable")]
    StoreUnavailable,

    #[error("{0}")]
    Validation(String),

    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { fields } => Self::DuplicateKey { fields },
            StoreError::NotFound => Self::NotFound("User not found"),
            StoreError::Unavailable => Self::StoreUnavailable,
            other => Self::Store(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateKey { .. } | Self::Validation(_) | Self::Store(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::DuplicateKey { fields } => json!({
                "success": false,
                "message": format!("Could not create user: {} already exists", fields.join(" and ")),
                "fields": fields,
            }),
            Self::NotFound(msg) => json!({ "success": false, "message": msg }),
            Self::Unauthorized(msg) => json!({
                "success": false,
                "loggedOut": true,
                "message": msg,
            }),
            Self::StoreUnavailable => json!({ "success": false, "message": "Service unavailable" }),
            Self::Validation(msg) => json!({ "success": false, "message": msg }),
            Self::Store(e) => {
                error!(error = %e, "store operation failed");
                json!({ "success": false, "message": "Could not complete request" })
            }
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                json!({ "success": false, "message": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_api_taxonomy() {
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unavailable),
            ApiError::StoreUnavailable
        ));
        assert!(matches!(
            ApiError::from(StoreError::Database(sqlx::Error::RowNotFound)),
            ApiError::Store(_)
        ));
    }

    #[test]
    fn unauthorized_and_not_found_differ_at_the_boundary() {
        assert_eq!(ApiError::Unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failure_is_a_client_error() {
        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolClosed));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::DuplicateKey { fields: vec!["email"] }.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
