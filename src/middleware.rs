use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Answers 503 without touching the handler while the store is disconnected.
pub async fn require_store(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.store.is_connected() {
        next.run(req).await
    } else {
        warn!(uri = %req.uri(), "credential store not connected");
        ApiError::StoreUnavailable.into_response()
    }
}
