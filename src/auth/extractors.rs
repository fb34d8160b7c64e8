use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::token::parse_authorization;
use crate::{error::ApiError, state::AppState, store::UserAccount};

/// Resolves the `Authorization` header to an account. Any handler taking this
/// extractor is only reached with a valid token; otherwise the request is
/// answered with 401.
pub struct AuthUser(pub UserAccount);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_authorization)
            .ok_or(ApiError::Unauthorized("Missing access token"))?;

        match state.store.find_by_access_token(token).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                warn!("unknown access token");
                Err(ApiError::Unauthorized("Invalid access token"))
            }
        }
    }
}
