use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            LoginRequest, ProfileResponse, PublicUser, SessionResponse, SignupRequest,
            SignupResponse, UpdateProfileRequest, UpdateProfileResponse,
        },
        extractors::AuthUser,
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/sessions", post(login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/sessions/:id", get(get_profile).patch(update_profile))
}

/// Turns axum's body rejection into our 400 JSON shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::Validation(e.body_text())
    })
}

/// An id that is not a UUID cannot name an account.
fn account_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|e| {
        warn!(error = %e, "rejected account id");
        ApiError::NotFound("User not found")
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let req = body(payload)?;
    let user = services::signup(state.store.as_ref(), &req.username, &req.email, req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            id: user.id,
            username: user.username,
            email: user.email,
            access_token: user.access_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let req = body(payload)?;
    let user = services::login(state.store.as_ref(), &req.username, req.password).await?;

    Ok(Json(SessionResponse {
        success: true,
        user: PublicUser::from(&user),
        access_token: user.access_token,
    }))
}

#[instrument(skip(user, path), fields(user_id = %user.id))]
pub async fn get_profile(
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let id = account_id(path)?;
    services::ensure_owner(&user, id)?;

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            success: true,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, user, path, payload), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    let id = account_id(path)?;
    let req = body(payload)?;
    let updated = services::update_profile(state.store.as_ref(), &user, id, req.into()).await?;

    Ok(Json(UpdateProfileResponse {
        success: true,
        update_user: PublicUser::from(&updated),
    }))
}
