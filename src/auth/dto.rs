use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{ProfileUpdate, UserAccount};

/// Request body for signup. Not `Debug`: it carries the plaintext password.
#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Request body for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Partial profile for `PATCH /sessions/:id`. Anything outside the profile
/// fields, credentials included, fails deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(r: UpdateProfileRequest) -> Self {
        Self {
            full_name: r.full_name,
            age: r.age,
            location: r.location,
            description: r.description,
        }
    }
}

/// Public part of an account. Never includes the password hash or token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<&UserAccount> for PublicUser {
    fn from(u: &UserAccount) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            age: u.age,
            location: u.location.clone(),
            description: u.description.clone(),
        }
    }
}

/// Returned by `POST /signup`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub access_token: String,
}

/// Returned by `POST /sessions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub user: PublicUser,
    pub access_token: String,
}

/// Returned by `GET /sessions/:id`.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(flatten)]
    pub user: PublicUser,
}

/// Returned by `PATCH /sessions/:id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub update_user: PublicUser,
}
