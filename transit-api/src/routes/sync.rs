//! Auth0 user sync endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use crate::auth0::{Auth0User, ACTION_HEADER};
use crate::crypto::tokens_match;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{TransitStore, UpsertOutcome, UserId, UserStore};

#[derive(Serialize)]
pub struct SyncUserResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user_id: UserId,
}

/// Check `Authorization: Bearer <token>` against the configured token
fn authorize(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .ok_or(ApiError::Unauthorized)?;

    if tokens_match(presented, expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// POST /api/auth0/sync-user
/// Mirror an Auth0 user into local storage
pub async fn sync_user<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SyncUserResponse>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    authorize(&headers, &state.api_token)?;

    let action = headers
        .get(ACTION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingActionHeader)?;

    // Parsed only after the caller is authenticated
    let user: Auth0User = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    user.validate()?;

    let outcome = state.user_store.upsert_synced(&user.to_profile())?;
    let message = match outcome {
        UpsertOutcome::Created(_) => "User created",
        UpsertOutcome::Updated(_) => "User updated",
    };

    tracing::info!(
        auth0_id = %user.user_id,
        user_id = outcome.user_id().0,
        action,
        "{}",
        message
    );

    Ok(Json(SyncUserResponse {
        status: "success",
        message,
        user_id: outcome.user_id(),
    }))
}

/// OPTIONS /api/auth0/sync-user
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
