//! Identity resolution: map the request's credential to a stored user.
//!
//! Every protected handler calls [`resolve_user`] first and treats its
//! failure as fatal for the request. The separate upsert path
//! ([`sync_user`]) is the only place a user row is created or patched.

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::models::user::User;
use crate::AppState;

/// Resolve the calling user. Fails with `NotAuthenticated` when no valid
/// credential is present, `UserNotFound` when the credential is valid
/// but no matching user row exists (a new user must call the sync path
/// first). No side effects.
pub async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let identity = state
        .jwks_client
        .authenticate(headers)
        .await
        .map_err(|e| {
            tracing::debug!("Authentication failed: {}", e);
            ApiError::NotAuthenticated
        })?;

    state
        .store
        .user_by_token(&identity.token_identifier)?
        .ok_or(ApiError::UserNotFound)
}

/// Upsert the calling user from their verified identity: create on first
/// sight, patch the display name on mismatch, otherwise no-op.
/// Idempotent.
pub async fn sync_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let identity = state
        .jwks_client
        .authenticate(headers)
        .await
        .map_err(|e| {
            tracing::debug!("Authentication failed: {}", e);
            ApiError::NotAuthenticated
        })?;

    // An absent name claim is not a name change; the store defaults the
    // name only when it creates the row.
    let user = state.store.upsert_user(
        &identity.token_identifier,
        identity.name.as_deref(),
        identity.email.as_deref().unwrap_or(""),
        identity.picture.as_deref(),
    )?;
    Ok(user)
}
