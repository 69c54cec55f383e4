//! User routes: current-user lookup, identity sync and search.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::identity;
use crate::models::user::User;
use crate::search::{self, CandidateUser};
use crate::AppState;

/// GET /users/me - the caller's user record
async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = identity::resolve_user(&state, &headers).await?;
    Ok(Json(user))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    user_id: String,
}

/// POST /users/sync - upsert the caller from their verified identity
async fn sync(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, ApiError> {
    let user = identity::sync_user(&state, &headers).await?;
    Ok(Json(SyncResponse { user_id: user.id }))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// GET /users/search?q=... - candidate users matching by name or email
async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CandidateUser>>, ApiError> {
    let caller = identity::resolve_user(&state, &headers).await?;
    let candidates = search::search_users(&state.store, &caller, &params.q)?;
    Ok(Json(candidates))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users/me", get(me))
        .route("/users/sync", post(sync))
        .route("/users/search", get(search))
        .with_state(state)
}
