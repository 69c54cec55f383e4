//! Group routes: atomic group creation with membership normalization.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::groups;
use crate::identity;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CreateGroupResponse {
    group_id: String,
}

/// POST /groups - create a group; the caller always joins as admin
async fn create_group(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateGroupRequest>,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    let caller = identity::resolve_user(&state, &headers).await?;
    let group_id = groups::create_group(
        &state.store,
        &caller,
        &request.name,
        &request.description,
        &request.members,
    )?;
    Ok(Json(CreateGroupResponse { group_id }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/groups", post(create_group))
        .with_state(state)
}
