//! Contacts route: derived counterparties and groups for the caller.

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::{extract::State, routing::get, Json, Router};

use crate::contacts;
use crate::error::ApiError;
use crate::identity;
use crate::models::contact::ContactsResponse;
use crate::AppState;

/// GET /contacts - distinct counterparties and the caller's groups
async fn get_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ContactsResponse>, ApiError> {
    let caller = identity::resolve_user(&state, &headers).await?;
    let response = contacts::contacts_and_groups(&state.store, &caller)?;
    Ok(Json(response))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/contacts", get(get_contacts))
        .with_state(state)
}
