use chrono::{DateTime, Utc};
use serde::Serialize;

/// User record created on first authenticated contact.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Internal user ID (UUID v4)
    pub id: String,
    /// Display name from the OIDC provider
    pub name: String,
    /// Email from the OIDC provider
    pub email: String,
    /// Avatar URL, if the provider supplied one
    pub image_url: Option<String>,
    /// External identity token, unique per user. Not exposed over HTTP.
    #[serde(skip_serializing)]
    pub token_identifier: String,
    /// When the user first authenticated
    pub created_at: DateTime<Utc>,
}
