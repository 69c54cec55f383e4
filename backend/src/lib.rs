pub mod auth;
pub mod config;
pub mod contacts;
pub mod error;
pub mod groups;
pub mod identity;
pub mod logging;
pub mod models;
pub mod routes;
pub mod search;
pub mod store;
pub mod test_util;

pub use auth::{AuthUser, JwksClient};
pub use config::Config;
pub use error::ApiError;
pub use models::contact::{Contact, ContactsResponse};
pub use models::group::{Group, Membership, Role};
pub use models::user::User;
pub use search::CandidateUser;
pub use store::SqliteStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub jwks_client: JwksClient,
    pub store: SqliteStore,
}
