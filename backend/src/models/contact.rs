use serde::Serialize;

/// Derived projection of a counterparty person or a group the caller
/// belongs to. Computed fresh on every query, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Contact {
    User {
        id: String,
        name: String,
        email: String,
        image_url: Option<String>,
    },
    Group {
        id: String,
        name: String,
        description: String,
        member_count: usize,
    },
}

impl Contact {
    /// Display name, used for sorting the contact lists.
    pub fn name(&self) -> &str {
        match self {
            Contact::User { name, .. } => name,
            Contact::Group { name, .. } => name,
        }
    }
}

/// Response for the contacts endpoint: distinct counterparties and the
/// caller's groups, each sorted by name.
#[derive(Debug, Clone, Serialize)]
pub struct ContactsResponse {
    pub users: Vec<Contact>,
    pub groups: Vec<Contact>,
}
