use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a member within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Parse a stored role string. Unknown values map to Member rather
    /// than failing the read.
    pub fn from_str_or_member(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }
}

/// Binding of a user to a group. Embedded in [`Group`].
#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub user_id: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// A named collection of members sharing expenses.
///
/// Invariant: contains at least its creator with role admin, and member
/// user ids are unique within the group. Groups are created atomically
/// and never mutated by this service.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Ordered membership list.
    pub members: Vec<Membership>,
}

impl Group {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }
}
