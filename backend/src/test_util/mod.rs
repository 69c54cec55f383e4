//! Shared fixtures for unit and integration tests.

pub mod fixtures {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::expense::{Expense, Split};
    use crate::models::user::User;
    use crate::store::SqliteStore;

    /// Build a user value without touching a store.
    pub fn user(id: &str, name: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            image_url: None,
            token_identifier: format!("test|{id}"),
            created_at: Utc::now(),
        }
    }

    /// Insert a user through the normal upsert path and return it.
    pub fn seed_user(store: &SqliteStore, name: &str, email: &str) -> User {
        store
            .upsert_user(&format!("test|{email}"), Some(name), email, None)
            .unwrap_or_else(|e| panic!("failed to seed user {name}: {e}"))
    }

    /// Personal (group-less) expense split evenly across participants.
    pub fn personal_expense(paid_by: &str, participants: &[&str]) -> Expense {
        let share = 10.0;
        Expense {
            id: Uuid::new_v4().to_string(),
            description: "test expense".to_string(),
            amount: share * participants.len() as f64,
            paid_by_user_id: paid_by.to_string(),
            group_id: None,
            created_at: Utc::now(),
            splits: participants
                .iter()
                .map(|user_id| Split {
                    user_id: user_id.to_string(),
                    amount: share,
                })
                .collect(),
        }
    }
}
