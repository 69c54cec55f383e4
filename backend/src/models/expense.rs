use chrono::{DateTime, Utc};
use serde::Serialize;

/// One participant's share of an expense. Embedded in [`Expense`], not
/// independently addressable.
#[derive(Debug, Clone, Serialize)]
pub struct Split {
    pub user_id: String,
    pub amount: f64,
}

/// A shared cost record. Read-only to this service; expenses are written
/// by the expense-creation flow (or test fixtures).
#[derive(Debug, Clone, Serialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    /// The single payer. Every expense has exactly one.
    pub paid_by_user_id: String,
    /// None for personal (group-less) expenses.
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Ordered, at least one entry.
    pub splits: Vec<Split>,
}

impl Expense {
    /// Whether the given user appears in the split list.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.splits.iter().any(|s| s.user_id == user_id)
    }
}
