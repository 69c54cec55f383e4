//! User search: two independent index lookups (name, email) merged into
//! one deduplicated, self-excluding candidate list.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::user::User;
use crate::store::{SqliteStore, StoreError};

/// Candidate returned by user search.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
}

/// Minimum query length before any index lookup is performed. Shorter
/// queries return an empty list; this is a cost guard, not an error.
const MIN_QUERY_LEN: usize = 2;

/// Search users by display name and email, merging both result sets.
/// Name matches come first, then email matches not already seen; the
/// caller is excluded from the result.
pub fn search_users(
    store: &SqliteStore,
    caller: &User,
    query: &str,
) -> Result<Vec<CandidateUser>, StoreError> {
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }

    let by_name = store.users_by_name(query)?;
    let by_email = store.users_by_email(query)?;

    Ok(merge_candidates(by_name, by_email, &caller.id))
}

/// First-seen-wins merge keyed on user id: every name hit, then every
/// email hit whose id was not already present. The caller's own id is
/// filtered out last.
fn merge_candidates(by_name: Vec<User>, by_email: Vec<User>, caller_id: &str) -> Vec<CandidateUser> {
    let mut seen: HashSet<String> = by_name.iter().map(|u| u.id.clone()).collect();
    let mut merged = by_name;
    for user in by_email {
        if seen.insert(user.id.clone()) {
            merged.push(user);
        }
    }

    merged
        .into_iter()
        .filter(|u| u.id != caller_id)
        .map(|u| CandidateUser {
            id: u.id,
            name: u.name,
            email: u.email,
            image_url: u.image_url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::fixtures;

    fn store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    #[test]
    fn test_short_query_returns_empty_without_lookup() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        fixtures::seed_user(&store, "B", "b@example.com");

        assert!(search_users(&store, &caller, "").unwrap().is_empty());
        assert!(search_users(&store, &caller, "b").unwrap().is_empty());
        // Multi-byte characters count as one
        assert!(search_users(&store, &caller, "é").unwrap().is_empty());
    }

    #[test]
    fn test_name_matches_before_email_matches() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        fixtures::seed_user(&store, "Zed", "alpha@example.com");
        fixtures::seed_user(&store, "Alpha", "zed@example.com");

        let results = search_users(&store, &caller, "alpha").unwrap();
        let names: Vec<&str> = results.iter().map(|c| c.name.as_str()).collect();
        // "Alpha" matched by name, "Zed" only by email
        assert_eq!(names, vec!["Alpha", "Zed"]);
    }

    #[test]
    fn test_no_duplicate_ids_when_both_indexes_match() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        fixtures::seed_user(&store, "Ben", "ben@example.com");

        let results = search_users(&store, &caller, "ben").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Ben");
    }

    #[test]
    fn test_caller_excluded_from_results() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        fixtures::seed_user(&store, "Umair", "umair@example.com");

        let results = search_users(&store, &caller, "uma").unwrap();
        assert!(results.iter().all(|c| c.id != caller.id));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_merge_prefers_name_lookup_order_on_ties() {
        let a = fixtures::user("u-a", "Ada", "ada@example.com");
        let b = fixtures::user("u-b", "Ben", "ben@example.com");
        // Same user appears in both lookups; the name-lookup entry wins
        let merged = merge_candidates(vec![a.clone(), b.clone()], vec![b, a], "caller");
        let ids: Vec<&str> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["u-a", "u-b"]);
    }
}
