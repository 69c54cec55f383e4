//! Group creation: validate and normalize a proposed member set, then
//! persist the group atomically with role assignment.

use std::collections::HashSet;

use crate::error::ApiError;
use crate::models::user::User;
use crate::store::SqliteStore;

/// Create a group with the given members. The member list is
/// deduplicated and the caller is always included as admin, so callers
/// never need to pre-clean their input. Validation failures leave the
/// store untouched.
pub fn create_group(
    store: &SqliteStore,
    caller: &User,
    name: &str,
    description: &str,
    member_ids: &[String],
) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidName);
    }

    let members = normalize_member_ids(member_ids, &caller.id);

    // Every member must exist before anything is written; the first
    // missing id aborts the whole call.
    for id in &members {
        if store.user_by_id(id)?.is_none() {
            return Err(ApiError::MemberNotFound(id.clone()));
        }
    }

    let group_id = store.insert_group(name, description.trim(), &caller.id, &members)?;
    Ok(group_id)
}

/// Deduplicate candidate member ids (first-seen order) and append the
/// caller's id if absent. Idempotent with respect to duplicate or
/// self-referential input.
fn normalize_member_ids(member_ids: &[String], caller_id: &str) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut members = Vec::new();
    for id in member_ids {
        if seen.insert(id) {
            members.push(id.clone());
        }
    }
    if seen.insert(caller_id) {
        members.push(caller_id.to_string());
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::Role;
    use crate::test_util::fixtures;

    fn store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_dedups_and_appends_caller() {
        let members = normalize_member_ids(&ids(&["a", "a", "b"]), "c");
        assert_eq!(members, ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_normalize_keeps_caller_position_when_listed() {
        let members = normalize_member_ids(&ids(&["c", "a"]), "c");
        assert_eq!(members, ids(&["c", "a"]));
    }

    #[test]
    fn test_empty_and_whitespace_names_rejected() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");

        for name in ["", "   "] {
            let result = create_group(&store, &caller, name, "", &[]);
            assert!(matches!(result, Err(ApiError::InvalidName)));
        }
        assert_eq!(store.group_count().unwrap(), 0);
    }

    #[test]
    fn test_missing_member_aborts_without_persisting() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        let ben = fixtures::seed_user(&store, "Ben", "ben@example.com");

        let result = create_group(
            &store,
            &caller,
            "Trip",
            "",
            &[ben.id.clone(), "ghost".to_string()],
        );
        match result {
            Err(ApiError::MemberNotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("expected MemberNotFound, got {other:?}"),
        }
        assert_eq!(store.group_count().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_members_produce_identical_membership() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        let a = fixtures::seed_user(&store, "Ada", "ada@example.com");
        let b = fixtures::seed_user(&store, "Ben", "ben@example.com");

        let with_dupes = create_group(
            &store,
            &caller,
            "Trip",
            "",
            &[a.id.clone(), a.id.clone(), b.id.clone()],
        )
        .unwrap();
        let without = create_group(
            &store,
            &caller,
            "Trip",
            "",
            &[a.id.clone(), b.id.clone()],
        )
        .unwrap();

        let members_of = |id: &str| -> Vec<String> {
            store
                .group_by_id(id)
                .unwrap()
                .unwrap()
                .members
                .into_iter()
                .map(|m| m.user_id)
                .collect()
        };
        assert_eq!(members_of(&with_dupes), members_of(&without));
    }

    #[test]
    fn test_caller_always_admin_even_when_omitted() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");
        let ben = fixtures::seed_user(&store, "Ben", "ben@example.com");

        let group_id = create_group(&store, &caller, "Trip", "", &[ben.id.clone()]).unwrap();
        let group = store.group_by_id(&group_id).unwrap().unwrap();

        let creator = group
            .members
            .iter()
            .find(|m| m.user_id == caller.id)
            .expect("creator must be a member");
        assert_eq!(creator.role, Role::Admin);
    }

    #[test]
    fn test_scenario_three_members_with_roles() {
        let store = store();
        let u1 = fixtures::seed_user(&store, "Uma", "uma@example.com");
        let u2 = fixtures::seed_user(&store, "Ada", "ada@example.com");
        let u3 = fixtures::seed_user(&store, "Ben", "ben@example.com");

        let group_id = create_group(
            &store,
            &u1,
            "Trip",
            "",
            &[u2.id.clone(), u3.id.clone(), u1.id.clone()],
        )
        .unwrap();
        let group = store.group_by_id(&group_id).unwrap().unwrap();

        assert_eq!(group.members.len(), 3);
        for member in &group.members {
            let expected = if member.user_id == u1.id {
                Role::Admin
            } else {
                Role::Member
            };
            assert_eq!(member.role, expected);
        }
    }

    #[test]
    fn test_name_and_description_trimmed() {
        let store = store();
        let caller = fixtures::seed_user(&store, "Uma", "uma@example.com");

        let group_id = create_group(&store, &caller, "  Trip  ", "  fun  ", &[]).unwrap();
        let group = store.group_by_id(&group_id).unwrap().unwrap();
        assert_eq!(group.name, "Trip");
        assert_eq!(group.description, "fun");
    }
}
