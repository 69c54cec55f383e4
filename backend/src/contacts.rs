//! Contact aggregation: derive the caller's distinct counterparties and
//! the groups they belong to from the raw expense ledger.

use std::collections::HashSet;

use crate::models::contact::{Contact, ContactsResponse};
use crate::models::expense::Expense;
use crate::models::user::User;
use crate::store::{SqliteStore, StoreError};

/// Compute the caller's contacts: every distinct person they share a
/// personal expense with, and every group they are a member of. Both
/// lists are sorted by name; both may be empty.
pub fn contacts_and_groups(
    store: &SqliteStore,
    caller: &User,
) -> Result<ContactsResponse, StoreError> {
    let expenses_you_paid = store.personal_expenses_paid_by(&caller.id)?;
    let expenses_not_paid_by_you: Vec<Expense> = store
        .personal_expenses()?
        .into_iter()
        .filter(|e| e.paid_by_user_id != caller.id && e.has_participant(&caller.id))
        .collect();

    // The two sets are disjoint by construction (an expense has exactly
    // one payer), so chaining them needs no cross-set dedup.
    let counterparty_ids = collect_counterparty_ids(
        expenses_you_paid.iter().chain(expenses_not_paid_by_you.iter()),
        &caller.id,
    );

    // Resolve each id independently; dangling references from old
    // expenses are dropped, not surfaced.
    let mut users = Vec::with_capacity(counterparty_ids.len());
    for id in &counterparty_ids {
        match store.user_by_id(id)? {
            Some(user) => users.push(Contact::User {
                id: user.id,
                name: user.name,
                email: user.email,
                image_url: user.image_url,
            }),
            None => {
                tracing::debug!(user_id = %id, "Dropping dangling expense participant");
            }
        }
    }

    let mut groups: Vec<Contact> = store
        .all_groups()?
        .into_iter()
        .filter(|g| g.has_member(&caller.id))
        .map(|g| Contact::Group {
            id: g.id,
            name: g.name,
            description: g.description,
            member_count: g.members.len(),
        })
        .collect();

    // Stable sorts: ties keep encounter order.
    users.sort_by(name_order);
    groups.sort_by(name_order);

    Ok(ContactsResponse { users, groups })
}

/// Case-insensitive name ordering, raw name as tiebreak, so mixed-case
/// names interleave the way a reader expects.
fn name_order(a: &Contact, b: &Contact) -> std::cmp::Ordering {
    a.name()
        .to_lowercase()
        .cmp(&b.name().to_lowercase())
        .then_with(|| a.name().cmp(b.name()))
}

/// Accumulate every participant id that is not the caller, in first-seen
/// order. The set is the load-bearing dedup: a counterparty appearing in
/// many expenses collapses to one entry.
fn collect_counterparty_ids<'a>(
    expenses: impl Iterator<Item = &'a Expense>,
    caller_id: &str,
) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::new();
    for expense in expenses {
        if expense.paid_by_user_id != caller_id && seen.insert(&expense.paid_by_user_id) {
            ordered.push(expense.paid_by_user_id.clone());
        }
        for split in &expense.splits {
            if split.user_id != caller_id && seen.insert(&split.user_id) {
                ordered.push(split.user_id.clone());
            }
        }
    }
    ordered
}
