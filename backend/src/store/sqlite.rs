use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::expense::{Expense, Split};
use crate::models::group::{Group, Membership, Role};
use crate::models::user::User;

/// SQLite-backed document store for users, expenses and groups.
///
/// The connection is serialized behind a mutex; each call observes a
/// consistent snapshot and mutations commit atomically.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
}

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        // Create parent directories if needed
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                image_url TEXT,
                token_identifier TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS expenses (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                paid_by_user_id TEXT NOT NULL,
                group_id TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS expense_splits (
                expense_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                amount REAL NOT NULL,
                PRIMARY KEY (expense_id, position),
                FOREIGN KEY (expense_id) REFERENCES expenses(id)
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS group_members (
                group_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                joined_at TEXT NOT NULL,
                PRIMARY KEY (group_id, position),
                UNIQUE (group_id, user_id),
                FOREIGN KEY (group_id) REFERENCES groups(id)
            )",
            [],
        )
        .map_err(db_err)?;

        // Index shapes the query layer depends on
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expenses_payer_group ON expenses(paid_by_user_id, group_id)",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_expenses_group ON expenses(group_id)",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_name ON users(name)",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            [],
        )
        .map_err(db_err)?;

        tracing::info!("Store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Find or create a user by external identity token. Creates the row
    /// on first sight, patches the display name when the identity carries
    /// a different one, otherwise leaves the row untouched. An identity
    /// without a name never renames an existing user. Idempotent.
    pub fn upsert_user(
        &self,
        token_identifier: &str,
        name: Option<&str>,
        email: &str,
        image_url: Option<&str>,
    ) -> Result<User, StoreError> {
        let name = name.filter(|n| !n.is_empty());
        let conn = self.conn.lock().map_err(db_err)?;

        let existing = conn
            .query_row(
                "SELECT id, name, email, image_url, token_identifier, created_at
                 FROM users WHERE token_identifier = ?1",
                params![token_identifier],
                row_to_user,
            )
            .optional()
            .map_err(db_err)?;

        match existing {
            Some(mut user) => {
                if let Some(name) = name {
                    if user.name != name {
                        conn.execute(
                            "UPDATE users SET name = ?1 WHERE id = ?2",
                            params![name, user.id],
                        )
                        .map_err(db_err)?;
                        tracing::info!(user_id = %user.id, "Updated display name for user");
                        user.name = name.to_string();
                    }
                }
                Ok(user)
            }
            None => {
                let user = User {
                    id: Uuid::new_v4().to_string(),
                    name: name.unwrap_or("Anonymous").to_string(),
                    email: email.to_string(),
                    image_url: image_url.map(String::from),
                    token_identifier: token_identifier.to_string(),
                    created_at: Utc::now(),
                };
                conn.execute(
                    "INSERT INTO users (id, name, email, image_url, token_identifier, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        user.id,
                        user.name,
                        user.email,
                        user.image_url,
                        user.token_identifier,
                        user.created_at.to_rfc3339(),
                    ],
                )
                .map_err(db_err)?;
                tracing::info!(user_id = %user.id, "Created new user: {}", user.email);
                Ok(user)
            }
        }
    }

    /// Look up a user by external identity token (unique index).
    pub fn user_by_token(&self, token_identifier: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.query_row(
            "SELECT id, name, email, image_url, token_identifier, created_at
             FROM users WHERE token_identifier = ?1",
            params![token_identifier],
            row_to_user,
        )
        .optional()
        .map_err(db_err)
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.query_row(
            "SELECT id, name, email, image_url, token_identifier, created_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(db_err)
    }

    /// Text lookup against display names, case-insensitive substring match.
    pub fn users_by_name(&self, query: &str) -> Result<Vec<User>, StoreError> {
        self.users_matching("name", query)
    }

    /// Text lookup against emails, case-insensitive substring match.
    pub fn users_by_email(&self, query: &str) -> Result<Vec<User>, StoreError> {
        self.users_matching("email", query)
    }

    fn users_matching(&self, column: &str, query: &str) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        let sql = format!(
            "SELECT id, name, email, image_url, token_identifier, created_at
             FROM users WHERE {column} LIKE ?1 ESCAPE '\\' ORDER BY {column}, id"
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let pattern = format!("%{}%", escape_like(query));
        let users = stmt
            .query_map(params![pattern], row_to_user)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(users)
    }

    /// Insert an expense with its splits. Expenses are written by the
    /// expense-creation flow; this service uses it for seeding and tests.
    pub fn insert_expense(&self, expense: &Expense) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(db_err)?;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            "INSERT INTO expenses (id, description, amount, paid_by_user_id, group_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                expense.id,
                expense.description,
                expense.amount,
                expense.paid_by_user_id,
                expense.group_id,
                expense.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        for (position, split) in expense.splits.iter().enumerate() {
            tx.execute(
                "INSERT INTO expense_splits (expense_id, position, user_id, amount)
                 VALUES (?1, ?2, ?3, ?4)",
                params![expense.id, position as i64, split.user_id, split.amount],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(())
    }

    /// Personal (group-less) expenses paid by the given user.
    pub fn personal_expenses_paid_by(&self, user_id: &str) -> Result<Vec<Expense>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        Self::load_expenses(
            &conn,
            "SELECT id, description, amount, paid_by_user_id, group_id, created_at
             FROM expenses WHERE paid_by_user_id = ?1 AND group_id IS NULL
             ORDER BY created_at, id",
            params![user_id],
        )
    }

    /// All personal (group-less) expenses, regardless of payer.
    pub fn personal_expenses(&self) -> Result<Vec<Expense>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        Self::load_expenses(
            &conn,
            "SELECT id, description, amount, paid_by_user_id, group_id, created_at
             FROM expenses WHERE group_id IS NULL
             ORDER BY created_at, id",
            params![],
        )
    }

    fn load_expenses(
        conn: &Connection,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<Expense>, StoreError> {
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let mut expenses = stmt
            .query_map(args, |row| {
                Ok(Expense {
                    id: row.get(0)?,
                    description: row.get(1)?,
                    amount: row.get(2)?,
                    paid_by_user_id: row.get(3)?,
                    group_id: row.get(4)?,
                    created_at: parse_timestamp(5, row.get::<_, String>(5)?)?,
                    splits: Vec::new(),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<Expense>, _>>()
            .map_err(db_err)?;

        let mut split_stmt = conn
            .prepare(
                "SELECT user_id, amount FROM expense_splits
                 WHERE expense_id = ?1 ORDER BY position",
            )
            .map_err(db_err)?;
        for expense in &mut expenses {
            expense.splits = split_stmt
                .query_map(params![expense.id], |row| {
                    Ok(Split {
                        user_id: row.get(0)?,
                        amount: row.get(1)?,
                    })
                })
                .map_err(db_err)?
                .collect::<Result<Vec<Split>, _>>()
                .map_err(db_err)?;
        }

        Ok(expenses)
    }

    /// All groups with their membership lists.
    pub fn all_groups(&self) -> Result<Vec<Group>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, description, created_by, created_at
                 FROM groups ORDER BY created_at, id",
            )
            .map_err(db_err)?;
        let mut groups = stmt
            .query_map([], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_by: row.get(3)?,
                    created_at: parse_timestamp(4, row.get::<_, String>(4)?)?,
                    members: Vec::new(),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<Group>, _>>()
            .map_err(db_err)?;

        let mut member_stmt = conn
            .prepare(
                "SELECT user_id, role, joined_at FROM group_members
                 WHERE group_id = ?1 ORDER BY position",
            )
            .map_err(db_err)?;
        for group in &mut groups {
            group.members = member_stmt
                .query_map(params![group.id], row_to_membership)
                .map_err(db_err)?
                .collect::<Result<Vec<Membership>, _>>()
                .map_err(db_err)?;
        }

        Ok(groups)
    }

    pub fn group_by_id(&self, id: &str) -> Result<Option<Group>, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        let group = conn
            .query_row(
                "SELECT id, name, description, created_by, created_at
                 FROM groups WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        created_by: row.get(3)?,
                        created_at: parse_timestamp(4, row.get::<_, String>(4)?)?,
                        members: Vec::new(),
                    })
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some(mut group) = group else {
            return Ok(None);
        };

        let mut member_stmt = conn
            .prepare(
                "SELECT user_id, role, joined_at FROM group_members
                 WHERE group_id = ?1 ORDER BY position",
            )
            .map_err(db_err)?;
        group.members = member_stmt
            .query_map(params![group.id], row_to_membership)
            .map_err(db_err)?
            .collect::<Result<Vec<Membership>, _>>()
            .map_err(db_err)?;

        Ok(Some(group))
    }

    pub fn group_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.query_row("SELECT COUNT(*) FROM groups", [], |row| {
            row.get::<_, i64>(0).map(|n| n as usize)
        })
        .map_err(db_err)
    }

    /// Insert a group and its membership list in one transaction. The
    /// creator gets role admin, everyone else member, all sharing one
    /// joined_at instant. Returns the new group id.
    pub fn insert_group(
        &self,
        name: &str,
        description: &str,
        created_by: &str,
        member_ids: &[String],
    ) -> Result<String, StoreError> {
        let mut conn = self.conn.lock().map_err(db_err)?;
        let tx = conn.transaction().map_err(db_err)?;

        let group_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        tx.execute(
            "INSERT INTO groups (id, name, description, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![group_id, name, description, created_by, now.to_rfc3339()],
        )
        .map_err(db_err)?;

        for (position, user_id) in member_ids.iter().enumerate() {
            let role = if user_id == created_by {
                Role::Admin
            } else {
                Role::Member
            };
            tx.execute(
                "INSERT INTO group_members (group_id, position, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    group_id,
                    position as i64,
                    user_id,
                    role.as_str(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        tracing::info!(group_id = %group_id, members = member_ids.len(), "Created group: {}", name);
        Ok(group_id)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        image_url: row.get(3)?,
        token_identifier: row.get(4)?,
        created_at: parse_timestamp(5, row.get::<_, String>(5)?)?,
    })
}

fn row_to_membership(row: &rusqlite::Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        user_id: row.get(0)?,
        role: Role::from_str_or_member(&row.get::<_, String>(1)?),
        joined_at: parse_timestamp(2, row.get::<_, String>(2)?)?,
    })
}

/// Parse a stored RFC 3339 timestamp. A value that does not parse is
/// data corruption and surfaces as an error instead of a substitute.
fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Escape LIKE wildcards in user-supplied query text.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::fixtures;

    fn store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    #[test]
    fn test_upsert_user_creates_once() {
        let store = store();
        let first = store
            .upsert_user("issuer|sub-1", Some("Ada"), "ada@example.com", None)
            .unwrap();
        let second = store
            .upsert_user("issuer|sub-1", Some("Ada"), "ada@example.com", None)
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_upsert_user_patches_changed_name() {
        let store = store();
        let created = store
            .upsert_user("issuer|sub-1", Some("Ada"), "ada@example.com", None)
            .unwrap();
        let updated = store
            .upsert_user("issuer|sub-1", Some("Ada Lovelace"), "ada@example.com", None)
            .unwrap();
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.name, "Ada Lovelace");
        let reloaded = store.user_by_id(&created.id).unwrap().unwrap();
        assert_eq!(reloaded.name, "Ada Lovelace");
    }

    #[test]
    fn test_upsert_user_keeps_name_when_identity_has_none() {
        let store = store();
        let created = store
            .upsert_user("issuer|sub-1", Some("Ada"), "ada@example.com", None)
            .unwrap();

        // An identity without a name claim is not a name change
        let resynced = store
            .upsert_user("issuer|sub-1", None, "ada@example.com", None)
            .unwrap();
        assert_eq!(resynced.id, created.id);
        assert_eq!(resynced.name, "Ada");

        let reloaded = store.user_by_id(&created.id).unwrap().unwrap();
        assert_eq!(reloaded.name, "Ada");
    }

    #[test]
    fn test_upsert_user_defaults_name_on_create_only() {
        let store = store();
        let created = store
            .upsert_user("issuer|sub-2", None, "new@example.com", None)
            .unwrap();
        assert_eq!(created.name, "Anonymous");
    }

    #[test]
    fn test_user_by_token_missing_returns_none() {
        let store = store();
        assert!(store.user_by_token("issuer|nobody").unwrap().is_none());
    }

    #[test]
    fn test_personal_expense_queries_skip_group_expenses() {
        let store = store();
        let ada = fixtures::seed_user(&store, "Ada", "ada@example.com");
        let bob = fixtures::seed_user(&store, "Bob", "bob@example.com");

        store
            .insert_expense(&fixtures::personal_expense(&ada.id, &[ada.id.as_str(), bob.id.as_str()]))
            .unwrap();
        let mut grouped = fixtures::personal_expense(&ada.id, &[ada.id.as_str(), bob.id.as_str()]);
        grouped.group_id = Some("some-group".to_string());
        store.insert_expense(&grouped).unwrap();

        assert_eq!(store.personal_expenses_paid_by(&ada.id).unwrap().len(), 1);
        assert_eq!(store.personal_expenses().unwrap().len(), 1);
    }

    #[test]
    fn test_expense_splits_load_in_order() {
        let store = store();
        let ada = fixtures::seed_user(&store, "Ada", "ada@example.com");
        let bob = fixtures::seed_user(&store, "Bob", "bob@example.com");
        store
            .insert_expense(&fixtures::personal_expense(&ada.id, &[ada.id.as_str(), bob.id.as_str()]))
            .unwrap();

        let expenses = store.personal_expenses().unwrap();
        assert_eq!(expenses.len(), 1);
        let splits: Vec<&str> = expenses[0].splits.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(splits, vec![ada.id.as_str(), bob.id.as_str()]);
    }

    #[test]
    fn test_insert_group_assigns_roles_and_shared_joined_at() {
        let store = store();
        let ada = fixtures::seed_user(&store, "Ada", "ada@example.com");
        let bob = fixtures::seed_user(&store, "Bob", "bob@example.com");

        let group_id = store
            .insert_group("Trip", "", &ada.id, &[ada.id.clone(), bob.id.clone()])
            .unwrap();

        let group = store.group_by_id(&group_id).unwrap().unwrap();
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0].user_id, ada.id);
        assert_eq!(group.members[0].role, Role::Admin);
        assert_eq!(group.members[1].role, Role::Member);
        assert_eq!(group.members[0].joined_at, group.members[1].joined_at);
    }

    #[test]
    fn test_corrupt_timestamp_surfaces_error() {
        let store = store();
        let ada = fixtures::seed_user(&store, "Ada", "ada@example.com");

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE users SET created_at = 'not-a-timestamp' WHERE id = ?1",
                params![ada.id],
            )
            .unwrap();
        }

        let result = store.user_by_id(&ada.id);
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_users_by_name_escapes_like_wildcards() {
        let store = store();
        fixtures::seed_user(&store, "100% Legit", "legit@example.com");
        fixtures::seed_user(&store, "Ada", "ada@example.com");

        let hits = store.users_by_name("100%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "100% Legit");

        // A bare wildcard must not match everyone
        assert!(store.users_by_name("~nobody~").unwrap().is_empty());
    }
}
