//! Minimal user registry
//!
//! Stands in for the external identity service: the ledger only needs to
//! resolve a recipient email to a user id. Emails compare case-insensitively.

use crate::error::{LedgerError, Result};
use crate::types::{Timestamp, UserId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: Timestamp,
}

/// Resolves users by email
pub trait UserDirectory {
    fn lookup_user_by_email(&self, email: &str) -> Result<Option<UserId>>;
}

/// Accessor for the `users` table
pub struct UserTable<'c> {
    conn: &'c Connection,
}

impl<'c> UserTable<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Register a user. The email must be non-empty and unused.
    pub fn create(&self, email: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::InvalidEmail(email.to_string()));
        }
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO users (email, name, created_at) VALUES (?1, ?2, ?3)",
            params![email, name, created_at],
        )?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at,
        })
    }

    pub fn by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, created_at FROM users WHERE email = ?1",
                params![email.trim()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, created_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }
}

impl UserDirectory for UserTable<'_> {
    fn lookup_user_by_email(&self, email: &str) -> Result<Option<UserId>> {
        Ok(self.by_email(email)?.map(|user| user.id))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_create_and_lookup() {
        let store = Store::new_in_memory().unwrap();
        let users = store.users();
        let alice = users.create("  alice@example.com ", Some("Alice")).unwrap();
        assert_eq!(alice.email, "alice@example.com");

        assert_eq!(users.lookup_user_by_email("alice@example.com").unwrap(), Some(alice.id));
        assert_eq!(users.lookup_user_by_email("ALICE@Example.com").unwrap(), Some(alice.id));
        assert_eq!(users.lookup_user_by_email("bob@example.com").unwrap(), None);
        assert_eq!(users.by_id(alice.id).unwrap().unwrap().name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_duplicate_email_is_store_failure() {
        let store = Store::new_in_memory().unwrap();
        store.users().create("a@example.com", None).unwrap();
        let err = store.users().create("A@example.com", None).unwrap_err();
        assert_eq!(err.kind(), "store_failure");
    }

    #[test]
    fn test_rejects_malformed_email() {
        let store = Store::new_in_memory().unwrap();
        assert!(store.users().create("   ", None).is_err());
        assert_eq!(store.users().create("nobody", None).unwrap_err().kind(), "invalid_email");
    }
}
