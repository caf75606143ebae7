use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Role, User};

/// Check credentials and return the matching account, or `None` when no row
/// matches. The password comparison is a plain equality predicate in the
/// query, mirroring how the stored value is written.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<Option<User>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, username, full_name, email, role_id
             FROM users
             WHERE username = ?1 AND password = ?2",
        )
        .context("failed to prepare login query")?;

    let row = stmt
        .query_row(params![username, password], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })
        .optional()
        .context("failed to check credentials")?;

    match row {
        Some((id, username, full_name, email, role_id)) => {
            let role = Role::from_id(role_id)
                .ok_or_else(|| anyhow!("account '{username}' has unknown role id {role_id}"))?;
            Ok(Some(User {
                id,
                username,
                full_name,
                email,
                role,
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{open_in_memory, seed_default_users};

    #[test]
    fn valid_credentials_return_the_account() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();

        let user = authenticate(&conn, "admin", "admin").unwrap().unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(user.full_name, "Default Librarian");
        assert_eq!(user.role, Role::Librarian);
        assert!(user.role.can_manage_catalog());

        let member = authenticate(&conn, "reader", "reader").unwrap().unwrap();
        assert_eq!(member.role, Role::Member);
        assert!(member.role.can_borrow());
    }

    #[test]
    fn wrong_password_returns_none() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();

        assert!(authenticate(&conn, "admin", "nope").unwrap().is_none());
    }

    #[test]
    fn unknown_username_returns_none() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();

        assert!(authenticate(&conn, "ghost", "admin").unwrap().is_none());
    }
}
