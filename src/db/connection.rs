use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::{params, Connection};

use crate::models::Role;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".smart-library";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";

/// Ensure the database file exists, run lazy migrations, and return a live
/// connection. Tables, the loan-rule triggers, and the two report views are
/// all provisioned here so the data-access functions never have to restate
/// any business rule themselves.
pub fn ensure_schema() -> Result<Connection> {
    let db_path = db_path()?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Apply the full schema to an open connection. Split out from
/// [`ensure_schema`] so tests can provision in-memory databases with exactly
/// the same tables, triggers, and views production uses.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            role_id INTEGER NOT NULL
        )",
        [],
    )
    .context("failed to create users table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            genre TEXT,
            publication_year INTEGER,
            available INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )
    .context("failed to create books table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            bio TEXT
        )",
        [],
    )
    .context("failed to create authors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS book_authors (
            book_id INTEGER NOT NULL,
            author_id INTEGER NOT NULL,
            PRIMARY KEY (book_id, author_id),
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY(author_id) REFERENCES authors(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create book_authors table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            borrow_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE RESTRICT,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )
    .context("failed to create loans table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS book_clubs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            created_by INTEGER NOT NULL,
            FOREIGN KEY(created_by) REFERENCES users(id)
        )",
        [],
    )
    .context("failed to create book_clubs table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS club_memberships (
            club_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            join_date TEXT NOT NULL DEFAULT (date('now')),
            PRIMARY KEY (club_id, user_id),
            FOREIGN KEY(club_id) REFERENCES book_clubs(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )
    .context("failed to create club_memberships table")?;

    apply_loan_rules(conn)?;
    apply_report_views(conn)?;

    Ok(())
}

/// Business rules live in triggers, not in application code: the loan limit,
/// the availability guard, and the availability sync on borrow/return.
fn apply_loan_rules(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS loans_enforce_limit
         BEFORE INSERT ON loans
         WHEN (SELECT COUNT(*) FROM loans
               WHERE user_id = NEW.user_id AND return_date IS NULL) >= 3
         BEGIN
             SELECT RAISE(ABORT, 'Loan limit reached for this member.');
         END",
        [],
    )
    .context("failed to create loan limit trigger")?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS loans_enforce_available
         BEFORE INSERT ON loans
         WHEN (SELECT available FROM books WHERE id = NEW.book_id) = 0
         BEGIN
             SELECT RAISE(ABORT, 'Book is not available for borrowing.');
         END",
        [],
    )
    .context("failed to create availability guard trigger")?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS loans_mark_unavailable
         AFTER INSERT ON loans
         BEGIN
             UPDATE books SET available = 0 WHERE id = NEW.book_id;
         END",
        [],
    )
    .context("failed to create borrow sync trigger")?;

    // Fires only on the NULL -> non-NULL transition, so returning an
    // already-returned loan cannot toggle availability a second time.
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS loans_mark_available
         AFTER UPDATE OF return_date ON loans
         WHEN NEW.return_date IS NOT NULL AND OLD.return_date IS NULL
         BEGIN
             UPDATE books SET available = 1 WHERE id = NEW.book_id;
         END",
        [],
    )
    .context("failed to create return sync trigger")?;

    Ok(())
}

/// Precomputed report views consumed read-only by the dashboard.
fn apply_report_views(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE VIEW IF NOT EXISTS PopularBooksReport AS
         SELECT b.title AS title, b.genre AS genre, COUNT(l.id) AS times_borrowed
         FROM books b
         JOIN loans l ON l.book_id = b.id
         GROUP BY b.id, b.title, b.genre
         ORDER BY times_borrowed DESC",
        [],
    )
    .context("failed to create popular books view")?;

    conn.execute(
        "CREATE VIEW IF NOT EXISTS OverdueBooksReport AS
         SELECT b.title AS title,
                u.full_name AS borrower,
                l.due_date AS due_date,
                CAST(julianday('now') - julianday(l.due_date) AS INTEGER) AS days_overdue
         FROM loans l
         JOIN books b ON b.id = l.book_id
         JOIN users u ON u.id = l.user_id
         WHERE l.return_date IS NULL AND l.due_date < date('now')
         ORDER BY l.due_date",
        [],
    )
    .context("failed to create overdue books view")?;

    Ok(())
}

/// Insert the default librarian and member accounts on a fresh database so
/// the login screen is usable before any real accounts exist.
pub fn seed_default_users(conn: &Connection) -> Result<()> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .context("failed to count users")?;

    if count > 0 {
        return Ok(());
    }

    conn.execute(
        "INSERT INTO users (username, password, full_name, email, role_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            "admin",
            "admin",
            "Default Librarian",
            "admin@smartlibrary.local",
            Role::Librarian.id()
        ],
    )
    .context("failed to seed librarian account")?;

    conn.execute(
        "INSERT INTO users (username, password, full_name, email, role_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            "reader",
            "reader",
            "Default Member",
            "reader@smartlibrary.local",
            Role::Member.id()
        ],
    )
    .context("failed to seed member account")?;

    Ok(())
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

/// In-memory database carrying the production schema, for tests.
#[cfg(test)]
pub(crate) fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    apply_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_twice_without_error() {
        let conn = open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
    }

    #[test]
    fn seeding_is_idempotent() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        seed_default_users(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let role: i64 = conn
            .query_row(
                "SELECT role_id FROM users WHERE username = 'admin'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(role, Role::Librarian.id());
    }
}
