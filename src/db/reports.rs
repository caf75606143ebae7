use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::{DashboardStats, OverdueLoan, PopularBook, Role};

/// Counts backing the dashboard stat cards.
pub fn dashboard_stats(conn: &Connection) -> Result<DashboardStats> {
    let books: i64 = conn
        .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
        .context("failed to count books")?;

    let members: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM users WHERE role_id = ?1",
            params![Role::Member.id()],
            |row| row.get(0),
        )
        .context("failed to count members")?;

    let active_loans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM loans WHERE return_date IS NULL",
            [],
            |row| row.get(0),
        )
        .context("failed to count active loans")?;

    Ok(DashboardStats {
        books,
        members,
        active_loans,
    })
}

/// Top ten rows of the `PopularBooksReport` view. The view is optional
/// reporting surface: any failure degrades to an empty list so the dashboard
/// keeps rendering.
pub fn popular_books(conn: &Connection) -> Vec<PopularBook> {
    let mut stmt = match conn
        .prepare("SELECT title, genre, times_borrowed FROM PopularBooksReport LIMIT 10")
    {
        Ok(stmt) => stmt,
        Err(_) => return Vec::new(),
    };

    let rows = match stmt.query_map([], |row| {
        Ok(PopularBook {
            title: row.get(0)?,
            genre: row.get(1)?,
            times_borrowed: row.get(2)?,
        })
    }) {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };

    rows.filter_map(|row| row.ok()).collect()
}

/// All rows of the `OverdueBooksReport` view, degrading to empty on failure
/// like [`popular_books`].
pub fn overdue_books(conn: &Connection) -> Vec<OverdueLoan> {
    let mut stmt = match conn
        .prepare("SELECT title, borrower, due_date, days_overdue FROM OverdueBooksReport")
    {
        Ok(stmt) => stmt,
        Err(_) => return Vec::new(),
    };

    let rows = match stmt.query_map([], |row| {
        Ok(OverdueLoan {
            title: row.get(0)?,
            borrower: row.get(1)?,
            due_date: row.get(2)?,
            days_overdue: row.get(3)?,
        })
    }) {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };

    rows.filter_map(|row| row.ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::create_book;
    use crate::db::connection::{open_in_memory, seed_default_users};
    use crate::db::loans::{borrow_book, return_book};

    const MEMBER_ID: i64 = 2;

    #[test]
    fn stats_count_books_members_and_active_loans() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let first = create_book(&conn, "One", None, None, &[]).unwrap();
        create_book(&conn, "Two", None, None, &[]).unwrap();
        borrow_book(&conn, MEMBER_ID, first).unwrap();

        let stats = dashboard_stats(&conn).unwrap();
        assert_eq!(stats.books, 2);
        assert_eq!(stats.members, 1);
        assert_eq!(stats.active_loans, 1);
    }

    #[test]
    fn popular_report_ranks_by_times_borrowed() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let hit = create_book(&conn, "Hit", Some("Fiction"), None, &[]).unwrap();
        let other = create_book(&conn, "Other", None, None, &[]).unwrap();

        for _ in 0..2 {
            borrow_book(&conn, MEMBER_ID, hit).unwrap();
            let loan_id: i64 = conn
                .query_row(
                    "SELECT id FROM loans WHERE book_id = ?1 AND return_date IS NULL",
                    [hit],
                    |row| row.get(0),
                )
                .unwrap();
            return_book(&conn, loan_id).unwrap();
        }
        borrow_book(&conn, MEMBER_ID, other).unwrap();

        let popular = popular_books(&conn);
        assert_eq!(popular.len(), 2);
        assert_eq!(popular[0].title, "Hit");
        assert_eq!(popular[0].times_borrowed, 2);
    }

    #[test]
    fn overdue_report_lists_only_past_due_active_loans() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let book_id = create_book(&conn, "Late", None, None, &[]).unwrap();
        borrow_book(&conn, MEMBER_ID, book_id).unwrap();

        // Fresh loans are due in the future, so nothing is overdue yet.
        assert!(overdue_books(&conn).is_empty());

        conn.execute(
            "UPDATE loans SET due_date = date('now', '-3 day') WHERE book_id = ?1",
            [book_id],
        )
        .unwrap();

        let overdue = overdue_books(&conn);
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].title, "Late");
        assert_eq!(overdue[0].borrower, "Default Member");
        assert_eq!(overdue[0].days_overdue, 3);
    }

    #[test]
    fn missing_views_degrade_to_empty_results() {
        let conn = open_in_memory().unwrap();
        conn.execute("DROP VIEW PopularBooksReport", []).unwrap();
        conn.execute("DROP VIEW OverdueBooksReport", []).unwrap();

        assert!(popular_books(&conn).is_empty());
        assert!(overdue_books(&conn).is_empty());
    }
}
