use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};

use crate::models::Loan;

/// Record a loan for the given member and book. The due date is computed in
/// SQL as seven days after the borrow date. There is deliberately no loan
/// count or availability check here: the `loans_enforce_limit` and
/// `loans_enforce_available` triggers reject the insert when a rule is
/// violated, and their abort text surfaces as the error message.
pub fn borrow_book(conn: &Connection, user_id: i64, book_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO loans (book_id, user_id, borrow_date, due_date)
         VALUES (?1, ?2, date('now'), date('now', '+7 day'))",
        params![book_id, user_id],
    )
    .context("failed to record loan")?;

    Ok(())
}

/// Stamp a loan's return date. Matching on the id alone means a second
/// return of the same loan updates the row again without error; the
/// availability sync trigger only fires on the first transition.
pub fn return_book(conn: &Connection, loan_id: i64) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE loans SET return_date = date('now') WHERE id = ?1",
            params![loan_id],
        )
        .context("failed to update loan")?;

    if updated == 0 {
        Err(anyhow!("Loan not found"))
    } else {
        Ok(())
    }
}

/// A member's active loans joined with book titles, soonest due first.
pub fn fetch_user_loans(conn: &Connection, user_id: i64) -> Result<Vec<Loan>> {
    let mut stmt = conn
        .prepare(
            "SELECT l.id, b.title, l.borrow_date, l.due_date, l.return_date
             FROM loans l
             JOIN books b ON b.id = l.book_id
             WHERE l.user_id = ?1 AND l.return_date IS NULL
             ORDER BY l.due_date, l.id",
        )
        .context("failed to prepare loan query")?;

    let loans = stmt
        .query_map(params![user_id], |row| {
            Ok(Loan {
                id: row.get(0)?,
                book_title: row.get(1)?,
                borrow_date: row.get(2)?,
                due_date: row.get(3)?,
                return_date: row.get(4)?,
            })
        })
        .context("failed to load loans")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect loans")?;

    Ok(loans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::{create_book, fetch_books};
    use crate::db::connection::{open_in_memory, seed_default_users};

    const MEMBER_ID: i64 = 2;

    fn book(conn: &Connection, title: &str) -> i64 {
        create_book(conn, title, None, None, &[]).unwrap()
    }

    #[test]
    fn due_date_is_seven_days_after_borrow() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let book_id = book(&conn, "Sample Title");

        borrow_book(&conn, MEMBER_ID, book_id).unwrap();

        let loans = fetch_user_loans(&conn, MEMBER_ID).unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].book_title, "Sample Title");
        assert_eq!(loans[0].status(), "Active");

        let expected: String = conn
            .query_row("SELECT date('now', '+7 day')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(loans[0].due_date, expected);
    }

    #[test]
    fn borrowing_toggles_availability_off() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let book_id = book(&conn, "Popular");

        borrow_book(&conn, MEMBER_ID, book_id).unwrap();

        let books = fetch_books(&conn, None).unwrap();
        assert!(!books[0].available);
    }

    #[test]
    fn borrowing_an_unavailable_book_is_rejected_by_the_store() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let book_id = book(&conn, "Contested");

        borrow_book(&conn, MEMBER_ID, book_id).unwrap();
        let err = borrow_book(&conn, 1, book_id).unwrap_err();
        assert!(err
            .root_cause()
            .to_string()
            .contains("Book is not available"));
    }

    #[test]
    fn fourth_active_loan_hits_the_limit_trigger() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        for title in ["One", "Two", "Three"] {
            borrow_book(&conn, MEMBER_ID, book(&conn, title)).unwrap();
        }

        let err = borrow_book(&conn, MEMBER_ID, book(&conn, "Four")).unwrap_err();
        assert!(err.root_cause().to_string().contains("Loan limit reached"));
        assert_eq!(fetch_user_loans(&conn, MEMBER_ID).unwrap().len(), 3);
    }

    #[test]
    fn returning_restores_availability_once() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let book_id = book(&conn, "Round Trip");

        borrow_book(&conn, MEMBER_ID, book_id).unwrap();
        let loan_id = fetch_user_loans(&conn, MEMBER_ID).unwrap()[0].id;

        return_book(&conn, loan_id).unwrap();
        assert!(fetch_books(&conn, None).unwrap()[0].available);
        assert!(fetch_user_loans(&conn, MEMBER_ID).unwrap().is_empty());

        // A second borrow of the same book, then a stale return of the first
        // loan: the sync trigger must not fire again and free the book.
        borrow_book(&conn, MEMBER_ID, book_id).unwrap();
        return_book(&conn, loan_id).unwrap();
        assert!(!fetch_books(&conn, None).unwrap()[0].available);
    }

    #[test]
    fn returning_a_missing_loan_is_an_error() {
        let conn = open_in_memory().unwrap();
        let err = return_book(&conn, 7).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Loan not found");
    }
}
