//! End-to-end catalog and loan flow against an in-memory database carrying
//! the exact production schema, triggers, and report views.

use rusqlite::Connection;

use smart_library::db::{
    authenticate, borrow_book, create_author, create_book, fetch_books, fetch_user_loans,
    return_book,
};
use smart_library::{apply_schema, seed_default_users, Role};

fn open_library() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    apply_schema(&conn).expect("schema");
    seed_default_users(&conn).expect("seed accounts");
    conn
}

#[test]
fn member_borrows_and_returns_a_new_book() {
    let conn = open_library();

    let member = authenticate(&conn, "reader", "reader")
        .unwrap()
        .expect("seeded member account");
    assert_eq!(member.role, Role::Member);

    let author = create_author(&conn, "A. Author", None).unwrap();
    create_book(
        &conn,
        "Sample Title",
        Some("Fiction"),
        Some(2020),
        &[author.id],
    )
    .unwrap();

    // The catalog search finds exactly the new book, available and credited.
    let found = fetch_books(&conn, Some("Sample")).unwrap();
    assert_eq!(found.len(), 1);
    let book = &found[0];
    assert!(book.available);
    assert_eq!(book.authors, "A. Author");
    assert_eq!(book.genre.as_deref(), Some("Fiction"));

    borrow_book(&conn, member.id, book.id).unwrap();

    // One active loan, due exactly seven days out.
    let loans = fetch_user_loans(&conn, member.id).unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].book_title, "Sample Title");
    let expected_due: String = conn
        .query_row("SELECT date('now', '+7 day')", [], |row| row.get(0))
        .unwrap();
    assert_eq!(loans[0].due_date, expected_due);

    // While on loan, the catalog reports the book unavailable.
    let during = fetch_books(&conn, Some("Sample")).unwrap();
    assert!(!during[0].available);

    return_book(&conn, loans[0].id).unwrap();

    // The trigger restores availability and the loan list empties.
    let after = fetch_books(&conn, Some("Sample")).unwrap();
    assert!(after[0].available);
    assert!(fetch_user_loans(&conn, member.id).unwrap().is_empty());
}
