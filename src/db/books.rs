use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, Row};

use crate::db::error::StoreError;
use crate::models::Book;

const CATALOG_BASE: &str = "SELECT b.id, b.title, b.genre, b.publication_year, b.available,
            COALESCE(GROUP_CONCAT(a.name, ', '), 'N/A') AS authors
     FROM books b
     LEFT JOIN book_authors ba ON ba.book_id = b.id
     LEFT JOIN authors a ON a.id = ba.author_id";

const CATALOG_TAIL: &str = " GROUP BY b.id, b.title, b.genre, b.publication_year, b.available
     ORDER BY b.id";

/// Retrieve the catalog with author names flattened into one column. The
/// optional filter applies a single case-insensitive substring across title,
/// genre, and author name, which is exactly what the search box offers.
pub fn fetch_books(conn: &Connection, search: Option<&str>) -> Result<Vec<Book>> {
    let term = search.map(str::trim).filter(|term| !term.is_empty());

    let books = match term {
        Some(term) => {
            let sql = format!(
                "{CATALOG_BASE}
                 WHERE b.title LIKE ?1 OR b.genre LIKE ?1 OR a.name LIKE ?1{CATALOG_TAIL}"
            );
            let mut stmt = conn
                .prepare(&sql)
                .context("failed to prepare catalog search")?;
            let pattern = format!("%{term}%");
            let rows = stmt
                .query_map(params![pattern], book_from_row)
                .context("failed to search books")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect search results")?;
            rows
        }
        None => {
            let sql = format!("{CATALOG_BASE}{CATALOG_TAIL}");
            let mut stmt = conn
                .prepare(&sql)
                .context("failed to prepare catalog query")?;
            let rows = stmt
                .query_map([], book_from_row)
                .context("failed to load books")?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to collect books")?;
            rows
        }
    };

    Ok(books)
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        genre: row.get(2)?,
        publication_year: row.get(3)?,
        available: row.get(4)?,
        authors: row.get(5)?,
    })
}

/// Insert a new book and link its authors. The book insert and each link
/// insert auto-commit separately; there is intentionally no wrapping
/// transaction, matching the per-statement commit model of the rest of the
/// layer. Returns the new book id.
pub fn create_book(
    conn: &Connection,
    title: &str,
    genre: Option<&str>,
    year: Option<i64>,
    author_ids: &[i64],
) -> Result<i64> {
    conn.execute(
        "INSERT INTO books (title, genre, publication_year) VALUES (?1, ?2, ?3)",
        params![title, genre, year],
    )
    .context("failed to insert book")?;

    let book_id = conn.last_insert_rowid();
    link_authors(conn, book_id, author_ids)?;

    Ok(book_id)
}

/// Update book details and replace its author links wholesale.
pub fn update_book(
    conn: &Connection,
    id: i64,
    title: &str,
    genre: Option<&str>,
    year: Option<i64>,
    author_ids: &[i64],
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE books SET title = ?1, genre = ?2, publication_year = ?3 WHERE id = ?4",
            params![title, genre, year, id],
        )
        .context("failed to update book")?;

    if updated == 0 {
        return Err(anyhow!("Book not found"));
    }

    conn.execute("DELETE FROM book_authors WHERE book_id = ?1", params![id])
        .context("failed to clear author links")?;
    link_authors(conn, id, author_ids)?;

    Ok(())
}

/// Delete a book. The schema cascades to `book_authors`, while any loan row
/// referencing the book blocks the delete via RESTRICT; that rejection is
/// mapped to the active-loans message.
pub fn delete_book(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM books WHERE id = ?1", params![id])
        .map_err(map_loan_restriction)
        .context("failed to delete book")?;

    if deleted == 0 {
        Err(anyhow!("Book not found"))
    } else {
        Ok(())
    }
}

fn link_authors(conn: &Connection, book_id: i64, author_ids: &[i64]) -> Result<()> {
    for author_id in author_ids {
        conn.execute(
            "INSERT INTO book_authors (book_id, author_id) VALUES (?1, ?2)",
            params![book_id, author_id],
        )
        .context("failed to link author to book")?;
    }
    Ok(())
}

fn map_loan_restriction(err: SqlError) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        StoreError::BookHasActiveLoans.into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::authors::create_author;
    use crate::db::connection::{open_in_memory, seed_default_users};
    use crate::db::loans::borrow_book;

    fn seeded_catalog(conn: &Connection) -> (i64, i64) {
        let fiction = create_author(conn, "A. Author", None).unwrap();
        let history = create_author(conn, "B. Historian", Some("Writes history.")).unwrap();
        let first = create_book(conn, "Sample Title", Some("Fiction"), Some(2020), &[fiction.id])
            .unwrap();
        create_book(conn, "Past Times", Some("History"), Some(1999), &[history.id]).unwrap();
        (first, fiction.id)
    }

    #[test]
    fn catalog_aggregates_author_names() {
        let conn = open_in_memory().unwrap();
        seeded_catalog(&conn);

        let books = fetch_books(&conn, None).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Sample Title");
        assert_eq!(books[0].authors, "A. Author");
        assert!(books[0].available);
    }

    #[test]
    fn unlinked_book_shows_na_authors() {
        let conn = open_in_memory().unwrap();
        create_book(&conn, "Orphan", None, None, &[]).unwrap();

        let books = fetch_books(&conn, None).unwrap();
        assert_eq!(books[0].authors, "N/A");
        assert!(books[0].genre.is_none());
        assert!(books[0].publication_year.is_none());
    }

    #[test]
    fn search_matches_title_genre_and_author() {
        let conn = open_in_memory().unwrap();
        seeded_catalog(&conn);

        let by_title = fetch_books(&conn, Some("Sample")).unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].title, "Sample Title");

        let by_genre = fetch_books(&conn, Some("history")).unwrap();
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].title, "Past Times");

        let by_author = fetch_books(&conn, Some("Historian")).unwrap();
        assert_eq!(by_author.len(), 1);

        assert!(fetch_books(&conn, Some("zzz")).unwrap().is_empty());
    }

    #[test]
    fn blank_search_is_no_filter() {
        let conn = open_in_memory().unwrap();
        seeded_catalog(&conn);

        assert_eq!(fetch_books(&conn, Some("   ")).unwrap().len(), 2);
    }

    #[test]
    fn update_replaces_author_links() {
        let conn = open_in_memory().unwrap();
        let (book_id, _) = seeded_catalog(&conn);
        let third = create_author(&conn, "C. Poet", None).unwrap();

        update_book(
            &conn,
            book_id,
            "Sample Title (2nd ed.)",
            Some("Fiction"),
            Some(2021),
            &[third.id],
        )
        .unwrap();

        let books = fetch_books(&conn, Some("2nd ed")).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].authors, "C. Poet");
        assert_eq!(books[0].publication_year, Some(2021));
    }

    #[test]
    fn updating_a_missing_book_is_an_error() {
        let conn = open_in_memory().unwrap();
        let err = update_book(&conn, 999, "Ghost", None, None, &[]).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Book not found");
    }

    #[test]
    fn delete_without_loans_succeeds() {
        let conn = open_in_memory().unwrap();
        let (book_id, _) = seeded_catalog(&conn);

        delete_book(&conn, book_id).unwrap();
        assert_eq!(fetch_books(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn delete_with_loan_reports_active_loans() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        let (book_id, _) = seeded_catalog(&conn);
        borrow_book(&conn, 2, book_id).unwrap();

        let err = delete_book(&conn, book_id).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "Cannot delete book. There are active loans associated with it."
        );
    }
}
