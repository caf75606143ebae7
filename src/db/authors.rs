use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode};

use crate::db::error::StoreError;
use crate::models::Author;

/// Retrieve every author sorted by name. The query doubles as the single
/// source of truth for how author pickers order their entries.
pub fn fetch_authors(conn: &Connection) -> Result<Vec<Author>> {
    let mut stmt = conn
        .prepare("SELECT id, name, bio FROM authors ORDER BY name")
        .context("failed to prepare author query")?;

    let authors = stmt
        .query_map([], |row| {
            Ok(Author {
                id: row.get(0)?,
                name: row.get(1)?,
                bio: row.get(2)?,
            })
        })
        .context("failed to load authors")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect authors")?;

    Ok(authors)
}

/// Insert a new author, returning the hydrated struct so the caller can push
/// it straight into the in-memory list. Name collisions map to the
/// duplicate-author message.
pub fn create_author(conn: &Connection, name: &str, bio: Option<&str>) -> Result<Author> {
    conn.execute(
        "INSERT INTO authors (name, bio) VALUES (?1, ?2)",
        params![name, bio],
    )
    .map_err(|err| map_duplicate_name(err, name))
    .context("failed to insert author")?;

    let id = conn.last_insert_rowid();
    Ok(Author {
        id,
        name: name.to_string(),
        bio: bio.map(str::to_string),
    })
}

/// Remove an author row. The schema cascades to `book_authors`, so books
/// simply lose the link.
pub fn delete_author(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM authors WHERE id = ?1", params![id])
        .context("failed to delete author")?;

    if deleted == 0 {
        Err(anyhow!("Author not found"))
    } else {
        Ok(())
    }
}

/// Coerce the unique-name constraint into a human-readable message. Other
/// store errors pass through untouched.
fn map_duplicate_name(err: SqlError, name: &str) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        StoreError::DuplicateAuthor(name.to_string()).into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::books::{create_book, fetch_books};
    use crate::db::connection::open_in_memory;

    #[test]
    fn new_author_appears_in_listing() {
        let conn = open_in_memory().unwrap();
        create_author(&conn, "Zadie Example", None).unwrap();
        create_author(&conn, "Alan Example", Some("Bio.")).unwrap();

        let authors = fetch_authors(&conn).unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].name, "Alan Example");
        assert_eq!(authors[1].name, "Zadie Example");
    }

    #[test]
    fn duplicate_name_is_rejected_with_message() {
        let conn = open_in_memory().unwrap();
        create_author(&conn, "A. Author", None).unwrap();

        let err = create_author(&conn, "A. Author", Some("other bio")).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "Author name 'A. Author' already exists."
        );
        assert_eq!(fetch_authors(&conn).unwrap().len(), 1);
    }

    #[test]
    fn deleting_an_author_unlinks_their_books() {
        let conn = open_in_memory().unwrap();
        let author = create_author(&conn, "A. Author", None).unwrap();
        create_book(&conn, "Linked", None, None, &[author.id]).unwrap();

        delete_author(&conn, author.id).unwrap();

        let books = fetch_books(&conn, None).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].authors, "N/A");
    }

    #[test]
    fn deleting_a_missing_author_is_an_error() {
        let conn = open_in_memory().unwrap();
        let err = delete_author(&conn, 42).unwrap_err();
        assert_eq!(err.root_cause().to_string(), "Author not found");
    }
}
