use anyhow::{Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode};

use crate::db::error::StoreError;
use crate::models::{Club, ClubMember};

/// Every club joined with its creator's full name.
pub fn fetch_clubs(conn: &Connection) -> Result<Vec<Club>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.name, c.description, u.full_name
             FROM book_clubs c
             JOIN users u ON u.id = c.created_by
             ORDER BY c.id",
        )
        .context("failed to prepare club query")?;

    let clubs = stmt
        .query_map([], |row| {
            Ok(Club {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                creator: row.get(3)?,
            })
        })
        .context("failed to load clubs")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect clubs")?;

    Ok(clubs)
}

/// Create a club owned by the given user.
pub fn create_club(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    created_by: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO book_clubs (name, description, created_by) VALUES (?1, ?2, ?3)",
        params![name, description, created_by],
    )
    .context("failed to insert club")?;

    Ok(())
}

/// Add the user to a club. The (club, user) pair is unique, so a repeat
/// insert violates the primary key and maps to the already-a-member message.
pub fn join_club(conn: &Connection, user_id: i64, club_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO club_memberships (club_id, user_id, join_date)
         VALUES (?1, ?2, date('now'))",
        params![club_id, user_id],
    )
    .map_err(map_duplicate_membership)
    .context("failed to join club")?;

    Ok(())
}

/// A club's roster: member names, emails, and join dates.
pub fn fetch_club_members(conn: &Connection, club_id: i64) -> Result<Vec<ClubMember>> {
    let mut stmt = conn
        .prepare(
            "SELECT u.full_name, u.email, cm.join_date
             FROM club_memberships cm
             JOIN users u ON u.id = cm.user_id
             WHERE cm.club_id = ?1
             ORDER BY cm.join_date, u.full_name",
        )
        .context("failed to prepare member query")?;

    let members = stmt
        .query_map(params![club_id], |row| {
            Ok(ClubMember {
                full_name: row.get(0)?,
                email: row.get(1)?,
                join_date: row.get(2)?,
            })
        })
        .context("failed to load club members")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect club members")?;

    Ok(members)
}

fn map_duplicate_membership(err: SqlError) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        StoreError::AlreadyClubMember.into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::{open_in_memory, seed_default_users};

    const LIBRARIAN_ID: i64 = 1;
    const MEMBER_ID: i64 = 2;

    #[test]
    fn created_club_lists_its_creator() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();

        create_club(&conn, "Mystery Circle", Some("Whodunits only."), LIBRARIAN_ID).unwrap();

        let clubs = fetch_clubs(&conn).unwrap();
        assert_eq!(clubs.len(), 1);
        assert_eq!(clubs[0].name, "Mystery Circle");
        assert_eq!(clubs[0].creator, "Default Librarian");
    }

    #[test]
    fn joining_twice_reports_already_a_member() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        create_club(&conn, "Sci-Fi Society", None, LIBRARIAN_ID).unwrap();
        let club_id = fetch_clubs(&conn).unwrap()[0].id;

        join_club(&conn, MEMBER_ID, club_id).unwrap();
        let err = join_club(&conn, MEMBER_ID, club_id).unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            "You are already a member of this club."
        );
    }

    #[test]
    fn roster_lists_joined_members_with_dates() {
        let conn = open_in_memory().unwrap();
        seed_default_users(&conn).unwrap();
        create_club(&conn, "Poetry Corner", None, LIBRARIAN_ID).unwrap();
        let club_id = fetch_clubs(&conn).unwrap()[0].id;

        join_club(&conn, MEMBER_ID, club_id).unwrap();
        join_club(&conn, LIBRARIAN_ID, club_id).unwrap();

        let members = fetch_club_members(&conn, club_id).unwrap();
        assert_eq!(members.len(), 2);
        let today: String = conn
            .query_row("SELECT date('now')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(members[0].join_date, today);

        assert!(fetch_club_members(&conn, 999).unwrap().is_empty());
    }
}
