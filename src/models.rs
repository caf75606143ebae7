//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. The intent is that these types stay light-weight data holders so other
//! layers can focus on presentation and persistence logic.

use std::fmt;

/// Closed enumeration of account roles. The role is fixed at login and every
/// capability check in the UI goes through these helpers rather than through
/// type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Librarian,
    Member,
}

impl Role {
    /// Decode the `role_id` column. Anything outside the closed set is
    /// rejected by the caller.
    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            1 => Some(Role::Librarian),
            2 => Some(Role::Member),
            _ => None,
        }
    }

    /// Numeric form used in query parameters.
    pub fn id(self) -> i64 {
        match self {
            Role::Librarian => 1,
            Role::Member => 2,
        }
    }

    /// Librarians get full CRUD on books and authors plus the overdue report.
    pub fn can_manage_catalog(self) -> bool {
        matches!(self, Role::Librarian)
    }

    /// Members borrow and return books and keep a personal loan list.
    pub fn can_borrow(self) -> bool {
        matches!(self, Role::Member)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Librarian => "Librarian",
            Role::Member => "Member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An authenticated account row. One record type covers both roles; the
/// `role` field drives which affordances the UI constructs after login.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

/// Catalog row as rendered in the book table. `authors` carries all linked
/// author names flattened into one comma-separated column ("N/A" when a book
/// has no links yet), because that is the shape every listing consumes.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub genre: Option<String>,
    pub publication_year: Option<i64>,
    /// Derived flag kept in sync with active loans by database triggers; the
    /// application only ever reads it.
    pub available: bool,
    pub authors: String,
}

impl Book {
    pub fn availability_label(&self) -> &'static str {
        if self.available {
            "Available"
        } else {
            "Unavailable"
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
}

/// One loan joined with its book title, the shape the "My Loans" screen
/// renders. A missing `return_date` denotes an active loan.
#[derive(Debug, Clone)]
pub struct Loan {
    pub id: i64,
    pub book_title: String,
    pub borrow_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
}

impl Loan {
    pub fn status(&self) -> &'static str {
        if self.return_date.is_some() {
            "Returned"
        } else {
            "Active"
        }
    }
}

/// Club row joined with its creator's full name.
#[derive(Debug, Clone)]
pub struct Club {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub creator: String,
}

/// One row of a club's roster.
#[derive(Debug, Clone)]
pub struct ClubMember {
    pub full_name: String,
    pub email: String,
    pub join_date: String,
}

/// Named counts shown on the dashboard stat cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardStats {
    pub books: i64,
    pub members: i64,
    pub active_loans: i64,
}

/// Row of the `PopularBooksReport` view.
#[derive(Debug, Clone)]
pub struct PopularBook {
    pub title: String,
    pub genre: Option<String>,
    pub times_borrowed: i64,
}

/// Row of the `OverdueBooksReport` view.
#[derive(Debug, Clone)]
pub struct OverdueLoan {
    pub title: String,
    pub borrower: String,
    pub due_date: String,
    pub days_overdue: i64,
}
