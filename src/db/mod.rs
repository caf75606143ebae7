//! Persistence module split across logical submodules. Every function takes
//! an explicit `&Connection`; the handle is opened once in `main` and owned
//! by the application state for the life of the process.

mod authors;
mod books;
mod clubs;
mod connection;
mod error;
mod loans;
mod reports;
mod users;

pub use authors::{create_author, delete_author, fetch_authors};
pub use books::{create_book, delete_book, fetch_books, update_book};
pub use clubs::{create_club, fetch_club_members, fetch_clubs, join_club};
pub use connection::{apply_schema, ensure_schema, seed_default_users};
pub use error::StoreError;
pub use loans::{borrow_book, fetch_user_loans, return_book};
pub use reports::{dashboard_stats, overdue_books, popular_books};
pub use users::authenticate;
