use thiserror::Error;

/// Constraint violations that deserve a friendlier message than the raw
/// SQLite error text. The `Display` text is exactly what the UI shows, so
/// wording changes happen here and nowhere else. Everything not covered by a
/// variant passes through with its original message.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Author name '{0}' already exists.")]
    DuplicateAuthor(String),

    #[error("You are already a member of this club.")]
    AlreadyClubMember,

    #[error("Cannot delete book. There are active loans associated with it.")]
    BookHasActiveLoans,
}
