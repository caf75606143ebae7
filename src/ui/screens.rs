use anyhow::Result;
use rusqlite::Connection;

use crate::db::{dashboard_stats, overdue_books, popular_books};
use crate::models::{Author, Book, Club, DashboardStats, Loan, OverdueLoan, PopularBook, Role};

/// List state for the book catalog tab. The filter text is kept here so a
/// refresh after a write can re-run the same search the user typed.
pub(crate) struct CatalogScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) filter: Option<String>,
    pub(crate) selected: usize,
}

impl CatalogScreen {
    pub(crate) fn new(books: Vec<Book>) -> Self {
        Self {
            books,
            filter: None,
            selected: 0,
        }
    }

    pub(crate) fn set_books(&mut self, books: Vec<Book>) {
        self.books = books;
        self.ensure_in_bounds();
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.books.len(), offset);
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        if !self.books.is_empty() {
            self.selected = self.books.len() - 1;
        }
    }

    fn ensure_in_bounds(&mut self) {
        if self.books.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.books.len() {
            self.selected = self.books.len() - 1;
        }
    }
}

/// List state for the librarian's author manager.
pub(crate) struct AuthorsScreen {
    pub(crate) authors: Vec<Author>,
    pub(crate) selected: usize,
}

impl AuthorsScreen {
    pub(crate) fn new(authors: Vec<Author>) -> Self {
        Self {
            authors,
            selected: 0,
        }
    }

    pub(crate) fn set_authors(&mut self, authors: Vec<Author>) {
        self.authors = authors;
        if self.authors.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.authors.len() {
            self.selected = self.authors.len() - 1;
        }
    }

    pub(crate) fn current_author(&self) -> Option<&Author> {
        self.authors.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.authors.len(), offset);
    }
}

/// List state for the clubs tab.
pub(crate) struct ClubsScreen {
    pub(crate) clubs: Vec<Club>,
    pub(crate) selected: usize,
}

impl ClubsScreen {
    pub(crate) fn new(clubs: Vec<Club>) -> Self {
        Self { clubs, selected: 0 }
    }

    pub(crate) fn set_clubs(&mut self, clubs: Vec<Club>) {
        self.clubs = clubs;
        if self.clubs.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.clubs.len() {
            self.selected = self.clubs.len() - 1;
        }
    }

    pub(crate) fn current_club(&self) -> Option<&Club> {
        self.clubs.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.clubs.len(), offset);
    }
}

/// List state for the member's personal loans tab.
pub(crate) struct LoansScreen {
    pub(crate) loans: Vec<Loan>,
    pub(crate) selected: usize,
}

impl LoansScreen {
    pub(crate) fn new(loans: Vec<Loan>) -> Self {
        Self { loans, selected: 0 }
    }

    pub(crate) fn set_loans(&mut self, loans: Vec<Loan>) {
        self.loans = loans;
        if self.loans.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.loans.len() {
            self.selected = self.loans.len() - 1;
        }
    }

    pub(crate) fn current_loan(&self) -> Option<&Loan> {
        self.loans.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.loans.len(), offset);
    }
}

/// Aggregates backing the dashboard tab. Librarians see the overdue report
/// in the detail table; members see the popular-books ranking instead.
pub(crate) struct DashboardScreen {
    pub(crate) stats: DashboardStats,
    pub(crate) popular: Vec<PopularBook>,
    pub(crate) overdue: Vec<OverdueLoan>,
}

impl DashboardScreen {
    pub(crate) fn load(conn: &Connection, role: Role) -> Result<Self> {
        let mut screen = Self {
            stats: DashboardStats::default(),
            popular: Vec::new(),
            overdue: Vec::new(),
        };
        screen.reload(conn, role)?;
        Ok(screen)
    }

    pub(crate) fn reload(&mut self, conn: &Connection, role: Role) -> Result<()> {
        self.stats = dashboard_stats(conn)?;
        self.popular = popular_books(conn);
        self.overdue = if role.can_manage_catalog() {
            overdue_books(conn)
        } else {
            Vec::new()
        };
        Ok(())
    }
}

fn move_within(selected: &mut usize, len: usize, offset: isize) {
    if len == 0 {
        return;
    }
    let max = len as isize - 1;
    let mut new = *selected as isize + offset;
    if new < 0 {
        new = 0;
    }
    if new > max {
        new = max;
    }
    *selected = new as usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            genre: None,
            publication_year: None,
            available: true,
            authors: "N/A".to_string(),
        }
    }

    #[test]
    fn selection_is_clamped_to_the_list() {
        let mut screen = CatalogScreen::new(vec![book(1, "One"), book(2, "Two")]);
        screen.move_selection(5);
        assert_eq!(screen.selected, 1);
        screen.move_selection(-5);
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn shrinking_the_list_pulls_the_selection_back() {
        let mut screen = CatalogScreen::new(vec![book(1, "One"), book(2, "Two")]);
        screen.select_last();
        screen.set_books(vec![book(1, "One")]);
        assert_eq!(screen.selected, 0);
        assert_eq!(screen.current_book().unwrap().title, "One");
    }

    #[test]
    fn empty_list_has_no_current_entry() {
        let screen = CatalogScreen::new(Vec::new());
        assert!(screen.current_book().is_none());
    }
}
