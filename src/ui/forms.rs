use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Author, Book, Club, ClubMember};

/// Login form state. The password field renders masked but is kept verbatim
/// for the equality predicate in the login query.
#[derive(Default, Clone)]
pub(crate) struct LoginForm {
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) active: LoginField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum LoginField {
    #[default]
    Username,
    Password,
}

impl LoginForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            LoginField::Username => self.username.push(ch),
            LoginField::Password => self.password.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            LoginField::Username => {
                self.username.pop();
            }
            LoginField::Password => {
                self.password.pop();
            }
        }
    }

    /// Validate locally before any store round-trip is attempted.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String)> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(anyhow!("Username is required."));
        }
        Ok((username.to_string(), self.password.clone()))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: LoginField) -> Line<'static> {
        let (value, is_active) = match field {
            LoginField::Username => (self.username.clone(), self.active == LoginField::Username),
            LoginField::Password => (
                "*".repeat(self.password.chars().count()),
                self.active == LoginField::Password,
            ),
        };

        let display = if value.is_empty() {
            "<required>".to_string()
        } else {
            value
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if display == "<required>" {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: LoginField) -> usize {
        match field {
            LoginField::Username => self.username.chars().count(),
            LoginField::Password => self.password.chars().count(),
        }
    }
}

/// One entry of the author multi-select inside the book form.
#[derive(Clone)]
pub(crate) struct AuthorChoice {
    pub(crate) author: Author,
    pub(crate) selected: bool,
}

/// Form state for creating and editing books, including the author
/// multi-select checklist.
#[derive(Clone)]
pub(crate) struct BookForm {
    pub(crate) title: String,
    pub(crate) genre: String,
    pub(crate) year: String,
    pub(crate) authors: Vec<AuthorChoice>,
    pub(crate) author_cursor: usize,
    pub(crate) active: BookField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum BookField {
    Title,
    Genre,
    Year,
    Authors,
}

impl BookForm {
    pub(crate) fn new(authors: Vec<Author>) -> Self {
        Self {
            title: String::new(),
            genre: String::new(),
            year: String::new(),
            authors: authors
                .into_iter()
                .map(|author| AuthorChoice {
                    author,
                    selected: false,
                })
                .collect(),
            author_cursor: 0,
            active: BookField::Title,
            error: None,
        }
    }

    /// Populate the form from a catalog row when editing. The current links
    /// are recovered by matching names against the flattened authors column,
    /// which is the only author information the row carries.
    pub(crate) fn from_book(book: &Book, authors: Vec<Author>) -> Self {
        let linked: Vec<&str> = book.authors.split(", ").collect();
        let mut form = Self::new(authors);
        form.title = book.title.clone();
        form.genre = book.genre.clone().unwrap_or_default();
        form.year = book
            .publication_year
            .map(|year| year.to_string())
            .unwrap_or_default();
        for choice in &mut form.authors {
            choice.selected = linked.contains(&choice.author.name.as_str());
        }
        form
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Genre,
            BookField::Genre => BookField::Year,
            BookField::Year => BookField::Authors,
            BookField::Authors => BookField::Title,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            BookField::Title => BookField::Authors,
            BookField::Genre => BookField::Title,
            BookField::Year => BookField::Genre,
            BookField::Authors => BookField::Year,
        };
    }

    /// Append a character to the active field. In the author checklist a
    /// space toggles the highlighted entry instead of inserting text, and the
    /// year field accepts digits only.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            BookField::Title => {
                if ch.is_control() {
                    return false;
                }
                self.title.push(ch);
                true
            }
            BookField::Genre => {
                if ch.is_control() {
                    return false;
                }
                self.genre.push(ch);
                true
            }
            BookField::Year => {
                if ch.is_ascii_digit() {
                    self.year.push(ch);
                    true
                } else {
                    false
                }
            }
            BookField::Authors => {
                if ch == ' ' {
                    self.toggle_author();
                    true
                } else {
                    false
                }
            }
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            BookField::Title => {
                self.title.pop();
            }
            BookField::Genre => {
                self.genre.pop();
            }
            BookField::Year => {
                self.year.pop();
            }
            BookField::Authors => {}
        }
    }

    pub(crate) fn move_author_cursor(&mut self, offset: isize) {
        if self.active != BookField::Authors || self.authors.is_empty() {
            return;
        }
        let len = self.authors.len() as isize;
        let mut new = self.author_cursor as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.author_cursor = new as usize;
    }

    pub(crate) fn toggle_author(&mut self) {
        if let Some(choice) = self.authors.get_mut(self.author_cursor) {
            choice.selected = !choice.selected;
        }
    }

    /// Validate the inputs and return typed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<(String, Option<String>, Option<i64>, Vec<i64>)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Title cannot be empty."));
        }

        let genre = self.genre.trim();
        let genre = if genre.is_empty() {
            None
        } else {
            Some(genre.to_string())
        };

        let year_raw = self.year.trim();
        let year = if year_raw.is_empty() {
            None
        } else {
            Some(
                year_raw
                    .parse::<i64>()
                    .map_err(|_| anyhow!("Publication year must be a number."))?,
            )
        };

        let author_ids = self
            .authors
            .iter()
            .filter(|choice| choice.selected)
            .map(|choice| choice.author.id)
            .collect();

        Ok((title.to_string(), genre, year, author_ids))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: BookField) -> Line<'static> {
        let (value, is_active, placeholder) = match field {
            BookField::Title => (&self.title, self.active == BookField::Title, "<required>"),
            BookField::Genre => (&self.genre, self.active == BookField::Genre, "<optional>"),
            BookField::Year => (&self.year, self.active == BookField::Year, "<optional>"),
            BookField::Authors => {
                return Line::from(Span::raw(format!("{field_name}:")));
            }
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: BookField) -> usize {
        match field {
            BookField::Title => self.title.chars().count(),
            BookField::Genre => self.genre.chars().count(),
            BookField::Year => self.year.chars().count(),
            BookField::Authors => 0,
        }
    }
}

/// Form state for adding an author.
#[derive(Default, Clone)]
pub(crate) struct AuthorForm {
    pub(crate) name: String,
    pub(crate) bio: String,
    pub(crate) active: AuthorField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum AuthorField {
    #[default]
    Name,
    Bio,
}

impl AuthorForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            AuthorField::Name => AuthorField::Bio,
            AuthorField::Bio => AuthorField::Name,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            AuthorField::Name => self.name.push(ch),
            AuthorField::Bio => self.bio.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            AuthorField::Name => {
                self.name.pop();
            }
            AuthorField::Bio => {
                self.bio.pop();
            }
        }
    }

    pub(crate) fn parse_inputs(&self) -> Result<(String, Option<String>)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Author name cannot be empty."));
        }
        let bio = self.bio.trim();
        let bio = if bio.is_empty() {
            None
        } else {
            Some(bio.to_string())
        };
        Ok((name.to_string(), bio))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: AuthorField) -> Line<'static> {
        let (value, is_active, placeholder) = match field {
            AuthorField::Name => (&self.name, self.active == AuthorField::Name, "<required>"),
            AuthorField::Bio => (&self.bio, self.active == AuthorField::Bio, "<optional>"),
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: AuthorField) -> usize {
        match field {
            AuthorField::Name => self.name.chars().count(),
            AuthorField::Bio => self.bio.chars().count(),
        }
    }
}

/// Form state for creating a book club.
#[derive(Default, Clone)]
pub(crate) struct ClubForm {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) active: ClubField,
    pub(crate) error: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum ClubField {
    #[default]
    Name,
    Description,
}

impl ClubForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            ClubField::Name => ClubField::Description,
            ClubField::Description => ClubField::Name,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            ClubField::Name => self.name.push(ch),
            ClubField::Description => self.description.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            ClubField::Name => {
                self.name.pop();
            }
            ClubField::Description => {
                self.description.pop();
            }
        }
    }

    pub(crate) fn parse_inputs(&self) -> Result<(String, Option<String>)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Club name cannot be empty."));
        }
        let description = self.description.trim();
        let description = if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        };
        Ok((name.to_string(), description))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: ClubField) -> Line<'static> {
        let (value, is_active, placeholder) = match field {
            ClubField::Name => (&self.name, self.active == ClubField::Name, "<required>"),
            ClubField::Description => (
                &self.description,
                self.active == ClubField::Description,
                "<optional>",
            ),
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    pub(crate) fn value_len(&self, field: ClubField) -> usize {
        match field {
            ClubField::Name => self.name.chars().count(),
            ClubField::Description => self.description.chars().count(),
        }
    }
}

/// Confirmation state for deleting a book.
#[derive(Clone)]
pub(crate) struct ConfirmBookDelete {
    pub(crate) id: i64,
    pub(crate) title: String,
}

impl ConfirmBookDelete {
    pub(crate) fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
        }
    }
}

/// Confirmation state for deleting an author.
#[derive(Clone)]
pub(crate) struct ConfirmAuthorDelete {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl ConfirmAuthorDelete {
    pub(crate) fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
        }
    }
}

/// Roster popup contents for the clubs screen.
#[derive(Clone)]
pub(crate) struct MembersPopup {
    pub(crate) club_name: String,
    pub(crate) members: Vec<ClubMember>,
}

impl MembersPopup {
    pub(crate) fn new(club: &Club, members: Vec<ClubMember>) -> Self {
        Self {
            club_name: club.name.clone(),
            members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(id: i64, name: &str) -> Author {
        Author {
            id,
            name: name.to_string(),
            bio: None,
        }
    }

    #[test]
    fn login_requires_a_username() {
        let mut form = LoginForm::default();
        assert!(form.parse_inputs().is_err());

        for ch in "admin".chars() {
            form.push_char(ch);
        }
        let (username, password) = form.parse_inputs().unwrap();
        assert_eq!(username, "admin");
        assert_eq!(password, "");
    }

    #[test]
    fn book_form_requires_a_title_and_numeric_year() {
        let mut form = BookForm::new(vec![author(1, "A. Author")]);
        assert!(form.parse_inputs().is_err());

        form.title = "Sample Title".to_string();
        form.year = "2020".to_string();
        let (title, genre, year, author_ids) = form.parse_inputs().unwrap();
        assert_eq!(title, "Sample Title");
        assert!(genre.is_none());
        assert_eq!(year, Some(2020));
        assert!(author_ids.is_empty());
    }

    #[test]
    fn book_form_year_field_rejects_non_digits() {
        let mut form = BookForm::new(Vec::new());
        form.active = BookField::Year;
        assert!(!form.push_char('x'));
        assert!(form.push_char('2'));
        assert_eq!(form.year, "2");
    }

    #[test]
    fn book_form_space_toggles_the_highlighted_author() {
        let mut form = BookForm::new(vec![author(1, "A. Author"), author(2, "B. Historian")]);
        form.active = BookField::Authors;
        form.move_author_cursor(1);
        form.push_char(' ');

        let (_, _, _, ids) = {
            form.title = "T".to_string();
            form.parse_inputs().unwrap()
        };
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn editing_preselects_linked_authors_by_name() {
        let book = Book {
            id: 7,
            title: "Sample Title".to_string(),
            genre: Some("Fiction".to_string()),
            publication_year: Some(2020),
            available: true,
            authors: "A. Author, B. Historian".to_string(),
        };
        let form = BookForm::from_book(
            &book,
            vec![author(1, "A. Author"), author(2, "C. Poet")],
        );

        assert_eq!(form.title, "Sample Title");
        assert_eq!(form.genre, "Fiction");
        assert_eq!(form.year, "2020");
        assert!(form.authors[0].selected);
        assert!(!form.authors[1].selected);
    }

    #[test]
    fn author_form_requires_a_name() {
        let mut form = AuthorForm::default();
        assert!(form.parse_inputs().is_err());

        form.name = "  A. Author  ".to_string();
        let (name, bio) = form.parse_inputs().unwrap();
        assert_eq!(name, "A. Author");
        assert!(bio.is_none());
    }

    #[test]
    fn club_form_requires_a_name() {
        let mut form = ClubForm::default();
        assert!(form.parse_inputs().is_err());

        form.name = "Mystery Circle".to_string();
        form.description = "Whodunits.".to_string();
        let (name, description) = form.parse_inputs().unwrap();
        assert_eq!(name, "Mystery Circle");
        assert_eq!(description.as_deref(), Some("Whodunits."));
    }
}
