use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    authenticate, borrow_book, create_author, create_book, create_club, delete_author,
    delete_book, fetch_authors, fetch_books, fetch_club_members, fetch_clubs, fetch_user_loans,
    join_club, return_book, update_book,
};
use crate::models::{Book, Role, User};

use super::forms::{
    AuthorField, AuthorForm, BookField, BookForm, ClubField, ClubForm, ConfirmAuthorDelete,
    ConfirmBookDelete, LoginField, LoginForm, MembersPopup,
};
use super::helpers::{centered_rect, display_optional, surface_error};
use super::screens::{AuthorsScreen, CatalogScreen, ClubsScreen, DashboardScreen, LoansScreen};

/// Footer space reserved for status messages and key hints.
const FOOTER_HEIGHT: u16 = 3;

/// High-level navigation states. The tab set a user can reach is fixed by
/// their role at login; every role-gated key below checks the capability
/// explicitly before constructing the librarian-only states.
enum Screen {
    Login(LoginForm),
    Dashboard(DashboardScreen),
    Catalog(CatalogScreen),
    Authors(AuthorsScreen),
    Clubs(ClubsScreen),
    Loans(LoansScreen),
}

/// Fine-grained modal states layered over the current screen.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { id: i64, form: BookForm },
    ConfirmBookDelete(ConfirmBookDelete),
    AddingAuthor(AuthorForm),
    ConfirmAuthorDelete(ConfirmAuthorDelete),
    CreatingClub(ClubForm),
    ViewingMembers(MembersPopup),
    Searching(SearchState),
}

/// State for the inline catalog search. Each keystroke re-runs the catalog
/// query with the new term, so the filter always reflects what the store
/// would return rather than a client-side approximation.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. The connection lives
/// here for the whole process; every data-access call borrows it.
pub struct App {
    conn: Connection,
    session: Option<User>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            session: None,
            screen: Screen::Login(LoginForm::default()),
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingBook(form) => self.handle_add_book(code, form)?,
            Mode::EditingBook { id, form } => self.handle_edit_book(code, id, form)?,
            Mode::ConfirmBookDelete(confirm) => self.handle_confirm_book_delete(code, confirm)?,
            Mode::AddingAuthor(form) => self.handle_add_author(code, form)?,
            Mode::ConfirmAuthorDelete(confirm) => {
                self.handle_confirm_author_delete(code, confirm)?
            }
            Mode::CreatingClub(form) => self.handle_create_club(code, form)?,
            Mode::ViewingMembers(popup) => handle_members_popup(code, popup),
            Mode::Searching(state) => self.handle_search(code, state)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let user = match self.session.clone() {
            Some(user) => user,
            None => return self.handle_login_key(code, exit),
        };

        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                *exit = true;
                return Ok(Mode::Normal);
            }
            KeyCode::Char('1') => {
                self.open_dashboard()?;
                return Ok(Mode::Normal);
            }
            KeyCode::Char('2') => {
                self.open_catalog()?;
                return Ok(Mode::Normal);
            }
            KeyCode::Char('3') => {
                self.open_clubs()?;
                return Ok(Mode::Normal);
            }
            KeyCode::Char('4') => {
                if user.role.can_manage_catalog() {
                    self.open_authors()?;
                } else {
                    self.open_loans()?;
                }
                return Ok(Mode::Normal);
            }
            _ => {}
        }

        let mut status_to_set: Option<(String, StatusKind)> = None;
        let mut back_to_catalog = false;
        let mut open_author_manager = false;

        match self.screen {
            Screen::Login(_) => {}
            Screen::Dashboard(ref mut dash) => {
                if let KeyCode::Char('r') | KeyCode::Char('R') = code {
                    dash.reload(&self.conn, user.role)?;
                    status_to_set = Some(("Dashboard refreshed.".to_string(), StatusKind::Info));
                }
            }
            Screen::Catalog(ref mut catalog) => match code {
                KeyCode::Up => catalog.move_selection(-1),
                KeyCode::Down => catalog.move_selection(1),
                KeyCode::PageUp => catalog.move_selection(-5),
                KeyCode::PageDown => catalog.move_selection(5),
                KeyCode::Home => catalog.select_first(),
                KeyCode::End => catalog.select_last(),
                KeyCode::Char('f') | KeyCode::Char('F') => {
                    return Ok(Mode::Searching(SearchState {
                        query: catalog.filter.clone().unwrap_or_default(),
                    }));
                }
                KeyCode::Char('+') if user.role.can_manage_catalog() => {
                    let authors = fetch_authors(&self.conn)?;
                    return Ok(Mode::AddingBook(BookForm::new(authors)));
                }
                KeyCode::Char('e') | KeyCode::Char('E') if user.role.can_manage_catalog() => {
                    if let Some(book) = catalog.current_book().cloned() {
                        let authors = fetch_authors(&self.conn)?;
                        return Ok(Mode::EditingBook {
                            id: book.id,
                            form: BookForm::from_book(&book, authors),
                        });
                    }
                    status_to_set =
                        Some(("No book selected to edit.".to_string(), StatusKind::Error));
                }
                KeyCode::Char('-') if user.role.can_manage_catalog() => {
                    if let Some(book) = catalog.current_book().cloned() {
                        return Ok(Mode::ConfirmBookDelete(ConfirmBookDelete::from(book)));
                    }
                    status_to_set =
                        Some(("No book selected to delete.".to_string(), StatusKind::Error));
                }
                KeyCode::Char('a') | KeyCode::Char('A') if user.role.can_manage_catalog() => {
                    open_author_manager = true;
                }
                KeyCode::Enter if user.role.can_borrow() => {
                    if let Some(book) = catalog.current_book().cloned() {
                        if !book.available {
                            status_to_set = Some((
                                format!("'{}' is currently unavailable.", book.title),
                                StatusKind::Error,
                            ));
                        } else {
                            match borrow_book(&self.conn, user.id, book.id) {
                                Ok(()) => {
                                    let books =
                                        fetch_books(&self.conn, catalog.filter.as_deref())?;
                                    catalog.set_books(books);
                                    status_to_set = Some((
                                        "Book borrowed successfully!".to_string(),
                                        StatusKind::Info,
                                    ));
                                }
                                Err(err) => {
                                    status_to_set =
                                        Some((surface_error(&err), StatusKind::Error));
                                }
                            }
                        }
                    } else {
                        status_to_set =
                            Some(("No book selected to borrow.".to_string(), StatusKind::Error));
                    }
                }
                _ => {}
            },
            Screen::Authors(ref mut authors) => match code {
                KeyCode::Up => authors.move_selection(-1),
                KeyCode::Down => authors.move_selection(1),
                KeyCode::Esc => back_to_catalog = true,
                KeyCode::Char('+') => {
                    return Ok(Mode::AddingAuthor(AuthorForm::default()));
                }
                KeyCode::Char('-') => {
                    if let Some(author) = authors.current_author().cloned() {
                        return Ok(Mode::ConfirmAuthorDelete(ConfirmAuthorDelete::from(author)));
                    }
                    status_to_set =
                        Some(("No author selected to delete.".to_string(), StatusKind::Error));
                }
                _ => {}
            },
            Screen::Clubs(ref mut clubs) => match code {
                KeyCode::Up => clubs.move_selection(-1),
                KeyCode::Down => clubs.move_selection(1),
                KeyCode::Char('+') | KeyCode::Char('c') | KeyCode::Char('C') => {
                    return Ok(Mode::CreatingClub(ClubForm::default()));
                }
                KeyCode::Enter | KeyCode::Char('j') | KeyCode::Char('J') => {
                    if let Some(club) = clubs.current_club().cloned() {
                        match join_club(&self.conn, user.id, club.id) {
                            Ok(()) => {
                                status_to_set = Some((
                                    "Joined club successfully!".to_string(),
                                    StatusKind::Info,
                                ));
                            }
                            Err(err) => {
                                status_to_set = Some((surface_error(&err), StatusKind::Error));
                            }
                        }
                    } else {
                        status_to_set =
                            Some(("No club selected to join.".to_string(), StatusKind::Error));
                    }
                }
                KeyCode::Char('m') | KeyCode::Char('M') => {
                    if let Some(club) = clubs.current_club().cloned() {
                        let members = fetch_club_members(&self.conn, club.id)?;
                        return Ok(Mode::ViewingMembers(MembersPopup::new(&club, members)));
                    }
                    status_to_set =
                        Some(("Please select a club row first.".to_string(), StatusKind::Error));
                }
                _ => {}
            },
            Screen::Loans(ref mut loans) => match code {
                KeyCode::Up => loans.move_selection(-1),
                KeyCode::Down => loans.move_selection(1),
                KeyCode::Enter | KeyCode::Char('r') | KeyCode::Char('R') => {
                    if let Some(loan) = loans.current_loan().cloned() {
                        match return_book(&self.conn, loan.id) {
                            Ok(()) => {
                                let refreshed = fetch_user_loans(&self.conn, user.id)?;
                                loans.set_loans(refreshed);
                                status_to_set = Some((
                                    "Book returned successfully.".to_string(),
                                    StatusKind::Info,
                                ));
                            }
                            Err(err) => {
                                status_to_set = Some((surface_error(&err), StatusKind::Error));
                            }
                        }
                    } else {
                        status_to_set =
                            Some(("No loan selected to return.".to_string(), StatusKind::Error));
                    }
                }
                _ => {}
            },
        }

        if back_to_catalog {
            self.open_catalog()?;
        }

        if open_author_manager {
            self.open_authors()?;
        }

        if let Some((text, kind)) = status_to_set {
            self.set_status(text, kind);
        }

        Ok(Mode::Normal)
    }

    fn handle_login_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let mut submit: Option<(String, String)> = None;

        if let Screen::Login(form) = &mut self.screen {
            match code {
                KeyCode::Esc => *exit = true,
                KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Enter => match form.parse_inputs() {
                    Ok(credentials) => submit = Some(credentials),
                    Err(err) => form.error = Some(surface_error(&err)),
                },
                KeyCode::Char(ch) => {
                    if form.push_char(ch) {
                        form.error = None;
                    }
                }
                _ => {}
            }
        }

        if let Some((username, password)) = submit {
            self.attempt_login(&username, &password)?;
        }

        Ok(Mode::Normal)
    }

    fn attempt_login(&mut self, username: &str, password: &str) -> Result<()> {
        match authenticate(&self.conn, username, password)? {
            Some(user) => {
                let greeting = format!("Welcome, {} ({}).", user.full_name, user.role.label());
                let role = user.role;
                self.session = Some(user);
                self.screen = Screen::Dashboard(DashboardScreen::load(&self.conn, role)?);
                self.set_status(greeting, StatusKind::Info);
            }
            None => {
                if let Screen::Login(form) = &mut self.screen {
                    form.error = Some("Invalid credentials".to_string());
                    form.password.clear();
                }
            }
        }
        Ok(())
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add book cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Up => form.move_author_cursor(-1),
            KeyCode::Down => form.move_author_cursor(1),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((title, genre, year, author_ids)) => {
                    match create_book(&self.conn, &title, genre.as_deref(), year, &author_ids) {
                        Ok(book_id) => {
                            self.refresh_catalog()?;
                            self.set_status(
                                format!("Book '{title}' added successfully with ID {book_id}."),
                                StatusKind::Info,
                            );
                            return Ok(Mode::Normal);
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(Mode::AddingBook(form))
    }

    fn handle_edit_book(&mut self, code: KeyCode, id: i64, mut form: BookForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Up => form.move_author_cursor(-1),
            KeyCode::Down => form.move_author_cursor(1),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((title, genre, year, author_ids)) => {
                    match update_book(&self.conn, id, &title, genre.as_deref(), year, &author_ids)
                    {
                        Ok(()) => {
                            self.refresh_catalog()?;
                            self.set_status(
                                format!("Book ID {id} updated successfully."),
                                StatusKind::Info,
                            );
                            return Ok(Mode::Normal);
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(Mode::EditingBook { id, form })
    }

    fn handle_confirm_book_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmBookDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_book(&self.conn, confirm.id) {
                    Ok(()) => {
                        self.refresh_catalog()?;
                        self.set_status(
                            format!("Book ID {} deleted successfully.", confirm.id),
                            StatusKind::Info,
                        );
                    }
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                    }
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmBookDelete(confirm)),
        }
    }

    fn handle_add_author(&mut self, code: KeyCode, mut form: AuthorForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Add author cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, bio)) => match create_author(&self.conn, &name, bio.as_deref()) {
                    Ok(author) => {
                        self.refresh_authors()?;
                        self.set_status(
                            format!("Author '{}' added successfully.", author.name),
                            StatusKind::Info,
                        );
                        return Ok(Mode::Normal);
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    }
                },
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(Mode::AddingAuthor(form))
    }

    fn handle_confirm_author_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmAuthorDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match delete_author(&self.conn, confirm.id) {
                    Ok(()) => {
                        self.refresh_authors()?;
                        self.set_status("Author deleted successfully.", StatusKind::Info);
                    }
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                    }
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmAuthorDelete(confirm)),
        }
    }

    fn handle_create_club(&mut self, code: KeyCode, mut form: ClubForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Create club cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((name, description)) => {
                    let user_id = self.session.as_ref().map(|user| user.id).unwrap_or_default();
                    match create_club(&self.conn, &name, description.as_deref(), user_id) {
                        Ok(()) => {
                            self.refresh_clubs()?;
                            self.set_status("Club created successfully!", StatusKind::Info);
                            return Ok(Mode::Normal);
                        }
                        Err(err) => {
                            let message = surface_error(&err);
                            form.error = Some(message.clone());
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        Ok(Mode::CreatingClub(form))
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                let books = fetch_books(&self.conn, None)?;
                if let Screen::Catalog(catalog) = &mut self.screen {
                    catalog.filter = None;
                    catalog.set_books(books);
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => return Ok(Mode::Normal),
            KeyCode::Up => {
                if let Screen::Catalog(catalog) = &mut self.screen {
                    catalog.move_selection(-1);
                }
                return Ok(Mode::Searching(state));
            }
            KeyCode::Down => {
                if let Screen::Catalog(catalog) = &mut self.screen {
                    catalog.move_selection(1);
                }
                return Ok(Mode::Searching(state));
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => return Ok(Mode::Searching(state)),
        }

        let filter = if state.query.trim().is_empty() {
            None
        } else {
            Some(state.query.clone())
        };
        let books = fetch_books(&self.conn, filter.as_deref())?;
        if let Screen::Catalog(catalog) = &mut self.screen {
            catalog.filter = filter;
            catalog.set_books(books);
        }

        Ok(Mode::Searching(state))
    }

    fn open_dashboard(&mut self) -> Result<()> {
        let role = self.current_role();
        self.screen = Screen::Dashboard(DashboardScreen::load(&self.conn, role)?);
        Ok(())
    }

    fn open_catalog(&mut self) -> Result<()> {
        let books = fetch_books(&self.conn, None)?;
        self.screen = Screen::Catalog(CatalogScreen::new(books));
        Ok(())
    }

    fn open_authors(&mut self) -> Result<()> {
        let authors = fetch_authors(&self.conn)?;
        self.screen = Screen::Authors(AuthorsScreen::new(authors));
        Ok(())
    }

    fn open_clubs(&mut self) -> Result<()> {
        let clubs = fetch_clubs(&self.conn)?;
        self.screen = Screen::Clubs(ClubsScreen::new(clubs));
        Ok(())
    }

    fn open_loans(&mut self) -> Result<()> {
        let user_id = self.session.as_ref().map(|user| user.id).unwrap_or_default();
        let loans = fetch_user_loans(&self.conn, user_id)?;
        self.screen = Screen::Loans(LoansScreen::new(loans));
        Ok(())
    }

    fn refresh_catalog(&mut self) -> Result<()> {
        if let Screen::Catalog(catalog) = &mut self.screen {
            let books = fetch_books(&self.conn, catalog.filter.as_deref())?;
            catalog.set_books(books);
        }
        Ok(())
    }

    fn refresh_authors(&mut self) -> Result<()> {
        if let Screen::Authors(authors) = &mut self.screen {
            let refreshed = fetch_authors(&self.conn)?;
            authors.set_authors(refreshed);
        }
        Ok(())
    }

    fn refresh_clubs(&mut self) -> Result<()> {
        if let Screen::Clubs(clubs) = &mut self.screen {
            let refreshed = fetch_clubs(&self.conn)?;
            clubs.set_clubs(refreshed);
        }
        Ok(())
    }

    fn current_role(&self) -> Role {
        self.session
            .as_ref()
            .map(|user| user.role)
            .unwrap_or(Role::Member)
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Login(form) => self.draw_login(frame, content_area, form),
            Screen::Dashboard(dash) => self.draw_dashboard(frame, content_area, dash),
            Screen::Catalog(catalog) => self.draw_catalog(frame, content_area, catalog),
            Screen::Authors(authors) => draw_authors(frame, content_area, authors),
            Screen::Clubs(clubs) => draw_clubs(frame, content_area, clubs),
            Screen::Loans(loans) => draw_loans(frame, content_area, loans),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingBook(form) => draw_book_form(frame, area, "Add New Book", form),
            Mode::EditingBook { form, .. } => draw_book_form(frame, area, "Manage Book", form),
            Mode::ConfirmBookDelete(confirm) => draw_confirm_book(frame, area, confirm),
            Mode::AddingAuthor(form) => draw_author_form(frame, area, form),
            Mode::ConfirmAuthorDelete(confirm) => draw_confirm_author(frame, area, confirm),
            Mode::CreatingClub(form) => draw_club_form(frame, area, form),
            Mode::ViewingMembers(popup) => draw_members_popup(frame, area, popup),
            Mode::Searching(state) => draw_search_bar(frame, area, state),
            Mode::Normal => {}
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect, form: &LoginForm) {
        let popup_area = centered_rect(50, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("SmartLibrary Login")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(Span::styled(
                "SmartLibrary System Login",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            form.build_line("Username", LoginField::Username),
            form.build_line("Password", LoginField::Password),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to sign in • Tab to switch • Esc to quit",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (cursor_x, cursor_y) = match form.active {
            LoginField::Username => {
                let prefix = "Username: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(LoginField::Username) as u16,
                    inner.y + 2,
                )
            }
            LoginField::Password => {
                let prefix = "Password: ".len() as u16;
                (
                    inner.x + prefix + form.value_len(LoginField::Password) as u16,
                    inner.y + 3,
                )
            }
        };
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect, dash: &DashboardScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(1)])
            .split(area);

        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ])
            .split(chunks[0]);

        draw_stat_card(frame, cards[0], "Total Books", dash.stats.books);
        draw_stat_card(frame, cards[1], "Active Members", dash.stats.members);
        draw_stat_card(frame, cards[2], "Active Loans", dash.stats.active_loans);

        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let popular_lines: Vec<Line> = if dash.popular.is_empty() {
            vec![Line::from("No loan data available.")]
        } else {
            dash.popular
                .iter()
                .map(|book| {
                    Line::from(format!("• {} ({} loans)", book.title, book.times_borrowed))
                })
                .collect()
        };
        let popular = Paragraph::new(popular_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Popular Books Report"),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(popular, panels[0]);

        let is_librarian = self.current_role().can_manage_catalog();
        let (detail_title, detail_lines) = if is_librarian {
            let lines: Vec<Line> = if dash.overdue.is_empty() {
                vec![Line::from("No overdue loans.")]
            } else {
                dash.overdue
                    .iter()
                    .map(|row| {
                        Line::from(format!(
                            "{} — {} — due {} — {} days overdue",
                            row.title, row.borrower, row.due_date, row.days_overdue
                        ))
                    })
                    .collect()
            };
            ("Overdue Loans", lines)
        } else {
            let lines: Vec<Line> = if dash.popular.is_empty() {
                vec![Line::from("No loan data available.")]
            } else {
                dash.popular
                    .iter()
                    .map(|book| {
                        Line::from(format!(
                            "{} — {} — borrowed {} times",
                            book.title,
                            display_optional(book.genre.as_deref()),
                            book.times_borrowed
                        ))
                    })
                    .collect()
            };
            ("Most Borrowed", lines)
        };

        let detail = Paragraph::new(detail_lines)
            .block(Block::default().borders(Borders::ALL).title(detail_title))
            .wrap(Wrap { trim: true });
        frame.render_widget(detail, panels[1]);
    }

    fn draw_catalog(&self, frame: &mut Frame, area: Rect, catalog: &CatalogScreen) {
        let title = match &catalog.filter {
            Some(filter) => format!(
                "Book Catalog — {} books — filter: '{}'",
                catalog.books.len(),
                filter
            ),
            None => format!("Book Catalog — {} books", catalog.books.len()),
        };

        let rows: Vec<String> = catalog.books.iter().map(catalog_row).collect();
        let empty_message = if catalog.filter.is_some() {
            "No books match the current search."
        } else {
            "No books in the catalog yet."
        };
        render_rows(frame, area, &title, &rows, catalog.selected, empty_message);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        let hint = |keys: &[(&'static str, &'static str)]| -> Line<'static> {
            let mut spans = Vec::new();
            for (idx, (key, action)) in keys.iter().enumerate() {
                if idx > 0 {
                    spans.push(Span::raw("   "));
                }
                spans.push(Span::styled(*key, key_style));
                spans.push(Span::raw(format!(" {action}")));
            }
            Line::from(spans)
        };

        match (&self.screen, &self.mode) {
            (_, Mode::Searching(_)) => hint(&[
                ("[Type]", "Filter"),
                ("[↑↓]", "Select"),
                ("[Enter]", "Keep Filter"),
                ("[Esc]", "Clear"),
            ]),
            (_, Mode::AddingBook(_)) | (_, Mode::EditingBook { .. }) => hint(&[
                ("[Tab]", "Next Field"),
                ("[Space]", "Toggle Author"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::AddingAuthor(_)) | (_, Mode::CreatingClub(_)) => hint(&[
                ("[Tab]", "Switch Field"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ]),
            (_, Mode::ConfirmBookDelete(_)) | (_, Mode::ConfirmAuthorDelete(_)) => hint(&[
                ("[Y]", "Confirm"),
                ("[N/Esc]", "Cancel"),
            ]),
            (_, Mode::ViewingMembers(_)) => hint(&[("[Esc]", "Close")]),
            (Screen::Login(_), _) => hint(&[
                ("[Tab]", "Switch Field"),
                ("[Enter]", "Sign In"),
                ("[Esc]", "Quit"),
            ]),
            (Screen::Dashboard(_), _) => {
                if self.current_role().can_manage_catalog() {
                    hint(&[
                        ("[r]", "Refresh"),
                        ("[1]", "Dashboard"),
                        ("[2]", "Catalog"),
                        ("[3]", "Clubs"),
                        ("[4]", "Authors"),
                        ("[q]", "Quit"),
                    ])
                } else {
                    hint(&[
                        ("[r]", "Refresh"),
                        ("[1]", "Dashboard"),
                        ("[2]", "Catalog"),
                        ("[3]", "Clubs"),
                        ("[4]", "My Loans"),
                        ("[q]", "Quit"),
                    ])
                }
            }
            (Screen::Catalog(_), _) => {
                if self.current_role().can_manage_catalog() {
                    hint(&[
                        ("[↑↓]", "Select"),
                        ("[f]", "Search"),
                        ("[+]", "Add"),
                        ("[e]", "Edit"),
                        ("[-]", "Delete"),
                        ("[a]", "Authors"),
                        ("[1-4]", "Tabs"),
                        ("[q]", "Quit"),
                    ])
                } else {
                    hint(&[
                        ("[↑↓]", "Select"),
                        ("[f]", "Search"),
                        ("[Enter]", "Borrow"),
                        ("[1-4]", "Tabs"),
                        ("[q]", "Quit"),
                    ])
                }
            }
            (Screen::Authors(_), _) => hint(&[
                ("[↑↓]", "Select"),
                ("[+]", "Add"),
                ("[-]", "Delete"),
                ("[Esc]", "Catalog"),
                ("[q]", "Quit"),
            ]),
            (Screen::Clubs(_), _) => hint(&[
                ("[↑↓]", "Select"),
                ("[+]", "Create"),
                ("[Enter]", "Join"),
                ("[m]", "Members"),
                ("[1-4]", "Tabs"),
                ("[q]", "Quit"),
            ]),
            (Screen::Loans(_), _) => hint(&[
                ("[↑↓]", "Select"),
                ("[Enter]", "Return"),
                ("[1-4]", "Tabs"),
                ("[q]", "Quit"),
            ]),
        }
    }
}

fn handle_members_popup(code: KeyCode, popup: MembersPopup) -> Mode {
    match code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('m') => Mode::Normal,
        _ => Mode::ViewingMembers(popup),
    }
}

fn catalog_row(book: &Book) -> String {
    let genre = display_optional(book.genre.as_deref());
    let year = book
        .publication_year
        .map(|year| year.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "{:>4}  {:<12}  {} ({}, {}) by {}",
        book.id,
        book.availability_label(),
        book.title,
        genre,
        year,
        book.authors
    )
}

/// Render a scrolling list of rows with the selected one highlighted. The
/// window slides so the selection stays visible even on short terminals.
fn render_rows(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[String],
    selected: usize,
    empty_message: &str,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string());

    if rows.is_empty() {
        let message = Paragraph::new(empty_message)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(message, area);
        return;
    }

    let capacity = (area.height.saturating_sub(2) as usize).max(1);
    let start = if selected >= capacity {
        selected + 1 - capacity
    } else {
        0
    };
    let end = min(start + capacity, rows.len());

    let mut lines = Vec::with_capacity(end - start);
    for (offset, row) in rows[start..end].iter().enumerate() {
        let absolute = start + offset;
        if absolute == selected {
            lines.push(Line::from(Span::styled(
                format!("> {row}"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
        } else {
            lines.push(Line::from(format!("  {row}")));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_stat_card(frame: &mut Frame, area: Rect, title: &str, value: i64) {
    let card = Paragraph::new(value.to_string())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        );
    frame.render_widget(card, area);
}

fn draw_authors(frame: &mut Frame, area: Rect, authors: &AuthorsScreen) {
    let rows: Vec<String> = authors
        .authors
        .iter()
        .map(|author| {
            format!(
                "{:>4}  {}  —  {}",
                author.id,
                author.name,
                display_optional(author.bio.as_deref())
            )
        })
        .collect();
    render_rows(
        frame,
        area,
        "Manage Authors",
        &rows,
        authors.selected,
        "No authors yet. Press '+' to add one.",
    );
}

fn draw_clubs(frame: &mut Frame, area: Rect, clubs: &ClubsScreen) {
    let rows: Vec<String> = clubs
        .clubs
        .iter()
        .map(|club| {
            format!(
                "{:>4}  {} — {} (created by {})",
                club.id,
                club.name,
                display_optional(club.description.as_deref()),
                club.creator
            )
        })
        .collect();
    render_rows(
        frame,
        area,
        "Book Clubs",
        &rows,
        clubs.selected,
        "No clubs created yet. Press '+' to start one.",
    );
}

fn draw_loans(frame: &mut Frame, area: Rect, loans: &LoansScreen) {
    let rows: Vec<String> = loans
        .loans
        .iter()
        .map(|loan| {
            format!(
                "{:>4}  {}  borrowed {}  due {}",
                loan.id, loan.book_title, loan.borrow_date, loan.due_date
            )
        })
        .collect();
    render_rows(
        frame,
        area,
        "My Loans",
        &rows,
        loans.selected,
        "No active loans.",
    );
}

fn draw_book_form(frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
    let popup_area = centered_rect(70, 70, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines = vec![
        form.build_line("Title", BookField::Title),
        form.build_line("Genre", BookField::Genre),
        form.build_line("Pub. Year", BookField::Year),
        Line::from(""),
        Line::from(Span::styled(
            "Select Authors (Space toggles):",
            if form.active == BookField::Authors {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            },
        )),
    ];

    if form.authors.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (no authors yet — add them from the author manager)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        // Keep the checklist window small enough for the popup while sliding
        // it with the cursor.
        let capacity = 6usize;
        let start = if form.author_cursor >= capacity {
            form.author_cursor + 1 - capacity
        } else {
            0
        };
        let end = min(start + capacity, form.authors.len());
        for (offset, choice) in form.authors[start..end].iter().enumerate() {
            let absolute = start + offset;
            let mark = if choice.selected { "[x]" } else { "[ ]" };
            let text = format!("  {mark} {}", choice.author.name);
            if form.active == BookField::Authors && absolute == form.author_cursor {
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
            } else {
                lines.push(Line::from(text));
            }
        }
    }

    lines.push(Line::from(""));
    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter to save • Tab to switch • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    let cursor = match form.active {
        BookField::Title => Some((
            inner.x + "Title: ".len() as u16 + form.value_len(BookField::Title) as u16,
            inner.y,
        )),
        BookField::Genre => Some((
            inner.x + "Genre: ".len() as u16 + form.value_len(BookField::Genre) as u16,
            inner.y + 1,
        )),
        BookField::Year => Some((
            inner.x + "Pub. Year: ".len() as u16 + form.value_len(BookField::Year) as u16,
            inner.y + 2,
        )),
        BookField::Authors => None,
    };
    if let Some((cursor_x, cursor_y)) = cursor {
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn draw_author_form(frame: &mut Frame, area: Rect, form: &AuthorForm) {
    let popup_area = centered_rect(60, 40, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title("Add Author").borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines = vec![
        form.build_line("Name", AuthorField::Name),
        form.build_line("Bio", AuthorField::Bio),
        Line::from(""),
    ];

    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter to save • Tab to switch • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    let (cursor_x, cursor_y) = match form.active {
        AuthorField::Name => (
            inner.x + "Name: ".len() as u16 + form.value_len(AuthorField::Name) as u16,
            inner.y,
        ),
        AuthorField::Bio => (
            inner.x + "Bio: ".len() as u16 + form.value_len(AuthorField::Bio) as u16,
            inner.y + 1,
        ),
    };
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn draw_club_form(frame: &mut Frame, area: Rect, form: &ClubForm) {
    let popup_area = centered_rect(60, 40, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Create New Book Club")
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines = vec![
        form.build_line("Club Name", ClubField::Name),
        form.build_line("Description", ClubField::Description),
        Line::from(""),
    ];

    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter to save • Tab to switch • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    let (cursor_x, cursor_y) = match form.active {
        ClubField::Name => (
            inner.x + "Club Name: ".len() as u16 + form.value_len(ClubField::Name) as u16,
            inner.y,
        ),
        ClubField::Description => (
            inner.x + "Description: ".len() as u16
                + form.value_len(ClubField::Description) as u16,
            inner.y + 1,
        ),
    };
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn draw_confirm_book(frame: &mut Frame, area: Rect, confirm: &ConfirmBookDelete) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Confirm Deletion")
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let lines = vec![
        Line::from(format!(
            "Are you sure you want to delete '{}'?",
            confirm.title
        )),
        Line::from("This cannot be undone."),
        Line::from(""),
        Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn draw_confirm_author(frame: &mut Frame, area: Rect, confirm: &ConfirmAuthorDelete) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Confirm Deletion")
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let lines = vec![
        Line::from(format!("Delete author '{}'?", confirm.name)),
        Line::from("This will unlink them from all books."),
        Line::from(""),
        Line::from(Span::styled(
            "Press Y to confirm or N / Esc to cancel.",
            Style::default().fg(Color::Gray),
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn draw_members_popup(frame: &mut Frame, area: Rect, popup: &MembersPopup) {
    let popup_area = centered_rect(70, 60, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!("Members of {}", popup.club_name))
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines: Vec<Line> = if popup.members.is_empty() {
        vec![Line::from("No members yet.")]
    } else {
        popup
            .members
            .iter()
            .map(|member| {
                Line::from(format!(
                    "• {} ({}) joined on {}",
                    member.full_name, member.email, member.join_date
                ))
            })
            .collect()
    };

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Esc to close.",
        Style::default().fg(Color::Gray),
    )));

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn draw_search_bar(frame: &mut Frame, area: Rect, state: &SearchState) {
    let height = 3u16.min(area.height);
    let popup_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height,
    };
    frame.render_widget(Clear, popup_area);

    let block = Block::default().borders(Borders::ALL).title("Search");
    let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
        .block(block.clone())
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);

    let inner = block.inner(popup_area);
    let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
    let cursor_y = inner.y;
    frame.set_cursor_position((cursor_x, cursor_y));
}
