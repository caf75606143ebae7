//! Binary entry point that glues the SQLite-backed library catalog to the
//! TUI: bring up the database, make sure a login is possible on a fresh
//! install, and drive the Ratatui event loop until the user exits.
use smart_library::{ensure_schema, run_app, seed_default_users, App};

/// Initialize persistence and launch the event loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (an
/// unopenable database file, a failed migration) to the terminal instead of
/// drawing anything.
fn main() -> anyhow::Result<()> {
    let conn = ensure_schema()?;
    seed_default_users(&conn)?;

    let mut app = App::new(conn);
    run_app(&mut app)
}
