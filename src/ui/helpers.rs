use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error. The last
/// link in the chain is the store-level cause, which carries the text we
/// actually want users to read.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Render a nullable text column the way the catalog table expects it.
pub(crate) fn display_optional(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "N/A",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn surface_error_returns_the_root_cause() {
        let err = Err::<(), _>(anyhow!("Author not found"))
            .context("failed to delete author")
            .unwrap_err();
        assert_eq!(surface_error(&err), "Author not found");
    }

    #[test]
    fn optional_columns_fall_back_to_na() {
        assert_eq!(display_optional(Some("Fiction")), "Fiction");
        assert_eq!(display_optional(Some("   ")), "N/A");
        assert_eq!(display_optional(None), "N/A");
    }
}
