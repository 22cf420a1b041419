//! Refresh status indicator for the header: ●/◐/○ with color mapping.

use ratatui::style::Style;
use ratatui::text::Span;

use crate::theme::Theme;

/// Styled status dot plus label for the current refresh state.
pub fn status_span(in_flight: usize, errors: usize, theme: &Theme) -> Span<'static> {
    let (text, color) = if in_flight > 0 {
        (format!("◐ fetching {in_flight}"), theme.warning)
    } else if errors > 0 {
        let noun = if errors == 1 { "error" } else { "errors" };
        (format!("○ {errors} {noun}"), theme.critical)
    } else {
        ("● live".to_string(), theme.ok)
    };
    Span::styled(text, Style::default().fg(color))
}
