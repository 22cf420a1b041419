use promviz_core::Panel;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::theme::Theme;

/// Row separator: `── Title ──────` across the full width.
pub fn render(panel: &Panel, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let title = format!(" {} ", panel.title);
    let used = 2 + title.chars().count();
    let fill = usize::from(area.width).saturating_sub(used);
    let line = Line::from(vec![
        Span::styled("──", theme.border_style()),
        Span::styled(title, theme.title_style()),
        Span::styled("─".repeat(fill), theme.border_style()),
    ]);
    Paragraph::new(line).render(area, buf);
}
