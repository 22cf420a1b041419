//! SilkCircuit Neon palette and semantic styling for the TUI.
//!
//! A [`Theme`] is built once in `main` and passed by reference to every
//! renderer.

use ratatui::style::{Color, Modifier, Style};

use crate::panels::Band;

// ── Core Palette ──────────────────────────────────────────────────────

pub const ELECTRIC_PURPLE: Color = Color::Rgb(225, 53, 255); // #e135ff
pub const NEON_CYAN: Color = Color::Rgb(128, 255, 234); // #80ffea
pub const CORAL: Color = Color::Rgb(255, 106, 193); // #ff6ac1
pub const ELECTRIC_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

// ── Extended Palette ──────────────────────────────────────────────────

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const LIGHT_BLUE: Color = Color::Rgb(139, 233, 253); // #8be9fd

/// Chart series colors for multi-line graphs.
pub const CHART_SERIES: &[Color] = &[
    NEON_CYAN,
    CORAL,
    ELECTRIC_PURPLE,
    SUCCESS_GREEN,
    ELECTRIC_YELLOW,
    LIGHT_BLUE,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub ok: Color,
    pub warning: Color,
    pub critical: Color,
    pub series: Vec<Color>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: ELECTRIC_PURPLE,
            title: NEON_CYAN,
            text: DIM_WHITE,
            muted: BORDER_GRAY,
            border: BORDER_GRAY,
            ok: SUCCESS_GREEN,
            warning: ELECTRIC_YELLOW,
            critical: ERROR_RED,
            series: CHART_SERIES.to_vec(),
        }
    }
}

impl Theme {
    // ── Semantic Styles ───────────────────────────────────────────────

    /// Title text for blocks/panels.
    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Placeholders and axis labels.
    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Large single values (stat panels).
    pub fn value_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Error marker in a panel's bottom border.
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
    }

    /// Key hint text (e.g., "q quit  r refresh").
    pub fn key_hint(&self) -> Style {
        Style::default().fg(self.muted)
    }

    /// Key hint key character.
    pub fn key_hint_key(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    /// Application name in the header.
    pub fn brand_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn band_color(&self, band: Band) -> Color {
        match band {
            Band::Low => self.ok,
            Band::Warning => self.warning,
            Band::Critical => self.critical,
        }
    }

    /// Color of the `index`-th chart series, cycling through the palette.
    pub fn series_color(&self, index: usize) -> Color {
        if self.series.is_empty() {
            return self.text;
        }
        self.series[index % self.series.len()]
    }
}
