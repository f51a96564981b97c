//! Colors and glyphs shared by help text, status lines and tables.

use colored::{Color, control::ShouldColorize};
use once_cell::sync::Lazy;

/// Whether the terminal (and `NO_COLOR`/`CLICOLOR*`) allows color, read once.
pub static COLOR_SUPPORTED: Lazy<bool> = Lazy::new(|| ShouldColorize::from_env().should_colorize());

pub const ARROW: &str = "→";
pub const BULLET: &str = "•";
pub const CHECK: &str = "✓";
pub const CROSS: &str = "✗";
pub const LOCK: &str = "🔒";

/// Flavour of a one-line status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Info,
    Detail,
    Progress,
}

impl Tone {
    pub fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Error => Color::Red,
            Tone::Warning => Color::Yellow,
            Tone::Info => Color::Blue,
            Tone::Detail => Color::BrightBlack,
            Tone::Progress => Color::Cyan,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Tone::Success => CHECK,
            Tone::Error => CROSS,
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
            Tone::Detail => ARROW,
            Tone::Progress => "⟳",
        }
    }
}

/// Colors for the long help appendix.
pub struct HelpPalette {
    pub heading: Color,
    pub title: Color,
    pub literal: Color,
    pub key: Color,
}

pub const HELP: HelpPalette = HelpPalette {
    heading: Color::Cyan,
    title: Color::BrightBlue,
    literal: Color::Magenta,
    key: Color::BrightCyan,
};
