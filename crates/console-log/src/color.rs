//! Terminal colors per console message type.

use devtap_protocol::ConsoleType;
use owo_colors::OwoColorize;

/// Colors used for console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermColor {
    Default,
    Blue,
    Yellow,
    Red,
    Gray,
    Cyan,
    Magenta,
    Green,
}

impl TermColor {
    /// Color name, never empty.
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "white",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Gray => "gray",
            Self::Cyan => "cyan",
            Self::Magenta => "magenta",
            Self::Green => "green",
        }
    }

    /// Wraps `text` in this color's ANSI escapes. `Default` leaves it as is.
    pub fn paint(self, text: &str) -> String {
        match self {
            Self::Default => text.to_string(),
            Self::Blue => text.blue().to_string(),
            Self::Yellow => text.yellow().to_string(),
            Self::Red => text.red().to_string(),
            Self::Gray => text.bright_black().to_string(),
            Self::Cyan => text.cyan().to_string(),
            Self::Magenta => text.magenta().to_string(),
            Self::Green => text.green().to_string(),
        }
    }
}

/// Color for a message type.
pub fn color_for(kind: &ConsoleType) -> TermColor {
    match kind {
        ConsoleType::Log | ConsoleType::Other(_) => TermColor::Default,
        ConsoleType::Info => TermColor::Blue,
        ConsoleType::Warn => TermColor::Yellow,
        ConsoleType::Error | ConsoleType::Assert => TermColor::Red,
        ConsoleType::Debug | ConsoleType::Trace | ConsoleType::Clear => TermColor::Gray,
        ConsoleType::Dir | ConsoleType::DirXml | ConsoleType::Table => TermColor::Cyan,
        ConsoleType::Group | ConsoleType::GroupCollapsed | ConsoleType::GroupEnd => {
            TermColor::Magenta
        }
        ConsoleType::Count
        | ConsoleType::CountReset
        | ConsoleType::Time
        | ConsoleType::TimeLog
        | ConsoleType::TimeEnd => TermColor::Green,
        ConsoleType::Profile | ConsoleType::ProfileEnd => TermColor::Yellow,
    }
}

/// Color for a type name, case-insensitive. Unknown names get the default.
pub fn color_for_name(name: &str) -> TermColor {
    color_for(&ConsoleType::parse(name))
}
