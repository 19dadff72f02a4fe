//! Terminal output formatting and utilities.
//!
//! Consistent console output for commands: colors, progress and the
//! human-readable report.

pub mod colors;
pub mod errors;
pub mod progress;
pub mod report;

use std::io::{self, IsTerminal};

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Color settings shared with renderers
    pub fn colors(&self) -> colors::ColorSupport {
        self.colors
    }

    /// Whether stderr is a terminal (progress is only drawn there)
    pub fn is_interactive(&self) -> bool {
        io::stderr().is_terminal()
    }

    /// Print a warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
