//! # Terminal Output
//!
//! Colour and emoji decisions for human-facing output. `--color` picks the
//! policy; `auto` honours `NO_COLOR`, `CLICOLOR`, `CLICOLOR_FORCE`,
//! `TERM=dumb` and whether stdout is a terminal.

use std::env;
use std::fmt;

use clap::ValueEnum;

/// Value of the global `--color` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorChoice::Auto => "auto",
            ColorChoice::Always => "always",
            ColorChoice::Never => "never",
        };
        f.write_str(name)
    }
}

/// Resolved output policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    pub fn new(choice: ColorChoice) -> Self {
        let use_color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => detect_color_support(),
        };
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// Pick `fancy` when colour is on, `plain` otherwise.
    pub fn emoji<'a>(&self, fancy: &'a str, plain: &'a str) -> &'a str {
        if self.use_color {
            fancy
        } else {
            plain
        }
    }

    /// Render `text` in `tone`, or unchanged without colour.
    pub fn paint(&self, tone: Tone, text: &str) -> String {
        let styled = console::style(text).force_styling(self.use_color);
        let styled = match tone {
            Tone::Heading => styled.bold(),
            Tone::Success => styled.green(),
            Tone::Warning => styled.yellow(),
            Tone::Muted => styled.dim(),
        };
        styled.to_string()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

/// Styles used by the command summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Success,
    Warning,
    Muted,
}

fn detect_color_support() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
        return false;
    }
    if env::var("CLICOLOR_FORCE").is_ok_and(|v| !v.is_empty() && v != "0") {
        return true;
    }
    if env::var("TERM").is_ok_and(|v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}
