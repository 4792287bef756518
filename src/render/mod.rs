//! Output formatting for analysis reports.
//!
//! Supports three output formats:
//! - Text: colored terminal output, one line per finding
//! - JSON: the merged report as structured data
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

mod json;
mod sarif;
mod text;

pub use json::JsonRenderer;
pub use sarif::SarifRenderer;
pub use text::TextRenderer;

use std::io::Write;

use crate::report::MergedReport;

/// Writes a finished report.
pub trait Renderer {
    fn render(&self, report: &MergedReport, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
    Sarif,
}

impl Format {
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            Format::Text => Box::new(TextRenderer::default()),
            Format::Json => Box::new(JsonRenderer),
            Format::Sarif => Box::new(SarifRenderer),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Text => write!(f, "text"),
            Format::Json => write!(f, "json"),
            Format::Sarif => write!(f, "sarif"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "sarif" => Ok(Format::Sarif),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

/// Escape control characters so the text stays on one line.
///
/// `\r`, `\n` and `\t` get their usual escapes, a backslash is doubled and
/// any other control character becomes `\u{..}`.
pub fn escape_control(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
