use std::io::Write;

use serde::Serialize;

use crate::report::{ConfigurationError, MergedReport, ProcessingError, RuleViolation};

use super::Renderer;

/// JSON report structure.
#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    files_analyzed: usize,
    violations: &'a [RuleViolation],
    processing_errors: Vec<JsonProcessingError<'a>>,
    configuration_errors: &'a [ConfigurationError],
}

#[derive(Serialize)]
struct JsonProcessingError<'a> {
    file: &'a str,
    message: &'a str,
    detail: String,
}

impl<'a> From<&'a ProcessingError> for JsonProcessingError<'a> {
    fn from(e: &'a ProcessingError) -> Self {
        Self {
            file: &e.file,
            message: &e.message,
            detail: e.detail(),
        }
    }
}

/// The merged report as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, report: &MergedReport, out: &mut dyn Write) -> anyhow::Result<()> {
        let json = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            files_analyzed: report.files(),
            violations: report.violations(),
            processing_errors: report.processing_errors().iter().map(Into::into).collect(),
            configuration_errors: report.configuration_errors(),
        };
        serde_json::to_writer_pretty(&mut *out, &json)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;

    #[test]
    fn test_detail_survives_as_valid_json() {
        let mut report = Report::new();
        report.add_processing_error(
            ProcessingError::new("A.java", "bad\tinput").with_cause("line 1\r\nline 2"),
        );
        let merged = MergedReport::from(report);

        let mut buf = Vec::new();
        JsonRenderer.render(&merged, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(
            value["processing_errors"][0]["detail"],
            "bad\tinput\nCaused by: line 1\r\nline 2"
        );
        assert_eq!(value["files_analyzed"], 0);
    }
}
