use std::io::Write;

use colored::*;

use crate::report::{MergedReport, RuleViolation, Severity};

use super::{escape_control, Renderer};

/// Human-readable output, one line per finding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer {
    /// Print the enclosing class/method of each violation.
    pub show_scope: bool,
}

impl Renderer for TextRenderer {
    fn render(&self, report: &MergedReport, out: &mut dyn Write) -> anyhow::Result<()> {
        for error in report.configuration_errors() {
            writeln!(
                out,
                "{} {:<24} {}",
                "CONFIG".red().bold(),
                escape_control(&error.rule_id).dimmed(),
                escape_control(&error.detail)
            )?;
        }

        for v in report.violations() {
            self.write_violation(v, out)?;
        }

        for error in report.processing_errors() {
            writeln!(
                out,
                "{} {}: {}",
                "FAILED".red().bold(),
                escape_control(&error.file).blue(),
                escape_control(&error.detail())
            )?;
        }

        writeln!(out)?;
        write_summary(report, out)
    }
}

impl TextRenderer {
    fn write_violation(&self, v: &RuleViolation, out: &mut dyn Write) -> anyhow::Result<()> {
        let location = format!(
            "{}:{}:{}",
            escape_control(&v.file),
            v.span.start_line,
            v.span.start_col
        );
        write!(
            out,
            "{} {} {:<24} {}",
            severity_tag(v.severity),
            location.blue(),
            escape_control(&v.rule_id).dimmed(),
            escape_control(&v.message)
        )?;
        if self.show_scope {
            let scope: Vec<String> = [&v.scope.class_name, &v.scope.method_name]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .map(escape_control)
                .collect();
            if !scope.is_empty() {
                write!(out, " {}", format!("({})", scope.join("#")).dimmed())?;
            }
        }
        writeln!(out)?;
        Ok(())
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR ".red(),
        Severity::Warning => "WARN  ".yellow(),
        Severity::Info => "INFO  ".blue(),
    }
}

fn write_summary(report: &MergedReport, out: &mut dyn Write) -> anyhow::Result<()> {
    let plural = |n: usize| if n != 1 { "s" } else { "" };
    let files = report.files();
    let violations = report.violations().len();
    let errors = report.processing_errors().len() + report.configuration_errors().len();

    let status = if report.has_findings() {
        "FAIL".red()
    } else {
        "PASS".green()
    };
    writeln!(
        out,
        "{} {} file{} analyzed, {} violation{}, {} error{}",
        status,
        files,
        plural(files),
        violations,
        plural(violations),
        errors,
        plural(errors)
    )?;
    Ok(())
}
