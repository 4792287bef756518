use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::report::{MergedReport, Severity};

use super::Renderer;

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "treelint";

#[derive(Serialize, Deserialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
    invocations: Vec<SarifInvocation>,
}

#[derive(Serialize, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
struct SarifRule {
    id: String,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize, Deserialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize, Deserialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<SarifRegion>,
}

#[derive(Serialize, Deserialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
    #[serde(rename = "endColumn")]
    end_column: usize,
}

#[derive(Serialize, Deserialize)]
struct SarifInvocation {
    #[serde(rename = "executionSuccessful")]
    execution_successful: bool,
    #[serde(rename = "toolExecutionNotifications")]
    tool_execution_notifications: Vec<SarifNotification>,
    #[serde(rename = "toolConfigurationNotifications")]
    tool_configuration_notifications: Vec<SarifNotification>,
}

#[derive(Serialize, Deserialize)]
struct SarifNotification {
    level: String,
    message: SarifMessage,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    locations: Vec<SarifLocation>,
    #[serde(rename = "associatedRule", skip_serializing_if = "Option::is_none", default)]
    associated_rule: Option<SarifRuleReference>,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleReference {
    id: String,
}

fn map_severity_to_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn file_location(file: &str) -> SarifLocation {
    SarifLocation {
        physical_location: SarifPhysicalLocation {
            artifact_location: SarifArtifact {
                uri: file.replace('\\', "/"),
            },
            region: None,
        },
    }
}

/// SARIF 2.1.0 log with a single run.
///
/// Every violation is its own result. Processing errors become tool
/// execution notifications and configuration errors become tool
/// configuration notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct SarifRenderer;

impl Renderer for SarifRenderer {
    fn render(&self, report: &MergedReport, out: &mut dyn Write) -> anyhow::Result<()> {
        // Most severe level seen per rule, sorted by id.
        let mut rule_levels: BTreeMap<&str, Severity> = BTreeMap::new();
        for v in report.violations() {
            rule_levels
                .entry(v.rule_id.as_str())
                .and_modify(|s| *s = (*s).min(v.severity))
                .or_insert(v.severity);
        }
        let rules = rule_levels
            .into_iter()
            .map(|(id, severity)| SarifRule {
                id: id.to_string(),
                default_config: SarifRuleConfig {
                    level: map_severity_to_level(severity).to_string(),
                },
            })
            .collect();

        let results = report
            .violations()
            .iter()
            .map(|v| {
                let mut location = file_location(&v.file);
                location.physical_location.region = Some(SarifRegion {
                    start_line: v.span.start_line.max(1),
                    start_column: v.span.start_col.max(1),
                    end_line: v.span.end_line.max(1),
                    end_column: v.span.end_col.max(1),
                });
                SarifResult {
                    rule_id: v.rule_id.clone(),
                    level: map_severity_to_level(v.severity).to_string(),
                    message: SarifMessage {
                        text: v.message.clone(),
                    },
                    locations: vec![location],
                }
            })
            .collect();

        let execution = report
            .processing_errors()
            .iter()
            .map(|e| SarifNotification {
                level: "error".to_string(),
                message: SarifMessage { text: e.detail() },
                locations: vec![file_location(&e.file)],
                associated_rule: None,
            })
            .collect();

        let configuration = report
            .configuration_errors()
            .iter()
            .map(|e| SarifNotification {
                level: "error".to_string(),
                message: SarifMessage {
                    text: e.detail.clone(),
                },
                locations: Vec::new(),
                associated_rule: Some(SarifRuleReference {
                    id: e.rule_id.clone(),
                }),
            })
            .collect();

        let sarif = SarifReport {
            version: SARIF_VERSION.to_string(),
            schema: SARIF_SCHEMA.to_string(),
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: TOOL_NAME.to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        rules,
                    },
                },
                results,
                invocations: vec![SarifInvocation {
                    execution_successful: report.processing_errors().is_empty(),
                    tool_execution_notifications: execution,
                    tool_configuration_notifications: configuration,
                }],
            }],
        };

        serde_json::to_writer_pretty(&mut *out, &sarif)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::report::{ConfigurationError, ProcessingError, Report, RuleViolation, ViolationScope};

    fn violation(rule: &str, severity: Severity, line: usize) -> RuleViolation {
        RuleViolation {
            rule_id: rule.to_string(),
            severity,
            message: format!("{} at {}", rule, line),
            file: "src\\A.java".to_string(),
            span: Span::lines(line, 3, line, 10),
            scope: ViolationScope::default(),
        }
    }

    fn render(report: Report) -> serde_json::Value {
        let mut buf = Vec::new();
        SarifRenderer
            .render(&MergedReport::from(report), &mut buf)
            .unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn test_results_and_notifications() {
        let mut report = Report::new();
        report.add_violation(violation("b-rule", Severity::Info, 2));
        report.add_violation(violation("a-rule", Severity::Warning, 3));
        report.add_violation(violation("b-rule", Severity::Error, 4));
        report.add_processing_error(ProcessingError::new("B.java", "syntax").with_cause("a\r\nb"));
        report.add_configuration_error(ConfigurationError::new("c-rule", "unknown function"));

        let sarif = render(report);
        let run = &sarif["runs"][0];

        assert_eq!(sarif["version"], "2.1.0");
        assert_eq!(run["results"].as_array().unwrap().len(), 3);
        assert_eq!(run["results"][0]["ruleId"], "b-rule");
        assert_eq!(run["results"][0]["level"], "note");
        assert_eq!(
            run["results"][1]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "src/A.java"
        );
        assert_eq!(
            run["results"][2]["locations"][0]["physicalLocation"]["region"]["startLine"],
            4
        );

        let rules = run["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["id"], "a-rule");
        assert_eq!(rules[1]["defaultConfiguration"]["level"], "error");

        let invocation = &run["invocations"][0];
        assert_eq!(invocation["executionSuccessful"], false);
        assert_eq!(
            invocation["toolExecutionNotifications"][0]["message"]["text"],
            "syntax\nCaused by: a\r\nb"
        );
        assert_eq!(
            invocation["toolConfigurationNotifications"][0]["associatedRule"]["id"],
            "c-rule"
        );
    }

    #[test]
    fn test_empty_report() {
        let sarif = render(Report::new());
        let run = &sarif["runs"][0];
        assert!(run["results"].as_array().unwrap().is_empty());
        assert_eq!(run["invocations"][0]["executionSuccessful"], true);
    }
}
