//! Rule set files.
//!
//! A rule set is a YAML document listing path-query rules.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::query::{value::format_number, Value, Variables};
use crate::report::Severity;

lazy_static! {
    static ref RULE_ID: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap();
}

/// Rules shipped with the binary.
const DEFAULT_RULES: &str = include_str!("../../rules/default.yaml");

/// Top-level rule set definition.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub name: String,
    pub description: Option<String>,
    /// Glob patterns for paths to exclude from analysis (e.g., "**/generated/**")
    pub excluded_paths: Vec<String>,
    /// Rules in file order, including the ones that cannot be used.
    pub rules: Vec<RuleEntry>,
}

/// The file layout. Rules stay raw so that one bad rule does not reject
/// the others.
#[derive(Deserialize)]
struct RuleSetFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    excluded_paths: Vec<String>,
    #[serde(default)]
    rules: Vec<serde_yaml::Value>,
}

/// One entry of a rule set.
#[derive(Debug, Clone)]
pub enum RuleEntry {
    Defined(RuleDefinition),
    /// The entry is malformed. `id` falls back to `rules[<index>]` when the
    /// entry has no usable id.
    Rejected { id: String, reason: String },
}

impl RuleEntry {
    pub fn id(&self) -> &str {
        match self {
            RuleEntry::Defined(definition) => &definition.id,
            RuleEntry::Rejected { id, .. } => id,
        }
    }

    pub fn definition(&self) -> Option<&RuleDefinition> {
        match self {
            RuleEntry::Defined(definition) => Some(definition),
            RuleEntry::Rejected { .. } => None,
        }
    }
}

/// One path-query rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleDefinition {
    pub id: String,
    pub language: String,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
    pub query: String,
    /// Values bound to `$name` in the query and `{name}` in the message.
    #[serde(default, skip_deserializing)]
    pub properties: BTreeMap<String, PropertyValue>,
}

fn default_severity() -> Severity {
    Severity::Warning
}

/// A rule property value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        match value {
            serde_yaml::Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            serde_yaml::Value::Number(n) => n.as_f64().map(PropertyValue::Number),
            serde_yaml::Value::String(s) => Some(PropertyValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::single(*b),
            PropertyValue::Number(n) => Value::single(*n),
            PropertyValue::String(s) => Value::single(s.as_str()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", format_number(*n)),
            PropertyValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl RuleDefinition {
    /// Query variables bound from the properties.
    pub fn variables(&self) -> Variables {
        self.properties
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect()
    }

    /// The message with `{name}` placeholders replaced by property values.
    /// Unknown placeholders are left as written.
    pub fn render_message(&self) -> String {
        let mut message = self.message.clone();
        for (name, value) in &self.properties {
            message = message.replace(&format!("{{{}}}", name), &value.to_string());
        }
        message
    }
}

/// Turn one raw entry into a definition, or the reason it is unusable.
fn parse_rule(index: usize, raw: serde_yaml::Value) -> RuleEntry {
    let id = raw
        .get("id")
        .and_then(serde_yaml::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("rules[{}]", index));

    match definition_from(raw) {
        Ok(definition) => RuleEntry::Defined(definition),
        Err(reason) => RuleEntry::Rejected { id, reason },
    }
}

fn definition_from(mut raw: serde_yaml::Value) -> Result<RuleDefinition, String> {
    let properties = raw
        .as_mapping_mut()
        .and_then(|mapping| mapping.remove("properties"));

    let mut definition: RuleDefinition = serde_yaml::from_value(raw).map_err(|e| e.to_string())?;
    if !RULE_ID.is_match(&definition.id) {
        return Err(format!("invalid rule id '{}'", definition.id));
    }
    if definition.query.trim().is_empty() {
        return Err("empty query".to_string());
    }

    match properties {
        None | Some(serde_yaml::Value::Null) => {}
        Some(serde_yaml::Value::Mapping(mapping)) => {
            for (name, value) in mapping {
                let name = match name {
                    serde_yaml::Value::String(name) => name,
                    other => return Err(format!("bad property name {:?}", other)),
                };
                let value = PropertyValue::from_yaml(&value)
                    .ok_or_else(|| format!("bad property value '{}': expected a string, number or boolean", name))?;
                definition.properties.insert(name, value);
            }
        }
        Some(_) => return Err("properties must be a mapping".to_string()),
    }

    Ok(definition)
}

impl RuleSet {
    /// Parse a rule set from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read rule set {}", path.display()))?;
        Self::parse_str(&content).with_context(|| format!("invalid rule set {}", path.display()))
    }

    /// Parse a rule set from YAML text.
    ///
    /// Only text that is not a rule set at all is an error. A malformed rule
    /// becomes a [`RuleEntry::Rejected`] entry and the other rules are kept.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let file: RuleSetFile = serde_yaml::from_str(content)?;

        let mut seen = HashSet::new();
        let rules = file
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                match parse_rule(index, raw) {
                    RuleEntry::Defined(definition) if !seen.insert(definition.id.clone()) => {
                        RuleEntry::Rejected {
                            reason: format!("duplicate rule id '{}'", definition.id),
                            id: definition.id,
                        }
                    }
                    entry => entry,
                }
            })
            .collect();

        Ok(Self {
            name: file.name,
            description: file.description,
            excluded_paths: file.excluded_paths,
            rules,
        })
    }

    /// The rule set shipped with the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        let rule_set = Self::parse_str(DEFAULT_RULES).context("built-in rule set")?;
        if let Some(RuleEntry::Rejected { id, reason }) = rule_set.rejected().next() {
            bail!("built-in rule set: rule '{}': {}", id, reason);
        }
        Ok(rule_set)
    }

    /// Usable rule definitions, in file order.
    pub fn definitions(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter_map(RuleEntry::definition)
    }

    /// Entries that cannot be used, in file order.
    pub fn rejected(&self) -> impl Iterator<Item = &RuleEntry> {
        self.rules
            .iter()
            .filter(|entry| matches!(entry, RuleEntry::Rejected { .. }))
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            match globset::Glob::new(pattern) {
                Ok(glob) => {
                    if glob.compile_matcher().is_match(&*path_str) {
                        return true;
                    }
                }
                Err(e) => tracing::warn!(pattern = %pattern, error = %e, "ignoring bad exclude pattern"),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: demo
excluded_paths: ["**/generated/**"]
rules:
  - id: complex-method
    language: java
    message: "Method exceeds {threshold} ({flag})"
    severity: error
    query: "//MethodDeclaration[metric('CYCLO') > $threshold]"
    properties:
      threshold: 10
      flag: true
      label: "x"
  - id: any-class
    language: java
    message: "class"
    query: "//ClassDeclaration"
"#;

    #[test]
    fn test_parse_rule_set() {
        let rule_set = RuleSet::parse_str(YAML).unwrap();
        assert_eq!(rule_set.name, "demo");
        assert_eq!(rule_set.rules.len(), 2);
        assert_eq!(rule_set.rejected().count(), 0);

        let rules: Vec<_> = rule_set.definitions().collect();
        let rule = rules[0];
        assert_eq!(rule.severity, Severity::Error);
        assert_eq!(rule.properties["threshold"], PropertyValue::Number(10.0));
        assert_eq!(rule.properties["flag"], PropertyValue::Bool(true));
        assert_eq!(rule.properties["label"], PropertyValue::String("x".into()));
        assert_eq!(rule.render_message(), "Method exceeds 10 (true)");
        assert_eq!(rule.variables()["threshold"], Value::single(10.0));

        assert_eq!(rules[1].severity, Severity::Warning);
    }

    fn rejected(content: &str) -> Vec<(String, String)> {
        RuleSet::parse_str(content)
            .unwrap()
            .rejected()
            .map(|entry| match entry {
                RuleEntry::Rejected { id, reason } => (id.clone(), reason.clone()),
                RuleEntry::Defined(_) => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_malformed_rules_are_rejected_one_by_one() {
        let content = r#"
rules:
  - {id: good, language: java, message: m, query: //X}
  - {id: 1abc, language: java, message: m, query: //X}
  - {id: blank, language: java, message: m, query: "   "}
  - {id: nested, language: java, message: m, query: //X, properties: {x: [1, 2]}}
  - {id: good, language: java, message: m, query: //Y}
  - {language: java, message: m, query: //X}
  - {id: no-query, language: java, message: m}
"#;
        let rule_set = RuleSet::parse_str(content).unwrap();
        let ids: Vec<_> = rule_set.definitions().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);

        let rejected = rejected(content);
        let ids: Vec<_> = rejected.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["1abc", "blank", "nested", "good", "rules[5]", "no-query"]);
        assert_eq!(rejected[0].1, "invalid rule id '1abc'");
        assert_eq!(rejected[1].1, "empty query");
        assert_eq!(
            rejected[2].1,
            "bad property value 'x': expected a string, number or boolean"
        );
        assert_eq!(rejected[3].1, "duplicate rule id 'good'");
        assert!(rejected[4].1.contains("missing field `id`"), "{}", rejected[4].1);
        assert!(rejected[5].1.contains("missing field `query`"), "{}", rejected[5].1);
    }

    #[test]
    fn test_unparsable_rule_set_is_an_error() {
        assert!(RuleSet::parse_str("rules: [").is_err());
        assert!(RuleSet::parse_str("rules: 3").is_err());
    }

    #[test]
    fn test_excluded_paths() {
        let rule_set = RuleSet::parse_str(YAML).unwrap();
        assert!(rule_set.is_path_excluded(Path::new("src/generated/Foo.java")));
        assert!(!rule_set.is_path_excluded(Path::new("src/main/Foo.java")));
    }

    #[test]
    fn test_builtin_rule_set_is_valid() {
        let rule_set = RuleSet::builtin().unwrap();
        assert!(!rule_set.rules.is_empty());
        assert_eq!(rule_set.rejected().count(), 0);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, YAML).unwrap();
        assert_eq!(RuleSet::parse_file(&path).unwrap().rules.len(), 2);
        assert!(RuleSet::parse_file(dir.path().join("missing.yaml")).is_err());
    }
}
