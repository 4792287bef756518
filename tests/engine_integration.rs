//! Integration tests for the full analysis pipeline.
//!
//! These tests run the built-in languages and rule sets against the
//! testdata fixtures.

#![cfg(feature = "tree-sitter")]

use std::path::PathBuf;
use std::sync::Arc;

use treelint::engine::{CancelToken, Engine, EngineConfig, SourceInput};
use treelint::render::{Renderer, SarifRenderer};
use treelint::{registry, LanguageHandler, MergedReport, Parser, Query, RuleSet};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn fixtures() -> Vec<PathBuf> {
    let testdata = testdata_path();
    vec![
        testdata.join("java/Sample.java"),
        testdata.join("java/Broken.java"),
        testdata.join("python/sample.py"),
    ]
}

fn run(rule_set: &RuleSet, paths: &[PathBuf], threads: usize) -> MergedReport {
    let mut engine = Engine::new(registry());
    engine.add_rule_set(rule_set);
    let config = EngineConfig {
        threads: Some(threads),
    };
    engine.run_paths(paths, &config, &CancelToken::new())
}

fn rule_lines(report: &MergedReport) -> Vec<(&str, usize)> {
    report
        .violations()
        .iter()
        .map(|v| (v.rule_id.as_str(), v.span.start_line))
        .collect()
}

#[test]
fn test_rule_set_against_fixtures() {
    let rule_set = RuleSet::parse_file(testdata_path().join("rules.yaml")).expect("should parse rules");
    let report = run(&rule_set, &fixtures(), 4);

    assert_eq!(
        rule_lines(&report),
        vec![
            ("every-method", 6),
            ("every-method", 8),
            ("every-method", 10),
            ("every-method", 17),
            ("python-functions", 4),
            ("python-functions", 12),
        ]
    );
    assert_eq!(report.violations()[0].message, "method found");

    // Broken rules are reported once each, in rule set order.
    let broken: Vec<_> = report
        .configuration_errors()
        .iter()
        .map(|e| e.rule_id.as_str())
        .collect();
    assert_eq!(broken, vec!["no-such-function", "bad-metric", "cobol-rule"]);
    assert_eq!(
        report.configuration_errors()[1].detail,
        "'NOPE' is not the name of a metric"
    );

    // The unparsable file is isolated.
    assert_eq!(report.processing_errors().len(), 1);
    let error = &report.processing_errors()[0];
    assert!(error.file.ends_with("Broken.java"));
    assert!(error.message.contains("syntax error"), "{}", error.message);
    assert_eq!(report.files(), 2);
}

#[test]
fn test_builtin_rules_against_fixtures() {
    let rule_set = RuleSet::builtin().unwrap();
    let mut paths = fixtures();
    paths.push(testdata_path().join("java/Complex.java"));
    let report = run(&rule_set, &paths, 2);

    assert_eq!(
        rule_lines(&report),
        vec![
            ("empty-catch-block", 13),
            ("star-import", 3),
            ("system-println", 12),
            ("missing-override", 17),
            ("bare-except", 7),
            ("python-star-import", 1),
            ("cyclomatic-complexity", 2),
        ]
    );
    assert!(report.configuration_errors().is_empty());

    let override_violation = &report.violations()[3];
    assert_eq!(override_violation.scope.package_name.as_deref(), Some("com.example"));
    assert_eq!(override_violation.scope.class_name.as_deref(), Some("Sample"));
    assert_eq!(override_violation.scope.method_name.as_deref(), Some("equals"));
}

#[test]
fn test_result_is_independent_of_thread_count() {
    let rule_set = RuleSet::builtin().unwrap();
    let mut paths = Vec::new();
    for _ in 0..8 {
        paths.extend(fixtures());
    }

    let single = run(&rule_set, &paths, 1);
    let many = run(&rule_set, &paths, 8);
    assert_eq!(single, many);
    assert_eq!(single.violations().len(), 8 * 6);
}

#[test]
fn test_three_methods_three_sarif_results() {
    let rule_set = RuleSet::parse_str(
        "rules:\n  - {id: method, language: java, message: method, query: //MethodDeclaration}\n",
    )
    .unwrap();
    let mut engine = Engine::new(registry());
    engine.add_rule_set(&rule_set);

    let source = "class A {\n  void a() {}\n  void b() {}\n  void c() {}\n}\n";
    let report = engine.run(
        &[SourceInput::new("A.java", source)],
        &EngineConfig::default(),
        &CancelToken::new(),
    );

    let mut buf = Vec::new();
    SarifRenderer.render(&report, &mut buf).unwrap();
    let sarif: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    let results = sarif["runs"][0]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    let lines: Vec<_> = results
        .iter()
        .map(|r| r["locations"][0]["physicalLocation"]["region"]["startLine"].as_u64().unwrap())
        .collect();
    assert_eq!(lines, vec![2, 3, 4]);
}

#[test]
fn test_registry_is_shared_between_threads() {
    let java = Arc::clone(registry().lookup("java").unwrap());
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let seen = registry().for_extension("java").unwrap();
                assert!(Arc::ptr_eq(seen, &java));
            });
        }
    });
}

#[test]
fn test_metric_queries_on_java() {
    let java = registry().lookup("java").unwrap();
    let source = std::fs::read_to_string(testdata_path().join("java/Complex.java")).unwrap();
    let tree = java.parser().unwrap().parse(&source, "Complex.java").unwrap();

    let query = Query::compile(
        "//MethodDeclaration[metric('CYCLO') >= 10]",
        java.as_ref(),
        &Default::default(),
    )
    .unwrap();
    assert_eq!(query.evaluate(tree.root(), java.as_ref()).unwrap().len(), 1);

    // At the document there is no context node.
    let at_document = Query::compile("metric('CYCLO')", java.as_ref(), &Default::default()).unwrap();
    let err = at_document.evaluate_value(tree.root(), java.as_ref()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Incorrect node type: the 'metric' function cannot be applied"
    );
}

#[test]
fn test_positional_predicate_after_double_slash_counts_per_class() {
    let java = registry().lookup("java").unwrap();
    let source = "class A {\n  void a() {}\n}\nclass B {\n  void b() {}\n}\n";
    let tree = java.parser().unwrap().parse(source, "Two.java").unwrap();

    let lines = |expr: &str| -> Vec<usize> {
        Query::compile(expr, java.as_ref(), &Default::default())
            .unwrap()
            .evaluate(tree.root(), java.as_ref())
            .unwrap()
            .iter()
            .map(|n| n.span().start_line)
            .collect()
    };

    assert_eq!(lines("//MethodDeclaration[1]"), vec![2, 5]);
    assert_eq!(
        lines("/descendant-or-self::node()/child::MethodDeclaration[1]"),
        vec![2, 5]
    );
    assert_eq!(lines("(//MethodDeclaration)[1]"), vec![2]);
}
