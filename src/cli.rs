//! Command-line interface for treelint.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use walkdir::WalkDir;

use crate::engine::{CancelToken, Engine, EngineConfig};
use crate::lang::{registry, LanguageRegistry};
use crate::render::{Format, Renderer, TextRenderer};
use crate::rule::RuleSet;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Multi-language static analysis with path-query rules.
#[derive(Parser)]
#[command(name = "treelint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory
    #[command(visible_alias = "lint")]
    Check(CheckArgs),
    /// List supported languages, extensions and metrics
    Languages,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    pub path: PathBuf,

    /// Rule set YAML file (default: built-in rules)
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Output format: text, json, or sarif
    #[arg(short, long, default_value = "text")]
    pub format: Format,

    /// Number of worker threads (default: one per core)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Show the enclosing class and method of each violation
    #[arg(long)]
    pub show_scope: bool,
}

/// Collect files some registered language can analyze.
fn collect_files(root: &Path, registry: &LanguageRegistry, rule_set: &RuleSet) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden and dependency directories
            !(e.depth() > 0
                && e.file_type().is_dir()
                && (name.starts_with('.') || name == "node_modules" || name == "target" || name == "__pycache__"))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if registry.for_extension(ext).is_none() {
            continue;
        }
        if rule_set.is_path_excluded(path) {
            tracing::debug!(path = %path.display(), "excluded");
            continue;
        }
        files.push(path.to_path_buf());
    }

    Ok(files)
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let rule_set = match &args.rules {
        Some(path) => RuleSet::parse_file(path),
        None => RuleSet::builtin(),
    };
    let rule_set = match rule_set {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let registry = registry();
    let files = if metadata.is_dir() {
        collect_files(&args.path, registry, &rule_set)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to analyze");
    }

    let mut engine = Engine::new(registry);
    engine.add_rule_set(&rule_set);
    tracing::info!(rules = engine.rules().count(), files = files.len(), "rule set loaded");

    let config = EngineConfig {
        threads: args.threads,
    };
    let report = engine.run_paths(&files, &config, &CancelToken::new());

    let renderer: Box<dyn Renderer> = match args.format {
        Format::Text => Box::new(TextRenderer {
            show_scope: args.show_scope,
        }),
        other => other.renderer(),
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    renderer.render(&report, &mut out)?;
    out.flush()?;

    if report.has_findings() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the languages command.
pub fn run_languages() -> anyhow::Result<i32> {
    let registry = registry();
    if registry.is_empty() {
        println!("No languages available (built without tree-sitter support)");
        return Ok(EXIT_SUCCESS);
    }

    println!("Supported languages:");
    println!();
    for handler in registry.handlers() {
        let extensions: Vec<String> = handler
            .file_extensions()
            .iter()
            .map(|e| format!(".{}", e))
            .collect();
        println!(
            "  {:<10} {:<10} {}",
            handler.language_id(),
            handler.display_name(),
            extensions.join(" ")
        );
        for metric in handler.metrics().metrics() {
            println!("      {:<8} {}", metric.key, metric.description);
        }
    }

    Ok(EXIT_SUCCESS)
}
