//! Kerf CLI - language-agnostic style-convention linter

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use globset::{Glob, GlobSet, GlobSetBuilder};
use kerf::config::{ColorMode, Config, ConfigError, OutputFormat};
use kerf::engine::{CancellationToken, Engine};
use kerf::language::LanguageRegistry;
use kerf::output::formatter_for;
use kerf::registry::RuleRegistry;
use kerf::report::RunStatus;
use kerf::rule::Rule;
use kerf::Severity;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "kerf",
    version,
    about = "Language-agnostic style-convention linter",
    long_about = "Checks source files against structural style conventions: line length, \
                  naming, block shape, blank lines and declaration order."
)]
struct Cli {
    /// Files, directories or glob patterns to check
    paths: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Lowest severity that fails the run
    #[arg(long, value_enum)]
    fail_on: Option<FailOn>,

    /// Stop checking after this many milliseconds
    #[arg(long)]
    timeout: Option<u64>,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// List known languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Show detailed information about a specific rule
    #[arg(long)]
    explain: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Compact,
    Github,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Compact => OutputFormat::Compact,
            Format::Github => OutputFormat::Github,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FailOn {
    Warning,
    Error,
}

impl From<FailOn> for Severity {
    fn from(level: FailOn) -> Self {
        match level {
            FailOn::Warning => Severity::Warning,
            FailOn::Error => Severity::Error,
        }
    }
}

fn list_rules(registry: &RuleRegistry) {
    println!("{}", "Available rules".bold());
    println!();
    for rule in registry.iter() {
        println!(
            "  {} {:<9} {:<10} {}",
            format!("{:<22}", rule.id()).cyan(),
            rule.default_severity().to_string(),
            rule.category().to_string(),
            rule.description()
        );
    }
    println!();
    println!("{} rules", registry.len());
}

fn list_languages() -> Result<()> {
    let languages = LanguageRegistry::builtin().context("built-in language table is invalid")?;
    println!("{}", "Built-in languages".bold());
    println!();
    for id in languages.ids() {
        let extensions = languages
            .get(id)
            .map(|a| a.extensions().join(", "))
            .unwrap_or_default();
        println!("  {} {}", format!("{:<12}", id).cyan(), extensions);
    }
    Ok(())
}

fn explain_rule(rule: &dyn Rule) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), rule.id().cyan());
    println!(
        "  {}: {}",
        "Severity".bold(),
        match rule.default_severity() {
            Severity::Error => "error".red(),
            Severity::Warning => "warning".yellow(),
            Severity::Advisory => "advisory".blue(),
        }
    );
    println!("  {}: {}", "Category".bold(), rule.category());
    if rule.is_advisory() {
        println!("  {}: never above warning", "Advisory".bold());
    }

    println!();
    println!("  {}", "Description".bold());
    println!("  {}", rule.description());

    if !rule.params().is_empty() {
        let defaults = rule.default_params();
        println!();
        println!("  {}", "Parameters".bold());
        for spec in rule.params() {
            let default = defaults
                .get(spec.name)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "    {} ({}, default {}): {}",
                spec.name.cyan(),
                spec.kind,
                default,
                spec.description
            );
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid file pattern '{}'", pattern))?);
    }
    Ok(Some(builder.build()?))
}

/// Expand arguments into the list of files to check.
///
/// Directories are walked recursively and keep only files with a known
/// language; explicit files are always kept so unknown or missing ones are
/// reported by the engine.
fn collect_files(patterns: &[String], config: &Config, engine: &Engine) -> Result<Vec<PathBuf>> {
    let include = build_globset(&config.files.include)?;
    let exclude = build_globset(&config.files.exclude)?;
    let languages = engine.rules().languages();

    let wanted = |path: &Path| {
        if exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return false;
        }
        include.as_ref().map_or(true, |set| set.is_match(path))
    };

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |path: PathBuf, files: &mut Vec<PathBuf>| {
        if seen.insert(path.clone()) {
            files.push(path);
        }
    };

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_dir() {
            let walk = path.join("**").join("*");
            let walk = walk.to_string_lossy();
            for entry in glob::glob(&walk)
                .with_context(|| format!("invalid directory '{}'", pattern))?
                .flatten()
            {
                if entry.is_file() && languages.for_path(&entry).is_some() && wanted(&entry) {
                    push(entry, &mut files);
                }
            }
        } else if path.exists() {
            push(path.to_path_buf(), &mut files);
        } else {
            let mut matched = false;
            for entry in glob::glob(pattern)
                .with_context(|| format!("invalid pattern '{}'", pattern))?
                .flatten()
            {
                matched = true;
                if entry.is_file() && wanted(&entry) {
                    push(entry, &mut files);
                }
            }
            if !matched {
                // Let the engine report the missing file
                push(path.to_path_buf(), &mut files);
            }
        }
    }

    debug!("expanded {} arguments into {} files", patterns.len(), files.len());
    Ok(files)
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.no_color.then_some(ColorMode::Never),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
        cli.fail_on.map(Severity::from),
        cli.timeout,
    );
    Ok(config)
}

fn run(cli: Cli) -> Result<RunStatus> {
    let registry = RuleRegistry::builtin();

    if cli.list_rules {
        list_rules(&registry);
        return Ok(RunStatus::Success);
    }
    if cli.list_languages {
        list_languages()?;
        return Ok(RunStatus::Success);
    }
    if let Some(rule_id) = &cli.explain {
        match registry.get(rule_id) {
            Some(rule) => {
                explain_rule(rule.as_ref());
                return Ok(RunStatus::Success);
            }
            None => {
                eprintln!("{}: unknown rule '{}'", "error".red().bold(), rule_id);
                eprintln!("Use --list-rules to see available rules");
                return Ok(RunStatus::ConfigurationInvalid);
            }
        }
    }

    let engine = match load_config(&cli).and_then(|config| Engine::with_registry(config, &registry)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}: invalid configuration: {}", "error".red().bold(), e);
            return Ok(RunStatus::ConfigurationInvalid);
        }
    };
    let config = engine.config();

    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let patterns = if cli.paths.is_empty() {
        vec![".".to_string()]
    } else {
        cli.paths.clone()
    };
    let files = collect_files(&patterns, config, &engine)?;
    if files.is_empty() {
        warn!("no files to check");
    }

    let outcome = engine.check_with_cancel(&files, &CancellationToken::new());

    let formatter = formatter_for(
        config.output.format,
        config.output.color != ColorMode::Never,
        config.output.statistics,
    );
    print!("{}", formatter.format(&outcome.report));

    if outcome.cancelled {
        eprintln!(
            "{}: run cancelled after {} of {} files",
            "warning".yellow().bold(),
            outcome.report.files.len(),
            files.len()
        );
    }
    if config.output.verbose {
        eprintln!("Finished in {:.2}s", outcome.duration.as_secs_f64());
    }

    Ok(outcome.status())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            RunStatus::ConfigurationInvalid
        }
    };

    std::process::exit(status.exit_code());
}
