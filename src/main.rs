use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use cpp_refactor::config::{discover, load_from_path, RefactorConfig};
use cpp_refactor::diagnostics::{DiagnosticSink, JsonLinesSink, StderrSink};
use cpp_refactor::ts::validate_rewrite;
use cpp_refactor::{CommitResult, RefactorEngine, RuleId, TreeSitterFrontend, UnitBuilder};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions of files treated as translation units when walking directories.
const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++"];

#[derive(Parser)]
#[command(name = "cpp-refactor")]
#[command(about = "Rule-based C++ refactoring with insert-only fixes", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: nearest .cpp-refactor.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply fixes to translation units
    Fix {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        unit: UnitArgs,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Report pending fixes without writing; exits 1 if any exist
    Check {
        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        unit: UnitArgs,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List available rules
    Rules,
}

#[derive(Args)]
struct UnitArgs {
    /// Add a user header search path
    #[arg(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Add a system header search path
    #[arg(long, value_name = "DIR")]
    isystem: Vec<PathBuf>,

    /// Run only these rules
    #[arg(long = "rule", value_name = "RULE")]
    rules: Vec<RuleId>,

    /// Only look at the named files, not the headers they include
    #[arg(long)]
    no_follow_includes: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Write,
    DryRun,
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fix {
            paths,
            unit,
            dry_run,
            diff,
            format,
        } => {
            let mode = if dry_run { Mode::DryRun } else { Mode::Write };
            cmd_run(cli.config, &paths, &unit, mode, diff, format)
        }

        Commands::Check {
            paths,
            unit,
            format,
        } => cmd_run(cli.config, &paths, &unit, Mode::Check, false, format),

        Commands::Rules => cmd_rules(cli.config),
    }
}

/// Explicit `--config`, else the nearest config file, else defaults.
fn resolve_config(explicit: Option<PathBuf>) -> Result<RefactorConfig> {
    if let Some(path) = explicit {
        return Ok(load_from_path(&path)?);
    }
    let cwd = env::current_dir().context("cannot determine current directory")?;
    match discover(&cwd) {
        Some(path) => Ok(load_from_path(&path)?),
        None => Ok(RefactorConfig::default()),
    }
}

fn apply_overrides(config: &mut RefactorConfig, args: &UnitArgs) {
    config.includes.search_paths.extend(args.include.iter().cloned());
    config.includes.system_paths.extend(args.isystem.iter().cloned());
    if !args.rules.is_empty() {
        config.restrict_to(&args.rules);
    }
    if args.no_follow_includes {
        config.includes.follow = false;
    }
}

/// Named files as given, plus C++ sources found under named directories.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            let is_source = entry
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
            if entry.file_type().is_file() && is_source {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files.dedup();
    Ok(files)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (fixed)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
    }
}

#[derive(Default)]
struct Totals {
    units: usize,
    modified: usize,
    edits: usize,
    skipped: usize,
    failed: usize,
}

fn cmd_run(
    config: Option<PathBuf>,
    paths: &[PathBuf],
    args: &UnitArgs,
    mode: Mode,
    show_diff: bool,
    format: Format,
) -> Result<()> {
    let mut config = resolve_config(config)?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let sources = collect_sources(paths)?;
    if sources.is_empty() {
        anyhow::bail!("no C++ source files found");
    }

    let engine = RefactorEngine::new(TreeSitterFrontend::new(), config.rule_set());
    let builder = UnitBuilder::new(config.include_options());
    let mut sink: Box<dyn DiagnosticSink> = match format {
        Format::Text => Box::new(StderrSink),
        Format::Json => Box::new(JsonLinesSink),
    };

    if mode == Mode::DryRun && format == Format::Text {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    let mut totals = Totals::default();
    for path in &sources {
        totals.units += 1;

        let unit = match builder.load(path) {
            Ok(unit) => unit,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                totals.failed += 1;
                continue;
            }
        };
        let outcome = engine.run(&unit, sink.as_mut())?;
        totals.edits += outcome.report.applied;
        totals.skipped += outcome.report.skipped();

        if format == Format::Json {
            println!(
                "{}",
                serde_json::json!({ "file": path, "report": &outcome.report })
            );
        }
        if !outcome.is_modified() {
            continue;
        }
        totals.modified += 1;

        let original = outcome.buffer.original();
        let rendered = outcome.render();
        if config.output.verify_syntax {
            if let Err(e) = validate_rewrite(original, &rendered) {
                eprintln!(
                    "{} {}: rewrite rejected, {}",
                    "✗".red(),
                    path.display(),
                    e
                );
                totals.failed += 1;
                continue;
            }
        }
        if show_diff {
            display_diff(path, original, &rendered);
        }

        match mode {
            Mode::Write => match outcome.buffer.commit(path) {
                Ok(CommitResult::Written { insertions, .. }) if format == Format::Text => {
                    println!(
                        "{} {}: {} edit(s) written",
                        "✓".green(),
                        path.display(),
                        insertions
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                    totals.failed += 1;
                }
            },
            Mode::DryRun | Mode::Check if format == Format::Text => {
                println!(
                    "{} {}: {} edit(s) pending",
                    "⊙".yellow(),
                    path.display(),
                    outcome.report.applied
                );
            }
            Mode::DryRun | Mode::Check => {}
        }
    }

    if format == Format::Text {
        println!();
        println!("{}", "Summary:".bold());
        println!("  {} unit(s)", totals.units);
        println!("  {} modified", format!("{}", totals.modified).green());
        println!("  {} edit(s)", format!("{}", totals.edits).green());
        println!("  {} match(es) skipped", format!("{}", totals.skipped).cyan());
        println!("  {} failed", format!("{}", totals.failed).red());
    }

    if totals.failed > 0 || (mode == Mode::Check && totals.edits > 0) {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules(config: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config)?;

    println!("{}", "Available rules:".bold());
    for id in RuleId::ALL {
        let state = if config.is_enabled(id) {
            "enabled".green()
        } else {
            "disabled".yellow()
        };
        println!("  {:<22} [{}] {}", id.as_str(), state, id.description());
    }
    Ok(())
}
