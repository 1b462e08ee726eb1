use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use scour::config::{self, CONFIG_FILE_NAME, PatternKind, Settings};
use scour::discovery;
use scour::location::LineSet;
use scour::process::{FileOutcome, Mode, Status, process_files};
use scour::types::RemovalKind;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "scour",
    about = "Strip comments and docstrings from Python source",
    version,
    long_about = "Scour removes comments and docstrings from Python files while keeping \
                  code, string literals, and meaningful directives (shebang, encoding \
                  declarations, type comments, noqa/pylint/mypy/... pragmas) intact.\n\n\
                  A single file is printed to stdout.  Directories are checked unless \
                  --write is given.\n\n\
                  Settings come from ~/.config/scour/config.json, then ./.scour.json; \
                  the --add-ignore* flags append a pattern to one of them and exit."
)]
struct Cli {
    /// Files or directories to process.
    #[arg(required_unless_present_any = [
        "add_ignore",
        "add_ignore_global",
        "add_ignore_file",
        "add_ignore_file_global",
    ])]
    paths: Vec<PathBuf>,

    /// Rewrite changed files in place.
    #[arg(long, conflicts_with = "check")]
    write: bool,

    /// Report files that would change; exit with code 1 if any would.
    #[arg(long)]
    check: bool,

    /// Print every removal as `file:line:col: kind text`.
    #[arg(long)]
    list_removals: bool,

    /// Emit a JSON summary instead of the default text format.
    #[arg(long)]
    json: bool,

    /// Exclude directories or files whose path contains any of the given
    /// comma-separated names (e.g. --exclude tests,migrations).
    /// Virtual environments, caches, and hidden directories are always skipped.
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Keep comments matching any of these comma-separated regexes.
    #[arg(long, value_delimiter = ',')]
    ignore: Option<Vec<String>>,

    /// Skip files whose path matches any of these comma-separated regexes.
    #[arg(long, value_delimiter = ',')]
    ignore_file: Option<Vec<String>>,

    /// Remove directive comments too (shebang, encoding, type:, noqa, ...).
    #[arg(long)]
    remove_directives: bool,

    /// Settings file to use instead of `./.scour.json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only strip comments and docstrings touching these lines of a single
    /// file, e.g. --lines 3,10-20.
    #[arg(long, value_name = "LINES")]
    lines: Option<LineSet>,

    /// Save a comment-keeping regex to the project settings file and exit.
    #[arg(long, value_name = "REGEX")]
    add_ignore: Option<String>,

    /// Save a comment-keeping regex to the global settings file and exit.
    #[arg(long, value_name = "REGEX")]
    add_ignore_global: Option<String>,

    /// Save a file-skipping regex to the project settings file and exit.
    #[arg(long, value_name = "REGEX")]
    add_ignore_file: Option<String>,

    /// Save a file-skipping regex to the global settings file and exit.
    #[arg(long, value_name = "REGEX")]
    add_ignore_file_global: Option<String>,

    /// Log per-file decisions to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    init_logging(cli.verbose)?;

    let local_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let global_path = config::global_config_path();

    // ── persisted patterns ────────────────────────────────────────────────────
    if add_patterns(&cli, &local_path, global_path.as_deref())? {
        return Ok(0);
    }

    // ── settings ──────────────────────────────────────────────────────────────
    let mut settings = Settings::load(global_path.as_deref(), &local_path, cli.config.is_some())?;
    if cli.remove_directives {
        settings.preserve_directives = false;
    }
    settings
        .ignore_patterns
        .extend(cli.ignore.clone().unwrap_or_default());
    settings
        .file_ignore_patterns
        .extend(cli.ignore_file.clone().unwrap_or_default());
    let rules = settings.rules()?;
    let filter = settings.file_filter()?;
    debug!(rules = rules.len(), "loaded preservation rules");

    // ── file discovery ────────────────────────────────────────────────────────
    let exclude = cli.exclude.clone().unwrap_or_default();
    let mut files = Vec::new();
    let mut walked = false;
    for path in &cli.paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            walked = true;
            let found = discovery::discover_python_files(path, &exclude)
                .with_context(|| format!("failed to walk {}", path.display()))?;
            files.extend(found);
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    files.retain(|f| {
        let ignored = filter.is_ignored(f);
        if ignored {
            debug!(path = %f.display(), "ignored by file pattern");
        }
        !ignored
    });
    files.sort();
    files.dedup();
    if cli.lines.is_some() && (walked || files.len() != 1) {
        bail!("--lines needs exactly one file");
    }

    // ── mode ──────────────────────────────────────────────────────────────────
    let mode = if cli.write {
        Mode::Write
    } else if cli.check || cli.json || walked || files.len() != 1 {
        Mode::Check
    } else {
        Mode::Print
    };

    let outcomes = process_files(&files, &rules, mode, cli.lines.as_ref());

    // ── output ────────────────────────────────────────────────────────────────
    if mode == Mode::Print {
        return Ok(print_stripped(&outcomes));
    }

    if cli.json {
        print_json(&outcomes, cli.list_removals)?;
    } else {
        print_text(&outcomes, mode, cli.list_removals);
    }

    // ── exit code ─────────────────────────────────────────────────────────────
    let failed = outcomes
        .iter()
        .any(|o| matches!(o.status, Status::Failed(_)));
    let changed = outcomes.iter().any(FileOutcome::is_changed);
    Ok(if failed {
        2
    } else if mode == Mode::Check && changed {
        1
    } else {
        0
    })
}

/// Handle the `--add-ignore*` flags.  Returns whether any was given.
fn add_patterns(cli: &Cli, local: &Path, global: Option<&Path>) -> Result<bool> {
    let requests = [
        (&cli.add_ignore, PatternKind::Comment, false),
        (&cli.add_ignore_global, PatternKind::Comment, true),
        (&cli.add_ignore_file, PatternKind::File, false),
        (&cli.add_ignore_file_global, PatternKind::File, true),
    ];

    let mut any = false;
    for (pattern, kind, is_global) in requests {
        let Some(pattern) = pattern else {
            continue;
        };
        any = true;
        let path = if is_global {
            global.context("cannot locate the home directory for global settings")?
        } else {
            local
        };
        let added = config::persist_pattern(path, kind, pattern)?;
        let list = match kind {
            PatternKind::Comment => "ignore",
            PatternKind::File => "file ignore",
        };
        if added {
            println!(
                "{} `{pattern}` to the {list} list in {}",
                "added".green(),
                path.display()
            );
        } else {
            println!("`{pattern}` is already in the {list} list in {}", path.display());
        }
        debug!(path = %path.display(), pattern = %pattern, added, "persisted pattern");
    }
    Ok(any)
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .context("failed to initialize logging")
}

/// Single-file mode: the stripped text goes to stdout untouched.
fn print_stripped(outcomes: &[FileOutcome]) -> i32 {
    let Some(outcome) = outcomes.first() else {
        return 0;
    };
    match &outcome.status {
        Status::Failed(message) => {
            eprintln!("{}: {message}", "error".red().bold());
            2
        }
        status => {
            if let Status::Skipped(reason) = status {
                eprintln!(
                    "{}: {}: {reason}, printed unchanged",
                    "warning".yellow().bold(),
                    outcome.path.display()
                );
            }
            if let Some(text) = &outcome.output {
                print!("{text}");
            }
            0
        }
    }
}

fn print_text(outcomes: &[FileOutcome], mode: Mode, list_removals: bool) {
    let verb = if mode == Mode::Write {
        "stripped"
    } else {
        "would strip"
    };

    let mut changed = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for o in outcomes {
        match &o.status {
            Status::Changed => {
                changed += 1;
                println!(
                    "{} {} ({} comments, {} docstrings)",
                    verb.cyan(),
                    o.path.display(),
                    o.count(RemovalKind::Comment),
                    o.count(RemovalKind::Docstring)
                );
                if list_removals {
                    for r in &o.removals {
                        println!("  {r}");
                    }
                }
            }
            Status::Unchanged => {}
            Status::Skipped(reason) => {
                skipped += 1;
                println!("{} {}: {reason}", "skipped".yellow(), o.path.display());
            }
            Status::Failed(message) => {
                failed += 1;
                eprintln!("{}: {message}", "error".red().bold());
            }
        }
    }

    let total = outcomes.len();
    if changed == 0 && skipped == 0 && failed == 0 {
        println!("{}", format!("Nothing to strip in {total} file(s)").green());
    } else {
        let summary = format!(
            "{total} file(s): {changed} {}, {skipped} skipped, {failed} error(s)",
            if mode == Mode::Write { "stripped" } else { "to strip" }
        );
        println!("{}", summary.yellow().bold());
    }
}

/// Emit valid, well-formatted JSON using serde_json.
fn print_json(outcomes: &[FileOutcome], list_removals: bool) -> Result<()> {
    let items: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|o| {
            let (status, reason) = match &o.status {
                Status::Changed => ("changed", None),
                Status::Unchanged => ("unchanged", None),
                Status::Skipped(r) => ("skipped", Some(r.as_str())),
                Status::Failed(m) => ("error", Some(m.as_str())),
            };
            let mut item = json!({
                "path":       o.path.display().to_string(),
                "status":     status,
                "comments":   o.count(RemovalKind::Comment),
                "docstrings": o.count(RemovalKind::Docstring),
            });
            if let Some(reason) = reason {
                item["reason"] = json!(reason);
            }
            if list_removals {
                item["removals"] = o
                    .removals
                    .iter()
                    .map(|r| {
                        json!({
                            "line":    r.line,
                            "col":     r.col,
                            "kind":    r.kind.to_string(),
                            "excerpt": r.excerpt,
                        })
                    })
                    .collect();
            }
            item
        })
        .collect();

    let count = |pred: fn(&Status) -> bool| outcomes.iter().filter(|o| pred(&o.status)).count();
    let output = json!({
        "files":   items,
        "changed": count(|s| *s == Status::Changed),
        "skipped": count(|s| matches!(s, Status::Skipped(_))),
        "errors":  count(|s| matches!(s, Status::Failed(_))),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
