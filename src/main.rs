use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use gitscribe_core::{GitscribeConfig, GitscribeError, OutputFormat};
use gitscribe_difflens::Diff;
use gitscribe_history::Commit;
use miette::{Context, IntoDiagnostic, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gitscribe",
    version,
    about = "Parse git log, diff and numstat output",
    long_about = "gitscribe turns the text git prints into structured commits, diffs and stats.\n\n\
                   It never runs git itself: pipe output in or point it at a file.\n\n\
                   Examples:\n  \
                     git rev-list --pretty=raw HEAD | gitscribe log\n  \
                     git diff -M --full-index main | gitscribe diff --format json\n  \
                     git diff --numstat HEAD~3 | gitscribe stats\n  \
                     gitscribe init                 Create a .gitscribe.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .gitscribe.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (default: from config, else text)
    #[arg(
        long,
        global = true,
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable summaries\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: Option<OutputFormat>,

    /// Enable debug logging on stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Parse `--pretty=raw` commit records
    #[command(long_about = "Parse `--pretty=raw` commit records.\n\n\
        Accepts `git log --pretty=raw` and `git rev-list --pretty=raw` output,\n\
        including `--bisect-all` annotations. Reads from stdin or a file.\n\n\
        Examples:\n  git rev-list --pretty=raw HEAD | gitscribe log\n  gitscribe log --file history.txt")]
    Log {
        /// Read input from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Parse full-index diff output into per-file entries
    #[command(long_about = "Parse full-index diff output into per-file entries.\n\n\
        Accepts `git diff -M --full-index` and `git show -M --full-index` output.\n\
        Reads from stdin or a file.\n\n\
        Examples:\n  git diff -M --full-index | gitscribe diff\n  gitscribe diff --file changes.patch")]
    Diff {
        /// Read input from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Aggregate insertion and deletion counts
    #[command(long_about = "Aggregate insertion and deletion counts.\n\n\
        Accepts `--numstat` output (optionally followed by a `--shortstat` summary)\n\
        or full diff text.\n\n\
        Examples:\n  git diff --numstat --shortstat HEAD~1 | gitscribe stats\n  git diff | gitscribe stats --format markdown")]
    Stats {
        /// Read input from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create a default .gitscribe.toml in the current directory
    Init,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

const CONFIG_FILE: &str = ".gitscribe.toml";

const DEFAULT_CONFIG: &str = r#"# gitscribe configuration

[log]
# Width of the indent before each message line in --pretty=raw records
message_indent = 4

[stats]
# Check per-file sums against a trailing --shortstat summary
verify_summary = true

[output]
# text, json, or markdown
format = "text"
"#;

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mgitscribe\x1b[0m v{version}: structured git log, diff and stats\n");
        println!("Commands:");
        println!("  \x1b[32mlog\x1b[0m          Parse --pretty=raw commit records");
        println!("  \x1b[32mdiff\x1b[0m         Parse full-index diffs");
        println!("  \x1b[32mstats\x1b[0m        Aggregate numstat or diff line counts");
        println!("  \x1b[32minit\x1b[0m         Create default configuration");
        println!("  \x1b[32mcompletions\x1b[0m  Generate shell completions\n");
    } else {
        println!("gitscribe v{version}: structured git log, diff and stats\n");
        println!("Commands:");
        println!("  log          Parse --pretty=raw commit records");
        println!("  diff         Parse full-index diffs");
        println!("  stats        Aggregate numstat or diff line counts");
        println!("  init         Create default configuration");
        println!("  completions  Generate shell completions\n");
    }

    println!("Run 'gitscribe <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<GitscribeConfig> {
    match path {
        Some(path) => Ok(GitscribeConfig::from_file(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                Ok(GitscribeConfig::from_file(default_path)?)
            } else {
                Ok(GitscribeConfig::default())
            }
        }
    }
}

fn read_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn render_commits(commits: &[Commit]) -> String {
    let mut out = String::new();
    for (i, commit) in commits.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("commit {commit}\n"));
        if commit.parents().len() > 1 {
            let short: Vec<&str> = commit.parents().iter().map(|p| short_id(p)).collect();
            out.push_str(&format!("Merge: {}\n", short.join(" ")));
        }
        let Some(details) = commit.details() else {
            continue;
        };
        out.push_str(&format!("Author: {}\n", details.author));
        if let Some(date) = details.author.datetime() {
            out.push_str(&format!("Date:   {}\n", date.format("%a %b %-d %H:%M:%S %Y %z")));
        }
        if !details.message.is_empty() {
            out.push('\n');
            for line in details.message.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        }
    }
    out
}

fn commits_to_markdown(commits: &[Commit]) -> String {
    let mut out = String::from("| Commit | Author | Date | Summary |\n|---|---|---|---|\n");
    for commit in commits {
        match commit.details() {
            Some(details) => {
                let date = details
                    .author
                    .datetime()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                out.push_str(&format!(
                    "| `{}` | {} | {} | {} |\n",
                    short_id(commit.id()),
                    details.author.name,
                    date,
                    details.summary().replace('|', "\\|")
                ));
            }
            None => out.push_str(&format!("| `{}` | | | |\n", short_id(commit.id()))),
        }
    }
    out
}

fn diffs_to_markdown(diffs: &[Diff]) -> String {
    let mut out = String::from("| Change | Path | + | - |\n|---|---|---:|---:|\n");
    for diff in diffs {
        let path = match diff.rename() {
            Some(rename) => format!("`{}` → `{}`", rename.from, rename.to),
            None => format!("`{}`", diff.path()),
        };
        if diff.binary() {
            out.push_str(&format!("| {} | {path} | bin | bin |\n", diff.change_type()));
        } else {
            out.push_str(&format!(
                "| {} | {path} | {} | {} |\n",
                diff.change_type(),
                diff.insertions(),
                diff.deletions()
            ));
        }
    }
    out
}

fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, GitscribeError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let format = cli.format.unwrap_or(config.output.format);
    debug!(%format, "resolved output format");

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Log { ref file }) => {
            let input = read_input(file)?;
            let commits = gitscribe_history::parse_commit_log_with(&input, &config.log)?;
            match format {
                OutputFormat::Json => print_json(&commits)?,
                OutputFormat::Markdown => print!("{}", commits_to_markdown(&commits)),
                OutputFormat::Text => print!("{}", render_commits(&commits)),
            }
        }
        Some(Command::Diff { ref file }) => {
            let input = read_input(file)?;
            let diffs = gitscribe_difflens::parse_diff(&input)?;
            match format {
                OutputFormat::Json => print_json(&diffs)?,
                OutputFormat::Markdown => print!("{}", diffs_to_markdown(&diffs)),
                OutputFormat::Text => {
                    for diff in &diffs {
                        println!("{diff}");
                    }
                }
            }
        }
        Some(Command::Stats { ref file }) => {
            let input = read_input(file)?;
            let stats = gitscribe_difflens::stats::parse_stats_with(&input, &config.stats)?;
            match format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Markdown => print!("{}", stats.to_markdown()),
                OutputFormat::Text => print!("{stats}"),
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gitscribe", &mut std::io::stdout());
        }
    }

    Ok(())
}
