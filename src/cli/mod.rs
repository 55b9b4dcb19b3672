//! CLI command definitions and handlers

mod history;
mod pin;
mod related;
mod status;

use crate::config::UserConfig;
use crate::error::{PinlogError, PinlogResult};
use crate::git::GitRepository;
use crate::pin::{normalize_repo_path, FilePinStore};
use crate::reporters::OutputFormat;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// pinlog - Pin a file and query its git history
#[derive(Parser, Debug)]
#[command(name = "pinlog")]
#[command(
    version,
    about = "Pin a file (or one line of it) and query its git history",
    long_about = "pinlog remembers one file of a repository, optionally one line of it, \
and answers history questions about it: which commits touched that line, what each of \
them changed, and which files tend to change alongside it.\n\n\
Nothing is written to the repository. The pin lives in pinlog's own state directory.",
    after_help = "\
Examples:
  pinlog pin src/parser.rs#42          Pin line 42 of src/parser.rs
  pinlog history                       Commits that touched the pinned line
  pinlog history --ignore-line         Commits that touched the pinned file
  pinlog history --author ada --after 2024-01-01
  pinlog history --traverse --limit 3  Full diffs of the last three changes
  pinlog history --files-changed       Files touched alongside the pinned file
  pinlog related --limit 5             Files most often changed together with it"
)]
pub struct Cli {
    /// Path inside the repository (default: current directory)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pin a file, optionally a single line of it (PATH or PATH#LINE)
    #[command(after_help = "\
Examples:
  pinlog pin src/main.rs               Pin the whole file
  pinlog pin src/main.rs#10            Pin line 10
  pinlog pin src/main.rs --line 10     Same as above
  pinlog pin --clear                   Forget the pin")]
    Pin {
        /// File to pin, relative to the current directory
        #[arg(value_name = "PATH[#LINE]", required_unless_present = "clear", conflicts_with = "clear")]
        target: Option<String>,

        /// Line to pin (overrides a #LINE suffix)
        #[arg(long, short = 'L')]
        line: Option<u32>,

        /// Remove the current pin
        #[arg(long)]
        clear: bool,
    },

    /// Show the current pin
    Status {
        /// Output format: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,
    },

    /// Show commit history for the pinned file or a given file
    History(HistoryArgs),

    /// Show files most often changed together with the pinned file
    Related {
        /// Maximum number of files to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Output format: text, json
        #[arg(long, short = 'f', value_parser = ["text", "json"])]
        format: Option<String>,
    },

    /// Manage user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct HistoryArgs {
    /// File to show history for instead of the pinned one
    #[arg(long)]
    pub file: Option<String>,

    /// Line to follow (overrides the pinned line)
    #[arg(long, short = 'L')]
    pub line: Option<u32>,

    /// Only commits whose author name or email contains this text
    #[arg(long, short = 'a')]
    pub author: Option<String>,

    /// Only commits on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Only commits on or before this date (YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Maximum number of commits
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Oldest commits first
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Ignore the pinned line and show the whole file's history
    #[arg(long, short = 'i')]
    pub ignore_line: bool,

    /// One line per commit (default)
    #[arg(long)]
    pub summary: bool,

    /// Every commit with its full diff
    #[arg(long, short = 't')]
    pub traverse: bool,

    /// Files changed across the matching commits
    #[arg(long)]
    pub files_changed: bool,

    /// Output format: text, json
    #[arg(long, short = 'f', value_parser = ["text", "json"])]
    pub format: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize config file with example settings
    Init,
    /// Show current config and paths
    Show,
}

/// The repository a command runs against and where the user stands in it.
pub(crate) struct Workspace {
    pub repo: GitRepository,
    pub root: PathBuf,
    pub cwd: PathBuf,
}

impl Workspace {
    fn open(path: &Path) -> Result<Self> {
        let cwd = path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", path.display()))?;
        let repo = GitRepository::open(&cwd)
            .with_context(|| format!("Not a git repository: {}", path.display()))?;
        let root = repo
            .root()
            .canonicalize()
            .unwrap_or_else(|_| repo.root().to_path_buf());
        debug!("Workspace root {}, cwd {}", root.display(), cwd.display());
        Ok(Self { repo, root, cwd })
    }

    /// Resolve a user-supplied path to its repository-relative form.
    pub fn relative(&self, path: &str) -> PinlogResult<String> {
        repo_relative(&self.root, &self.cwd, path)
    }
}

/// Turn `path` (absolute, or relative to `cwd`) into a `/`-separated path
/// relative to `root`. Works for files that no longer exist on disk.
pub(crate) fn repo_relative(root: &Path, cwd: &Path, path: &str) -> PinlogResult<String> {
    let given = Path::new(path.trim());
    let joined = if given.is_absolute() {
        given.to_path_buf()
    } else {
        cwd.join(given)
    };
    let absolute = joined.canonicalize().unwrap_or_else(|_| lexical_normalize(&joined));

    let relative = absolute.strip_prefix(root).map_err(|_| {
        PinlogError::InvalidArgument(format!(
            "{} is outside the repository at {}",
            path,
            root.display()
        ))
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    normalize_repo_path(&parts.join("/"))
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn resolve_format(flag: Option<&str>, config: &UserConfig) -> Result<OutputFormat> {
    match flag {
        Some(format) => format.parse(),
        None => config.format().parse().or_else(|e| {
            tracing::warn!("Ignoring configured format: {}", e);
            Ok(OutputFormat::Text)
        }),
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = UserConfig::load()?;

    let output = match cli.command {
        Commands::Config { action } => return run_config_action(action),
        Commands::Pin { target, line, clear } => {
            let workspace = Workspace::open(&cli.repo)?;
            let store = FilePinStore::for_repo(&config.state_root(), &workspace.root);
            pin::run(&workspace, &store, target.as_deref(), line, clear)?
        }
        Commands::Status { format } => {
            let workspace = Workspace::open(&cli.repo)?;
            let store = FilePinStore::for_repo(&config.state_root(), &workspace.root);
            status::run(&store, resolve_format(format.as_deref(), &config)?)?
        }
        Commands::History(args) => {
            let workspace = Workspace::open(&cli.repo)?;
            let store = FilePinStore::for_repo(&config.state_root(), &workspace.root);
            let format = resolve_format(args.format.as_deref(), &config)?;
            history::run(&workspace, &store, &args, config.default_limit(), format)?
        }
        Commands::Related { limit, format } => {
            let workspace = Workspace::open(&cli.repo)?;
            let store = FilePinStore::for_repo(&config.state_root(), &workspace.root);
            let format = resolve_format(format.as_deref(), &config)?;
            related::run(&workspace.repo, &store, limit, format)?
        }
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn run_config_action(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = UserConfig::init_user_config()?;
            println!("Config initialized at: {}", path.display());
            println!("\nOr set via environment:");
            println!("  export {}=\"/path/to/state\"", crate::config::STATE_DIR_ENV);
            println!("  export {}=10", crate::config::DEFAULT_LIMIT_ENV);
            Ok(())
        }
        ConfigAction::Show => show_config(),
    }
}

fn show_config() -> Result<()> {
    let config = UserConfig::load()?;
    println!("Config paths:");
    let user_path = std::env::var_os(crate::config::CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .or_else(UserConfig::user_config_path);
    if let Some(user_path) = user_path {
        let status = if user_path.exists() { "" } else { " (not found)" };
        println!("  User:  {}{}", user_path.display(), status);
    }
    println!("  State: {}", config.state_root().display());
    println!();
    match config.default_limit() {
        Some(limit) => println!("Default limit: {}", limit),
        None => println!("Default limit: none"),
    }
    println!("Format:        {}", config.format());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_history_flags() {
        let cli = Cli::try_parse_from([
            "pinlog", "history", "--author", "ada", "--after", "2024-01-01", "-n", "5", "--reverse",
            "--traverse",
        ])
        .unwrap();
        let Commands::History(args) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(args.author.as_deref(), Some("ada"));
        assert_eq!(args.limit, Some(5));
        assert!(args.reverse && args.traverse);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_pin_requires_target_or_clear() {
        assert!(Cli::try_parse_from(["pinlog", "pin"]).is_err());
        assert!(Cli::try_parse_from(["pinlog", "pin", "--clear"]).is_ok());
        assert!(Cli::try_parse_from(["pinlog", "pin", "a.rs", "--clear"]).is_err());
    }

    #[test]
    fn test_repo_relative_from_subdirectory() {
        let root = Path::new("/work/repo");
        let cwd = Path::new("/work/repo/src/nested");
        assert_eq!(repo_relative(root, cwd, "file.rs").unwrap(), "src/nested/file.rs");
        assert_eq!(repo_relative(root, cwd, "../lib.rs").unwrap(), "src/lib.rs");
        assert_eq!(repo_relative(root, cwd, "/work/repo/README.md").unwrap(), "README.md");
    }

    #[test]
    fn test_repo_relative_rejects_outside_paths() {
        let root = Path::new("/work/repo");
        assert!(matches!(
            repo_relative(root, root, "../elsewhere.rs"),
            Err(PinlogError::InvalidArgument(_))
        ));
        assert!(matches!(
            repo_relative(root, root, "."),
            Err(PinlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_format_flag_beats_config() {
        let config = UserConfig {
            history: crate::config::HistoryConfig {
                format: Some("json".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(resolve_format(None, &config).unwrap(), OutputFormat::Json);
        assert_eq!(resolve_format(Some("text"), &config).unwrap(), OutputFormat::Text);

        let broken = UserConfig {
            history: crate::config::HistoryConfig {
                format: Some("yaml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(resolve_format(None, &broken).unwrap(), OutputFormat::Text);
    }
}
