use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_BANK: &str = "data/real_data.csv";
pub const DEFAULT_PROGRESS: &str = "data/progress.json";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidSeed { raw: String },
    InvalidDbUrl { raw: String },
    ConflictingBackends,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::ConflictingBackends => {
                write!(f, "--progress and --db cannot be used together")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  drill [drill]   [--bank <path>] [--progress <path> | --db <sqlite_url>]");
    eprintln!("                  [--categories <a,b,...>] [--seed <n>]");
    eprintln!("  drill history   [--progress <path> | --db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --bank {DEFAULT_BANK}");
    eprintln!("  --progress {DEFAULT_PROGRESS}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRILL_BANK, DRILL_PROGRESS, DRILL_DB_URL, DRILL_CATEGORIES, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Drill,
    History,
    Help,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "drill" => Some(Self::Drill),
            "history" => Some(Self::History),
            "help" | "--help" | "-h" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Where the progress log lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressBackend {
    Json(PathBuf),
    Sqlite(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub bank: PathBuf,
    pub backend: ProgressBackend,
    pub categories: Option<Vec<String>>,
    pub seed: Option<u64>,
}

/// Lookup for environment fallbacks; injected so parsing is testable.
pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

impl Args {
    /// Parse command-line arguments (without the program name).
    ///
    /// Flags win over environment variables, which win over defaults.
    pub fn parse(argv: Vec<String>, env: &impl Env) -> Result<Self, ArgsError> {
        let mut iter = argv.into_iter().peekable();

        let first = iter.peek().cloned();
        let command = match first.as_deref() {
            None => Command::Drill,
            Some(first) if first.starts_with('-') && !matches!(first, "-h" | "--help") => {
                Command::Drill
            }
            Some(first) => {
                let cmd = Command::from_arg(first)
                    .ok_or_else(|| ArgsError::UnknownCommand(first.to_owned()))?;
                iter.next();
                cmd
            }
        };

        let mut bank = env.var("DRILL_BANK").map(PathBuf::from);
        let mut progress = None;
        let mut db_url = None;
        let mut categories = env.var("DRILL_CATEGORIES").map(|raw| split_categories(&raw));
        let mut seed = None;

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--bank" => bank = Some(PathBuf::from(require_value(&mut iter, "--bank")?)),
                "--progress" => {
                    progress = Some(PathBuf::from(require_value(&mut iter, "--progress")?));
                }
                "--db" => {
                    let value = require_value(&mut iter, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = Some(value);
                }
                "--categories" => {
                    let value = require_value(&mut iter, "--categories")?;
                    categories = Some(split_categories(&value));
                }
                "--seed" => {
                    let value = require_value(&mut iter, "--seed")?;
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    seed = Some(parsed);
                }
                "--help" | "-h" => {
                    return Ok(Self::defaults(Command::Help));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let backend = match (progress, db_url) {
            (Some(_), Some(_)) => return Err(ArgsError::ConflictingBackends),
            (Some(path), None) => ProgressBackend::Json(path),
            (None, Some(url)) => ProgressBackend::Sqlite(normalize_sqlite_url(url)),
            (None, None) => match (env.var("DRILL_PROGRESS"), env.var("DRILL_DB_URL")) {
                (_, Some(url)) => ProgressBackend::Sqlite(normalize_sqlite_url(url)),
                (Some(path), None) => ProgressBackend::Json(PathBuf::from(path)),
                (None, None) => ProgressBackend::Json(PathBuf::from(DEFAULT_PROGRESS)),
            },
        };

        Ok(Self {
            command,
            bank: bank.unwrap_or_else(|| PathBuf::from(DEFAULT_BANK)),
            backend,
            categories,
            seed,
        })
    }

    fn defaults(command: Command) -> Self {
        Self {
            command,
            bank: PathBuf::from(DEFAULT_BANK),
            backend: ProgressBackend::Json(PathBuf::from(DEFAULT_PROGRESS)),
            categories: None,
            seed: None,
        }
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
