mod config;
mod terminal;

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use config::{Args, ArgsError, Command, ProcessEnv, ProgressBackend, print_usage};
use services::{
    Clock, DrillSession, ProgressError, ProgressStore, SessionError, SessionPlanner, load_bank,
};
use storage::repository::Storage;
use terminal::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Logs go to stderr so they never interleave with prompts on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

async fn open_storage(backend: &ProgressBackend) -> Result<Storage, Box<dyn std::error::Error>> {
    match backend {
        ProgressBackend::Json(path) => Ok(Storage::json_file(path.clone())),
        ProgressBackend::Sqlite(url) => {
            // Open + migrate SQLite at startup. Keep this in the binary glue so services stay pure.
            prepare_sqlite_file(url)?;
            Ok(Storage::sqlite(url).await?)
        }
    }
}

/// Move an unreadable JSON log aside so the fresh one does not overwrite it.
fn back_up_corrupt_log(path: &Path) -> io::Result<Option<std::path::PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut backup = path.as_os_str().to_owned();
    backup.push(".corrupt");
    let backup = std::path::PathBuf::from(backup);
    std::fs::rename(path, &backup)?;
    Ok(Some(backup))
}

async fn open_progress(
    storage: &Storage,
    backend: &ProgressBackend,
    clock: Clock,
) -> Result<ProgressStore, Box<dyn std::error::Error>> {
    let repo = Arc::clone(&storage.progress);
    match ProgressStore::load_or_create(Arc::clone(&repo), clock).await {
        Ok(store) => Ok(store),
        Err(err @ ProgressError::Corrupt(_)) => {
            warn!(error = %err, "progress log unreadable");
            eprintln!("Progress log could not be read ({err}); starting a new one.");
            if let ProgressBackend::Json(path) = backend {
                if let Some(backup) = back_up_corrupt_log(path)? {
                    eprintln!("The old log was kept at {}.", backup.display());
                }
            }
            Ok(ProgressStore::fresh(repo, clock))
        }
        Err(err) => Err(err.into()),
    }
}

/// Print the persisted log as-is; nothing is appended or saved.
async fn write_history(
    storage: &Storage,
    out: impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let log = ProgressStore::peek(storage.progress.as_ref()).await?;
    let mut terminal = Terminal::new(io::empty(), out);
    terminal.print_history(&log)?;
    Ok(())
}

async fn run_history(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.backend).await?;
    write_history(&storage, io::stdout().lock()).await
}

async fn run_drill(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let bank = Arc::new(load_bank(&args.bank)?);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut terminal = Terminal::new(stdin.lock(), stdout.lock());

    let mut planner = match args.seed {
        Some(seed) => SessionPlanner::with_seed(seed),
        None => SessionPlanner::new(),
    };

    let (categories, queue) = match &args.categories {
        Some(names) => {
            let categories: BTreeSet<String> = names.iter().cloned().collect();
            let queue = planner.build_queue(&bank, &categories)?;
            (categories, queue)
        }
        None => loop {
            let categories = terminal.select_categories(&bank)?;
            if categories.is_empty() {
                terminal.say("No categories were selected. Exiting...")?;
                return Ok(());
            }
            match planner.build_queue(&bank, &categories) {
                Ok(queue) => break (categories, queue),
                Err(SessionError::EmptySelection) => {
                    terminal.say("The selected categories contain no questions.")?;
                }
                Err(other) => return Err(other.into()),
            }
        },
    };

    let storage = open_storage(&args.backend).await?;
    let store = open_progress(&storage, &args.backend, Clock::default_clock()).await?;

    let mut session = DrillSession::from_queue(Arc::clone(&bank), categories, queue, store)?;
    terminal.drive(&mut session).await?;

    let totals = session.progress_log().lifetime_totals();
    info!(
        categories = session.categories().len(),
        passes = session.pass_number(),
        entries = totals.entries,
        known = totals.known,
        unknown = totals.unknown,
        "drill finished"
    );
    terminal.into_output().flush()?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = Args::parse(argv, &ProcessEnv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match args.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::History => run_history(&args).await,
        Command::Drill => run_drill(&args).await,
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::ProgressRepository;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "drill-app-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn corrupt_log_is_moved_aside() {
        let dir = scratch("backup");
        let path = dir.join("progress.json");
        std::fs::write(&path, "{not json").unwrap();

        let backup = back_up_corrupt_log(&path).unwrap().unwrap();

        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");
        assert!(backup.to_string_lossy().ends_with("progress.json.corrupt"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_log_needs_no_backup() {
        let dir = scratch("missing");
        assert!(back_up_corrupt_log(&dir.join("absent.json")).unwrap().is_none());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn sqlite_file_is_created_with_parents() {
        let dir = scratch("sqlite");
        let path = dir.join("nested").join("progress.sqlite3");
        let url = format!("sqlite://{}", path.display());

        prepare_sqlite_file(&url).unwrap();

        assert!(path.exists());
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://x").is_err());
        std::fs::remove_dir_all(dir).unwrap();
    }

    async fn history_output(storage: &Storage) -> String {
        let mut out = Vec::new();
        write_history(storage, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn history_of_an_empty_store_adds_no_session() {
        let storage = Storage::in_memory();

        let out = history_output(&storage).await;

        assert_eq!(out, "No progress recorded yet.\n");
        assert!(storage.progress.load_log().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_lists_only_recorded_sessions() {
        use drill_core::model::{ProgressLog, QuestionId, Verdict};
        use drill_core::time::fixed_now;
        use storage::repository::{InMemoryRepository, ProgressLogRecord};

        let mut log = ProgressLog::new();
        log.record(QuestionId::new(0), Verdict::Known, fixed_now());
        log.record(QuestionId::new(1), Verdict::Unknown, fixed_now());
        let repo = InMemoryRepository::with_record(ProgressLogRecord::from_log(&log));
        let storage = Storage {
            progress: Arc::new(repo.clone()),
        };

        let out = history_output(&storage).await;

        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("#1 "));
        assert!(out.contains("(50.00%)"));
        assert!(out.contains("1 entries, 1 right, 1 wrong"));
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_json_log_falls_back_to_a_fresh_store() {
        let dir = scratch("fresh");
        let path = dir.join("progress.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let backend = ProgressBackend::Json(path.clone());
        let storage = open_storage(&backend).await.unwrap();

        let store = open_progress(&storage, &backend, drill_core::time::fixed_clock())
            .await
            .unwrap();

        assert!(store.log().is_empty());
        assert!(dir.join("progress.json.corrupt").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
