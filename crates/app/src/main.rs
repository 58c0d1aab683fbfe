mod terminal;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use recruit_core::model::ScheduleId;
use services::{ApiConfig, AuthService, HttpRecruitApi, SessionError, TestSessionService};
use storage::repository::Storage;

#[derive(Parser)]
#[command(
    name = "recruit",
    about = "Take scheduled recruitment tests from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database holding credentials and test progress
    #[arg(
        long,
        global = true,
        env = "RECRUIT_DB_URL",
        default_value = "sqlite://recruit.sqlite3"
    )]
    db: String,

    /// Base URL of the recruitment API
    #[arg(long, global = true, env = "RECRUIT_API_BASE")]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long, env = "RECRUIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// List tests currently open for you
    Tests,

    /// Start or resume a test
    Take { id: ScheduleId },

    /// Show the graded result of a finished test
    Result { id: ScheduleId },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_dir(db_url: &str) -> Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_dir(&db_url)?;
    let storage = Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))?;

    let mut config = ApiConfig::from_env();
    if let Some(base) = cli.api_base {
        config = ApiConfig::new(base).with_timeout(config.timeout);
    }
    tracing::debug!(api = %config.base_url, db = %db_url, "starting");

    let http = Arc::new(HttpRecruitApi::new(config, storage.credentials.clone())?);
    let auth = AuthService::new(http.clone(), storage.credentials.clone());
    let tests = TestSessionService::new(http, storage.progress.clone(), storage.credentials.clone());

    match cli.command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let user = auth.login(&email, &password).await?;
            println!("Logged in as {}", user.display_name());
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out");
        }
        Command::Tests => {
            let open = tests.active_tests().await?;
            if open.is_empty() {
                println!("No active tests.");
            }
            for schedule in open {
                println!(
                    "{:>6}  {}  {}  {} min",
                    schedule.id,
                    schedule.test_time.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    schedule.job_title,
                    schedule.duration_minutes,
                );
            }
        }
        Command::Take { id } => terminal::take_test(&tests, id).await?,
        Command::Result { id } => {
            let result = tests.result(id).await?;
            let title = result.job.as_ref().map_or("Test", |job| job.title.as_str());
            println!(
                "{title}: score {} ({}/{} correct)",
                result.score,
                result.correct_count(),
                result.responses.len()
            );
            for (n, response) in result.responses.iter().enumerate() {
                let mark = if response.is_correct { "+" } else { "-" };
                println!(
                    "{mark} {}. {} (chose {}, correct {})",
                    n + 1,
                    response.question_text,
                    response.selected_option.value(),
                    response.correct_option.value(),
                );
            }
        }
    }
    Ok(())
}

/// One-line rendering of an error that ended a command.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SessionError>() {
        Some(SessionError::WindowClosed { ended_at }) => format!(
            "This test window has ended ({}).",
            ended_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        _ => format!("{err:#}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", describe(&err));
            ExitCode::from(2)
        }
    }
}
