use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobtrack::api::{ApiClient, DEFAULT_API_URL};
use jobtrack::auth::AuthController;
use jobtrack::commands;
use jobtrack::models::{ContactField, JobField, JobStatus};
use jobtrack::session::SessionStore;
use jobtrack::sync::{JobsEngine, SyncError};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications against a Job Tracker backend")]
#[command(version)]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "JOBTRACK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Directory holding the session database
    #[arg(long, global = true, env = "JOBTRACK_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Work on this user's jobs instead of the logged-in user's
    #[arg(long, global = true)]
    user: Option<String>,

    /// Request timeout in seconds (none by default)
    #[arg(long, global = true, env = "JOBTRACK_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log output format
    #[arg(long, global = true, env = "JOBTRACK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Signup {
        username: String,
        /// Full name
        #[arg(short, long)]
        name: String,
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Show where navigating to a path would lead
    Open {
        /// e.g. /, /about, /login, /signup, /alice/jobs
        path: String,
    },

    #[command(flatten)]
    Jobs(JobsCommands),
}

#[derive(Subcommand)]
enum JobsCommands {
    /// List jobs
    List,

    /// Show a job and its contacts
    Show {
        /// Row number from `list`
        row: usize,
    },

    /// Add a blank job
    Add,

    /// Change one field of a job
    Set {
        /// Row number from `list`
        row: usize,
        /// company, role, status, appliedOn, location, platform, resume,
        /// followUp, interviewDate, jobLink or feedback
        field: JobField,
        value: String,
    },

    /// Change the status of a job (Applied, Interviewing, Offer, Rejected)
    Status {
        /// Row number from `list`
        row: usize,
        status: JobStatus,
    },

    /// Delete a job
    Delete {
        /// Row number from `list`
        row: usize,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Manage a job's contacts
    Contact {
        #[command(subcommand)]
        action: ContactCommands,
    },
}

#[derive(Subcommand)]
enum ContactCommands {
    /// Add a blank contact to a saved job
    Add {
        /// Job row number
        row: usize,
    },

    /// Change one field of a contact
    Set {
        /// Job row number
        row: usize,
        /// Contact position within the job
        contact: usize,
        /// name, role or email
        field: ContactField,
        value: String,
    },

    /// Delete a contact
    Delete {
        /// Job row number
        row: usize,
        /// Contact position within the job
        contact: usize,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// List a job's contacts
    List {
        /// Job row number
        row: usize,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (plain, json) = match format {
        LogFormat::Plain => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();
}

fn open_session(state_dir: Option<PathBuf>) -> Result<Arc<SessionStore>> {
    let dir = match state_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("Could not determine a data directory. Pass --state-dir.")?
            .join("jobtrack"),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create state directory {}", dir.display()))?;

    let path = dir.join("session.db");
    debug!(path = %path.display(), "opening session store");
    let store = SessionStore::open(&path).context("Failed to open session store")?;
    Ok(Arc::new(store))
}

/// Mounts the jobs view, runs one action and tears the view down.
/// Ctrl-C tears it down early; the action then finishes as detached.
async fn run_jobs(
    api: ApiClient,
    session: &SessionStore,
    user: Option<&str>,
    command: JobsCommands,
) -> Result<()> {
    let engine = commands::mount(api, &session.get(), user).await?;

    let action = dispatch(&engine, command);
    tokio::pin!(action);
    let result = tokio::select! {
        biased;
        result = &mut action => result,
        _ = tokio::signal::ctrl_c() => {
            engine.teardown();
            action.await
        }
    };

    engine.teardown();
    result
}

async fn dispatch(engine: &JobsEngine<ApiClient>, command: JobsCommands) -> Result<()> {
    match command {
        JobsCommands::List => commands::list::run(engine),
        JobsCommands::Show { row } => commands::show::run(engine, row),
        JobsCommands::Add => commands::create::run(engine).await,
        JobsCommands::Set { row, field, value } => {
            commands::update::run(engine, row, field, &value).await
        }
        JobsCommands::Status { row, status } => commands::status::run(engine, row, status).await,
        JobsCommands::Delete { row, force } => commands::delete::run(engine, row, force).await,
        JobsCommands::Contact { action } => match action {
            ContactCommands::Add { row } => commands::contact::add(engine, row).await,
            ContactCommands::Set {
                row,
                contact,
                field,
                value,
            } => commands::contact::set(engine, row, contact, field, &value).await,
            ContactCommands::Delete {
                row,
                contact,
                force,
            } => commands::contact::delete(engine, row, contact, force).await,
            ContactCommands::List { row } => commands::contact::list(engine, row),
        },
    }
}

fn session_expired(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<SyncError>())
        .any(SyncError::is_unauthorized)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let session = open_session(cli.state_dir)?;
    let api = ApiClient::new(
        &cli.api_url,
        session.clone(),
        cli.timeout_secs.map(Duration::from_secs),
    )
    .context("Failed to configure API client")?;

    let result = match cli.command {
        Commands::Login { username, password } => {
            let mut auth = AuthController::new(api, session);
            commands::auth::login(&mut auth, &username, password.as_deref()).await
        }
        Commands::Signup {
            username,
            name,
            email,
            password,
        } => {
            let mut auth = AuthController::new(api, session);
            commands::auth::signup(&mut auth, &username, &name, &email, password.as_deref()).await
        }
        Commands::Logout => {
            let mut auth = AuthController::new(api, session);
            commands::auth::logout(&mut auth)
        }
        Commands::Whoami => commands::auth::whoami(&session.get()),
        Commands::Open { path } => commands::open::run(&session.get(), &path),
        Commands::Jobs(command) => run_jobs(api, &session, cli.user.as_deref(), command).await,
    };

    if let Err(err) = &result {
        if session_expired(err) {
            eprintln!("The server rejected your session. Run 'jobtrack login' again.");
        }
    }
    result
}
