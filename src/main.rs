use adk_utils::commands::data_insights::{self, DataInsightsCommand};
use adk_utils::commands::{self, Command, Context};
use adk_utils::config::Config;
use adk_utils::error::{format_error, Error};
use adk_utils::gcp::auth::{self, Credentials};
use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Helpers for ADK agents on Gemini Enterprise and Vertex AI Agent Engine
#[derive(Parser, Debug)]
#[command(name = "adk-utils", version = adk_utils::VERSION, about, long_about = None)]
struct Args {
    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Location (`global`, `us`, `eu`, `us-central1`, ...)
    #[arg(short, long, global = true)]
    location: Option<String>,

    /// Print raw JSON and never prompt
    #[arg(long, global = true)]
    format_raw: bool,

    /// Items per page in listings
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Send every API call to this base URL
    #[arg(long, global = true, hide = true)]
    api_endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("adk-utils {} started with log level: {:?}", adk_utils::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("adk-utils").join("adk-utils.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".adk-utils").join("adk-utils.log");
    }
    PathBuf::from("adk-utils.log")
}

async fn build_context(args: &Args) -> anyhow::Result<Context> {
    let config = Config::load()?;

    let project = config
        .effective_project(args.project.as_deref())
        .ok_or_else(|| {
            Error::validation(
                "No GCP project configured. Set GOOGLE_CLOUD_PROJECT, run `gcloud config set project`, or use --project",
            )
        })?;
    if !auth::validate_project_id(&project) {
        tracing::warn!("Project '{}' does not look like a project ID", project);
    }
    let location = config.effective_location(args.location.as_deref());
    tracing::info!("Using project: {}, location: {}", project, location);

    let credentials = Credentials::from_environment().await?;

    let mut ctx = Context::new(&project, &location, credentials);
    ctx.format_raw = args.format_raw;
    ctx.page_size = config.effective_page_size(args.page_size);
    ctx.poll_interval = config.poll_interval();
    ctx.endpoint_override = args.api_endpoint.clone();
    Ok(ctx)
}

async fn run(args: Args) -> anyhow::Result<()> {
    if let Command::DataInsightsAgent(DataInsightsCommand::Init { dir }) = &args.command {
        data_insights::init(dir)?;
        return Ok(());
    }

    let ctx = build_context(&args).await?;
    commands::dispatch(&ctx, args.command).await?;
    Ok(())
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", format_error(e));
            ExitCode::from(e.exit_code())
        }
        None => {
            tracing::error!("{:#}", err);
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match setup_logging(args.log_level) {
        Ok(guard) => guard,
        Err(err) => return report_error(&err),
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err),
    }
}
