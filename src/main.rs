// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

use tqagent::app_config::{self, Config, FaultPolicy};
use tqagent::content_source::HttpContentSource;
use tqagent::orchestrator::{BatchOrchestrator, OrchestratorSettings};
use tqagent::providers::anthropic::Anthropic;
use tqagent::quality::{AssessorSettings, QualityAssessor};
use tqagent::scheduler::Scheduler;
use tqagent::server::{self, AppState};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control API and the scheduler (default command)
    Serve(ServeArgs),

    /// Run one batch quality check and print the outcome as JSON
    Check,

    /// Assess a single translation and print the result as JSON
    Assess(AssessArgs),

    /// Generate shell completions for tqagent
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Port for the control API
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not start the scheduler; checks only run on request
    #[arg(long)]
    no_schedule: bool,
}

#[derive(Args, Debug)]
struct AssessArgs {
    /// English source text
    #[arg(long)]
    english: String,

    /// Sinhala translation
    #[arg(long)]
    sinhala: String,

    /// Tamil translation
    #[arg(long)]
    tamil: String,

    /// Where the text appears on the site
    #[arg(long)]
    context: Option<String>,
}

/// tqagent - Translation Quality Agent
///
/// Reviews the Sinhala and Tamil translations of a marine education site with a
/// generative-text model and optionally writes better translations back.
#[derive(Parser, Debug)]
#[command(name = "tqagent")]
#[command(version)]
#[command(about = "Translation quality agent for Sinhala and Tamil content")]
#[command(long_about = "tqagent periodically reviews English/Sinhala/Tamil translation triples with an LLM,
keeps quality statistics and exposes an HTTP control API.

EXAMPLES:
    tqagent                                      # Serve the API and run the scheduler
    tqagent serve --port 8080 --no-schedule      # API only, checks on demand
    tqagent check                                # One batch run, JSON to stdout
    tqagent assess --english Reef --sinhala .. --tamil ..
    tqagent completions bash > tqagent.bash      # Generate bash completions

CONFIGURATION:
    Defaults can be overridden by a JSON file (--config), then by environment
    variables such as LLM_API_KEY, CONTENT_API_URL, CHECK_SCHEDULE, AUTO_UPDATE,
    QUALITY_THRESHOLD, PORT and LOG_LEVEL, then by command line flags.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TQAGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Defaults, then the JSON file, then the environment, then CLI flags
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;

    if let Some(level) = &cli.log_level {
        config.log.level = level.clone().into();
    }
    if let Some(Commands::Serve(args)) = &cli.command {
        if let Some(port) = args.port {
            config.server.port = port;
        }
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn build_orchestrator(config: &Config) -> Result<Arc<BatchOrchestrator>> {
    if config.llm.api_key.is_empty() {
        warn!("LLM_API_KEY is not set, every quality assessment will fail");
    }

    let provider = Anthropic::new(
        config.llm.api_key.clone(),
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
    );
    let assessor = QualityAssessor::new(Arc::new(provider), AssessorSettings::from_config(config));
    let source = HttpContentSource::from_config(&config.content)?;

    Ok(Arc::new(BatchOrchestrator::new(
        Arc::new(assessor),
        Arc::new(source),
        OrchestratorSettings::from_config(config),
    )))
}

/// Log every panic with its location
///
/// Request handler panics are answered with a 500 by the router and leave the
/// agent running; background faults are escalated by the scheduler's supervisor.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        error!("Panic at {}: {}", location, message);
    }));
}

async fn shutdown_signal(fault: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully"),
        _ = fault.notified() => info!("Shutting down after a fault"),
    }
}

async fn run_serve(config: Config, args: ServeArgs) -> Result<()> {
    let config = Arc::new(config);
    let orchestrator = build_orchestrator(&config)?;
    let fault = Arc::new(Notify::new());
    install_panic_hook();

    let mut scheduler = Scheduler::new(
        Arc::clone(&orchestrator),
        config.agent.check_schedule.clone(),
        config.agent.warmup(),
    );
    if config.fault_policy == FaultPolicy::Shutdown {
        scheduler = scheduler.with_fault_notify(Arc::clone(&fault));
    }
    let scheduler = Arc::new(scheduler);

    info!(
        "Translation quality agent starting ({} mode, model {}, auto-update {})",
        config.server.environment, config.llm.model, config.agent.auto_update
    );

    if args.no_schedule {
        info!("Scheduler disabled, checks run on request only");
    } else {
        scheduler.start();
    }

    let state = AppState::new(orchestrator, Arc::clone(&scheduler), Arc::clone(&config));
    let stopping = Arc::clone(&scheduler);
    let shutdown = async move {
        shutdown_signal(fault).await;
        stopping.stop();
    };

    server::serve(state, shutdown).await
}

async fn run_check(config: Config) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let outcome = orchestrator.run_quality_check().await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.success {
        anyhow::bail!(outcome.message);
    }
    Ok(())
}

async fn run_assess(config: Config, args: AssessArgs) -> Result<()> {
    let orchestrator = build_orchestrator(&config)?;
    let result = orchestrator
        .assessor()
        .assess(&args.english, &args.sinhala, &args.tamil, args.context.as_deref())
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!(result.error.unwrap_or_else(|| "Assessment failed".to_string()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "tqagent", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    tqagent::logging::init(&config.log)?;

    match cli.command {
        Some(Commands::Serve(args)) => run_serve(config, args).await,
        None => run_serve(config, ServeArgs::default()).await,
        Some(Commands::Check) => run_check(config).await,
        Some(Commands::Assess(args)) => run_assess(config, args).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}
