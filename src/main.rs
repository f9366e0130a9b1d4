/// Version injected at compile time via BOWDASH_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("BOWDASH_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use bowdash::api::{format_api_error, ApiClient};
use bowdash::config::Config;
use bowdash::resource::{EnrichedResource, PolicyUpdate};
use bowdash::ResourceStore;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Dashboard for bow-managed resources
#[derive(Parser, Debug)]
#[command(name = "bowdash", version, about, long_about = None)]
struct Args {
    /// Backend base URL
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resources with their derived policy fields
    List,
    /// Submit a policy change, then refresh
    Policy {
        /// Resource identifier
        identifier: String,
        /// Update policy (all, major, minor, patch, force, glob:...)
        #[arg(long)]
        policy: Option<String>,
        /// Required approvals
        #[arg(long)]
        approvals: Option<u32>,
        /// Trigger mode
        #[arg(long, value_enum)]
        trigger: Option<Trigger>,
        /// Poll schedule, e.g. "@every 5m"
        #[arg(long)]
        poll_schedule: Option<String>,
        /// Extra policy field as key=value
        #[arg(long = "set", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },
    /// Persist the backend endpoint
    SetEndpoint { url: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Trigger {
    Poll,
    Default,
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

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
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
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("bowdash {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("bowdash").join("bowdash.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".bowdash").join("bowdash.log");
    }
    PathBuf::from("bowdash.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();

    if let Command::SetEndpoint { url } = &args.command {
        ApiClient::new(url, None)?;
        config.set_endpoint(url)?;
        println!("Endpoint saved: {}", url);
        return Ok(());
    }

    let endpoint = config.effective_endpoint(args.endpoint.as_deref());
    tracing::info!("Using endpoint: {}", endpoint);

    let client = ApiClient::new(&endpoint, config.effective_auth())?;
    let store = ResourceStore::new(client);

    if let Command::Policy {
        identifier,
        policy,
        approvals,
        trigger,
        poll_schedule,
        fields,
    } = args.command
    {
        let mut update = PolicyUpdate::new(identifier);
        if let Some(policy) = policy {
            update = update.with_policy(&policy);
        }
        if let Some(approvals) = approvals {
            update = update.with_approvals(approvals);
        }
        if let Some(trigger) = trigger {
            update = update.with_trigger(matches!(trigger, Trigger::Poll));
        }
        if let Some(schedule) = poll_schedule {
            update = update.with_poll_schedule(&schedule);
        }
        for (key, value) in fields {
            update = update.with_field(key, value);
        }

        store.submit_policy(update).await;
        if let Some(err) = store.error() {
            anyhow::bail!("Policy update failed: {}", format_api_error(&err));
        }
    }

    // also clears any loading flag left by a submit
    store.refresh().await;

    let snapshot = store.snapshot();
    if let Some(err) = snapshot.error {
        anyhow::bail!("Failed to load resources: {}", format_api_error(&err));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot.resources)?);
    } else {
        print_table(&snapshot.resources);
    }

    Ok(())
}

fn print_table(resources: &[EnrichedResource]) {
    println!(
        "{:<48} {:<10} {:<9} {:<6} {}",
        "IDENTIFIER", "POLICY", "APPROVALS", "POLL", "SCHEDULE"
    );
    for r in resources {
        let schedule = if r.trigger_poll { r.poll_schedule() } else { "-" };
        println!(
            "{:<48} {:<10} {:<9} {:<6} {}",
            r.identifier(),
            r.policy().unwrap_or("-"),
            r.required_approvals.as_deref().unwrap_or("-"),
            if r.trigger_poll { "yes" } else { "no" },
            schedule
        );
    }
}
