use anyhow::Result;
use clap::{Parser, ValueEnum};
use cloudmap_service::aws::client::ServiceDiscoveryClient;
use cloudmap_service::config::{Config, ConfigOverrides};
use cloudmap_service::error::failure_message;
use cloudmap_service::output::{self, GithubOutput};
use cloudmap_service::params::{self, EnvInputs, InputProvider, LayeredInputs};
use cloudmap_service::{action, VERSION};
use std::collections::HashMap;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Find-or-create or delete an AWS Cloud Map service
#[derive(Parser, Debug)]
#[command(name = "cloudmap-service", version = VERSION, about, long_about = None)]
struct Args {
    /// Service name
    #[arg(long)]
    name: Option<String>,

    /// Service description
    #[arg(long)]
    description: Option<String>,

    /// Namespace id (or set NamespaceId inside --dns-config)
    #[arg(long)]
    namespace_id: Option<String>,

    /// Service type: HTTP, DNS_HTTP or DNS
    #[arg(long = "type")]
    service_type: Option<String>,

    /// `create` (find or create) or `delete`
    #[arg(long)]
    action: Option<String>,

    /// Service id to delete
    #[arg(long)]
    id: Option<String>,

    /// DnsConfig as JSON
    #[arg(long)]
    dns_config: Option<String>,

    /// HealthCheckConfig as JSON
    #[arg(long)]
    health_check_config: Option<String>,

    /// HealthCheckCustomConfig as JSON
    #[arg(long)]
    health_check_custom_config: Option<String>,

    /// Tags as a JSON list of {"key", "value"} objects
    #[arg(long)]
    tags: Option<String>,

    /// AWS region
    #[arg(long)]
    region: Option<String>,

    /// Custom Cloud Map endpoint URL
    #[arg(long)]
    endpoint_url: Option<String>,

    /// AWS profile for shared credentials
    #[arg(long)]
    profile: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

impl Args {
    /// Inputs given as flags, keyed like the workflow inputs
    fn inputs(&self) -> HashMap<String, String> {
        [
            (params::NAME, &self.name),
            (params::DESCRIPTION, &self.description),
            (params::NAMESPACE_ID, &self.namespace_id),
            (params::TYPE, &self.service_type),
            (params::ACTION, &self.action),
            (params::ID, &self.id),
            (params::DNS_CONFIG, &self.dns_config),
            (params::HEALTH_CHECK_CONFIG, &self.health_check_config),
            (params::HEALTH_CHECK_CUSTOM_CONFIG, &self.health_check_custom_config),
            (params::TAGS, &self.tags),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name.to_string(), v)))
        .collect()
    }

    fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            profile: self.profile.clone(),
        }
    }
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

    /// Default when no flag is given: debug when the runner has step
    /// debugging enabled, info otherwise
    fn from_runner() -> Self {
        match std::env::var("RUNNER_DEBUG").as_deref() {
            Ok("1") => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    // stdout carries workflow commands, so logs go to stderr
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::debug!("cloudmap-service {} started with log level: {:?}", VERSION, level);

    Some(guard)
}

async fn run(args: &Args) -> Result<()> {
    let cli_inputs = args.inputs();
    let env_inputs = EnvInputs;
    let inputs = LayeredInputs::new(vec![&cli_inputs as &dyn InputProvider, &env_inputs]);

    let request = params::normalize(&inputs)?;

    let config = Config::load(&args.config_overrides())?;
    let client = ServiceDiscoveryClient::from_config(&config)?;
    tracing::debug!("Using Cloud Map endpoint {}", client.endpoint());

    let mut sink = GithubOutput::from_env();
    action::execute(&client, &request, &mut sink).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = args.log_level.unwrap_or_else(LogLevel::from_runner);
    let _log_guard = setup_logging(level);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::set_failed(&failure_message(&err));
            tracing::debug!("Received error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
