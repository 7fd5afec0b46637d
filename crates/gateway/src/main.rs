use std::path::PathBuf;

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use intrachat_gateway::server;

#[derive(Parser)]
#[command(name = "intrachat", about = "Intrachat — in-memory corporate chat gateway")]
struct Cli {
    /// Bind address (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Listen port (overrides config and INTRACHAT_PORT/PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Config file path (skips the standard discovery).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = intrachat_config::load_config(path)?;
            intrachat_config::loader::apply_env_overrides(&mut config);
            config
        },
        None => intrachat_config::discover_and_load(),
    };
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    info!("starting intrachat gateway v{}", env!("CARGO_PKG_VERSION"));
    server::start_gateway(&config).await
}
