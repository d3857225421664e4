//! Distordia verification daemon: runs the reconciliation engine against a
//! Nexus node on a fixed interval.

use anyhow::Context;
use clap::Parser;
use dist_engine::{init_logging, DaemonConfig, LogFormat, ReconciliationEngine, ShutdownController};
use dist_nexus::NexusClient;
use dist_types::SystemClock;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dist-daemon", about = "Distordia verification daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are used as the
    /// base; CLI flags and env vars override them.
    #[arg(long, short = 'c', env = "DIST_CONFIG")]
    config: Option<PathBuf>,

    /// Nexus node URL.
    #[arg(long, short = 'n', env = "DIST_NODE_URL")]
    node: Option<String>,

    /// Existing session id.
    #[arg(long, short = 's', env = "DIST_SESSION", hide_env_values = true)]
    session: Option<String>,

    /// Username for login.
    #[arg(long, short = 'u', env = "DIST_USERNAME")]
    username: Option<String>,

    /// Password for login.
    #[arg(long, short = 'p', env = "DIST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PIN for login and unlock.
    #[arg(long, env = "DIST_PIN", hide_env_values = true)]
    pin: Option<String>,

    /// Seconds between processing cycles.
    #[arg(long, short = 'i', env = "DIST_INTERVAL")]
    interval: Option<u64>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Log at debug level.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "DIST_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level filter, e.g. "info" or "debug,dist_registry=trace".
    #[arg(long, env = "DIST_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut DaemonConfig) {
        if let Some(node) = &self.node {
            config.node_url = node.clone();
        }
        if let Some(interval) = self.interval {
            config.check_interval_secs = interval;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    init_logging(config.log_format, &config.log_level);
    tracing::info!(
        node = %config.node_url,
        root = %config.root_namespace,
        "Distordia verification daemon starting"
    );

    let mut client = NexusClient::new(&config.node_url, config.request_timeout())?;
    if let Some(session) = &cli.session {
        client = client.with_session(session.clone());
    }
    match (&cli.username, &cli.password, &cli.pin) {
        (Some(username), Some(password), Some(pin)) => {
            client
                .login(username, password, pin)
                .await
                .context("login failed")?;
            client.unlock(pin).await.context("unlock failed")?;
        }
        _ if cli.session.is_none() => {
            tracing::warn!("no session or credentials provided, write operations will fail");
        }
        _ => {}
    }

    let controller = Arc::new(ShutdownController::new());
    let engine = ReconciliationEngine::new(Arc::new(client), &config, Arc::new(SystemClock))?
        .with_shutdown(controller.signal());

    let listener = controller.clone();
    tokio::spawn(async move { listener.wait_for_signal().await });

    if cli.once {
        let report = engine.run_cycle().await;
        if report.failures() > 0 {
            tracing::warn!(failed = report.failures(), "cycle finished with failures");
        }
        return Ok(());
    }

    tracing::info!(
        interval_secs = config.check_interval_secs,
        "starting daemon loop"
    );
    let mut shutdown = controller.signal();
    loop {
        engine.run_cycle().await;
        if shutdown.is_triggered() {
            break;
        }

        tracing::info!(secs = config.check_interval_secs, "sleeping until next cycle");
        tokio::select! {
            _ = tokio::time::sleep(config.check_interval()) => {}
            _ = shutdown.wait() => break,
        }
    }

    tracing::info!("verification daemon exited cleanly");
    Ok(())
}
