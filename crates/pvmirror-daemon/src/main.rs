//! pvmirror Daemon - Background PV/NFS mirroring service
//!
//! This binary runs as a long-lived service (systemd unit or container
//! sidecar) and handles:
//! - Periodic storage topology classification
//! - Directional `rsync` mirroring with bounded retries
//! - Daily log sessions and webhook alerts
//! - Signal reporting with a tail of the current log
//!
//! # Architecture
//!
//! Startup loads and validates the YAML configuration, runs the preflight
//! checks, wires the adapters into the scheduler, and hands control to the
//! scheduler loop. The loop is controlled by a `CancellationToken` that the
//! signal listener cancels on SIGTERM or SIGINT.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use pvmirror_core::{config::Config, ports::IAlertChannel};
use pvmirror_journal::{Journal, Notifier};
use pvmirror_sync::{
    adapters::{KubectlMetadata, ProcMountTable, RsyncTransfer},
    IterationOutcome, MirrorScheduler, ProcessSignal, SignalAction, SignalReporter,
    TopologyInspector, TransferEngine,
};
use pvmirror_webhook::WebhookAlertChannel;
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after a second terminating signal.
const FORCED_EXIT_CODE: i32 = 130;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "pvmirrord",
    version,
    about = "Mirror a cluster persistent volume and an NFS destination"
)]
struct Args {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/pvmirror/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load, validate and preflight the configuration, then exit
    #[arg(long)]
    check_config: bool,

    /// Run a single iteration, then exit with its status
    #[arg(long, conflicts_with = "check_config")]
    once: bool,
}

impl Args {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

// ============================================================================
// Startup checks
// ============================================================================

/// Problems that prevent the daemon from starting. Never raised afterwards.
#[derive(Debug, Error)]
enum ConfigurationError {
    #[error(transparent)]
    Config(#[from] pvmirror_core::config::ConfigError),

    #[error("Kubeconfig {} is not readable: {source}", .path.display())]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Journal(#[from] pvmirror_journal::JournalError),

    #[error("Cannot create alert channel: {0}")]
    Alert(#[from] pvmirror_webhook::AlertError),
}

/// Checks the credentials `kubectl` will be handed.
fn preflight(config: &Config) -> Result<(), ConfigurationError> {
    std::fs::File::open(&config.cluster.kubeconfig).map_err(|source| {
        ConfigurationError::Kubeconfig {
            path: config.cluster.kubeconfig.clone(),
            source,
        }
    })?;
    Ok(())
}

/// Builds the alert channel, if one is configured.
fn alert_channel(
    config: &Config,
) -> Result<Option<Arc<dyn IAlertChannel>>, ConfigurationError> {
    let Some(url) = &config.alert.webhook_url else {
        return Ok(None);
    };
    let channel = WebhookAlertChannel::new(url, config.alert.timeout_duration())?;
    Ok(Some(Arc::new(channel)))
}

/// Maps a single iteration to the process exit status used by `--once`.
fn exit_code(outcome: IterationOutcome) -> i32 {
    match outcome {
        IterationOutcome::Synced { .. } => 0,
        IterationOutcome::Skipped => 2,
        IterationOutcome::Failed { .. }
        | IterationOutcome::Aborted { .. }
        | IterationOutcome::Panicked => 1,
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns everything the scheduler loop and the signal listener share
struct DaemonService {
    notifier: Notifier,
    scheduler: MirrorScheduler,
    reporter: SignalReporter,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Wires the production adapters around a validated configuration.
    async fn new(
        config: &Config,
        shutdown: CancellationToken,
    ) -> Result<Self, ConfigurationError> {
        preflight(config)?;

        let (journal, _writer) = Journal::open(&config.logging.directory).await?;
        let notifier = Notifier::new(journal, alert_channel(config)?);

        let inspector = TopologyInspector::new(
            Arc::new(KubectlMetadata::from_config(&config.cluster)),
            Arc::new(ProcMountTable::new(&config.paths.mounts_table)),
            notifier.clone(),
            config,
        );
        let engine = TransferEngine::new(
            Arc::new(RsyncTransfer::from_config(&config.transfer)),
            notifier.clone(),
            &config.transfer,
            shutdown.clone(),
        );
        let scheduler =
            MirrorScheduler::new(inspector, engine, notifier.clone(), config, shutdown.clone());
        let reporter = SignalReporter::new(notifier.clone(), config.logging.tail_lines);

        Ok(Self {
            notifier,
            scheduler,
            reporter,
            shutdown,
        })
    }

    /// Installs the signal handlers and reports every signal in a background task.
    fn spawn_signal_listener(&self) -> Result<()> {
        let mut interrupt =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let mut hangup =
            signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;

        let reporter = self.reporter.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => ProcessSignal::Interrupt,
                    Some(()) = terminate.recv() => ProcessSignal::Terminate,
                    Some(()) = hangup.recv() => ProcessSignal::Hangup,
                    else => break,
                };

                match reporter.handle(received, &shutdown).await {
                    SignalAction::Continue => {}
                    SignalAction::Shutdown => {
                        info!(signal = %received, "Graceful shutdown requested");
                    }
                    SignalAction::ForceExit => {
                        warn!(signal = %received, "Forced exit");
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                }
            }
        });

        Ok(())
    }

    async fn run(&self) {
        self.notifier.log_info("pvmirror daemon started");
        self.scheduler.run().await;
        self.notifier.log_info("pvmirror daemon stopped");
    }

    async fn run_once(&self) -> IterationOutcome {
        let outcome = self.scheduler.run_once().await;
        self.notifier
            .log_info(format!("Single iteration finished: {outcome:?}"));
        outcome
    }

    async fn flush(&self) {
        if let Err(e) = self.notifier.journal().flush().await {
            warn!(error = %e, "Failed to flush journal before exit");
        }
    }
}

// ============================================================================
// Main entry point
// ============================================================================

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config_path();

    let config = Config::load_validated(&config_path)
        .map_err(ConfigurationError::from)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    init_tracing(&config.logging.level);
    info!(config_path = %config_path.display(), "Loaded configuration");

    let shutdown = CancellationToken::new();
    let service = DaemonService::new(&config, shutdown.clone())
        .await
        .context("Startup checks failed")?;

    if args.check_config {
        println!("Configuration {} is valid", config_path.display());
        println!("  source:      {}", config.paths.source.display());
        println!("  destination: {}", config.paths.destination.display());
        println!("  mount point: {}", config.paths.mount_point.display());
        let session = service.notifier.journal().current_session();
        println!("  log session: {}", session.path().display());
        return Ok(());
    }

    service.spawn_signal_listener()?;

    if args.once {
        let outcome = service.run_once().await;
        service.flush().await;
        let code = exit_code(outcome);
        if code != 0 {
            error!(?outcome, "Iteration did not sync");
            std::process::exit(code);
        }
        return Ok(());
    }

    service.run().await;
    service.flush().await;
    info!("pvmirror daemon shut down gracefully");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
