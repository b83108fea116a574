//! foldersync CLI: drive the scheduler from the command line.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use foldersync::access::{AccessContext, AccountRegistry};
use foldersync::config::Config;
use foldersync::error::SyncError;
use foldersync::event::{EventBus, EventKind};
use foldersync::path::normalize;
use foldersync::telemetry::{TelemetryConfig, init_telemetry};
use foldersync::work::{CancelToken, SyncWork};
use foldersync::{CancelOutcome, EnqueueResult, SyncScheduler};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "foldersync", about = "Sequential folder synchronization scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run simulated synchronizations and print scheduler events as JSON lines
    Simulate {
        /// Account the folders belong to
        #[arg(long)]
        owner: String,
        /// Remote folder to synchronize (repeatable, queued in order)
        #[arg(long = "path", required = true)]
        paths: Vec<String>,
        /// Steps each simulated synchronization takes
        #[arg(long, default_value_t = 5)]
        steps: u32,
        /// Duration of one step in milliseconds
        #[arg(long, default_value_t = 100)]
        step_ms: u64,
        /// Folder to cancel while the run is in progress
        #[arg(long)]
        cancel: Option<String>,
        /// Delay before the cancel is issued, in milliseconds
        #[arg(long, default_value_t = 250)]
        cancel_after_ms: u64,
    },
    /// List the accounts configured in the accounts file
    Accounts,
}

/// Stand-in synchronization: sleeps through its steps, checking for
/// cancellation between them.
struct SimulatedSync {
    path: String,
    steps: u32,
    step: Duration,
    token: CancelToken,
}

impl SyncWork for SimulatedSync {
    fn execute(&self, access: &AccessContext) -> Result<(), SyncError> {
        debug!(server = %access.server_url, path = %self.path, "simulated sync starting");
        for step in 0..self.steps {
            self.token.check()?;
            std::thread::sleep(self.step);
            debug!(path = %self.path, step, "simulated sync step");
        }
        self.token.check()
    }

    fn cancel(&self) {
        self.token.cancel();
    }

    fn target_path(&self) -> &str {
        &self.path
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "foldersync".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let registry = AccountRegistry::load_from_file(&config.accounts_file)?;

    match cli.command {
        Command::Accounts => {
            for owner in registry.owners() {
                println!("{owner}");
            }
            Ok(())
        }
        Command::Simulate {
            owner,
            paths,
            steps,
            step_ms,
            cancel,
            cancel_after_ms,
        } => {
            let run = SimulateRun {
                owner,
                paths,
                steps,
                step: Duration::from_millis(step_ms),
                cancel,
                cancel_after: Duration::from_millis(cancel_after_ms),
            };
            cmd_simulate(&config, registry, run).await
        }
    }
}

struct SimulateRun {
    owner: String,
    paths: Vec<String>,
    steps: u32,
    step: Duration,
    cancel: Option<String>,
    cancel_after: Duration,
}

async fn cmd_simulate(
    config: &Config,
    registry: AccountRegistry,
    run: SimulateRun,
) -> anyhow::Result<()> {
    let (scheduler, worker) = SyncScheduler::start(Arc::new(registry));

    let bus = Arc::new(EventBus::new(config.event_capacity));
    let mut events = bus.subscribe();
    scheduler.add_listener(bus);

    let mut outstanding = HashSet::new();
    for path in &run.paths {
        let work = Arc::new(SimulatedSync {
            path: normalize(path),
            steps: run.steps,
            step: run.step,
            token: CancelToken::new(),
        });
        match scheduler.enqueue(&run.owner, path, work)? {
            EnqueueResult::Queued(_) => {
                outstanding.insert(normalize(path));
            }
            EnqueueResult::AlreadyPending => info!(path = %path, "duplicate path collapsed"),
        }
    }

    let mut cancel = run.cancel;
    let cancel_timer = tokio::time::sleep(run.cancel_after);
    tokio::pin!(cancel_timer);

    while !outstanding.is_empty() {
        tokio::select! {
            _ = &mut cancel_timer, if cancel.is_some() => {
                if let Some(target) = cancel.take() {
                    let hit = scheduler.cancel(&run.owner, &target);
                    info!(folder = %target, ?hit, "cancel issued");
                    if hit == CancelOutcome::Pending {
                        outstanding.remove(&normalize(&target));
                    }
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if let EventKind::SyncFinished { .. } = &event.kind {
                        outstanding.remove(&event.kind.key().path);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    scheduler.shutdown();
    worker.await?;
    Ok(())
}
