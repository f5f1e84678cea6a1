mod commands;
mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{BackendKind, Config, EngineBackend};
use control::{ConfigCache, ConfigChange, ConfigStore, LoadOutcome};
use paper::PaperBackend;
use poller::{Poller, PollerCommand, PollerHandle, TaskKind};
use remote::HttpBackend;

use commands::Command;

struct Console {
    backend: Arc<dyn EngineBackend>,
    store: ConfigStore,
    poller: PollerHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    // stderr, so stdout stays the console
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(backend = %cfg.backend, api_url = %cfg.api_url, "AlgoConsole starting");

    // ── Engine backend (chosen by CONSOLE_BACKEND) ────────────────────────────
    let backend: Arc<dyn EngineBackend> = match cfg.backend {
        BackendKind::Http => Arc::new(
            HttpBackend::new(&cfg.api_url, cfg.http_timeout)
                .context("failed to build HTTP client")?,
        ),
        BackendKind::Paper => {
            info!("Paper backend selected, nothing leaves this process");
            Arc::new(PaperBackend::new())
        }
    };

    // ── Configuration store ───────────────────────────────────────────────────
    let store = match &cfg.cache_path {
        Some(path) => {
            info!(path = %path.display(), "Config cache enabled");
            ConfigStore::with_cache(backend.clone(), ConfigCache::new(path))
        }
        None => ConfigStore::new(backend.clone()),
    };
    match store.load().await {
        LoadOutcome::LoadFailed(reason) => {
            warn!("Engine unreachable, continuing with local config: {reason}")
        }
        _ => info!("Configuration loaded from engine"),
    }

    // ── Poller ────────────────────────────────────────────────────────────────
    let (poller, poller_handle) = Poller::new(backend.clone(), store.clone());
    tokio::spawn(poller.run());
    poller_handle.send(PollerCommand::Start).await;

    let console = Console {
        backend,
        store,
        poller: poller_handle.clone(),
    };

    println!("{}", render::config(&console.store.snapshot().await));
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match commands::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(cmd)) => {
                        if let Err(e) = console.handle(cmd).await {
                            println!("error: {e:#}");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    poller_handle.send(PollerCommand::Shutdown).await;
    info!("Exiting.");
    Ok(())
}

impl Console {
    async fn handle(&self, cmd: Command) -> anyhow::Result<()> {
        match cmd {
            Command::Help => println!("{}", commands::HELP),

            Command::Show => print!("{}", render::config(&self.store.snapshot().await)),

            Command::Set { field, value } => {
                self.edit(ConfigChange::parse(&field, &value)?).await?;
            }
            Command::Add(pair) => self.edit(ConfigChange::AddSymbol(pair)).await?,
            Command::Remove(pair) => self.edit(ConfigChange::RemoveSymbol(pair)).await?,

            Command::Load => {
                // An explicit load replaces unsaved edits.
                match self.store.reload().await {
                    LoadOutcome::Loaded(cfg) => print!("{}", render::config(&cfg)),
                    LoadOutcome::Superseded => println!("Kept local edits made during the load"),
                    LoadOutcome::LocalPending => println!("Kept unsaved local edits"),
                    LoadOutcome::LoadFailed(reason) => println!("Load failed: {reason}"),
                }
                self.poller.send(PollerCommand::SyncMode).await;
            }

            Command::Save => {
                self.store.save().await?;
                println!("Configuration saved");
            }

            Command::Start => {
                let cfg = self.store.snapshot().await;
                let ack = control::start_engine(self.backend.as_ref(), &cfg).await?;
                println!("{}", ack.message);
                self.poller.send(PollerCommand::Start).await;
                self.poller
                    .send(PollerCommand::RefreshNow(TaskKind::Status))
                    .await;
            }

            Command::Stop => {
                let ack = control::stop_engine(self.backend.as_ref()).await?;
                println!("{}", ack.message);
                // Polling follows the engine; one last status read shows it stopped.
                self.poller.send(PollerCommand::Stop).await;
                self.poller
                    .send(PollerCommand::RefreshNow(TaskKind::Status))
                    .await;
            }

            Command::Backtest(years) => {
                let cfg = self.store.snapshot().await;
                let summary = control::run_backtest(self.backend.as_ref(), &cfg, years).await?;
                print!("{}", render::backtest(&summary));
            }

            Command::Test => {
                let cfg = self.store.snapshot().await;
                let probe = control::test_connection(self.backend.as_ref(), &cfg).await?;
                print!("{}", render::probe(&probe));
            }

            Command::Status => print!("{}", render::status(&self.poller.view().await)),
            Command::Chart => print!("{}", render::chart(&self.poller.view().await)),
            Command::Stats => print!("{}", render::stats(&self.poller.view().await)),
            Command::Trades => print!("{}", render::trades(&self.poller.view().await)),

            Command::Quit => {}
        }
        Ok(())
    }

    /// Apply a local edit, then let the poller pick up any mode change.
    async fn edit(&self, change: ConfigChange) -> anyhow::Result<()> {
        let cfg = self.store.change(change).await?;
        print!("{}", render::config(&cfg));
        self.poller.send(PollerCommand::SyncMode).await;
        self.poller
            .send(PollerCommand::RefreshNow(TaskKind::Chart))
            .await;
        Ok(())
    }
}
