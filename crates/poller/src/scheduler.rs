use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use common::EngineBackend;
use control::{ConfigStore, LoadOutcome, Mode};
use series::{trades_for_symbol, ChartBuilder, DemoDataSynthesizer, PerformanceStats};

use crate::view::{DataSource, LiveView, ViewState};

/// Kinds of polled data. At most one repeating task runs per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Status,
    Config,
    Chart,
    Stats,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Status,
        TaskKind::Config,
        TaskKind::Chart,
        TaskKind::Stats,
    ];

    fn period(&self, mode: Mode) -> Duration {
        let cadence = mode.cadence();
        match self {
            TaskKind::Status => cadence.status,
            TaskKind::Config => cadence.config,
            TaskKind::Chart => cadence.chart,
            TaskKind::Stats => cadence.stats,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    /// Begin polling at the current mode's cadence.
    Start,
    /// Cancel every task. Nothing is published after this returns.
    Stop,
    /// Re-read the mode and reschedule if it changed.
    SyncMode,
    /// One immediate refresh, outside the schedule.
    RefreshNow(TaskKind),
    Shutdown,
}

/// Cloneable handle for the console.
#[derive(Clone)]
pub struct PollerHandle {
    command_tx: mpsc::Sender<PollerCommand>,
    view: Arc<RwLock<ViewState>>,
}

impl PollerHandle {
    pub async fn send(&self, cmd: PollerCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn view(&self) -> LiveView {
        self.view.read().await.view.clone()
    }
}

/// Shared by every refresh task.
struct Refresher {
    backend: Arc<dyn EngineBackend>,
    store: ConfigStore,
    view: Arc<RwLock<ViewState>>,
    commands: mpsc::Sender<PollerCommand>,
    synthesizer: DemoDataSynthesizer,
    chart: ChartBuilder,
}

/// Drives the periodic refresh tasks. Call `run` from `tokio::spawn`.
pub struct Poller {
    refresher: Arc<Refresher>,
    command_rx: mpsc::Receiver<PollerCommand>,
    tasks: HashMap<TaskKind, JoinHandle<()>>,
    /// Mode the running tasks were scheduled for; `None` while stopped.
    scheduled: Option<Mode>,
}

impl Poller {
    pub fn new(backend: Arc<dyn EngineBackend>, store: ConfigStore) -> (Self, PollerHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let view = Arc::new(RwLock::new(ViewState::default()));

        let handle = PollerHandle {
            command_tx: command_tx.clone(),
            view: view.clone(),
        };

        let poller = Poller {
            refresher: Arc::new(Refresher {
                backend,
                store,
                view,
                commands: command_tx,
                synthesizer: DemoDataSynthesizer::default(),
                chart: ChartBuilder::default(),
            }),
            command_rx,
            tasks: HashMap::new(),
            scheduled: None,
        };

        (poller, handle)
    }

    pub async fn run(mut self) {
        info!("Poller ready. Waiting for Start command.");

        loop {
            match self.command_rx.recv().await {
                Some(PollerCommand::Start) => {
                    let mode = self.refresher.store.mode().await;
                    if self.scheduled == Some(mode) {
                        debug!(%mode, "Poller already running");
                        continue;
                    }
                    self.schedule(mode).await;
                }

                Some(PollerCommand::Stop) => {
                    self.cancel_all().await;
                    self.refresher.view.write().await.view.mode = None;
                    info!("Polling stopped");
                }

                Some(PollerCommand::SyncMode) => {
                    let Some(current) = self.scheduled else {
                        continue;
                    };
                    let mode = self.refresher.store.mode().await;
                    if mode != current {
                        info!(from = %current, to = %mode, "Mode changed; rescheduling");
                        self.schedule(mode).await;
                    }
                }

                Some(PollerCommand::RefreshNow(kind)) => {
                    let refresher = self.refresher.clone();
                    let epoch = refresher.view.read().await.epoch;
                    tokio::spawn(async move { refresher.refresh(kind, epoch).await });
                }

                Some(PollerCommand::Shutdown) | None => {
                    self.cancel_all().await;
                    info!("Poller shut down");
                    break;
                }
            }
        }
    }

    /// Replace every task with one running at `mode`'s cadence.
    async fn schedule(&mut self, mode: Mode) {
        let epoch = self.cancel_all().await;
        self.refresher.view.write().await.view.mode = Some(mode);
        for kind in TaskKind::ALL {
            self.spawn(kind, kind.period(mode), epoch);
        }
        self.scheduled = Some(mode);
        info!(%mode, chart_secs = mode.cadence().chart.as_secs(), "Polling scheduled");
    }

    fn spawn(&mut self, kind: TaskKind, period: Duration, epoch: u64) {
        if let Some(previous) = self.tasks.remove(&kind) {
            previous.abort();
        }
        let refresher = self.refresher.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                refresher.refresh(kind, epoch).await;
            }
        });
        self.tasks.insert(kind, handle);
    }

    /// Abort all tasks and advance the epoch so in-flight refreshes cannot
    /// publish. Returns the new epoch.
    async fn cancel_all(&mut self) -> u64 {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
        self.scheduled = None;
        let mut state = self.refresher.view.write().await;
        state.epoch += 1;
        state.epoch
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

// ─── Refreshes ────────────────────────────────────────────────────────────────

impl Refresher {
    async fn refresh(&self, kind: TaskKind, epoch: u64) {
        match kind {
            TaskKind::Status => self.refresh_status(epoch).await,
            TaskKind::Config => self.refresh_config(epoch).await,
            TaskKind::Chart => self.refresh_chart(epoch).await,
            TaskKind::Stats => self.refresh_stats(epoch).await,
        }
    }

    /// Apply `update` unless the epoch moved on since the refresh began.
    async fn publish(&self, epoch: u64, update: impl FnOnce(&mut LiveView)) -> bool {
        let mut state = self.view.write().await;
        if state.epoch != epoch {
            debug!(epoch, current = state.epoch, "Dropping refresh from a cancelled schedule");
            return false;
        }
        update(&mut state.view);
        state.view.updated_at = Some(Utc::now());
        true
    }

    async fn last_known_trades(&self) -> Vec<common::Trade> {
        self.view.read().await.view.trades.clone()
    }

    async fn refresh_status(&self, epoch: u64) {
        let (status, balance, trades) = tokio::join!(
            self.backend.status(),
            self.backend.balance(),
            self.backend.trades()
        );
        let error = [
            status.as_ref().err(),
            balance.as_ref().err(),
            trades.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .next()
        .map(ToString::to_string);
        if let Some(e) = &error {
            warn!("Status refresh incomplete: {e}");
        }

        self.publish(epoch, |view| {
            if let Ok(status) = status {
                view.running = status.running;
            }
            if let Ok(balance) = balance {
                view.balance = Some(balance);
            }
            if let Ok(trades) = trades {
                view.trades = trades;
            }
            view.last_error = error;
        })
        .await;
    }

    async fn refresh_config(&self, epoch: u64) {
        match self.store.load().await {
            LoadOutcome::Loaded(config) => {
                let mode = Mode::of(&config);
                debug!(%mode, "Config refreshed");
                if self.publish(epoch, |_| {}).await {
                    let _ = self.commands.send(PollerCommand::SyncMode).await;
                }
            }
            LoadOutcome::Superseded => debug!("Config refresh superseded by a local change"),
            LoadOutcome::LocalPending => debug!("Config refresh skipped, local edits not saved"),
            LoadOutcome::LoadFailed(reason) => {
                self.publish(epoch, |view| view.last_error = Some(reason)).await;
            }
        }
    }

    async fn refresh_chart(&self, epoch: u64) {
        let config = self.store.snapshot().await;
        let symbol = config.primary_symbol().to_string();
        let mode = Mode::of(&config);
        let query = mode.chart_query();
        // A fetch may not outlive its own cycle.
        let deadline = mode.cadence().chart;

        let (candles, price) = tokio::join!(
            timeout(deadline, self.backend.ohlcv(&symbol, &query)),
            timeout(deadline, self.backend.current_price(&symbol))
        );

        let (candles, source) = match candles {
            Ok(Ok(c)) if !c.is_empty() => (c, DataSource::Live),
            Ok(Ok(_)) => self.synthesize(&symbol, query.limit, "engine returned no candles"),
            Ok(Err(e)) => {
                warn!(%symbol, "Candle fetch failed, using synthetic data: {e}");
                self.synthesize(&symbol, query.limit, &e.to_string())
            }
            Err(_) => {
                warn!(
                    %symbol,
                    secs = deadline.as_secs(),
                    "Candle fetch timed out, using synthetic data"
                );
                self.synthesize(&symbol, query.limit, "candle fetch timed out")
            }
        };
        let price = match price {
            Ok(Ok(quote)) => Some(quote),
            Ok(Err(e)) => {
                debug!(%symbol, "Price fetch failed, keeping last known: {e}");
                None
            }
            Err(_) => {
                debug!(%symbol, "Price fetch timed out, keeping last known");
                None
            }
        };
        // Trades come from the status refresh.
        let trades = self.last_known_trades().await;

        let chart = self
            .chart
            .build(&candles, &trades_for_symbol(&trades, &symbol));
        debug!(
            %symbol,
            points = chart.points.len(),
            markers = chart.markers.len(),
            synthetic = source.is_synthetic(),
            "Chart refreshed"
        );

        self.publish(epoch, |view| {
            match price {
                Some(quote) => view.current_price = Some(quote),
                // a last known price only stands in for the same pair
                None if view.chart_symbol != symbol => view.current_price = None,
                None => {}
            }
            view.chart_symbol = symbol;
            view.chart = chart;
            view.chart_source = source;
        })
        .await;
    }

    fn synthesize(
        &self,
        symbol: &str,
        limit: usize,
        reason: &str,
    ) -> (Vec<common::Candle>, DataSource) {
        // Enough candles for at least one point with both averages.
        let length = limit.max(self.chart.min_candles() + 1);
        (
            self.synthesizer.candles(symbol, length, Utc::now()),
            DataSource::Synthetic {
                reason: reason.to_string(),
            },
        )
    }

    async fn refresh_stats(&self, epoch: u64) {
        let performance = self.backend.bot_performance().await;
        if let Err(e) = &performance {
            debug!("Bot performance unavailable, keeping last known: {e}");
        }

        self.publish(epoch, |view| {
            if let Ok(performance) = performance {
                view.performance = Some(performance);
            }
            // Derived from the trades the status refresh keeps current.
            view.stats = PerformanceStats::from_trades(&view.trades);
        })
        .await;
    }
}
