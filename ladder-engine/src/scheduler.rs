use crate::command_source::CommandSource;
use crate::dispatcher::CommandDispatcher;
use crate::ladder::LadderEngine;
use crate::notify::SinkList;
use crate::reconciler::Reconciler;
use crate::state::EngineState;
use crate::store::InMemoryOrderStore;
use ladder_execution::adapter::ExchangeAdapter;
use ladder_instrument::Pair;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Tick intervals and the per-call timeout for the scheduler's four long-lived tasks.
/// Defaults follow the spec's suggested ranges and its Open Question resolution for the ladder
/// tick (pick from configuration, default 30s).
#[derive(Debug, Clone, Copy)]
pub struct SchedulerIntervals {
    pub ladder_tick: Duration,
    pub reconcile_tick: Duration,
    pub market_cache_refresh: Duration,
    pub call_timeout: Duration,
}

impl Default for SchedulerIntervals {
    fn default() -> Self {
        Self {
            ladder_tick: Duration::from_secs(30),
            reconcile_tick: Duration::from_secs(45),
            market_cache_refresh: Duration::from_secs(15 * 60),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Owns the four long-lived tasks of spec §5: command-intake, ladder-tick, reconciliation, and
/// market-cache refresh. Holds `Arc`-shared collaborators so each task can run as an independent
/// `tokio::spawn`'d future while sharing one `OrderStore`/`EngineState`/adapter.
pub struct Scheduler {
    store: Arc<InMemoryOrderStore>,
    state: Arc<EngineState>,
    adapter: Arc<dyn ExchangeAdapter>,
    sinks: Arc<SinkList>,
    pair: Pair,
    intervals: SchedulerIntervals,
}

impl Scheduler {
    pub fn new(
        store: Arc<InMemoryOrderStore>,
        state: Arc<EngineState>,
        adapter: Arc<dyn ExchangeAdapter>,
        sinks: Arc<SinkList>,
        pair: Pair,
        intervals: SchedulerIntervals,
) -> Self {
        Self {
            store,
            state,
            adapter,
            sinks,
            pair,
            intervals,
        }
    }

    /// Runs all four tasks until `shutdown_rx` fires, then waits for the in-flight tick of each
    /// to finish cooperatively.
    pub async fn run(
        self,
        dispatcher: Arc<CommandDispatcher>,
        mut command_source: Box<dyn CommandSource>,
        shutdown_rx: watch::Receiver<bool>,
) {
        let ladder_task = {
            let store = self.store.clone();
            let state = self.state.clone();
            let adapter = self.adapter.clone();
            let pair = self.pair.clone();
            let interval = self.intervals.ladder_tick;
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            run_ladder_tick(&store, &state, adapter.as_ref(), &pair).await;
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let reconcile_task = {
            let store = self.store.clone();
            let state = self.state.clone();
            let adapter = self.adapter.clone();
            let pair = self.pair.clone();
            let interval = self.intervals.reconcile_tick;
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                // Spec §5 "reconciliation does not overlap itself; if the previous pass is still
                // running when the next tick fires, the new tick is dropped (coalesced)." A
                // `tokio::sync::Mutex` that the tick task only ever `try_lock`s gives exactly
                // that: a held lock means the previous pass hasn't returned yet.
                let busy_gate = tokio::sync::Mutex::new(());
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            match busy_gate.try_lock() {
                                Ok(_guard) => {
                                    let reconciler = Reconciler::new(&store);
                                    let report = reconciler.reconcile(adapter.as_ref(), &pair).await;
                                    if !report.unknown_orders.is_empty() {
                                        info!(%pair, unknown = report.unknown_orders.len(), "reconciliation found unknown orders");
                                    }
                                    state.set_last_reconcile(pair.clone(), report).await;
                                }
                                Err(_) => {
                                    warn!(%pair, "reconciliation tick coalesced: previous pass still running");
                                }
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let market_cache_task = {
            let state = self.state.clone();
            let adapter = self.adapter.clone();
            let interval = self.intervals.market_cache_refresh;
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            match adapter.markets().await {
                                Ok(markets) => {
                                    for (pair, spec) in markets {
                                        state.set_market_spec(pair, spec).await;
                                    }
                                }
                                Err(error) => warn!(%error, "market cache refresh failed"),
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let command_task = {
            let sinks = self.sinks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        frame = command_source.next_frame() => {
                            match frame {
                                Some(frame) => {
                                    let result = dispatcher.dispatch(&frame.text, &frame.sender).await;
                                    if let Some(notify_text) = &result.notify_text {
                                        sinks.notify_all(result.notify_level, notify_text);
                                    }
                                }
                                None => {
                                    info!("command source exhausted, ending command-intake task");
                                    break;
                                }
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            })
        };

        let _ = tokio::join!(ladder_task, reconcile_task, market_cache_task, command_task);
    }
}

async fn run_ladder_tick(store: &InMemoryOrderStore, state: &EngineState, adapter: &dyn ExchangeAdapter, pair: &Pair) {
    let Some(spec) = state.market_spec(pair).await else {
        warn!(%pair, "ladder tick skipped: no market spec cached yet");
        return;
    };
    let Some(mut params) = state.trade_params(pair).await else {
        return;
    };

    let engine = LadderEngine::new(store);
    engine.tick(adapter, pair, &spec, &mut params).await;

    state.set_trade_params(pair.clone(), params).await;
}

/// Builds the one-shot shutdown channel shared by `run` and whoever calls `stop`.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}
