mod config;
mod dry_run;
mod logging;
mod stdio;

use crate::config::{AmountCoinConfig, Config};
use crate::dry_run::DryRunAdapter;
use crate::stdio::{StdinCommandSource, StdoutSink};
use clap::Parser;
use ladder_engine::{
    AmountCoin, CommandDispatcher, EngineState, InMemoryOrderStore, LadderConfig, Scheduler,
    SchedulerIntervals, SinkList, StaticRatesOracle, TradeParams,
};
use ladder_execution::{AdapterCapabilities, ExchangeAdapter, MockAdapter};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Ladder/grid market-making bot. Connects one `ExchangeAdapter` to one pair, holds
/// a layered ladder of limit orders around a moving mid price, and accepts operator commands.
#[derive(Debug, Parser)]
#[command(name = "ladderbot", version, about)]
struct Cli {
    /// Path to the `config.toml` describing the venue, pair, and ladder defaults.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Switch the log formatter to JSON (for log-shipping in production).
    #[arg(long)]
    json_logs: bool,

    /// Wire everything up and log every command/tick without ever calling the adapter's mutating
    /// methods (`place_order`/`cancel_order`/`cancel_all`). Read-only calls still run normally.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.json_logs {
        logging::init_json_logging();
    } else {
        logging::init_logging();
    }

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("config error: {error}");
            std::process::exit(1);
        }
    };

    let pair = config.pair().expect("validated by Config::load");

    if config.venue != "mock" {
        eprintln!(
            "config error: unregistered venue {:?} (this build ships only the \"mock\" reference adapter; a real venue plugs in via RestAdapterDialect)",
            config.venue
        );
        std::process::exit(1);
    }

    let mock = build_mock_adapter(&pair);
    let adapter: Arc<dyn ExchangeAdapter> = if cli.dry_run {
        Arc::new(DryRunAdapter::new(mock))
    } else {
        Arc::new(mock)
    };

    // An auth failure on the very first call is treated as irrecoverable at startup; later,
    // mid-run auth failures instead stop the trading loops but keep the dispatcher alive, which
    // the scheduler's tick handlers already implement by logging and returning early.
    let markets: HashMap<_, _> = match adapter.markets().await {
        Ok(markets) => markets.into_iter().collect(),
        Err(error) if matches!(error, ladder_execution::AdapterError::Auth(_)) => {
            error!(%error, "adapter refused authentication on startup");
            std::process::exit(2);
        }
        Err(error) => {
            error!(%error, "failed to fetch markets on startup");
            std::process::exit(1);
        }
    };

    let ladder = LadderConfig::new(
        config.ladder.amount,
        match config.ladder.amount_coin {
            AmountCoinConfig::Quote => AmountCoin::Quote,
            AmountCoinConfig::Base => AmountCoin::Base,
        },
        config.ladder.count_per_side,
        config.ladder.step_percent,
    );
    let trade_params = HashMap::from([(pair.clone(), TradeParams::new(ladder))]);

    let state = Arc::new(EngineState::new(markets, trade_params));
    let store = Arc::new(InMemoryOrderStore::new());
    let rates = Arc::new(StaticRatesOracle::new());

    let mut sinks = SinkList::new();
    sinks.push(Box::new(StdoutSink));
    let sinks = Arc::new(sinks);

    let dispatcher = Arc::new(CommandDispatcher {
        store: store.clone(),
        adapter: adapter.clone(),
        rates,
        state: state.clone(),
        default_pair: pair.clone(),
        amount_to_confirm_usd: config.amount_to_confirm_usd,
    });

    let intervals = SchedulerIntervals {
        ladder_tick: config.intervals.ladder_tick(),
        reconcile_tick: config.intervals.reconcile_tick(),
        market_cache_refresh: config.intervals.market_cache_refresh(),
        call_timeout: config.intervals.call_timeout(),
    };

    let scheduler = Scheduler::new(store, state, adapter, sinks, pair, intervals);
    let (shutdown_tx, shutdown_rx) = ladder_engine::scheduler::shutdown_channel();

    // `watch::Sender::send` is synchronous, so the ctrlc handler thread can signal shutdown
    // directly without needing a handle into the tokio runtime.
    if let Err(error) = ctrlc::set_handler(move || {
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    }) {
        error!(%error, "failed to install signal handler, shutdown must be forced");
    }

    info!(venue = %config.venue, %pair, dry_run = cli.dry_run, "ladderbot starting");

    scheduler
        .run(dispatcher, Box::new(StdinCommandSource::new()), shutdown_rx)
        .await;

    info!("ladderbot shut down cleanly");
}

/// Seeds a [`MockAdapter`] with the configured pair so the reference binary is runnable
/// out of the box.
fn build_mock_adapter(pair: &ladder_instrument::Pair) -> MockAdapter {
    use ladder_execution::models::Ticker;
    use ladder_instrument::{MarketStatus, PairSpec};
    use rust_decimal_macros::dec;

    let adapter = MockAdapter::new(AdapterCapabilities::full());
    adapter.set_market(
        pair.clone(),
        PairSpec::new(8, 8, dec!(0.00000001), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online),
    );
    adapter.set_ticker(
        pair.clone(),
        Ticker::new(dec!(1), dec!(1.01), dec!(1), dec!(1.02), dec!(0.98), dec!(0), dec!(0)),
    );
    adapter
}
