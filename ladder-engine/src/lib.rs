#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! # ladder-engine
//!
//! The trading engine core: [`store::InMemoryOrderStore`], [`collector::OrderCollector`],
//! [`reconciler::Reconciler`], [`ladder::LadderEngine`], [`dispatcher::CommandDispatcher`], the
//! [`rates::RatesOracle`] client contract, [`state::EngineState`], and the [`scheduler::Scheduler`]
//! that owns the four long-lived tasks of spec §5.

pub mod collector;
pub mod command_source;
pub mod dispatcher;
pub mod ladder;
pub mod notify;
pub mod order;
pub mod rates;
pub mod reconciler;
pub mod scheduler;
pub mod state;
pub mod store;

pub use collector::OrderCollector;
pub use command_source::{CommandFrame, CommandSource};
pub use dispatcher::{CommandDispatcher, CommandResult};
pub use ladder::{AmountCoin, LadderConfig, LadderEngine, MidOrigin, TradeParams};
pub use notify::{NotificationSink, NotifyLevel, SinkList};
pub use order::{LadderState, Order, OrderId, Purpose};
pub use rates::{RatesError, RatesOracle, StaticRatesOracle};
pub use reconciler::{ReconcileReport, Reconciler, UnknownOrder};
pub use scheduler::{Scheduler, SchedulerIntervals};
pub use state::{EngineState, PendingConfirmation};
pub use store::{InMemoryOrderStore, OrderFilter, PricePredicate, StoreError};
