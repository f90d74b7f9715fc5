#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! # ladder-execution
//!
//! The [`ExchangeAdapter`] trait, its [`AdapterCapabilities`] descriptor, the
//! [`AdapterError`] error taxonomy, wire-normalized models ([`Ticker`], [`OrderBook`],
//! [`BalancesSnapshot`], [`VenueOrder`], ...), and two adapters: a deterministic [`MockAdapter`]
//! used by `ladder-engine`'s tests, and a [`RestAdapter`] skeleton showing how a real venue plugs
//! into the same trait via a per-venue [`RestAdapterDialect`].

pub mod adapter;
pub mod capabilities;
pub mod error;
pub mod mock;
pub mod models;
pub mod rest_adapter;

pub use adapter::ExchangeAdapter;
pub use capabilities::AdapterCapabilities;
pub use error::AdapterError;
pub use mock::MockAdapter;
pub use rest_adapter::{RestAdapter, RestAdapterDialect};
