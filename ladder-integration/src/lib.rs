#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! # ladder-integration
//!
//! Transport-agnostic plumbing shared by every component of the ladder bot that talks to the
//! outside world over HTTP: a small `RestRequest`/`RestClient` pair, a `Snapshot<T>` wrapper for
//! full-replace state updates, a `Tx`/`Rx` channel abstraction, and the `TransportError` taxonomy
//! those pieces return.

pub mod channel;
pub mod error;
pub mod rest;
pub mod snapshot;

pub use error::TransportError;
pub use snapshot::Snapshot;
