#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

//! # ladder-instrument
//!
//! Pure, leaf-level types and helpers: [`Pair`]/[`Asset`] identifiers, the per-pair
//! [`PairSpec`] venue descriptors, and the precision/step rounding + minimum-amount validation
//! used everywhere a price or amount is about to leave the engine.

pub mod asset;
pub mod pair;
pub mod precision;
pub mod side;

pub use asset::Asset;
pub use pair::{MarketStatus, Pair, PairSpec};
pub use side::{OrderType, Side};
