use derive_more::{Constructor, From};
use serde::{Deserialize, Serialize};

/// Wraps a value that fully replaces existing state, as opposed to an incremental update.
///
/// Used throughout `ladder-engine` to distinguish "here is the new truth" (eg/ a balances
/// snapshot, an order status snapshot from the [`Reconciler`]) from deltas.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, From)]
pub struct Snapshot<T>(pub T);

impl<T> Snapshot<T> {
    pub fn as_ref(&self) -> Snapshot<&T> {
        let Self(item) = self;
        Snapshot(item)
    }

    pub fn map<F, N>(self, op: F) -> Snapshot<N>
    where
        F: FnOnce(T) -> N,
    {
        let Self(item) = self;
        Snapshot(op(item))
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}
