use crate::ladder::TradeParams;
use crate::reconciler::ReconcileReport;
use chrono::{DateTime, Utc};
use ladder_execution::models::BalancesSnapshot;
use ladder_instrument::{Pair, PairSpec};
use std::collections::HashMap;
use std::time::Duration;

/// Spec §3 "PendingConfirmation": single-slot, replaced on any new confirmable command, expires
/// after 10 minutes wall time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub command_text: String,
    pub created_at: DateTime<Utc>,
}

/// Confirmation window.
const CONFIRMATION_WINDOW: Duration = Duration::from_secs(10 * 60);

impl PendingConfirmation {
    pub fn new(command_text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            command_text: command_text.into(),
            created_at: now,
        }
    }

    /// `true` once strictly more than [`CONFIRMATION_WINDOW`] has elapsed since `created_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (now - self.created_at).to_std() {
            Ok(elapsed) => elapsed > CONFIRMATION_WINDOW,
            Err(_) => false,
        }
    }
}

/// The single mutable heap of engine state threaded into every command handler and scheduler
/// tick (spec §9 redesign flag, replacing "hidden global mutable state (`tradeParams`,
/// `pendingConfirmation`, `previousBalances`, `previousOrders`)"). Guarded by one
/// `tokio::sync::Mutex` — spec §5's "coarse mutual-exclusion primitive held only for the
/// duration of the critical section, not across venue I/O": callers lock, clone out a working
/// copy, release the guard, do I/O, then lock again to commit.
///
/// `OrderStore` is deliberately *not* behind this gate: its own per-record `parking_lot::RwLock`
/// already gives the finer-grained "writes serialized per id" spec §5 calls for, without
/// coarsening unrelated readers behind a single mutex.
#[derive(Debug)]
pub struct EngineState {
    inner: tokio::sync::Mutex<EngineStateInner>,
}

#[derive(Debug)]
struct EngineStateInner {
    trade_params: HashMap<Pair, TradeParams>,
    markets: HashMap<Pair, PairSpec>,
    pending_confirmation: Option<PendingConfirmation>,
    previous_balances: HashMap<String, BalancesSnapshot>,
    previous_orders_digest: HashMap<String, String>,
    last_reconcile: HashMap<Pair, ReconcileReport>,
}

impl EngineState {
    pub fn new(markets: HashMap<Pair, PairSpec>, trade_params: HashMap<Pair, TradeParams>) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(EngineStateInner {
                trade_params,
                markets,
                pending_confirmation: None,
                previous_balances: HashMap::new(),
                previous_orders_digest: HashMap::new(),
                last_reconcile: HashMap::new(),
            }),
        }
    }

    pub async fn trade_params(&self, pair: &Pair) -> Option<TradeParams> {
        self.inner.lock().await.trade_params.get(pair).cloned()
    }

    /// Commits a working copy of `TradeParams` back under the gate.
    pub async fn set_trade_params(&self, pair: Pair, params: TradeParams) {
        self.inner.lock().await.trade_params.insert(pair, params);
    }

    /// Mutates `TradeParams` in place under the gate; used by command handlers that only flip a
    /// flag or field and never touch the venue.
    pub async fn update_trade_params<F>(&self, pair: &Pair, mutator: F) -> bool
    where
        F: FnOnce(&mut TradeParams),
    {
        let mut inner = self.inner.lock().await;
        match inner.trade_params.get_mut(pair) {
            Some(params) => {
                mutator(params);
                true
            }
            None => false,
        }
    }

    pub async fn market_spec(&self, pair: &Pair) -> Option<PairSpec> {
        self.inner.lock().await.markets.get(pair).copied()
    }

    pub async fn set_market_spec(&self, pair: Pair, spec: PairSpec) {
        self.inner.lock().await.markets.insert(pair, spec);
    }

    pub async fn all_markets(&self) -> HashMap<Pair, PairSpec> {
        self.inner.lock().await.markets.clone()
    }

    /// Sets a new pending confirmation, replacing whatever was there.
    pub async fn set_pending_confirmation(&self, confirmation: PendingConfirmation) {
        self.inner.lock().await.pending_confirmation = Some(confirmation);
    }

    /// Takes the pending confirmation out of the slot.
    pub async fn take_pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.inner.lock().await.pending_confirmation.take()
    }

    pub async fn previous_balances(&self, sender: &str, snapshot: BalancesSnapshot) -> Option<BalancesSnapshot> {
        let mut inner = self.inner.lock().await;
        inner
            .previous_balances
            .insert(sender.to_string(), snapshot)
    }

    pub async fn previous_orders_digest(&self, sender: &str, digest: String) -> Option<String> {
        let mut inner = self.inner.lock().await;
        inner
            .previous_orders_digest
            .insert(sender.to_string(), digest)
    }

    pub async fn set_last_reconcile(&self, pair: Pair, report: ReconcileReport) {
        self.inner.lock().await.last_reconcile.insert(pair, report);
    }

    pub async fn last_reconcile(&self, pair: &Pair) -> Option<ReconcileReport> {
        self.inner.lock().await.last_reconcile.get(pair).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::{AmountCoin, LadderConfig};
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    #[test]
    fn pending_confirmation_expires_strictly_after_ten_minutes() {
        let now = Utc::now();
        let confirmation = PendingConfirmation::new("buy amount=1", now);

        assert!(!confirmation.is_expired(now + ChronoDuration::minutes(10)));
        assert!(confirmation.is_expired(now + ChronoDuration::minutes(10) + ChronoDuration::seconds(1)));
    }

    #[tokio::test]
    async fn commits_trade_params_under_the_gate() {
        let pair = Pair::new("ADM", "USDT");
        let config = LadderConfig::new(dec!(300), AmountCoin::Quote, 3, dec!(2));
        let params = TradeParams::new(config);

        let state = EngineState::new(HashMap::new(), HashMap::from([(pair.clone(), params.clone())]));
        assert_eq!(state.trade_params(&pair).await, Some(params));

        state
            .update_trade_params(&pair, |params| params.co_active = false)
            .await;
        assert!(!state.trade_params(&pair).await.unwrap().co_active);
    }
}
