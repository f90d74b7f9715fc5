use crate::order::{LadderState, Purpose};
use crate::store::{InMemoryOrderStore, OrderFilter, PricePredicate};
use derive_more::Constructor;
use ladder_execution::ExchangeAdapter;
use ladder_instrument::{Pair, Side};
use tracing::{info, warn};

/// Outcome of any bulk-cancellation call.
#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct ClearOutcome {
    pub attempted: u32,
    pub cancelled: u32,
    pub failed: u32,
    pub human_message: String,
}

impl ClearOutcome {
    fn summarize(attempted: u32, cancelled: u32) -> Self {
        let failed = attempted.saturating_sub(cancelled);
        let human_message = format!(
            "cancelled {cancelled}/{attempted} order(s){}",
            if failed > 0 {
                format!(" ({failed} failed)")
            } else {
                String::new()
            }
        );
        Self::new(attempted, cancelled, failed, human_message)
    }
}

/// Bulk-cancellation primitives with a shared non-cancellable-purpose policy.
pub struct OrderCollector<'a> {
    pub store: &'a InMemoryOrderStore,
}

impl<'a> OrderCollector<'a> {
    pub fn new(store: &'a InMemoryOrderStore) -> Self {
        Self { store }
    }

    /// Enumerates venue open orders and cancels each; on `force=false`, skips orders whose
    /// purpose is non-cancellable by policy.
    pub async fn clear_all(
        &self,
        adapter: &dyn ExchangeAdapter,
        pair: &Pair,
        side: Option<Side>,
        force: bool,
    ) -> ClearOutcome {
        let venue_orders = match adapter.open_orders(pair).await {
            Ok(orders) => orders,
            Err(error) => {
                warn!(%error, %pair, "clear_all: failed to list open orders");
                return ClearOutcome::new(0, 0, 0, format!("could not list open orders: {error}"));
            }
        };

        let mut attempted = 0u32;
        let mut cancelled = 0u32;

        for venue_order in venue_orders {
            if let Some(side) = side {
                if venue_order.side != side {
                    continue;
                }
            }

            if !force {
                let local = self
                    .store
                    .find(&OrderFilter::default().pair(pair.clone()))
                    .into_iter()
                    .find(|order| order.venue_id.as_deref() == Some(venue_order.venue_id.as_str()));

                if let Some(local) = local {
                    if !local.purpose.is_cancellable_by_default() {
                        continue;
                    }
                }
            }

            attempted += 1;
            match adapter
                .cancel_order(&venue_order.venue_id, pair, Some(venue_order.side))
                .await
            {
                Ok(_) => {
                    cancelled += 1;
                    self.mark_local_cancelled(pair, &venue_order.venue_id);
                }
                Err(error) => warn!(%error, venue_id = %venue_order.venue_id, "cancel failed"),
            }
        }

        info!(%pair, attempted, cancelled, "clear_all complete");
        ClearOutcome::summarize(attempted, cancelled)
    }

    /// Cancels local orders matching the filter criteria, then marks them cancelled.
    pub async fn clear_local(
        &self,
        adapter: &dyn ExchangeAdapter,
        purposes: &[Purpose],
        pair: &Pair,
        side: Option<Side>,
        price_filter: Option<PricePredicate>,
        force: bool,
    ) -> ClearOutcome {
        let mut attempted = 0u32;
        let mut cancelled = 0u32;

        for purpose in purposes {
            if !force && !purpose.is_cancellable_by_default() {
                continue;
            }

            let mut filter = OrderFilter::default()
                .pair(pair.clone())
                .purpose(*purpose)
                .ladder_state(LadderState::Placed);
            if let Some(side) = side {
                filter = filter.side(side);
            }
            if let Some(predicate) = price_filter {
                filter = filter.price(predicate);
            }

            for order in self.store.find(&filter) {
                let Some(venue_id) = order.venue_id.clone() else {
                    continue;
                };

                attempted += 1;
                match adapter.cancel_order(&venue_id, pair, Some(order.side)).await {
                    Ok(_) => {
                        cancelled += 1;
                        let id = order.id;
                        let _ = self.store.update(id, |order| {
                            order.ladder_state = LadderState::Cancelled;
                        });
                    }
                    Err(error) => warn!(%error, venue_id, "clear_local cancel failed"),
                }
            }
        }

        ClearOutcome::summarize(attempted, cancelled)
    }

    /// Cancels venue orders whose `venue_id` is absent from the store.
    pub async fn clear_unknown(
        &self,
        adapter: &dyn ExchangeAdapter,
        pair: &Pair,
        side: Option<Side>,
        force: bool,
    ) -> ClearOutcome {
        let venue_orders = match adapter.open_orders(pair).await {
            Ok(orders) => orders,
            Err(error) => {
                return ClearOutcome::new(0, 0, 0, format!("could not list open orders: {error}"));
            }
        };

        let known_ids: std::collections::HashSet<String> = self
            .store
            .find(&OrderFilter::default().pair(pair.clone()))
            .into_iter()
            .filter_map(|order| order.venue_id)
            .collect();

        let mut attempted = 0u32;
        let mut cancelled = 0u32;

        for venue_order in venue_orders {
            if known_ids.contains(&venue_order.venue_id) {
                continue;
            }
            if let Some(side) = side {
                if venue_order.side != side {
                    continue;
                }
            }
            let _ = force;

            attempted += 1;
            match adapter
                .cancel_order(&venue_order.venue_id, pair, Some(venue_order.side))
                .await
            {
                Ok(_) => cancelled += 1,
                Err(error) => warn!(%error, venue_id = %venue_order.venue_id, "clear_unknown cancel failed"),
            }
        }

        ClearOutcome::summarize(attempted, cancelled)
    }

    fn mark_local_cancelled(&self, pair: &Pair, venue_id: &str) {
        if let Some(order) = self
            .store
            .find(&OrderFilter::default().pair(pair.clone()))
            .into_iter()
            .find(|order| order.venue_id.as_deref() == Some(venue_id))
        {
            let id = order.id;
            let _ = self
                .store
                .update(id, |order| order.ladder_state = LadderState::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;
    use chrono::Utc;
    use ladder_execution::mock::MockAdapter;
    use ladder_execution::AdapterCapabilities;
    use ladder_instrument::{MarketStatus, OrderType, PairSpec};
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new("ADM", "USDT")
    }

    fn spec() -> PairSpec {
        PairSpec::new(8, 8, dec!(0.01), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online)
    }

    async fn place_local(
        store: &InMemoryOrderStore,
        adapter: &MockAdapter,
        purpose: Purpose,
    ) -> String {
        let ack = adapter
            .place_order(&pair(), Side::Buy, OrderType::Limit, Some(dec!(1)), Some(dec!(20)), None)
            .await
            .unwrap();
        let venue_id = ack.venue_id.unwrap();

        let mut order = Order::new_pending(
            store.next_id(),
            pair(),
            Side::Buy,
            OrderType::Limit,
            dec!(1),
            dec!(20),
            dec!(20),
            purpose,
            Some(-1),
            Utc::now(),
        );
        order.venue_id = Some(venue_id.clone());
        order.ladder_state = LadderState::Placed;
        store.insert(order).unwrap();
        venue_id
    }

    #[tokio::test]
    async fn clear_all_skips_non_cancellable_purpose_unless_forced() {
        let store = InMemoryOrderStore::new();
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());
        place_local(&store, &adapter, Purpose::FundSupplier).await;

        let collector = OrderCollector::new(&store);
        let outcome = collector.clear_all(&adapter, &pair(), None, false).await;
        assert_eq!(outcome.attempted, 0);
        assert_eq!(outcome.cancelled, 0);

        let outcome = collector.clear_all(&adapter, &pair(), None, true).await;
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.cancelled, 1);
    }

    #[tokio::test]
    async fn clear_local_marks_matching_orders_cancelled() {
        let store = InMemoryOrderStore::new();
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());
        place_local(&store, &adapter, Purpose::Ladder).await;

        let collector = OrderCollector::new(&store);
        let outcome = collector
            .clear_local(&adapter, &[Purpose::Ladder], &pair(), None, None, false)
            .await;

        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.cancelled, 1);
        let remaining = store.find(
            &OrderFilter::default()
                .pair(pair())
                .ladder_state(LadderState::Cancelled),
        );
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn clear_unknown_only_cancels_orders_absent_from_the_store() {
        let store = InMemoryOrderStore::new();
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());

        // known, local order: must survive clear_unknown.
        place_local(&store, &adapter, Purpose::Ladder).await;
        // unknown venue order with no local record.
        adapter
            .place_order(&pair(), Side::Sell, OrderType::Limit, Some(dec!(1)), Some(dec!(21)), None)
            .await
            .unwrap();

        let collector = OrderCollector::new(&store);
        let outcome = collector.clear_unknown(&adapter, &pair(), None, false).await;

        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.cancelled, 1);
        assert_eq!(adapter.open_orders(&pair()).await.unwrap().len(), 1);
    }
}
