use crate::order::{LadderState, Purpose};
use crate::store::{InMemoryOrderStore, OrderFilter};
use chrono::Utc;
use ladder_execution::adapter::ExchangeAdapter;
use ladder_execution::error::AdapterError;
use ladder_execution::models::VenueOrderStatus;
use ladder_instrument::Pair;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const PENDING_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// A venue order observed with no matching local record. Exposed in stats; never cancelled except by an explicit `/clear unk` command.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownOrder {
    pub venue_id: String,
    pub pair: Pair,
    pub side: ladder_instrument::Side,
    pub price: rust_decimal::Decimal,
    pub amount: rust_decimal::Decimal,
}

/// Result of one reconciliation pass, surfaced to the dispatcher for `/stats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub filled: u32,
    pub cancelled: u32,
    pub still_unknown: u32,
    pub garbage_collected: u32,
    pub unknown_orders: Vec<UnknownOrder>,
    pub skipped_temporary: bool,
}

/// Tracks consecutive `unknown` responses per venue id so a single transient misread doesn't
/// cancel a local record.
#[derive(Debug, Default)]
struct UnknownTracker {
    last_seen_unknown_at: HashMap<String, Instant>,
}

/// Maintains consistency between [`InMemoryOrderStore`] and the venue.
pub struct Reconciler<'a> {
    store: &'a InMemoryOrderStore,
    unknown_tracker: Mutex<UnknownTracker>,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a InMemoryOrderStore) -> Self {
        Self {
            store,
            unknown_tracker: Mutex::new(UnknownTracker::default()),
        }
    }

    /// Runs one reconciliation pass for `pair`.
    pub async fn reconcile(&self, adapter: &dyn ExchangeAdapter, pair: &Pair) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let venue_orders = match adapter.open_orders(pair).await {
            Ok(orders) => orders,
            Err(error) if error.is_temporary() => {
                debug!(%pair, %error, "reconcile: open_orders temporary failure, skipping tick");
                report.skipped_temporary = true;
                return report;
            }
            Err(error) => {
                warn!(%pair, %error, "reconcile: open_orders failed");
                report.skipped_temporary = true;
                return report;
            }
        };

        let venue_ids: std::collections::HashSet<&str> = venue_orders
            .iter()
            .map(|order| order.venue_id.as_str())
            .collect();

        let local_placed = self.store.placed_with_venue_id(pair);

        // step 3: local `placed` orders missing from the venue listing.
        for local in &local_placed {
            let Some(venue_id) = local.venue_id.as_deref() else {
                continue;
            };
            if venue_ids.contains(venue_id) {
                continue;
            }

            match adapter.get_order(venue_id, pair).await {
                Ok(venue_order) => {
                    self.clear_unknown_marker(venue_id);
                    match venue_order.status {
                        VenueOrderStatus::Filled => {
                            let id = local.id;
                            let _ = self.store.update(id, |order| {
                                order.ladder_state = LadderState::Filled;
                                order.amount_executed = venue_order.amount_executed;
                                order.volume_executed = venue_order.volume_executed;
                            });
                            report.filled += 1;
                        }
                        VenueOrderStatus::Cancelled => {
                            let id = local.id;
                            let _ = self.store.update(id, |order| {
                                order.ladder_state = LadderState::Cancelled;
                            });
                            report.cancelled += 1;
                        }
                        VenueOrderStatus::Unknown => {
                            self.handle_unknown(local, &mut report);
                        }
                        VenueOrderStatus::New | VenueOrderStatus::PartFilled => {
                            // venue still sees it open; listing was momentarily stale, leave as-is.
                        }
                    }
                }
                Err(AdapterError::Inconsistency(_)) => {
                    self.handle_unknown(local, &mut report);
                }
                Err(error) if error.is_temporary() => {
                    debug!(venue_id, %error, "reconcile: get_order temporary failure");
                }
                Err(error) => {
                    warn!(venue_id, %error, "reconcile: get_order failed");
                }
            }
        }

        // step 4: venue orders with no matching local record.
        let local_venue_ids: std::collections::HashSet<&str> = local_placed
            .iter()
            .filter_map(|order| order.venue_id.as_deref())
            .collect();

        for venue_order in &venue_orders {
            if local_venue_ids.contains(venue_order.venue_id.as_str()) {
                continue;
            }
            report.unknown_orders.push(UnknownOrder {
                venue_id: venue_order.venue_id.clone(),
                pair: venue_order.pair.clone(),
                side: venue_order.side,
                price: venue_order.price,
                amount: venue_order.amount,
            });
        }

        // step 5: partial fills on orders present both locally and on the venue.
        for venue_order in &venue_orders {
            if venue_order.status != VenueOrderStatus::PartFilled {
                continue;
            }
            if let Some(local) = local_placed
                .iter()
                .find(|order| order.venue_id.as_deref() == Some(venue_order.venue_id.as_str()))
            {
                let id = local.id;
                let _ = self.store.update(id, |order| {
                    order.amount_executed = venue_order.amount_executed;
                    order.volume_executed = venue_order.volume_executed;
                });
            }
        }

        report.garbage_collected = self.garbage_collect_stale_pending(pair);

        info!(
            %pair,
            filled = report.filled,
            cancelled = report.cancelled,
            unknown = report.unknown_orders.len(),
            gc = report.garbage_collected,
            "reconciliation pass complete"
        );

        report
    }

    fn handle_unknown(&self, local: &crate::order::Order, report: &mut ReconcileReport) {
        let Some(venue_id) = local.venue_id.clone() else {
            return;
        };

        let mut tracker = self.unknown_tracker.lock();
        let now = Instant::now();
        // A previous entry means this venue id was already seen `unknown` on an earlier tick;
        // two consecutive sightings separated by at least one tick boundary confirm cancellation.
        let confirmed = tracker.last_seen_unknown_at.contains_key(&venue_id);

        if confirmed {
            tracker.last_seen_unknown_at.remove(&venue_id);
            drop(tracker);
            let id = local.id;
            let _ = self
                .store
                .update(id, |order| order.ladder_state = LadderState::Cancelled);
            report.cancelled += 1;
        } else {
            tracker.last_seen_unknown_at.insert(venue_id, now);
            report.still_unknown += 1;
        }
    }

    fn clear_unknown_marker(&self, venue_id: &str) {
        self.unknown_tracker
            .lock()
            .last_seen_unknown_at
            .remove(venue_id);
    }

    /// `pending` orders older than the grace period without a `venue_id` are garbage-collected
    /// to `not-placed`.
    fn garbage_collect_stale_pending(&self, pair: &Pair) -> u32 {
        let mut collected = 0;
        let stale = self.store.find(
            &OrderFilter::default()
                .pair(pair.clone())
                .ladder_state(LadderState::Pending),
        );

        for order in stale {
            if order.venue_id.is_some() {
                continue;
            }
            if order.created_monotonic.elapsed() < PENDING_GRACE_PERIOD {
                continue;
            }

            let id = order.id;
            let _ = self.store.update(id, |order| {
                order.ladder_state = LadderState::NotPlaced;
                order.ladder_not_placed_reason = Some("placement lost".to_string());
            });
            collected += 1;
        }

        collected
    }

    /// Returns `true` if `purpose` orders currently tracked for `pair` are all terminal —
    /// used by the ladder tick after a `reinit_requested` cancel sweep to know when it is safe
    /// to clear the flag.
    pub fn all_terminal(&self, pair: &Pair, purpose: Purpose) -> bool {
        self.store
            .find(&OrderFilter::default().pair(pair.clone()).purpose(purpose))
            .iter()
            .all(|order| order.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;
    use ladder_execution::mock::MockAdapter;
    use ladder_execution::AdapterCapabilities;
    use ladder_instrument::{MarketStatus, OrderType, PairSpec, Side};
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new("ADM", "USDT")
    }

    fn spec() -> PairSpec {
        PairSpec::new(8, 8, dec!(0.01), dec!(0.0001), dec!(1), dec!(10), MarketStatus::Online)
    }

    #[tokio::test]
    async fn marks_filled_order_after_venue_confirms() {
        let store = InMemoryOrderStore::new();
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());

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
            Purpose::Ladder,
            Some(-1),
            Utc::now(),
        );
        order.venue_id = Some(venue_id.clone());
        order.ladder_state = LadderState::Placed;
        store.insert(order).unwrap();

        // cancel directly on the venue so it drops out of open_orders, simulating a fill
        adapter.fill_order(&venue_id);
        adapter.cancel_order(&venue_id, &pair(), None).await.ok();

        let reconciler = Reconciler::new(&store);
        let report = reconciler.reconcile(&adapter, &pair()).await;

        assert_eq!(report.filled, 1);
    }

    #[tokio::test]
    async fn skips_tick_on_temporary_failure() {
        let store = InMemoryOrderStore::new();
        let adapter = MockAdapter::new(AdapterCapabilities::full());
        adapter.set_market(pair(), spec());
        adapter.set_market_offline(true);

        let reconciler = Reconciler::new(&store);
        let report = reconciler.reconcile(&adapter, &pair()).await;

        assert!(report.skipped_temporary);
        assert_eq!(report.filled, 0);
        assert_eq!(report.cancelled, 0);
    }
}
