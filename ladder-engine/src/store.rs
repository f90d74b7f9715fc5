use crate::order::{LadderState, Order, OrderId, Purpose};
use chrono::Utc;
use ladder_instrument::Pair;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum StoreError {
    #[error("order {0:?} already exists")]
    Duplicate(OrderId),
    #[error("order {0:?} not found")]
    NotFound(OrderId),
}

/// A price-comparison predicate for [`OrderFilter::price`] (spec §4.2 "price predicate (`lt`,
/// `gt`)").
#[derive(Debug, Clone, Copy)]
pub enum PricePredicate {
    LessThan(Decimal),
    GreaterThan(Decimal),
}

impl PricePredicate {
    pub fn matches(self, price: Decimal) -> bool {
        match self {
            PricePredicate::LessThan(bound) => price < bound,
            PricePredicate::GreaterThan(bound) => price > bound,
        }
    }
}

/// Criteria for [`OrderStore::find`]. Every field is optional; an empty filter
/// matches everything.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub pair: Option<Pair>,
    pub purpose: Option<Purpose>,
    pub ladder_state: Option<LadderState>,
    pub venue_id: Option<String>,
    pub side: Option<ladder_instrument::Side>,
    pub price: Option<PricePredicate>,
}

impl OrderFilter {
    pub fn pair(mut self, pair: Pair) -> Self {
        self.pair = Some(pair);
        self
    }

    pub fn purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn ladder_state(mut self, state: LadderState) -> Self {
        self.ladder_state = Some(state);
        self
    }

    pub fn side(mut self, side: ladder_instrument::Side) -> Self {
        self.side = Some(side);
        self
    }

    pub fn price(mut self, predicate: PricePredicate) -> Self {
        self.price = Some(predicate);
        self
    }

    fn matches(&self, order: &Order) -> bool {
        self.pair.as_ref().map_or(true, |pair| pair == &order.pair)
            && self
            .purpose
            .map_or(true, |purpose| purpose == order.purpose)
            && self
            .ladder_state
            .map_or(true, |state| state == order.ladder_state)
            && self
            .venue_id
            .as_deref()
            .map_or(true, |id| order.venue_id.as_deref() == Some(id))
            && self.side.map_or(true, |side| side == order.side)
            && self
            .price
            .map_or(true, |predicate| predicate.matches(order.price))
    }
}

/// Durable record of every [`Order`] the engine has ever touched. This in-memory
/// implementation persists every mutation into a `parking_lot::RwLock`-guarded map synchronously
/// before returning, matching the spec's "every mutation is persisted before returning" even
/// though there is no on-disk `Store` collaborator in this crate (out of scope per spec §1); a
/// real deployment would swap this for a type wrapping an actual `Store`.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    next_id: AtomicU64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Mints a fresh, unique [`OrderId`] for a new order about to be inserted.
    pub fn next_id(&self) -> OrderId {
        OrderId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(order.id));
        }
        orders.insert(order.id, order);
        Ok(())
    }

    /// Atomic single-record update (spec §4.2 `update(id, mutator)`).
    pub fn update<F>(&self, id: OrderId, mutator: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Order),
    {
        let mut orders = self.orders.write();
        let order = orders.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        mutator(order);
        order.updated_at = Utc::now();
        Ok(())
    }

    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    pub fn find(&self, filter: &OrderFilter) -> Vec<Order> {
        self.orders
            .read()
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect()
    }

    /// Grouped view for stats and clearing (spec §4.2 `ordered_by(purpose, pair)`), sorted by
    /// `ladder_index` then `created_at` so rungs list nearest-to-mid first within a side.
    pub fn ordered_by(&self, purpose: Purpose, pair: &Pair) -> Vec<Order> {
        let mut orders = self.find(&OrderFilter::default().pair(pair.clone()).purpose(purpose));
        orders.sort_by_key(|order| (order.ladder_index, order.created_at));
        orders
    }

    /// All orders still in `placed` state for a pair, keyed by venue id — the `L` set of spec
    /// §4.4 step 2.
    pub fn placed_with_venue_id(&self, pair: &Pair) -> Vec<Order> {
        self.find(
            &OrderFilter::default()
                .pair(pair.clone())
                .ladder_state(LadderState::Placed),
        )
            .into_iter()
            .filter(|order| order.venue_id.is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_instrument::{OrderType, Side};
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new("ADM", "USDT")
    }

    fn new_order(store: &InMemoryOrderStore, purpose: Purpose) -> Order {
        Order::new_pending(
            store.next_id(),
            pair(),
            Side::Buy,
            OrderType::Limit,
            dec!(1),
            dec!(10),
            dec!(10),
            purpose,
            Some(-1),
            Utc::now(),
        )
    }

    #[test]
    fn rejects_duplicate_insert() {
        let store = InMemoryOrderStore::new();
        let order = new_order(&store, Purpose::Ladder);
        store.insert(order.clone()).unwrap();
        assert_eq!(store.insert(order).unwrap_err(), StoreError::Duplicate(OrderId(1)));
    }

    #[test]
    fn find_filters_by_purpose_and_pair() {
        let store = InMemoryOrderStore::new();
        store.insert(new_order(&store, Purpose::Ladder)).unwrap();
        store.insert(new_order(&store, Purpose::Manual)).unwrap();

        let ladder_orders = store.find(&OrderFilter::default().purpose(Purpose::Ladder));
        assert_eq!(ladder_orders.len(), 1);
    }

    #[test]
    fn update_mutates_single_record() {
        let store = InMemoryOrderStore::new();
        let order = new_order(&store, Purpose::Ladder);
        let id = order.id;
        store.insert(order).unwrap();

        store
            .update(id, |order| order.ladder_state = LadderState::Placed)
            .unwrap();

        assert_eq!(store.get(id).unwrap().ladder_state, LadderState::Placed);
    }
}
