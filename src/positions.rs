// ===============================
// src/positions.rs (multi-book inventory)
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::domain::{Bond, Position, Trade};
use crate::error::DeskError;
use crate::metrics::AGG_POSITION;
use crate::risk::RiskService;
use crate::service::{KeyedService, Listener, ServiceListener};

impl Position {
    /// Flat position with every known book seeded at zero.
    pub fn new(product: Bond, books: &[String]) -> Self {
        Self { product, books: books.iter().map(|b| (b.clone(), 0)).collect() }
    }

    /// Add the trade's signed quantity to its book. Unknown books are refused,
    /// as is a trade that would overflow the book or the aggregate. A refused
    /// trade leaves the position as it was.
    pub fn apply(&mut self, trade: &Trade) -> Result<(), DeskError> {
        let delta = trade.signed_quantity()?;
        let current = self.book(&trade.book).ok_or_else(|| DeskError::unknown("book", trade.book.clone()))?;
        let overflow = || DeskError::Range(format!("trade {} overflows position in {}", trade.trade_id, trade.book));
        let updated = current.checked_add(delta).ok_or_else(overflow)?;
        self.aggregate()?.checked_add(delta).ok_or_else(overflow)?;
        self.books.insert(trade.book.clone(), updated);
        Ok(())
    }

    pub fn book(&self, book: &str) -> Option<i64> {
        self.books.get(book).copied()
    }

    pub fn aggregate(&self) -> Result<i64, DeskError> {
        self.books.values().try_fold(0i64, |acc, q| {
            acc.checked_add(*q)
                .ok_or_else(|| DeskError::Range(format!("aggregate position of {} overflows", self.product.product_id)))
        })
    }
}

pub struct PositionService {
    positions: KeyedService<String, Position>,
    books: Vec<String>,
}

impl PositionService {
    pub fn new(books: Vec<String>) -> Self {
        Self { positions: KeyedService::new("position"), books }
    }

    /// Apply a trade to its product's position and publish the result.
    /// The stored position is untouched when the trade is refused.
    pub fn add_trade(&mut self, trade: &Trade) -> Result<(), DeskError> {
        let key = trade.product.product_id.clone();
        let mut position = match self.positions.get(&key) {
            Ok(existing) => existing.clone(),
            Err(_) => Position::new(trade.product.clone(), &self.books),
        };
        position.apply(trade)?;
        let total = position.aggregate()?;
        debug!(product = %key, trade_id = %trade.trade_id, book = %trade.book, total, "position updated");

        // publish stores before fanning out, so the gauge follows the store
        AGG_POSITION.with_label_values(&[&key]).set(total);
        self.positions.publish(position)
    }

    /// Store and publish a position as-is.
    pub fn publish(&mut self, position: Position) -> Result<(), DeskError> {
        self.positions.publish(position)
    }

    pub fn get(&self, product_id: &str) -> Result<&Position, DeskError> {
        self.positions.get(&product_id.to_string())
    }

    pub fn aggregate_position(&self, product_id: &str) -> Result<i64, DeskError> {
        self.get(product_id)?.aggregate()
    }

    pub fn add_listener(&mut self, listener: Listener<Position>) {
        self.positions.add_listener(listener);
    }
}

/// Feeds every published position into risk.
pub struct PositionListener {
    risk: Rc<RefCell<RiskService>>,
}

impl PositionListener {
    pub fn new(risk: Rc<RefCell<RiskService>>) -> Self {
        Self { risk }
    }
}

impl ServiceListener<Position> for PositionListener {
    fn process_add(&self, data: &Position) -> Result<(), DeskError> {
        self.risk.borrow_mut().add_position(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::fixtures::bond;
    use rust_decimal_macros::dec;
    use std::cell::Cell;

    fn trade(id: &str, book: &str, qty: i64, side: Side) -> Trade {
        Trade {
            product: bond("912828XX"),
            trade_id: id.into(),
            book: book.into(),
            price: dec!(99.5),
            quantity: qty,
            side,
        }
    }

    struct Counter(Rc<Cell<usize>>);
    impl ServiceListener<Position> for Counter {
        fn process_add(&self, _data: &Position) -> Result<(), DeskError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn service() -> PositionService {
        PositionService::new(vec!["A".into(), "B".into(), "C".into()])
    }

    #[test]
    fn aggregates_across_books() {
        let mut svc = service();
        svc.add_trade(&trade("T1", "A", 1_000_000, Side::Buy)).unwrap();
        svc.add_trade(&trade("T2", "A", 400_000, Side::Sell)).unwrap();
        svc.add_trade(&trade("T3", "B", 200_000, Side::Buy)).unwrap();

        let pos = svc.get("912828XX").unwrap();
        assert_eq!(pos.book("A"), Some(600_000));
        assert_eq!(pos.book("B"), Some(200_000));
        assert_eq!(pos.book("C"), Some(0));
        assert_eq!(svc.aggregate_position("912828XX").unwrap(), 800_000);
    }

    #[test]
    fn unknown_book_is_refused_without_touching_the_store() {
        let mut svc = service();
        svc.add_trade(&trade("T1", "A", 500, Side::Buy)).unwrap();

        let err = svc.add_trade(&trade("T2", "Z", 100, Side::Buy)).unwrap_err();

        assert_eq!(err, DeskError::unknown("book", "Z"));
        assert_eq!(svc.aggregate_position("912828XX").unwrap(), 500);
        assert!(svc.get("912828XX").unwrap().book("Z").is_none());
    }

    #[test]
    fn republishing_the_same_position_is_idempotent() {
        let mut svc = service();
        let hits = Rc::new(Cell::new(0));
        svc.add_listener(Rc::new(Counter(hits.clone())));
        svc.add_trade(&trade("T1", "B", 300, Side::Sell)).unwrap();
        let snapshot = svc.get("912828XX").unwrap().clone();

        svc.publish(snapshot.clone()).unwrap();
        svc.publish(snapshot).unwrap();

        assert_eq!(svc.aggregate_position("912828XX").unwrap(), -300);
        assert_eq!(hits.get(), 3);
    }

    struct Refuse;
    impl ServiceListener<Position> for Refuse {
        fn process_add(&self, data: &Position) -> Result<(), DeskError> {
            Err(DeskError::unknown("pv01", data.product.product_id.clone()))
        }
    }

    #[test]
    fn gauge_matches_the_stored_position_when_a_listener_fails() {
        let mut svc = PositionService::new(vec!["A".into()]);
        svc.add_listener(Rc::new(Refuse));
        let mut t = trade("T1", "A", 42, Side::Buy);
        t.product = bond("GAUGE1");

        assert!(svc.add_trade(&t).is_err());

        assert_eq!(svc.aggregate_position("GAUGE1").unwrap(), 42);
        assert_eq!(AGG_POSITION.with_label_values(&["GAUGE1"]).get(), 42);
    }

    #[test]
    fn overflow_leaves_the_gauge_alone() {
        let mut svc = PositionService::new(vec!["A".into(), "B".into()]);
        let mut t1 = trade("T1", "A", i64::MAX, Side::Buy);
        t1.product = bond("GAUGE2");
        let mut t2 = trade("T2", "B", 1, Side::Buy);
        t2.product = bond("GAUGE2");

        svc.add_trade(&t1).unwrap();
        assert!(svc.add_trade(&t2).is_err());

        assert_eq!(AGG_POSITION.with_label_values(&["GAUGE2"]).get(), i64::MAX);
    }

    #[test]
    fn overflowing_aggregate_is_a_range_error_and_keeps_the_store() {
        let mut svc = service();
        svc.add_trade(&trade("T1", "A", i64::MAX, Side::Buy)).unwrap();

        let err = svc.add_trade(&trade("T2", "B", i64::MAX, Side::Buy)).unwrap_err();

        assert!(matches!(err, DeskError::Range(_)));
        let pos = svc.get("912828XX").unwrap();
        assert_eq!((pos.book("A"), pos.book("B")), (Some(i64::MAX), Some(0)));
        assert_eq!(svc.aggregate_position("912828XX").unwrap(), i64::MAX);
    }

    #[test]
    fn overflowing_book_is_refused() {
        let mut svc = service();
        svc.add_trade(&trade("T1", "C", i64::MAX, Side::Sell)).unwrap();
        assert!(matches!(svc.add_trade(&trade("T2", "C", 2, Side::Sell)), Err(DeskError::Range(_))));
        assert_eq!(svc.get("912828XX").unwrap().book("C"), Some(-i64::MAX));
    }

    #[test]
    fn first_trade_on_unknown_book_creates_nothing() {
        let mut svc = service();
        assert!(svc.add_trade(&trade("T1", "Q", 1, Side::Buy)).is_err());
        assert!(svc.get("912828XX").is_err());
    }
}
