// ===============================
// src/execution.rs (stub exchange: every order fills)
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::domain::{ExecutionOrder, Fill, Market, Trade};
use crate::error::DeskError;
use crate::metrics::FILLS;
use crate::service::{KeyedService, Listener, ServiceListener};
use crate::trade_booking::TradeBookingService;

/// Round-robin over a fixed list of destination books.
#[derive(Debug, Clone)]
pub struct BookRotation {
    books: Vec<String>,
    next: usize,
}

impl BookRotation {
    pub fn new(books: Vec<String>) -> Result<Self, DeskError> {
        if books.is_empty() {
            return Err(DeskError::Range("book rotation needs at least one book".into()));
        }
        Ok(Self { books, next: 0 })
    }

    pub fn next_book(&mut self) -> String {
        let book = self.books[self.next].clone();
        self.next = (self.next + 1) % self.books.len();
        book
    }
}

pub struct ExecutionService {
    fills: KeyedService<String, Fill>,
    rotation: BookRotation,
    executed: u64,
}

impl ExecutionService {
    pub fn new(books: Vec<String>) -> Result<Self, DeskError> {
        Ok(Self { fills: KeyedService::new("fill"), rotation: BookRotation::new(books)?, executed: 0 })
    }

    /// Fill `order` in full on the next book and publish the fill.
    /// The fill, its id and the rotation are committed even when a listener fails.
    pub fn execute_order(&mut self, order: &ExecutionOrder, market: Market) -> Result<Fill, DeskError> {
        self.executed += 1;
        let execution_id = format!("EX-{}", self.executed);
        let book = self.rotation.next_book();

        let trade = Trade {
            product: order.product.clone(),
            trade_id: execution_id.clone(),
            book: book.clone(),
            price: order.price,
            quantity: order.visible_quantity,
            side: order.side.trade_side(),
        };
        let fill = Fill { execution_id, order: order.clone(), book, market, trade };

        FILLS.with_label_values(&[&fill.book]).inc();
        info!(
            execution_id = %fill.execution_id,
            product = %order.product.product_id,
            book = %fill.book,
            market = %market,
            side = %fill.trade.side,
            px = %fill.trade.price,
            qty = fill.trade.quantity,
            "FILLED"
        );
        self.fills.publish(fill.clone())?;
        Ok(fill)
    }

    pub fn get(&self, execution_id: &str) -> Result<&Fill, DeskError> {
        self.fills.get(&execution_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn add_listener(&mut self, listener: Listener<Fill>) {
        self.fills.add_listener(listener);
    }
}

/// Books each fill's trade so executions move positions and risk.
pub struct FillBookingListener {
    trade_booking: Rc<RefCell<TradeBookingService>>,
}

impl FillBookingListener {
    pub fn new(trade_booking: Rc<RefCell<TradeBookingService>>) -> Self {
        Self { trade_booking }
    }
}

impl ServiceListener<Fill> for FillBookingListener {
    fn process_add(&self, data: &Fill) -> Result<(), DeskError> {
        self.trade_booking.borrow_mut().book_trade(data.trade.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderType, PricingSide, Side};
    use crate::fixtures::bond;
    use rust_decimal_macros::dec;

    fn books() -> Vec<String> {
        vec!["TRSY1".into(), "TRSY2".into(), "TRSY3".into()]
    }

    fn market_order(side: PricingSide, qty: i64) -> ExecutionOrder {
        ExecutionOrder {
            product: bond("P1"),
            side,
            order_id: 0,
            order_type: OrderType::Market,
            price: dec!(99.5),
            visible_quantity: qty,
            hidden_quantity: qty,
            parent_order_id: None,
            is_child_order: false,
        }
    }

    #[test]
    fn books_rotate_and_wrap() {
        let mut svc = ExecutionService::new(books()).unwrap();
        let got: Vec<String> = (0..4)
            .map(|_| svc.execute_order(&market_order(PricingSide::Bid, 1), Market::Cme).unwrap().book)
            .collect();
        assert_eq!(got, vec!["TRSY1", "TRSY2", "TRSY3", "TRSY1"]);
        assert_eq!(svc.len(), 4);
    }

    #[test]
    fn fill_carries_the_implied_trade() {
        let mut svc = ExecutionService::new(books()).unwrap();
        svc.execute_order(&market_order(PricingSide::Bid, 10), Market::Cme).unwrap();
        let fill = svc.execute_order(&market_order(PricingSide::Offer, 25), Market::Cme).unwrap();

        assert_eq!(fill.execution_id, "EX-2");
        assert_eq!(fill.market, Market::Cme);
        assert_eq!(fill.trade.trade_id, "EX-2");
        assert_eq!(fill.trade.side, Side::Sell);
        assert_eq!((fill.trade.quantity, fill.trade.price), (25, dec!(99.5)));
        assert_eq!(svc.get("EX-1").unwrap().trade.side, Side::Buy);
    }

    #[test]
    fn empty_rotation_is_refused() {
        assert!(matches!(BookRotation::new(vec![]), Err(DeskError::Range(_))));
    }
}
