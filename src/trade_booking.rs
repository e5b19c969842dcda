// ===============================
// src/trade_booking.rs
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::domain::Trade;
use crate::error::DeskError;
use crate::positions::PositionService;
use crate::service::{KeyedService, Listener, ServiceListener};

pub struct TradeBookingService {
    trades: KeyedService<String, Trade>,
}

impl TradeBookingService {
    pub fn new() -> Self {
        Self { trades: KeyedService::new("trade") }
    }

    /// Book a trade once. A repeated trade id is refused and nothing downstream runs.
    ///
    /// The trade is stored before the listeners run. An error from downstream
    /// (positions, risk, audit) is returned but the trade stays booked, so the
    /// same id can never be applied twice.
    pub fn book_trade(&mut self, trade: Trade) -> Result<(), DeskError> {
        debug!(trade_id = %trade.trade_id, product = %trade.product.product_id, book = %trade.book, side = %trade.side, qty = trade.quantity, "book trade");
        self.trades.insert_unique(trade)
    }

    pub fn get(&self, trade_id: &str) -> Result<&Trade, DeskError> {
        self.trades.get(&trade_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn add_listener(&mut self, listener: Listener<Trade>) {
        self.trades.add_listener(listener);
    }
}

impl Default for TradeBookingService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies every booked trade to positions.
pub struct TradeBookingListener {
    positions: Rc<RefCell<PositionService>>,
}

impl TradeBookingListener {
    pub fn new(positions: Rc<RefCell<PositionService>>) -> Self {
        Self { positions }
    }
}

impl ServiceListener<Trade> for TradeBookingListener {
    fn process_add(&self, data: &Trade) -> Result<(), DeskError> {
        self.positions.borrow_mut().add_trade(data)
    }
}
