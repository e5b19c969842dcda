// ===============================
// src/market_data.rs (order books, best bid/offer, crossing)
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::algo_execution::AlgoExecutionService;
use crate::domain::{BidOffer, Order, OrderBook};
use crate::error::DeskError;
use crate::service::{KeyedService, Listener, ServiceListener};
use crate::tick::one_32nd;

/// First strictly-better element wins, so equal prices keep stack order.
fn best_by<F>(stack: &[Order], better: F) -> Option<Order>
where
    F: Fn(&Order, &Order) -> bool,
{
    let mut it = stack.iter();
    let mut best = *it.next()?;
    for o in it {
        if better(o, &best) {
            best = *o;
        }
    }
    Some(best)
}

impl OrderBook {
    /// Add levels behind the existing ones. Nothing is pruned.
    pub fn append(&mut self, bids: &[Order], offers: &[Order]) {
        self.bid_stack.extend_from_slice(bids);
        self.offer_stack.extend_from_slice(offers);
    }

    /// Throw away both stacks and take the given levels.
    pub fn replace(&mut self, bids: Vec<Order>, offers: Vec<Order>) {
        self.bid_stack = bids;
        self.offer_stack = offers;
    }

    /// Highest bid and lowest offer; `None` when either side is empty.
    pub fn best_bid_offer(&self) -> Option<BidOffer> {
        let bid = best_by(&self.bid_stack, |o, best| o.price > best.price)?;
        let offer = best_by(&self.offer_stack, |o, best| o.price < best.price)?;
        Some(BidOffer { bid, offer })
    }
}

impl BidOffer {
    /// Bid and offer closer than one 32nd. Exactly one 32nd apart does not cross.
    pub fn crosses(&self) -> bool {
        (self.bid.price - self.offer.price).abs() < one_32nd()
    }
}

pub struct MarketDataService {
    books: KeyedService<String, OrderBook>,
}

impl MarketDataService {
    pub fn new() -> Self {
        Self { books: KeyedService::new("order_book") }
    }

    /// Merge a snapshot into the product's book and publish the accumulated book.
    pub fn ingest(&mut self, snapshot: OrderBook) -> Result<(), DeskError> {
        let key = snapshot.product.product_id.clone();
        let merged = match self.books.get_mut(&key) {
            Some(book) => {
                book.append(&snapshot.bid_stack, &snapshot.offer_stack);
                book.clone()
            }
            None => {
                self.books.put(snapshot.clone());
                snapshot
            }
        };
        debug!(product = %key, bids = merged.bid_stack.len(), offers = merged.offer_stack.len(), "book merged");
        self.books.notify_add(&merged)
    }

    pub fn get(&self, product_id: &str) -> Result<&OrderBook, DeskError> {
        self.books.get(&product_id.to_string())
    }

    pub fn best_bid_offer(&self, product_id: &str) -> Result<Option<BidOffer>, DeskError> {
        Ok(self.get(product_id)?.best_bid_offer())
    }

    pub fn add_listener(&mut self, listener: Listener<OrderBook>) {
        self.books.add_listener(listener);
    }
}

impl Default for MarketDataService {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends crossed books to the algo execution engine.
pub struct MarketDataListener {
    algo_execution: Rc<RefCell<AlgoExecutionService>>,
}

impl MarketDataListener {
    pub fn new(algo_execution: Rc<RefCell<AlgoExecutionService>>) -> Self {
        Self { algo_execution }
    }
}

impl ServiceListener<OrderBook> for MarketDataListener {
    fn process_add(&self, data: &OrderBook) -> Result<(), DeskError> {
        match data.best_bid_offer() {
            Some(bo) if bo.crosses() => {
                self.algo_execution.borrow_mut().convert(&data.product, &bo).map(|_| ())
            }
            _ => Ok(()),
        }
    }
}
