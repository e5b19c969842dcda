// ===============================
// src/pricing.rs
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::algo_streaming::AlgoStreamingService;
use crate::domain::Price;
use crate::error::DeskError;
use crate::service::{KeyedService, Listener, ServiceListener};

/// Latest mid/spread per product.
pub struct PricingService {
    prices: KeyedService<String, Price>,
}

impl PricingService {
    pub fn new() -> Self {
        Self { prices: KeyedService::new("price") }
    }

    pub fn on_message(&mut self, price: Price) -> Result<(), DeskError> {
        debug!(product = %price.product.product_id, mid = %price.mid, spread = %price.bid_offer_spread, "price in");
        self.prices.publish(price)
    }

    pub fn get(&self, product_id: &str) -> Result<&Price, DeskError> {
        self.prices.get(&product_id.to_string())
    }

    pub fn add_listener(&mut self, listener: Listener<Price>) {
        self.prices.add_listener(listener);
    }
}

impl Default for PricingService {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the streaming engine on every new price.
pub struct PricingListener {
    algo_streaming: Rc<RefCell<AlgoStreamingService>>,
}

impl PricingListener {
    pub fn new(algo_streaming: Rc<RefCell<AlgoStreamingService>>) -> Self {
        Self { algo_streaming }
    }
}

impl ServiceListener<Price> for PricingListener {
    fn process_add(&self, data: &Price) -> Result<(), DeskError> {
        self.algo_streaming.borrow_mut().convert(data).map(|_| ())
    }
}
