// ===============================
// src/algo_execution.rs (crossed book -> market order)
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::domain::{AlgoExecution, BidOffer, Bond, ExecutionOrder, Market, OrderType, PricingSide};
use crate::error::DeskError;
use crate::execution::ExecutionService;
use crate::metrics::ALGO_ORDERS;
use crate::service::{KeyedService, Listener, ServiceListener};

pub struct AlgoExecutionService {
    executions: KeyedService<String, AlgoExecution>,
    side: PricingSide,
    next_order_id: u64,
}

impl AlgoExecutionService {
    pub fn new() -> Self {
        Self { executions: KeyedService::new("algo_execution"), side: PricingSide::Bid, next_order_id: 0 }
    }

    /// Side the next order will take.
    pub fn side(&self) -> PricingSide {
        self.side
    }

    /// Take the current side of `bid_offer` as a MARKET order, then flip sides.
    /// The order id and side flip stand even when a listener fails.
    pub fn convert(&mut self, product: &Bond, bid_offer: &BidOffer) -> Result<ExecutionOrder, DeskError> {
        let leg = match self.side {
            PricingSide::Bid => bid_offer.bid,
            PricingSide::Offer => bid_offer.offer,
        };
        let order = ExecutionOrder {
            product: product.clone(),
            side: self.side,
            order_id: self.next_order_id,
            order_type: OrderType::Market,
            price: leg.price,
            visible_quantity: leg.quantity,
            hidden_quantity: leg.quantity,
            parent_order_id: None,
            is_child_order: false,
        };
        self.next_order_id += 1;
        self.side = self.side.flip();

        ALGO_ORDERS.with_label_values(&[&order.side.to_string()]).inc();
        info!(
            product = %product.product_id,
            order_id = order.order_id,
            side = %order.side,
            px = %order.price,
            qty = order.visible_quantity,
            "aggress"
        );
        self.executions.publish(AlgoExecution { order: order.clone() })?;
        Ok(order)
    }

    pub fn get(&self, product_id: &str) -> Result<&AlgoExecution, DeskError> {
        self.executions.get(&product_id.to_string())
    }

    pub fn add_listener(&mut self, listener: Listener<AlgoExecution>) {
        self.executions.add_listener(listener);
    }
}

impl Default for AlgoExecutionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends algo orders to the exchange.
pub struct AlgoExecutionListener {
    execution: Rc<RefCell<ExecutionService>>,
    market: Market,
}

impl AlgoExecutionListener {
    pub fn new(execution: Rc<RefCell<ExecutionService>>) -> Self {
        Self { execution, market: Market::Cme }
    }
}

impl ServiceListener<AlgoExecution> for AlgoExecutionListener {
    fn process_add(&self, data: &AlgoExecution) -> Result<(), DeskError> {
        self.execution.borrow_mut().execute_order(&data.order, self.market).map(|_| ())
    }
}
