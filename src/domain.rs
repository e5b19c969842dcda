// ===============================
// src/domain.rs
// ===============================
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DeskError;
use crate::service::Keyed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side {
    /// BUY adds to a position, SELL takes away.
    pub fn sign(&self) -> i64 { match self { Side::Buy => 1, Side::Sell => -1 } }

    pub fn parse(s: &str) -> Result<Self, DeskError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(DeskError::parse(format!("unknown side {other:?}"))),
        }
    }
}
impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Side::Buy => "BUY", Side::Sell => "SELL" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingSide { Bid, Offer }
impl PricingSide {
    pub fn flip(&self) -> Self { match self { PricingSide::Bid => PricingSide::Offer, PricingSide::Offer => PricingSide::Bid } }
    /// Side of the trade booked when an order on this side is filled.
    pub fn trade_side(&self) -> Side { match self { PricingSide::Bid => Side::Buy, PricingSide::Offer => Side::Sell } }
}
impl fmt::Display for PricingSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { PricingSide::Bid => "BID", PricingSide::Offer => "OFFER" })
    }
}

// ---- Reference data ----
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondIdType { Cusip, Isin }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub product_id: String,
    pub id_type: BondIdType,
    pub ticker: String,
    pub coupon: Decimal,
    pub maturity: NaiveDate,
}
impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}% {}", self.ticker, self.coupon, self.maturity)
    }
}

// ---- Trades, positions, risk ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub product: Bond,
    pub trade_id: String,
    pub book: String,
    pub price: Decimal,
    pub quantity: i64,
    pub side: Side,
}
impl Trade {
    pub fn signed_quantity(&self) -> Result<i64, DeskError> {
        self.quantity
            .checked_mul(self.side.sign())
            .ok_or_else(|| DeskError::Range(format!("trade {} quantity {} overflows", self.trade_id, self.quantity)))
    }
}

/// Net quantity per book. Books are seeded up front; a trade never creates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub product: Bond,
    pub books: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pv01 {
    pub product: Bond,
    pub pv01: Decimal,
    pub quantity: i64,
}
impl Pv01 {
    /// PV01 exposure of the whole position.
    pub fn risk(&self) -> Result<Decimal, DeskError> {
        self.pv01
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| DeskError::Range(format!("pv01 risk of {} overflows", self.product.product_id)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketedSector {
    pub name: String,
    pub products: Vec<Bond>,
}

// ---- Prices & streams ----
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub product: Bond,
    pub mid: Decimal,
    pub bid_offer_spread: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStreamOrder {
    pub price: Decimal,
    pub visible_quantity: i64,
    pub hidden_quantity: i64,
    pub side: PricingSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStream {
    pub product: Bond,
    pub bid: PriceStreamOrder,
    pub offer: PriceStreamOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgoStream { pub stream: PriceStream }

// ---- Market data ----
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order { pub price: Decimal, pub quantity: i64, pub side: PricingSide }

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidOffer { pub bid: Order, pub offer: Order }

/// Bid and offer stacks in arrival order. Levels from later snapshots are
/// appended, never pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub product: Bond,
    pub bid_stack: Vec<Order>,
    pub offer_stack: Vec<Order>,
}

// ---- Execution ----
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType { Fok, Ioc, Market, Limit, Stop }
impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderType::Fok => "FOK",
            OrderType::Ioc => "IOC",
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market { Brokertec, Espeed, Cme }
impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Market::Brokertec => "BROKERTEC", Market::Espeed => "ESPEED", Market::Cme => "CME" })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOrder {
    pub product: Bond,
    pub side: PricingSide,
    pub order_id: u64,
    pub order_type: OrderType,
    pub price: Decimal,
    pub visible_quantity: i64,
    pub hidden_quantity: i64,
    pub parent_order_id: Option<String>,
    pub is_child_order: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgoExecution { pub order: ExecutionOrder }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub execution_id: String,
    pub order: ExecutionOrder,
    pub book: String,
    pub market: Market,
    pub trade: Trade,
}

// ---- Inquiries ----
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryState { Received, Quoted, Done, Rejected, CustomerRejected }
impl InquiryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InquiryState::Done | InquiryState::Rejected | InquiryState::CustomerRejected)
    }

    pub fn parse(s: &str) -> Result<Self, DeskError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RECEIVED" => Ok(InquiryState::Received),
            "QUOTED" => Ok(InquiryState::Quoted),
            "DONE" => Ok(InquiryState::Done),
            "REJECTED" => Ok(InquiryState::Rejected),
            "CUSTOMER_REJECTED" => Ok(InquiryState::CustomerRejected),
            other => Err(DeskError::parse(format!("unknown inquiry state {other:?}"))),
        }
    }
}
impl fmt::Display for InquiryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InquiryState::Received => "RECEIVED",
            InquiryState::Quoted => "QUOTED",
            InquiryState::Done => "DONE",
            InquiryState::Rejected => "REJECTED",
            InquiryState::CustomerRejected => "CUSTOMER_REJECTED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    pub inquiry_id: String,
    pub product: Bond,
    pub side: Side,
    pub quantity: i64,
    pub price: Decimal,
    pub state: InquiryState,
}

// ---- Store keys ----
impl Keyed<String> for Bond { fn key(&self) -> String { self.product_id.clone() } }
impl Keyed<String> for Trade { fn key(&self) -> String { self.trade_id.clone() } }
impl Keyed<String> for Position { fn key(&self) -> String { self.product.product_id.clone() } }
impl Keyed<String> for Pv01 { fn key(&self) -> String { self.product.product_id.clone() } }
impl Keyed<String> for Price { fn key(&self) -> String { self.product.product_id.clone() } }
impl Keyed<String> for PriceStream { fn key(&self) -> String { self.product.product_id.clone() } }
impl Keyed<String> for AlgoStream { fn key(&self) -> String { self.stream.product.product_id.clone() } }
impl Keyed<String> for OrderBook { fn key(&self) -> String { self.product.product_id.clone() } }
impl Keyed<String> for AlgoExecution { fn key(&self) -> String { self.order.product.product_id.clone() } }
impl Keyed<String> for Fill { fn key(&self) -> String { self.execution_id.clone() } }
impl Keyed<String> for Inquiry { fn key(&self) -> String { self.inquiry_id.clone() } }
