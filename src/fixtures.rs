// ===============================
// src/fixtures.rs (test-only builders)
// ===============================
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{Bond, BondIdType, Order, OrderBook, PricingSide, Side, Trade};

pub fn bond(id: &str) -> Bond {
    Bond {
        product_id: id.to_string(),
        id_type: BondIdType::Cusip,
        ticker: "T".into(),
        coupon: Decimal::new(1125, 3),
        maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
    }
}

pub fn trade(product: &str, id: &str, book: &str, qty: i64, side: Side) -> Trade {
    Trade {
        product: bond(product),
        trade_id: id.into(),
        book: book.into(),
        price: Decimal::from(100),
        quantity: qty,
        side,
    }
}

pub fn order(price: Decimal, quantity: i64, side: PricingSide) -> Order {
    Order { price, quantity, side }
}

pub fn book(product: &str, bids: &[Decimal], offers: &[Decimal]) -> OrderBook {
    OrderBook {
        product: bond(product),
        bid_stack: bids.iter().map(|p| order(*p, 1_000_000, PricingSide::Bid)).collect(),
        offer_stack: offers.iter().map(|p| order(*p, 1_000_000, PricingSide::Offer)).collect(),
    }
}
