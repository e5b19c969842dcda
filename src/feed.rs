// ===============================
// src/feed.rs (file connectors)
// ===============================
//
// One connector per input file:
// - trades.txt     : CUSIP,TradeID,Book,Price,Quantity,Side          -> trade booking
// - prices.txt     : CUSIP,Mid,BidOfferSpread                         -> pricing
// - marketdata.txt : CUSIP,(BidPx,Qty)x5,(OfferPx,Qty)x5              -> market data
// - inquiries.txt  : CUSIP,Side,Quantity,Price,State                  -> inquiries
//
// First line is a header. Fields are trimmed and one trailing empty field is
// tolerated. A bad record is logged with its line number, counted and skipped.
//
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::{fs, io};
use tracing::{info, warn};

use crate::domain::{Inquiry, InquiryState, Order, OrderBook, Price, PricingSide, Side, Trade};
use crate::error::DeskError;
use crate::inquiry::InquiryService;
use crate::market_data::MarketDataService;
use crate::metrics::RECORDS;
use crate::pricing::PricingService;
use crate::products::ProductService;
use crate::tick;
use crate::trade_booking::TradeBookingService;

pub const TRADES_FILE: &str = "trades.txt";
pub const PRICES_FILE: &str = "prices.txt";
pub const MARKET_DATA_FILE: &str = "marketdata.txt";
pub const INQUIRIES_FILE: &str = "inquiries.txt";

/// Levels per side in a market-data record.
pub const BOOK_DEPTH: usize = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub read: usize,
    pub accepted: usize,
    pub skipped: usize,
}

/// Parses one record shape and hands it to a service entry point.
pub trait Connector {
    /// Feed label used in logs and metrics.
    fn feed(&self) -> &'static str;

    fn fields(&self) -> usize;

    fn on_record(&mut self, fields: &[&str]) -> Result<(), DeskError>;
}

fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>, DeskError> {
    let mut fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() == expected + 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    if fields.len() != expected {
        return Err(DeskError::parse(format!("expected {expected} fields, got {}", fields.len())));
    }
    Ok(fields)
}

fn quantity(raw: &str) -> Result<i64, DeskError> {
    let q = match raw.parse::<i64>() {
        Ok(q) => q,
        // generators sometimes write 1000000.0
        Err(_) => Decimal::from_str(raw)
            .ok()
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_i64())
            .ok_or_else(|| DeskError::parse(format!("bad quantity {raw:?}")))?,
    };
    if q < 0 {
        return Err(DeskError::parse(format!("negative quantity {raw:?}")));
    }
    Ok(q)
}

/// Tick notation when the field has a '-', plain decimal otherwise.
fn tick_or_decimal(raw: &str) -> Result<Decimal, DeskError> {
    if raw.contains('-') {
        tick::decode(raw)
    } else {
        Decimal::from_str(raw).map_err(|e| DeskError::parse(format!("bad price {raw:?} ({e})")))
    }
}

/// Run every record after the header through `connector`.
pub fn ingest<C: Connector>(text: &str, connector: &mut C) -> IngestReport {
    let feed = connector.feed();
    let mut report = IngestReport::default();

    for (idx, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        report.read += 1;
        let outcome = split_fields(line, connector.fields()).and_then(|f| connector.on_record(&f));
        match outcome {
            Ok(()) => {
                report.accepted += 1;
                RECORDS.with_label_values(&[feed, "accepted"]).inc();
            }
            Err(e) => {
                report.skipped += 1;
                RECORDS.with_label_values(&[feed, "skipped"]).inc();
                warn!(feed, line = idx + 1, error = %e, "record skipped");
            }
        }
    }
    report
}

/// Read `path` and ingest it.
pub async fn subscribe<C: Connector>(path: &Path, connector: &mut C) -> io::Result<IngestReport> {
    let text = fs::read_to_string(path).await?;
    let report = ingest(&text, connector);
    info!(
        feed = connector.feed(),
        path = %path.display(),
        read = report.read,
        accepted = report.accepted,
        skipped = report.skipped,
        "feed done"
    );
    Ok(report)
}

// -------- trades.txt --------
pub struct TradeConnector<'a> {
    products: &'a ProductService,
    booking: Rc<RefCell<TradeBookingService>>,
}

impl<'a> TradeConnector<'a> {
    pub fn new(products: &'a ProductService, booking: Rc<RefCell<TradeBookingService>>) -> Self {
        Self { products, booking }
    }
}

impl Connector for TradeConnector<'_> {
    fn feed(&self) -> &'static str {
        "trades"
    }

    fn fields(&self) -> usize {
        6
    }

    fn on_record(&mut self, f: &[&str]) -> Result<(), DeskError> {
        let trade = Trade {
            product: self.products.get(f[0])?.clone(),
            trade_id: f[1].to_string(),
            book: f[2].to_string(),
            price: tick::decode(f[3])?,
            quantity: quantity(f[4])?,
            side: Side::parse(f[5])?,
        };
        self.booking.borrow_mut().book_trade(trade)
    }
}

// -------- prices.txt --------
pub struct PriceConnector<'a> {
    products: &'a ProductService,
    pricing: Rc<RefCell<PricingService>>,
}

impl<'a> PriceConnector<'a> {
    pub fn new(products: &'a ProductService, pricing: Rc<RefCell<PricingService>>) -> Self {
        Self { products, pricing }
    }
}

impl Connector for PriceConnector<'_> {
    fn feed(&self) -> &'static str {
        "prices"
    }

    fn fields(&self) -> usize {
        3
    }

    fn on_record(&mut self, f: &[&str]) -> Result<(), DeskError> {
        let price = Price {
            product: self.products.get(f[0])?.clone(),
            mid: tick::decode(f[1])?,
            bid_offer_spread: tick::decode(f[2])?,
        };
        self.pricing.borrow_mut().on_message(price)
    }
}

// -------- marketdata.txt --------
pub struct MarketDataConnector<'a> {
    products: &'a ProductService,
    market_data: Rc<RefCell<MarketDataService>>,
}

impl<'a> MarketDataConnector<'a> {
    pub fn new(products: &'a ProductService, market_data: Rc<RefCell<MarketDataService>>) -> Self {
        Self { products, market_data }
    }
}

fn levels(pairs: &[&str], side: PricingSide) -> Result<Vec<Order>, DeskError> {
    pairs
        .chunks_exact(2)
        .map(|p| Ok(Order { price: tick::decode(p[0])?, quantity: quantity(p[1])?, side }))
        .collect()
}

impl Connector for MarketDataConnector<'_> {
    fn feed(&self) -> &'static str {
        "marketdata"
    }

    fn fields(&self) -> usize {
        1 + 4 * BOOK_DEPTH
    }

    fn on_record(&mut self, f: &[&str]) -> Result<(), DeskError> {
        let (bids, offers) = f[1..].split_at(2 * BOOK_DEPTH);
        let snapshot = OrderBook {
            product: self.products.get(f[0])?.clone(),
            bid_stack: levels(bids, PricingSide::Bid)?,
            offer_stack: levels(offers, PricingSide::Offer)?,
        };
        self.market_data.borrow_mut().ingest(snapshot)
    }
}

// -------- inquiries.txt --------
pub struct InquiryConnector<'a> {
    products: &'a ProductService,
    inquiries: Rc<RefCell<InquiryService>>,
    issued: u64,
}

impl<'a> InquiryConnector<'a> {
    pub fn new(products: &'a ProductService, inquiries: Rc<RefCell<InquiryService>>) -> Self {
        Self { products, inquiries, issued: 0 }
    }
}

impl Connector for InquiryConnector<'_> {
    fn feed(&self) -> &'static str {
        "inquiries"
    }

    fn fields(&self) -> usize {
        5
    }

    fn on_record(&mut self, f: &[&str]) -> Result<(), DeskError> {
        let product = self.products.get(f[0])?.clone();
        let side = Side::parse(f[1])?;
        let quantity = quantity(f[2])?;
        let price = tick_or_decimal(f[3])?;
        let state = match InquiryState::parse(f[4])? {
            InquiryState::Received => InquiryState::Quoted,
            other => other,
        };

        self.issued += 1;
        let inquiry = Inquiry { inquiry_id: format!("INQ{}", self.issued), product, side, quantity, price, state };
        self.inquiries.borrow_mut().on_message(inquiry)
    }
}
