// ===============================
// src/desk.rs (service graph + wiring)
// ===============================
//
// Owns one instance of every service and registers the listeners that chain
// them into four pipelines:
//   trades      -> booking -> positions -> risk       -> audit
//   prices      -> pricing -> algo streaming -> streaming -> audit
//   market data -> books   -> algo execution -> execution -> audit (-> booking)
//   inquiries   -> inquiry                            -> audit
//
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::algo_execution::{AlgoExecutionListener, AlgoExecutionService};
use crate::algo_streaming::{AlgoStreamingListener, AlgoStreamingService};
use crate::config::DeskParams;
use crate::domain::BucketedSector;
use crate::error::DeskError;
use crate::execution::{ExecutionService, FillBookingListener};
use crate::feed::{self, Connector, IngestReport};
use crate::inquiry::InquiryService;
use crate::market_data::{MarketDataListener, MarketDataService};
use crate::positions::{PositionListener, PositionService};
use crate::pricing::{PricingListener, PricingService};
use crate::products::ProductService;
use crate::recorder::{AuditEvent, AuditListener};
use crate::risk::RiskService;
use crate::streaming::StreamingService;
use crate::trade_booking::{TradeBookingListener, TradeBookingService};

/// Switches that change the wiring rather than a service.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    pub stream_seed: Option<u64>,
    pub book_fills: bool,
}

pub struct Desk {
    pub params: DeskParams,
    pub products: ProductService,
    pub trade_booking: Rc<RefCell<TradeBookingService>>,
    pub positions: Rc<RefCell<PositionService>>,
    pub risk: Rc<RefCell<RiskService>>,
    pub pricing: Rc<RefCell<PricingService>>,
    pub algo_streaming: Rc<RefCell<AlgoStreamingService>>,
    pub streaming: Rc<RefCell<StreamingService>>,
    pub market_data: Rc<RefCell<MarketDataService>>,
    pub algo_execution: Rc<RefCell<AlgoExecutionService>>,
    pub execution: Rc<RefCell<ExecutionService>>,
    pub inquiries: Rc<RefCell<InquiryService>>,
    audit: Option<mpsc::UnboundedSender<AuditEvent>>,
}

fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

impl Desk {
    /// Build every service and register listeners. `audit` is `None` when nothing records.
    pub fn new(
        params: DeskParams,
        wiring: Wiring,
        audit: Option<mpsc::UnboundedSender<AuditEvent>>,
    ) -> Result<Self, DeskError> {
        params.validate()?;

        let desk = Self {
            products: ProductService::with_treasuries(),
            trade_booking: shared(TradeBookingService::new()),
            positions: shared(PositionService::new(params.books.clone())),
            risk: shared(RiskService::new(params.pv01_per_unit)),
            pricing: shared(PricingService::new()),
            algo_streaming: shared(AlgoStreamingService::new(
                params.max_visible_qty,
                params.max_hidden_qty,
                wiring.stream_seed,
            )?),
            streaming: shared(StreamingService::new()),
            market_data: shared(MarketDataService::new()),
            algo_execution: shared(AlgoExecutionService::new()),
            execution: shared(ExecutionService::new(params.books.clone())?),
            inquiries: shared(InquiryService::new(params.inquiry_quote_px)),
            audit,
            params,
        };

        // trades -> positions -> risk
        desk.trade_booking
            .borrow_mut()
            .add_listener(Rc::new(TradeBookingListener::new(desk.positions.clone())));
        desk.positions
            .borrow_mut()
            .add_listener(Rc::new(PositionListener::new(desk.risk.clone())));

        // prices -> streams
        desk.pricing
            .borrow_mut()
            .add_listener(Rc::new(PricingListener::new(desk.algo_streaming.clone())));
        desk.algo_streaming
            .borrow_mut()
            .add_listener(Rc::new(AlgoStreamingListener::new(desk.streaming.clone())));

        // market data -> executions
        desk.market_data
            .borrow_mut()
            .add_listener(Rc::new(MarketDataListener::new(desk.algo_execution.clone())));
        desk.algo_execution
            .borrow_mut()
            .add_listener(Rc::new(AlgoExecutionListener::new(desk.execution.clone())));

        // audit listeners go after the forwarding ones
        if let Some(tx) = &desk.audit {
            let audit = Rc::new(AuditListener::new(tx.clone()));
            desk.risk.borrow_mut().add_listener(audit.clone());
            desk.streaming.borrow_mut().add_listener(audit.clone());
            desk.execution.borrow_mut().add_listener(audit.clone());
            desk.inquiries.borrow_mut().add_listener(audit);
        }

        if wiring.book_fills {
            desk.execution
                .borrow_mut()
                .add_listener(Rc::new(FillBookingListener::new(desk.trade_booking.clone())));
        }

        info!(
            products = desk.products.len(),
            books = ?desk.params.books,
            book_fills = wiring.book_fills,
            audit = desk.audit.is_some(),
            "desk wired"
        );
        Ok(desk)
    }

    /// Replay the four input files found in `input_dir`: prices, market data,
    /// trades, inquiries. A missing file is logged and skipped.
    pub async fn replay(&self, input_dir: &Path) -> Vec<(&'static str, IngestReport)> {
        let mut reports = Vec::with_capacity(4);

        let mut prices = feed::PriceConnector::new(&self.products, self.pricing.clone());
        reports.extend(run_feed(&input_dir.join(feed::PRICES_FILE), &mut prices).await);

        let mut market_data = feed::MarketDataConnector::new(&self.products, self.market_data.clone());
        reports.extend(run_feed(&input_dir.join(feed::MARKET_DATA_FILE), &mut market_data).await);

        let mut trades = feed::TradeConnector::new(&self.products, self.trade_booking.clone());
        reports.extend(run_feed(&input_dir.join(feed::TRADES_FILE), &mut trades).await);

        let mut inquiries = feed::InquiryConnector::new(&self.products, self.inquiries.clone());
        reports.extend(run_feed(&input_dir.join(feed::INQUIRIES_FILE), &mut inquiries).await);

        reports
    }

    /// Bucketed PV01 for each default bucket. Failed buckets are logged and left out;
    /// the rest go to the audit sink.
    pub fn report_bucket_risk(&self) -> Vec<(BucketedSector, Decimal)> {
        let risk = self.risk.borrow();
        let mut out = Vec::new();
        for sector in self.products.default_buckets() {
            match risk.bucketed_risk(&sector) {
                Ok(total) => {
                    info!(bucket = %sector.name, risk = %total, "bucket risk");
                    if let Some(tx) = &self.audit {
                        if tx.send(AuditEvent::BucketRisk { name: sector.name.clone(), risk: total }).is_err() {
                            warn!(bucket = %sector.name, "recorder: channel closed, bucket risk dropped");
                        }
                    }
                    out.push((sector, total));
                }
                Err(e) => warn!(bucket = %sector.name, error = %e, "bucket risk skipped"),
            }
        }
        out
    }
}

async fn run_feed<C: Connector>(path: &Path, connector: &mut C) -> Option<(&'static str, IngestReport)> {
    match feed::subscribe(path, connector).await {
        Ok(report) => Some((connector.feed(), report)),
        Err(e) => {
            error!(?e, path = %path.display(), feed = connector.feed(), "feed file unreadable, skipped");
            None
        }
    }
}
