// ===============================
// src/recorder.rs (audit sink)
// ===============================
//
// Audit listeners push events onto an unbounded channel; this task drains it:
// - one human-readable line per event, appended to the event's stream file
//   (risk.txt, executions.txt, streaming.txt, allinquiries.txt)
// - optional JSONL journal of every event (RECORD_FILE)
// - BufWriter per file, flushed every second, every 1000 events and on close
// - on a failed write the file is reopened and the line retried once
//
use std::path::{Path, PathBuf};

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{self, AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::domain::{Fill, Inquiry, PriceStream, Pv01};
use crate::error::DeskError;
use crate::service::ServiceListener;
use crate::tick;

pub const RISK_FILE: &str = "risk.txt";
pub const EXECUTIONS_FILE: &str = "executions.txt";
pub const STREAMING_FILE: &str = "streaming.txt";
pub const INQUIRIES_FILE: &str = "allinquiries.txt";

const FLUSH_EVERY_N_EVENTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    Risk(Pv01),
    BucketRisk { name: String, risk: Decimal },
    Execution(Fill),
    Stream(PriceStream),
    Inquiry(Inquiry),
}

/// Journal line: the event plus the time the recorder saw it.
#[derive(Serialize)]
struct Journaled<'a> {
    ts: DateTime<Utc>,
    event: &'a AuditEvent,
}

/// Tick notation when the price sits on the 256 grid, plain decimal otherwise.
fn px(price: Decimal) -> String {
    tick::encode(price).unwrap_or_else(|_| price.to_string())
}

impl AuditEvent {
    pub fn stream_file(&self) -> &'static str {
        match self {
            AuditEvent::Risk(_) | AuditEvent::BucketRisk { .. } => RISK_FILE,
            AuditEvent::Execution(_) => EXECUTIONS_FILE,
            AuditEvent::Stream(_) => STREAMING_FILE,
            AuditEvent::Inquiry(_) => INQUIRIES_FILE,
        }
    }

    pub fn line(&self) -> String {
        match self {
            AuditEvent::Risk(p) => format!(
                "PV01 {} pv01={} qty={} risk={}",
                p.product.product_id,
                p.pv01,
                p.quantity,
                p.risk().map_or_else(|_| "overflow".to_string(), |r| r.to_string())
            ),
            AuditEvent::BucketRisk { name, risk } => format!("BUCKET {name} risk={risk}"),
            AuditEvent::Execution(f) => format!(
                "EXEC {} {} order={} {} {} px={} visible={} hidden={} book={} market={}",
                f.execution_id,
                f.order.product.product_id,
                f.order.order_id,
                f.order.order_type,
                f.order.side,
                px(f.order.price),
                f.order.visible_quantity,
                f.order.hidden_quantity,
                f.book,
                f.market
            ),
            AuditEvent::Stream(s) => format!(
                "STREAM {} BID {} {}/{} OFFER {} {}/{}",
                s.product.product_id,
                px(s.bid.price),
                s.bid.visible_quantity,
                s.bid.hidden_quantity,
                px(s.offer.price),
                s.offer.visible_quantity,
                s.offer.hidden_quantity
            ),
            AuditEvent::Inquiry(i) => format!(
                "INQUIRY {} {} {} qty={} px={} state={}",
                i.inquiry_id,
                i.product.product_id,
                i.side,
                i.quantity,
                px(i.price),
                i.state
            ),
        }
    }
}

/// Values the audit sink knows how to record.
pub trait Audited {
    fn audit_event(&self) -> AuditEvent;
}

impl Audited for Pv01 {
    fn audit_event(&self) -> AuditEvent {
        AuditEvent::Risk(self.clone())
    }
}

impl Audited for Fill {
    fn audit_event(&self) -> AuditEvent {
        AuditEvent::Execution(self.clone())
    }
}

impl Audited for PriceStream {
    fn audit_event(&self) -> AuditEvent {
        AuditEvent::Stream(self.clone())
    }
}

impl Audited for Inquiry {
    fn audit_event(&self) -> AuditEvent {
        AuditEvent::Inquiry(self.clone())
    }
}

/// Terminal listener: forwards adds and updates to the recorder task.
#[derive(Clone)]
pub struct AuditListener {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditListener {
    pub fn new(tx: mpsc::UnboundedSender<AuditEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            warn!("recorder: channel closed, audit event dropped");
        }
    }
}

impl<V: Audited> ServiceListener<V> for AuditListener {
    fn process_add(&self, data: &V) -> Result<(), DeskError> {
        self.send(data.audit_event());
        Ok(())
    }

    fn process_update(&self, data: &V) -> Result<(), DeskError> {
        self.send(data.audit_event());
        Ok(())
    }
}

async fn open_writer(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path).await?;
    Ok(BufWriter::new(file))
}

struct Sink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Sink {
    async fn open(path: PathBuf) -> io::Result<Self> {
        let writer = open_writer(&path).await?;
        Ok(Self { path, writer })
    }

    async fn write_line(&mut self, line: &str) {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        if let Err(e) = self.writer.write_all(&buf).await {
            error!(?e, path = %self.path.display(), "recorder: write failed, attempting reopen");
            match open_writer(&self.path).await {
                Ok(w) => {
                    self.writer = w;
                    if let Err(e2) = self.writer.write_all(&buf).await {
                        error!(?e2, path = %self.path.display(), "recorder: write failed again after reopen, drop line");
                    }
                }
                Err(e2) => error!(?e2, path = %self.path.display(), "recorder: reopen failed, drop line"),
            }
        }
    }

    async fn flush(&mut self) {
        if let Err(e) = self.writer.flush().await {
            error!(?e, path = %self.path.display(), "recorder: flush failed");
        }
    }
}

/// Drain `rx` into the audit files until every sender is dropped.
/// Returns the number of events recorded.
pub async fn run(
    mut rx: mpsc::UnboundedReceiver<AuditEvent>,
    output_dir: PathBuf,
    record_file: Option<PathBuf>,
) -> io::Result<u64> {
    fs::create_dir_all(&output_dir).await?;

    let mut sinks: HashMap<&'static str, Sink> = HashMap::new();
    for name in [RISK_FILE, EXECUTIONS_FILE, STREAMING_FILE, INQUIRIES_FILE] {
        sinks.insert(name, Sink::open(output_dir.join(name)).await?);
    }
    let mut journal = match record_file {
        Some(path) => Some(Sink::open(path).await?),
        None => None,
    };
    info!(dir = %output_dir.display(), journal = journal.is_some(), "recorder: started");

    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut since_last_flush: u32 = 0;
    let mut recorded: u64 = 0;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                match maybe_ev {
                    Some(ev) => {
                        if let Some(sink) = sinks.get_mut(ev.stream_file()) {
                            sink.write_line(&ev.line()).await;
                        }
                        if let Some(j) = journal.as_mut() {
                            match serde_json::to_string(&Journaled { ts: Utc::now(), event: &ev }) {
                                Ok(s) => j.write_line(&s).await,
                                Err(e) => error!(?e, "recorder: serialize error, skip journal line"),
                            }
                        }
                        recorded += 1;

                        since_last_flush += 1;
                        if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                            for sink in sinks.values_mut().chain(journal.as_mut()) {
                                sink.flush().await;
                            }
                            since_last_flush = 0;
                        }
                    }
                    None => {
                        for sink in sinks.values_mut().chain(journal.as_mut()) {
                            sink.flush().await;
                        }
                        info!(recorded, "recorder: channel closed, stopped");
                        break;
                    }
                }
            }

            _ = tick.tick() => {
                for sink in sinks.values_mut().chain(journal.as_mut()) {
                    sink.flush().await;
                }
                since_last_flush = 0;
            }
        }
    }
    Ok(recorded)
}
