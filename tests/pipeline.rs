// End-to-end replay: input files in, audit files out.
use std::fs;
use std::path::Path;
use std::str::FromStr;

use bond_desk::config::DeskParams;
use bond_desk::desk::{Desk, Wiring};
use bond_desk::recorder;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

const PRICES: &str = "CUSIP,Mid,BidOfferSpread
3137EAED7,99-16+,0-002
";

const MARKET_DATA: &str = "CUSIP,Bids,Offers
3137EAEB1,99-310,1000000,99-307,2000000,99-306,3000000,99-305,4000000,99-304,5000000,99-314,1000000,99-315,2000000,99-316,3000000,99-317,4000000,100-000,5000000
";

const TRADES: &str = "CUSIP,TradeID,Book,Price,Quantity,Side
3137EAED7,T1,TRSY1,99-16+,1000000,BUY
3137EAEB1,T2,TRSY2,99-000,2000000,BUY
3137EAEC9,T3,TRSY3,100-01+,500000,SELL
3137EADB2,T4,TRSY1,99-31+,500000,BUY
3134A3U46,T5,TRSY2,100-000,1000000,BUY
3134A4KX1,T6,TRSY3,99-080,250000,BUY
3134A4KX1,T6,TRSY3,99-080,250000,BUY
";

const INQUIRIES: &str = "CUSIP,Side,Quantity,Price,State
3134A4KX1,BUY,1000000,99-16+,RECEIVED
3137EAED7,SELL,2000000,100.5,RECEIVED,
";

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

fn bucket(line: &str, name: &str) -> Decimal {
    let prefix = format!("BUCKET {name} risk=");
    Decimal::from_str(line.strip_prefix(&prefix).unwrap()).unwrap()
}

#[tokio::test]
async fn replay_writes_every_audit_stream() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("prices.txt"), PRICES).unwrap();
    fs::write(input.join("marketdata.txt"), MARKET_DATA).unwrap();
    fs::write(input.join("trades.txt"), TRADES).unwrap();
    fs::write(input.join("inquiries.txt"), INQUIRIES).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(recorder::run(rx, output.clone(), None));
    let desk = Desk::new(DeskParams::default(), Wiring { stream_seed: Some(7), book_fills: false }, Some(tx)).unwrap();

    let reports = desk.replay(&input).await;
    let summary: Vec<_> = reports.iter().map(|(f, r)| (*f, r.accepted, r.skipped)).collect();
    assert_eq!(
        summary,
        vec![("prices", 1, 0), ("marketdata", 1, 0), ("trades", 6, 1), ("inquiries", 2, 0)]
    );
    assert_eq!(desk.report_bucket_risk().len(), 3);

    drop(desk);
    let recorded = task.await.unwrap().unwrap();
    assert_eq!(recorded, 6 + 3 + 1 + 1 + 2);

    let risk = lines(&output.join("risk.txt"));
    assert_eq!(risk.len(), 9);
    assert!(risk[0].starts_with("PV01 3137EAED7 "));
    assert_eq!(bucket(&risk[6], "FrontEnd"), dec!(300));
    assert_eq!(bucket(&risk[7], "Belly"), Decimal::ZERO);
    assert_eq!(bucket(&risk[8], "LongEnd"), dec!(125));

    let executions = lines(&output.join("executions.txt"));
    assert_eq!(executions.len(), 1);
    assert!(executions[0].starts_with("EXEC EX-1 3137EAEB1 order=0 MARKET BID px=99-310"));
    assert!(executions[0].ends_with("book=TRSY1 market=CME"));

    let streams = lines(&output.join("streaming.txt"));
    assert_eq!(streams.len(), 1);
    assert!(streams[0].starts_with("STREAM 3137EAED7 BID 99-162 "));

    let inquiries = lines(&output.join("allinquiries.txt"));
    assert_eq!(inquiries.len(), 2);
    assert_eq!(inquiries[0], "INQUIRY INQ1 3134A4KX1 BUY qty=1000000 px=100-000 state=DONE");
    assert!(inquiries[1].starts_with("INQUIRY INQ2 3137EAED7 SELL"));
}

#[tokio::test]
async fn missing_inputs_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trades.txt"), TRADES).unwrap();

    let desk = Desk::new(DeskParams::default(), Wiring::default(), None).unwrap();
    let reports = desk.replay(dir.path()).await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "trades");
    assert_eq!(desk.positions.borrow().aggregate_position("3137EAEC9").unwrap(), -500_000);
}
