// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : bond_desk - fixed-income desk data plane in Rust
Module  : config.rs
Version : 0.5.0
License : MIT (see LICENSE)

Summary : Replays trades, prices, market data and customer inquiries through
          synchronous pub/sub services (positions, PV01 risk, algo streaming,
          algo execution, inquiries) and writes an append-only audit log.
=============================================================================
*/
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use dotenvy::dotenv;
use rust_decimal::Decimal;

use crate::error::DeskError;

/// Paths and switches (CLI flag or ENV).
#[derive(Clone, Debug, Parser)]
#[command(name = "bond_desk", version, about = "Replay desk input files through the service pipelines")]
pub struct Args {
    /// Directory holding trades.txt, prices.txt, marketdata.txt, inquiries.txt
    #[arg(long, env = "INPUT_DIR", default_value = "input")]
    pub input_dir: PathBuf,

    /// Directory receiving the audit files
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Optional JSONL journal of every audit event
    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<PathBuf>,

    /// Optional Prometheus text snapshot written at shutdown
    #[arg(long, env = "METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Seed for stream quantities (random when absent)
    #[arg(long, env = "STREAM_SEED")]
    pub stream_seed: Option<u64>,

    /// Book algo fills back through trade booking
    #[arg(long, env = "BOOK_FILLS")]
    pub book_fills: bool,

    /// Fallback log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log: String,
}

/// Desk parameters (ENV only).
#[derive(Clone, Debug, PartialEq)]
pub struct DeskParams {
    pub pv01_per_unit: Decimal,
    pub max_visible_qty: i64,
    pub max_hidden_qty: i64,
    pub inquiry_quote_px: Decimal,
    pub books: Vec<String>,
}

impl Default for DeskParams {
    fn default() -> Self {
        Self {
            pv01_per_unit: Decimal::new(1, 4), // 0.0001
            max_visible_qty: 1_000_000,
            max_hidden_qty: 10_000_000,
            inquiry_quote_px: Decimal::from(100),
            books: vec!["TRSY1".into(), "TRSY2".into(), "TRSY3".into()],
        }
    }
}

impl DeskParams {
    pub fn from_env() -> Result<Self, DeskError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read parameters through `lookup`, keeping the default for missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeskError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(raw: Option<String>, default: T) -> T {
            raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
        }

        let d = Self::default();

        // BOOKS=TRSY1,TRSY2,TRSY3
        let books: Vec<String> = lookup("BOOKS")
            .map(|s| {
                s.split(',')
                    .map(|x| x.trim())
                    .filter(|x| !x.is_empty())
                    .map(|x| x.to_ascii_uppercase())
                    .collect()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or(d.books);

        let params = Self {
            pv01_per_unit: parsed(lookup("PV01_PER_UNIT"), d.pv01_per_unit),
            max_visible_qty: parsed(lookup("MAX_VISIBLE_QTY"), d.max_visible_qty),
            max_hidden_qty: parsed(lookup("MAX_HIDDEN_QTY"), d.max_hidden_qty),
            inquiry_quote_px: parsed(lookup("INQUIRY_QUOTE_PX"), d.inquiry_quote_px),
            books,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), DeskError> {
        if self.max_visible_qty < 1 {
            return Err(DeskError::Range(format!(
                "MAX_VISIBLE_QTY must be >= 1, got {}",
                self.max_visible_qty
            )));
        }
        if self.max_hidden_qty <= self.max_visible_qty {
            return Err(DeskError::Range(format!(
                "MAX_HIDDEN_QTY ({}) must exceed MAX_VISIBLE_QTY ({})",
                self.max_hidden_qty, self.max_visible_qty
            )));
        }
        if self.books.is_empty() {
            return Err(DeskError::Range("BOOKS must name at least one book".into()));
        }
        Ok(())
    }
}

/// Load `.env`, parse CLI/ENV arguments and desk parameters.
pub fn load() -> Result<(Args, DeskParams), DeskError> {
    // .env first so clap's `env =` fallbacks see it
    let _ = dotenv();
    let args = Args::parse();
    let params = DeskParams::from_env()?;
    Ok((args, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap as HashMap;
    use rust_decimal_macros::dec;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_desk() {
        let p = DeskParams::from_lookup(lookup(&[])).unwrap();
        assert_eq!(p, DeskParams::default());
        assert_eq!(p.pv01_per_unit, dec!(0.0001));
    }

    #[test]
    fn env_values_override_and_books_are_normalised() {
        let p = DeskParams::from_lookup(lookup(&[
            ("PV01_PER_UNIT", "0.00025"),
            ("MAX_VISIBLE_QTY", "10"),
            ("MAX_HIDDEN_QTY", "20"),
            ("BOOKS", " trsy1 , ,trsy2"),
        ]))
        .unwrap();
        assert_eq!(p.pv01_per_unit, dec!(0.00025));
        assert_eq!((p.max_visible_qty, p.max_hidden_qty), (10, 20));
        assert_eq!(p.books, vec!["TRSY1".to_string(), "TRSY2".to_string()]);
    }

    #[test]
    fn hidden_must_exceed_visible() {
        let err = DeskParams::from_lookup(lookup(&[("MAX_VISIBLE_QTY", "50"), ("MAX_HIDDEN_QTY", "50")]));
        assert!(matches!(err, Err(DeskError::Range(_))));
    }

    #[test]
    fn args_parse_from_the_command_line() {
        let args = Args::try_parse_from([
            "bond_desk",
            "--input-dir",
            "data/in",
            "--stream-seed",
            "7",
            "--book-fills",
        ])
        .unwrap();
        assert_eq!(args.input_dir, PathBuf::from("data/in"));
        assert_eq!(args.stream_seed, Some(7));
        assert!(args.book_fills);
    }
}
