// ===============================
// src/products.rs (bond reference data)
// ===============================
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{Bond, BondIdType, BucketedSector};
use crate::error::DeskError;
use crate::service::KeyedService;

/// (CUSIP, coupon in percent as mantissa/scale, maturity)
const TREASURIES: [(&str, i64, u32, (i32, u32, u32)); 6] = [
    ("3137EAED7", 8775, 4, (2018, 10, 12)),
    ("3137EAEB1", 875, 3, (2019, 7, 19)),
    ("3137EAEC9", 1125, 3, (2021, 11, 12)),
    ("3137EADB2", 2375, 3, (2022, 1, 13)),
    ("3134A3U46", 675, 2, (2029, 11, 15)),
    ("3134A4KX1", 625, 2, (2032, 7, 15)),
];

pub struct ProductService {
    bonds: KeyedService<String, Bond>,
}

impl ProductService {
    pub fn new() -> Self {
        Self { bonds: KeyedService::new("product") }
    }

    /// The six treasuries the desk trades.
    pub fn with_treasuries() -> Self {
        let mut svc = Self::new();
        for (cusip, mantissa, scale, (y, m, d)) in TREASURIES {
            // dates in TREASURIES are valid calendar days
            if let Some(maturity) = NaiveDate::from_ymd_opt(y, m, d) {
                svc.add(Bond {
                    product_id: cusip.to_string(),
                    id_type: BondIdType::Cusip,
                    ticker: "T".to_string(),
                    coupon: Decimal::new(mantissa, scale),
                    maturity,
                });
            }
        }
        svc
    }

    pub fn add(&mut self, bond: Bond) {
        self.bonds.put(bond);
    }

    pub fn get(&self, cusip: &str) -> Result<&Bond, DeskError> {
        self.bonds.get(&cusip.to_string())
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Bonds ordered by maturity.
    pub fn by_maturity(&self) -> Vec<Bond> {
        let mut all: Vec<Bond> = self.bonds.values().cloned().collect();
        all.sort_by(|a, b| a.maturity.cmp(&b.maturity).then_with(|| a.product_id.cmp(&b.product_id)));
        all
    }

    /// FrontEnd / Belly / LongEnd, two bonds each by maturity.
    pub fn default_buckets(&self) -> Vec<BucketedSector> {
        let all = self.by_maturity();
        ["FrontEnd", "Belly", "LongEnd"]
            .iter()
            .zip(all.chunks(2))
            .map(|(name, chunk)| BucketedSector { name: name.to_string(), products: chunk.to_vec() })
            .collect()
    }
}

impl Default for ProductService {
    fn default() -> Self {
        Self::new()
    }
}
