// ===============================
// src/risk.rs (PV01 per product and per bucket)
// ===============================
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Bond, BucketedSector, Position, Pv01};
use crate::error::DeskError;
use crate::service::{KeyedService, Listener};

pub struct RiskService {
    risk: KeyedService<String, Pv01>,
    pv01_per_unit: Decimal,
}

impl RiskService {
    pub fn new(pv01_per_unit: Decimal) -> Self {
        Self { risk: KeyedService::new("pv01"), pv01_per_unit }
    }

    /// PV01 per unit of face. A flat policy value for every bond.
    pub fn pv01_for(&self, _product: &Bond) -> Decimal {
        self.pv01_per_unit
    }

    /// Recompute the product's PV01 from the position's aggregate and publish it.
    pub fn add_position(&mut self, position: &Position) -> Result<(), DeskError> {
        let pv01 = Pv01 {
            product: position.product.clone(),
            pv01: self.pv01_for(&position.product),
            quantity: position.aggregate()?,
        };
        let risk = pv01.risk()?;
        debug!(product = %pv01.product.product_id, quantity = pv01.quantity, %risk, "pv01 updated");
        self.risk.publish(pv01)
    }

    pub fn get(&self, product_id: &str) -> Result<&Pv01, DeskError> {
        self.risk.get(&product_id.to_string())
    }

    /// Sum of PV01 x quantity over the bucket. Pure read: nothing is published.
    /// A bucket member without a PV01 entry is an error, not a zero.
    pub fn bucketed_risk(&self, sector: &BucketedSector) -> Result<Decimal, DeskError> {
        sector
            .products
            .iter()
            .try_fold(Decimal::ZERO, |acc, bond| {
                acc.checked_add(self.get(&bond.product_id)?.risk()?)
                    .ok_or_else(|| DeskError::Range(format!("bucket {} risk overflows", sector.name)))
            })
    }

    pub fn add_listener(&mut self, listener: Listener<Pv01>) {
        self.risk.add_listener(listener);
    }
}
