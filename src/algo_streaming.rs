// ===============================
// src/algo_streaming.rs (mid/spread -> two-way stream)
// ===============================
use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{AlgoStream, Price, PriceStream, PriceStreamOrder, PricingSide};
use crate::error::DeskError;
use crate::service::{KeyedService, Listener, ServiceListener};
use crate::streaming::StreamingService;

pub struct AlgoStreamingService {
    streams: KeyedService<String, AlgoStream>,
    rng: StdRng,
    max_visible: i64,
    max_hidden: i64,
}

impl AlgoStreamingService {
    /// `seed` makes stream quantities reproducible; `None` draws from entropy.
    pub fn new(max_visible: i64, max_hidden: i64, seed: Option<u64>) -> Result<Self, DeskError> {
        if max_visible < 1 || max_hidden <= max_visible {
            return Err(DeskError::Range(format!(
                "stream quantities need 1 <= max_visible < max_hidden, got {max_visible}/{max_hidden}"
            )));
        }
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self { streams: KeyedService::new("algo_stream"), rng, max_visible, max_hidden })
    }

    fn stream_order(&mut self, price: Decimal, side: PricingSide) -> PriceStreamOrder {
        let visible_quantity = self.rng.gen_range(1..=self.max_visible);
        let hidden_quantity = self.rng.gen_range(visible_quantity + 1..=self.max_hidden);
        PriceStreamOrder { price, visible_quantity, hidden_quantity, side }
    }

    /// Quote `mid - spread` / `mid + spread` with fresh random sizes, store and publish.
    pub fn convert(&mut self, price: &Price) -> Result<PriceStream, DeskError> {
        let bid = self.stream_order(price.mid - price.bid_offer_spread, PricingSide::Bid);
        let offer = self.stream_order(price.mid + price.bid_offer_spread, PricingSide::Offer);
        let stream = PriceStream { product: price.product.clone(), bid, offer };

        debug!(product = %stream.product.product_id, bid = %stream.bid.price, offer = %stream.offer.price, "algo stream");
        self.streams.publish(AlgoStream { stream: stream.clone() })?;
        Ok(stream)
    }

    pub fn get(&self, product_id: &str) -> Result<&AlgoStream, DeskError> {
        self.streams.get(&product_id.to_string())
    }

    pub fn add_listener(&mut self, listener: Listener<AlgoStream>) {
        self.streams.add_listener(listener);
    }
}

/// Hands every algo stream to the streaming service.
pub struct AlgoStreamingListener {
    streaming: Rc<RefCell<StreamingService>>,
}

impl AlgoStreamingListener {
    pub fn new(streaming: Rc<RefCell<StreamingService>>) -> Self {
        Self { streaming }
    }
}

impl ServiceListener<AlgoStream> for AlgoStreamingListener {
    fn process_add(&self, data: &AlgoStream) -> Result<(), DeskError> {
        self.streaming.borrow_mut().publish_price(data.stream.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::bond;
    use rust_decimal_macros::dec;

    fn price(mid: Decimal, spread: Decimal) -> Price {
        Price { product: bond("P1"), mid, bid_offer_spread: spread }
    }

    #[test]
    fn two_way_prices_straddle_the_mid() {
        let mut svc = AlgoStreamingService::new(1_000_000, 10_000_000, Some(1)).unwrap();
        let s = svc.convert(&price(dec!(99.5), dec!(0.0078125))).unwrap();
        assert_eq!(s.bid.price, dec!(99.4921875));
        assert_eq!(s.offer.price, dec!(99.5078125));
        assert_eq!((s.bid.side, s.offer.side), (PricingSide::Bid, PricingSide::Offer));
    }

    #[test]
    fn quantities_stay_in_range_and_hidden_exceeds_visible() {
        let mut svc = AlgoStreamingService::new(10, 20, Some(42)).unwrap();
        for _ in 0..500 {
            let s = svc.convert(&price(dec!(100), dec!(0.015625))).unwrap();
            for o in [&s.bid, &s.offer] {
                assert!((1..=10).contains(&o.visible_quantity));
                assert!(o.hidden_quantity > o.visible_quantity && o.hidden_quantity <= 20);
            }
        }
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut a = AlgoStreamingService::new(1_000, 5_000, Some(7)).unwrap();
        let mut b = AlgoStreamingService::new(1_000, 5_000, Some(7)).unwrap();
        let p = price(dec!(101), dec!(0.03125));
        for _ in 0..10 {
            assert_eq!(a.convert(&p).unwrap(), b.convert(&p).unwrap());
        }
    }

    #[test]
    fn hidden_cap_must_exceed_visible_cap() {
        assert!(matches!(AlgoStreamingService::new(10, 10, None), Err(DeskError::Range(_))));
        assert!(matches!(AlgoStreamingService::new(0, 10, None), Err(DeskError::Range(_))));
    }

    #[test]
    fn listener_forwards_to_streaming() {
        let streaming = Rc::new(RefCell::new(StreamingService::new()));
        let mut svc = AlgoStreamingService::new(10, 20, Some(3)).unwrap();
        svc.add_listener(Rc::new(AlgoStreamingListener::new(streaming.clone())));

        let out = svc.convert(&price(dec!(99), dec!(0.0078125))).unwrap();

        assert_eq!(streaming.borrow().get("P1").unwrap(), &out);
        assert_eq!(svc.get("P1").unwrap().stream, out);
    }
}
