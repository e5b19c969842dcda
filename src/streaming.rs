// ===============================
// src/streaming.rs
// ===============================
use tracing::debug;

use crate::domain::PriceStream;
use crate::error::DeskError;
use crate::metrics::STREAMS;
use crate::service::{KeyedService, Listener};

/// Latest two-way stream per product.
pub struct StreamingService {
    streams: KeyedService<String, PriceStream>,
}

impl StreamingService {
    pub fn new() -> Self {
        Self { streams: KeyedService::new("stream") }
    }

    pub fn publish_price(&mut self, stream: PriceStream) -> Result<(), DeskError> {
        STREAMS.with_label_values(&[&stream.product.product_id]).inc();
        debug!(
            product = %stream.product.product_id,
            bid = %stream.bid.price,
            offer = %stream.offer.price,
            "stream out"
        );
        self.streams.publish(stream)
    }

    pub fn get(&self, product_id: &str) -> Result<&PriceStream, DeskError> {
        self.streams.get(&product_id.to_string())
    }

    pub fn add_listener(&mut self, listener: Listener<PriceStream>) {
        self.streams.add_listener(listener);
    }
}

impl Default for StreamingService {
    fn default() -> Self {
        Self::new()
    }
}
