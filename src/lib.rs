// ===============================
// src/lib.rs
// ===============================
pub mod algo_execution;
pub mod algo_streaming;
pub mod config;
pub mod desk;
pub mod domain;
pub mod error;
pub mod execution;
pub mod feed;
pub mod inquiry;
pub mod market_data;
pub mod metrics;
pub mod positions;
pub mod pricing;
pub mod products;
pub mod recorder;
pub mod risk;
pub mod service;
pub mod streaming;
pub mod tick;
pub mod trade_booking;

#[cfg(test)]
mod fixtures;
