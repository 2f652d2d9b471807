// Library module for staticsync
// Re-exports modules for use in integration tests and external crates

pub mod cache;
pub mod collect;
pub mod config;
pub mod digest;
pub mod engine;
pub mod error;
pub mod gzip;
pub mod store;
pub mod strategy;
