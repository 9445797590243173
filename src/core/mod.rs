//! Core domain types and collaborator abstractions

pub mod config;
pub mod log;
pub mod rates;
pub mod sync;
pub mod transform;
pub mod warehouse;
pub mod window;

// Re-export main types for cleaner imports
pub use rates::{ExchangeRateRow, RateProvider, RawRates};
pub use sync::{RateSync, RunOutcome};
pub use warehouse::{TableRef, Warehouse};
pub use window::FetchWindow;
