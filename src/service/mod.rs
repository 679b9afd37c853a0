//! Service layer: entry points that turn upstream data into broadcasts.

pub mod rates_service;

pub use rates_service::RatesService;
