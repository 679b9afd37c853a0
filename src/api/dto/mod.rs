//! Data Transfer Objects for REST request/response serialization.

pub mod rates_dto;

pub use rates_dto::*;
