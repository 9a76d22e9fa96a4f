//! Shared types and models for the Boutique stock platform
//!
//! This crate contains the domain types and pure stock-accounting rules shared
//! between the backend, the admin UI (via WASM), and the test suites.

pub mod barcode;
pub mod models;
pub mod types;
pub mod validation;

pub use barcode::*;
pub use models::*;
pub use types::*;
pub use validation::*;
