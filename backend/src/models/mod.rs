//! Domain models for the Boutique stock platform
//!
//! Re-exports models from the shared crate

pub use shared::barcode::{parse_barcode, BarcodeError, ScanCode};
pub use shared::models::*;
pub use shared::types::*;
