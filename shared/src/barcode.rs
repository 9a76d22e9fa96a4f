//! Barcode parsing for the manual scan workflow
//!
//! Labels are printed as `REFERENCE` for accessories and `REFERENCE-SIZE` for
//! sized products. References may themselves contain hyphens, so a code is
//! first tried as a whole reference and only then split at its last hyphen.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Barcode parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarcodeError {
    #[error("barcode is empty")]
    Empty,

    #[error("barcode contains whitespace: {0}")]
    Whitespace(String),
}

/// A normalised scanned code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCode {
    /// Whole code, trimmed and upper-cased
    pub code: String,
    /// `(reference, size)` when the code contains a hyphen with text on both sides
    pub split: Option<(String, String)>,
}

impl ScanCode {
    /// Lookup candidates in resolution order
    pub fn candidates(&self) -> Vec<(String, Option<String>)> {
        let mut out = vec![(self.code.clone(), None)];
        if let Some((reference, size)) = &self.split {
            out.push((reference.clone(), Some(size.clone())));
        }
        out
    }
}

/// Parse a raw scanned string
pub fn parse_barcode(raw: &str) -> Result<ScanCode, BarcodeError> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err(BarcodeError::Empty);
    }
    if code.chars().any(char::is_whitespace) {
        return Err(BarcodeError::Whitespace(code));
    }

    let split = code
        .rsplit_once('-')
        .filter(|(reference, size)| !reference.is_empty() && !size.is_empty())
        .map(|(reference, size)| (reference.to_string(), size.to_string()));

    Ok(ScanCode { code, split })
}
