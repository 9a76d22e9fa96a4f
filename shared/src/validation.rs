//! Validation utilities for the Boutique stock platform
//!
//! Includes Algeria-specific checks for customer contact details.

// ============================================================================
// Stock Validations
// ============================================================================

/// Largest quantity accepted on a single reception or order line
pub const MAX_LINE_QUANTITY: i32 = 100_000;

/// Validate a line quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Quantity must be at least 1");
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err("Quantity is too large");
    }
    Ok(())
}

/// Validate a courier tracking number (after normalisation)
pub fn validate_tracking_number(tracking: &str) -> Result<(), &'static str> {
    if tracking.len() < 4 {
        return Err("Tracking number is too short");
    }
    if tracking.len() > 64 {
        return Err("Tracking number is too long");
    }
    if !tracking
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Tracking number must be alphanumeric");
    }
    Ok(())
}

// ============================================================================
// Algeria-Specific Validations
// ============================================================================

/// Number of wilayas (provinces)
pub const WILAYA_COUNT: i32 = 58;

/// Validate an Algerian mobile number
/// Accepts: 0551234567, 05 51 23 45 67, +213551234567, 00213551234567
pub fn validate_algerian_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = if let Some(rest) = digits.strip_prefix("00213") {
        format!("0{}", rest)
    } else if phone.trim_start().starts_with('+') {
        match digits.strip_prefix("213") {
            Some(rest) => format!("0{}", rest),
            None => return Err("Phone number must use the +213 country code"),
        }
    } else {
        digits
    };

    if national.len() != 10 {
        return Err("Phone number must have 10 digits");
    }
    if !(national.starts_with("05") || national.starts_with("06") || national.starts_with("07")) {
        return Err("Mobile number must start with 05, 06 or 07");
    }
    Ok(())
}

/// Validate a wilaya code (1..=58)
pub fn validate_wilaya_code(code: i32) -> Result<(), &'static str> {
    if (1..=WILAYA_COUNT).contains(&code) {
        Ok(())
    } else {
        Err("Wilaya code must be between 1 and 58")
    }
}
