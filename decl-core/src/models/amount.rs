use rust_decimal::Decimal;

use crate::error::DeclarationError;

/// Normalizes input for decimal parsing: trims whitespace and removes commas (thousands separator).
fn normalize_amount_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Rejects negative amounts.
pub fn validate_amount(
    field: &str,
    value: Decimal,
) -> Result<Decimal, DeclarationError> {
    if value < Decimal::ZERO {
        return Err(DeclarationError::validation(
            field,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(value)
}

/// Parses a user-entered amount.
///
/// Handles comma as thousands separator (e.g. `"1,234.56"`).
/// Empty or whitespace-only input is treated as 0.
///
/// # Errors
///
/// [`DeclarationError::Validation`] when the input is not a number or is
/// negative.
pub fn parse_amount(
    field: &str,
    s: &str,
) -> Result<Decimal, DeclarationError> {
    let normalized = normalize_amount_input(s);
    if normalized.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let value: Decimal = normalized.parse().map_err(|e| {
        tracing::warn!(field, input = %s, "rejected non-numeric amount: {}", e);
        DeclarationError::validation(field, format!("'{s}' is not a number"))
    })?;
    validate_amount(field, value)
}
