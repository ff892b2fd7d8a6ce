use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DeclarationError;

/// Surcharge rates applied to late declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Penalty on the principal, in percent (20 means 20%).
    pub penalty_percentage: Decimal,
    /// Late fee on the principal, as a fraction (0.05 means 5%).
    pub late_fee_rate: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            penalty_percentage: Decimal::from(20),
            late_fee_rate: Decimal::new(5, 2),
        }
    }
}

impl FeeConfig {
    /// Checks both rates are within range.
    ///
    /// # Errors
    ///
    /// [`DeclarationError::InvalidConfig`] if `penalty_percentage` is not in
    /// [0, 100] or `late_fee_rate` is not in [0, 1].
    pub fn validate(&self) -> Result<(), DeclarationError> {
        if self.penalty_percentage < Decimal::ZERO || self.penalty_percentage > Decimal::ONE_HUNDRED
        {
            return Err(DeclarationError::InvalidConfig(format!(
                "penalty percentage must be between 0 and 100, got {}",
                self.penalty_percentage
            )));
        }
        if self.late_fee_rate < Decimal::ZERO || self.late_fee_rate > Decimal::ONE {
            return Err(DeclarationError::InvalidConfig(format!(
                "late fee rate must be between 0 and 1, got {}",
                self.late_fee_rate
            )));
        }
        Ok(())
    }
}
