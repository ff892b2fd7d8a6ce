//! Fee calculation for withholding declarations.
//!
//! | Step | Value |
//! |------|-------|
//! | 1    | Deadline: last day of the month after the declared month |
//! | 2    | Late: as-of date strictly after the deadline |
//! | 3    | Principal: withholdings − already paid (minimum 0) |
//! | 4    | Penalty: principal × 20% if late, else 0 |
//! | 5    | Late fee: principal × 5% if late, else 0 |
//! | 6    | Total: principal + penalty + late fee, rounded up to a whole unit |
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use decl_core::{Declaration, DeclarationId, FeeCalculator};
//!
//! let mut declaration = Declaration::new(DeclarationId::from("jan-2024"), 2024, 1);
//! declaration.withholdings = dec!(1000);
//! declaration.already_paid = dec!(200);
//!
//! let calculator = FeeCalculator::default();
//! let as_of = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let fees = calculator.calculate(&declaration, as_of).unwrap();
//!
//! assert!(fees.is_late);
//! assert_eq!(fees.principal_amount, dec!(800));
//! assert_eq!(fees.penalty_amount, dec!(160));
//! assert_eq!(fees.late_fee, dec!(40));
//! assert_eq!(fees.total_amount, dec!(1000));
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::common::{ceil_to_unit, max};
use crate::calculations::deadline::filing_deadline;
use crate::error::DeclarationError;
use crate::models::{Declaration, FeeBreakdown, FeeConfig, validate_amount};

/// Calculator for the amounts due on a declaration.
///
/// Holds the surcharge rates; the as-of date is always supplied by the
/// caller so results are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeCalculator {
    config: FeeConfig,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self {
            config: FeeConfig::default(),
        }
    }
}

impl FeeCalculator {
    /// Creates a calculator after checking the configured rates.
    pub fn new(config: FeeConfig) -> Result<Self, DeclarationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Calculates principal, surcharges and total for `declaration` as of
    /// `as_of`. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// [`DeclarationError::Validation`] if the declared month is invalid or
    /// an input amount is negative.
    pub fn calculate(
        &self,
        declaration: &Declaration,
        as_of: NaiveDate,
    ) -> Result<FeeBreakdown, DeclarationError> {
        let withholdings = validate_amount("withholdings", declaration.withholdings)?;
        let already_paid = validate_amount("already_paid", declaration.already_paid)?;

        let deadline = filing_deadline(declaration.year, declaration.month)?;
        let is_late = as_of > deadline;

        let principal_amount = self.principal(withholdings, already_paid);
        let penalty_percentage = self.penalty_percentage(is_late);
        let penalty_amount = self.penalty_amount(principal_amount, penalty_percentage);
        let late_fee = self.late_fee(principal_amount, is_late);
        let total_amount = ceil_to_unit(principal_amount + penalty_amount + late_fee);

        debug!(
            id = %declaration.id,
            %deadline,
            %as_of,
            is_late,
            %principal_amount,
            %total_amount,
            "calculated declaration fees"
        );

        Ok(FeeBreakdown {
            principal_amount,
            penalty_percentage,
            penalty_amount,
            late_fee,
            total_amount,
            deadline,
            is_late,
        })
    }

    /// Whether the stored principal still follows from the declaration's
    /// inputs. Surcharges and total derive from the principal, so a match
    /// means the derived fields are consistent with some calculation date.
    pub fn is_current(
        &self,
        declaration: &Declaration,
    ) -> bool {
        self.principal(declaration.withholdings, declaration.already_paid)
            == declaration.principal_amount
    }

    fn principal(
        &self,
        withholdings: Decimal,
        already_paid: Decimal,
    ) -> Decimal {
        max(withholdings - already_paid, Decimal::ZERO)
    }

    fn penalty_percentage(
        &self,
        is_late: bool,
    ) -> Decimal {
        if is_late {
            self.config.penalty_percentage
        } else {
            Decimal::ZERO
        }
    }

    fn penalty_amount(
        &self,
        principal: Decimal,
        penalty_percentage: Decimal,
    ) -> Decimal {
        principal * penalty_percentage / Decimal::ONE_HUNDRED
    }

    fn late_fee(
        &self,
        principal: Decimal,
        is_late: bool,
    ) -> Decimal {
        if is_late {
            principal * self.config.late_fee_rate
        } else {
            Decimal::ZERO
        }
    }
}
