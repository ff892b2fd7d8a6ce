use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DeclarationStatus, FeeBreakdown, PaymentType, validate_amount};
use crate::error::DeclarationError;

/// Opaque identifier assigned to a declaration when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationId(String);

impl DeclarationId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeclarationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeclarationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One filer's record of tax withheld for a given year and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclarationId,
    pub year: i32,
    /// Declared month, 1 through 12.
    pub month: u32,
    pub payment_type: PaymentType,
    pub status: DeclarationStatus,

    // Filer-provided values
    pub total_remuneration: Decimal,
    pub withholdings: Decimal,
    pub already_paid: Decimal,

    // Calculated values
    pub principal_amount: Decimal,
    pub penalty_percentage: Decimal,
    pub penalty_amount: Decimal,
    pub late_fee: Decimal,
    /// Whole currency units, rounded up.
    pub total_amount: Decimal,
}

impl Declaration {
    /// A draft for the given period with every amount at zero.
    pub fn new(
        id: DeclarationId,
        year: i32,
        month: u32,
    ) -> Self {
        Self {
            id,
            year,
            month,
            payment_type: PaymentType::Initial,
            status: DeclarationStatus::Draft,
            total_remuneration: Decimal::ZERO,
            withholdings: Decimal::ZERO,
            already_paid: Decimal::ZERO,
            principal_amount: Decimal::ZERO,
            penalty_percentage: Decimal::ZERO,
            penalty_amount: Decimal::ZERO,
            late_fee: Decimal::ZERO,
            total_amount: Decimal::ZERO,
        }
    }

    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    /// Copies a calculation result onto the derived fields.
    pub fn apply_fees(
        &mut self,
        fees: &FeeBreakdown,
    ) {
        self.principal_amount = fees.principal_amount;
        self.penalty_percentage = fees.penalty_percentage;
        self.penalty_amount = fees.penalty_amount;
        self.late_fee = fees.late_fee;
        self.total_amount = fees.total_amount;
    }

    /// Whether the filer-provided fields of `self` and `other` match.
    pub fn same_inputs(
        &self,
        other: &Declaration,
    ) -> bool {
        self.payment_type == other.payment_type
            && self.total_remuneration == other.total_remuneration
            && self.withholdings == other.withholdings
            && self.already_paid == other.already_paid
    }
}

/// Partial update of a declaration's filer-provided fields.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationPatch {
    pub payment_type: Option<PaymentType>,
    pub total_remuneration: Option<Decimal>,
    pub withholdings: Option<Decimal>,
    pub already_paid: Option<Decimal>,
}

impl DeclarationPatch {
    pub fn touches_inputs(&self) -> bool {
        self.payment_type.is_some()
            || self.total_remuneration.is_some()
            || self.withholdings.is_some()
            || self.already_paid.is_some()
    }

    /// Rejects negative amounts before anything is merged.
    pub fn validate(&self) -> Result<(), DeclarationError> {
        let amounts = [
            ("total_remuneration", self.total_remuneration),
            ("withholdings", self.withholdings),
            ("already_paid", self.already_paid),
        ];
        for (field, value) in amounts {
            if let Some(value) = value {
                validate_amount(field, value)?;
            }
        }
        Ok(())
    }

    /// Merges the patch into `declaration`. Derived fields are left as they
    /// were; they are refreshed by the next calculation.
    pub fn apply_to(
        &self,
        declaration: &mut Declaration,
    ) {
        if let Some(payment_type) = self.payment_type {
            declaration.payment_type = payment_type;
        }
        if let Some(value) = self.total_remuneration {
            declaration.total_remuneration = value;
        }
        if let Some(value) = self.withholdings {
            declaration.withholdings = value;
        }
        if let Some(value) = self.already_paid {
            declaration.already_paid = value;
        }
    }
}
