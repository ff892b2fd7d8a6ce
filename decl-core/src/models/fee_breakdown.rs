use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Amounts owed on a declaration as of a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Withholdings not yet remitted, never negative.
    pub principal_amount: Decimal,
    /// 0, or the configured penalty percentage when late.
    pub penalty_percentage: Decimal,
    pub penalty_amount: Decimal,
    pub late_fee: Decimal,
    /// `ceil(principal + penalty + late fee)`.
    pub total_amount: Decimal,

    /// Last day the declaration could be filed without surcharges.
    pub deadline: NaiveDate,
    pub is_late: bool,
}
