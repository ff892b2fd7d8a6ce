//! Filing deadlines.
//!
//! A declaration for month M is due by the last calendar day of month M+1.
//! December rolls into January of the following year.
//!
//! | Declared month | Deadline |
//! |----------------|----------|
//! | January 2024   | 2024-02-29 |
//! | March 2024     | 2024-04-30 |
//! | December 2024  | 2025-01-31 |

use chrono::{Months, NaiveDate};

use crate::error::DeclarationError;

/// Last day on which the declaration for `year`/`month` is on time.
///
/// # Errors
///
/// [`DeclarationError::Validation`] if `month` is not in 1..=12 or the
/// period falls outside the supported calendar range.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use decl_core::filing_deadline;
///
/// let deadline = filing_deadline(2023, 12).unwrap();
///
/// assert_eq!(deadline, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
/// ```
pub fn filing_deadline(
    year: i32,
    month: u32,
) -> Result<NaiveDate, DeclarationError> {
    if !(1..=12).contains(&month) {
        return Err(DeclarationError::validation(
            "month",
            format!("must be between 1 and 12, got {month}"),
        ));
    }

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(2)))
        .and_then(|first_after| first_after.pred_opt())
        .ok_or_else(|| {
            DeclarationError::validation("year", format!("{year} is out of the supported range"))
        })
}

/// Whether a declaration for `year`/`month` filed on `as_of` is past its
/// deadline. Filing on the deadline itself is on time.
pub fn is_late(
    year: i32,
    month: u32,
    as_of: NaiveDate,
) -> Result<bool, DeclarationError> {
    Ok(as_of > filing_deadline(year, month)?)
}
