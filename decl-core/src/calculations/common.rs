//! Common utility functions for fee calculations.

use rust_decimal::Decimal;

/// Rounds a decimal value up to the next whole currency unit.
///
/// Fractions are always rounded toward positive infinity, in the treasury's
/// favor: `800.01` becomes `801`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use decl_core::calculations::common::ceil_to_unit;
///
/// assert_eq!(ceil_to_unit(dec!(1000.00)), dec!(1000));
/// assert_eq!(ceil_to_unit(dec!(1000.01)), dec!(1001));
/// assert_eq!(ceil_to_unit(dec!(0)), dec!(0));
/// ```
pub fn ceil_to_unit(value: Decimal) -> Decimal {
    value.ceil()
}

/// Returns the maximum of two decimal values.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use decl_core::calculations::common::max;
///
/// assert_eq!(max(dec!(100.00), dec!(200.00)), dec!(200.00));
/// assert_eq!(max(dec!(-100.00), dec!(0)), dec!(0));
/// ```
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}
