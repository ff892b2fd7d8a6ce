//! Amount-due calculations for withholding declarations.
//!
//! This module provides the filing deadline rules and the fee calculator
//! that derives principal, penalty, late fee and total from a declaration.

pub mod common;
pub mod deadline;
pub mod fees;

pub use deadline::{filing_deadline, is_late};
pub use fees::FeeCalculator;
