use thiserror::Error;

use crate::db::repository::RepositoryError;
use crate::models::{DeclarationId, DeclarationStatus};

/// Errors surfaced by the declaration store, the fee calculator and the
/// lifecycle controller.
///
/// Every variant is recoverable: an operation that fails leaves the store
/// exactly as it was before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeclarationError {
    /// A declaration already exists for the requested period.
    #[error("a declaration for {year}-{month:02} already exists ({existing})")]
    DuplicatePeriod {
        year: i32,
        month: u32,
        existing: DeclarationId,
    },

    #[error("declaration {0} not found")]
    NotFound(DeclarationId),

    /// The declaration is paid and can no longer change.
    #[error("declaration {0} is paid and cannot be modified")]
    ImmutableRecord(DeclarationId),

    #[error("cannot move declaration from {from} to {to}")]
    InvalidTransition {
        from: DeclarationStatus,
        to: DeclarationStatus,
    },

    /// The stored amounts were calculated from inputs that have since
    /// changed; save the declaration to recalculate.
    #[error("declaration {0} changed since its amounts were calculated")]
    StaleCalculation(DeclarationId),

    /// An input value is negative, non-numeric or otherwise out of range.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("invalid fee configuration: {0}")]
    InvalidConfig(String),

    #[error("persistence failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl DeclarationError {
    pub(crate) fn validation(
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
