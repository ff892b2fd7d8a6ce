use decl_core::{DeclarationId, DeclarationStatus};
use thiserror::Error;

/// Errors that can occur when producing exports or documents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("No data to export")]
    NoData,

    #[error("CSV write error: {0}")]
    Csv(String),

    #[error("Declaration {id} is {status}; a receipt needs a paid declaration")]
    NotPaid {
        id: DeclarationId,
        status: DeclarationStatus,
    },

    #[error("Invalid month {0}")]
    InvalidMonth(u32),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}
