//! Outputs built from stored declarations: CSV exports and the plain-text
//! summary and receipt documents.

mod documents;
mod error;
mod export;

pub use documents::{declaration_summary, format_amount, month_name, payment_receipt};
pub use error::ExportError;
pub use export::{DEFAULT_EXPORT_FILENAME, DeclarationCsvRecord, DeclarationExporter};
