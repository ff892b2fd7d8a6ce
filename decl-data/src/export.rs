use std::io::Write;

use decl_core::Declaration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ExportError;

/// File name offered when the caller does not choose one.
pub const DEFAULT_EXPORT_FILENAME: &str = "export_declarations_ir.csv";

/// One row of the declarations CSV.
///
/// Column headers are the ones filers already know from the paper form:
/// `Annee, Mois, Type de versement, Montant global verse, Montant retenu,
/// Montant deja verse, Montant total a verser`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationCsvRecord {
    #[serde(rename = "Annee")]
    pub year: i32,
    #[serde(rename = "Mois")]
    pub month: u32,
    #[serde(rename = "Type de versement")]
    pub payment_type: String,
    #[serde(rename = "Montant global verse")]
    pub total_remuneration: Decimal,
    #[serde(rename = "Montant retenu")]
    pub withholdings: Decimal,
    #[serde(rename = "Montant deja verse")]
    pub already_paid: Decimal,
    #[serde(rename = "Montant total a verser")]
    pub total_amount: Decimal,
}

impl From<&Declaration> for DeclarationCsvRecord {
    fn from(declaration: &Declaration) -> Self {
        Self {
            year: declaration.year,
            month: declaration.month,
            payment_type: declaration.payment_type.label().to_string(),
            total_remuneration: declaration.total_remuneration,
            withholdings: declaration.withholdings,
            already_paid: declaration.already_paid,
            total_amount: declaration.total_amount,
        }
    }
}

/// Writes declarations out as CSV, in the order given.
pub struct DeclarationExporter;

impl DeclarationExporter {
    /// Write a header row and one row per declaration to `writer`.
    ///
    /// Returns the number of data rows written.
    ///
    /// # Errors
    /// * [`ExportError::NoData`] if `declarations` is empty. Nothing is
    ///   written in that case.
    /// * [`ExportError::Csv`] if the underlying writer fails.
    pub fn write_csv<W: Write>(
        writer: W,
        declarations: &[Declaration],
    ) -> Result<usize, ExportError> {
        if declarations.is_empty() {
            warn!("export requested with no declarations");
            return Err(ExportError::NoData);
        }

        let mut csv_writer = csv::Writer::from_writer(writer);
        for declaration in declarations {
            csv_writer.serialize(DeclarationCsvRecord::from(declaration))?;
        }
        csv_writer.flush().map_err(csv::Error::from)?;

        info!(rows = declarations.len(), "exported declarations to csv");
        Ok(declarations.len())
    }

    /// Same as [`write_csv`](Self::write_csv), collected into a string.
    pub fn to_csv_string(declarations: &[Declaration]) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        Self::write_csv(&mut buffer, declarations)?;
        String::from_utf8(buffer).map_err(|e| ExportError::Csv(e.to_string()))
    }
}
