use chrono::NaiveDate;
use decl_core::{Declaration, DeclarationStatus};
use rust_decimal::Decimal;

use crate::error::ExportError;

const MONTHS: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

const RULE: &str = "--------------------------------";

/// French name of a 1-based month.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTHS.get(index).copied()
}

/// Amount with exactly two decimal places, e.g. `800.00`.
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded.to_string()
}

fn period_month(declaration: &Declaration) -> Result<&'static str, ExportError> {
    month_name(declaration.month).ok_or(ExportError::InvalidMonth(declaration.month))
}

/// Printable summary of a declaration in any status.
///
/// ```
/// use decl_core::{Declaration, DeclarationId};
///
/// let declaration = Declaration::new(DeclarationId::from("d1"), 2024, 2);
/// let text = decl_data::declaration_summary(&declaration).unwrap();
/// assert!(text.contains("Mois de paiement: Février"));
/// ```
pub fn declaration_summary(declaration: &Declaration) -> Result<String, ExportError> {
    let month = period_month(declaration)?;

    Ok(render(&[
        "Récapitulatif de la déclaration".to_string(),
        RULE.to_string(),
        format!("Année fiscale: {}", declaration.year),
        format!("Mois de paiement: {month}"),
        format!("Type de versement: {}", declaration.payment_type.label()),
        format!("Statut: {}", declaration.status.label()),
        format!(
            "Montant global versé: {}",
            format_amount(declaration.total_remuneration)
        ),
        format!("Montant retenu: {}", format_amount(declaration.withholdings)),
        format!(
            "Montant total à verser: {}",
            format_amount(declaration.total_amount)
        ),
    ]))
}

/// Payment receipt. Only paid declarations have one.
///
/// # Errors
/// * [`ExportError::NotPaid`] for drafts and validated declarations.
/// * [`ExportError::InvalidMonth`] if the stored month is outside 1..=12.
pub fn payment_receipt(
    declaration: &Declaration,
    issued_on: NaiveDate,
) -> Result<String, ExportError> {
    if declaration.status != DeclarationStatus::Paid {
        return Err(ExportError::NotPaid {
            id: declaration.id.clone(),
            status: declaration.status,
        });
    }
    let month = period_month(declaration)?;

    Ok(render(&[
        "Reçu de paiement".to_string(),
        RULE.to_string(),
        format!("Statut: {}", declaration.status.label()),
        format!("Détails de la déclaration - {}/{month}", declaration.year),
        format!("Type de versement: {}", declaration.payment_type.label()),
        format!("ID: {}", declaration.id),
        format!(
            "Montant total à verser: {} MAD",
            format_amount(declaration.total_amount)
        ),
        format!("Date: {}", issued_on.format("%d/%m/%Y")),
    ]))
}

fn render(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
