use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use decl_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use decl_core::{
    Declaration, DeclarationError, DeclarationId, DeclarationService, FeeBreakdown,
};
use decl_data::{DeclarationExporter, declaration_summary, format_amount, payment_receipt};
use decl_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

use crate::cli::Command;
use crate::config::AppConfig;

/// Every storage backend this binary knows about.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

/// Connects to the configured backend and loads the declarations.
pub async fn open_service(config: &AppConfig) -> Result<DeclarationService> {
    debug!("connecting to {} backend", config.database.backend);
    let repository = build_registry()
        .create(&config.database)
        .await
        .with_context(|| format!("Failed to open '{}' storage", config.database.backend))?;

    DeclarationService::open(repository, config.service_config())
        .await
        .context("Failed to load declarations")
}

/// Runs one command, writing its report to `out`. `today` stands in for any
/// date the user did not give.
pub async fn run<W: Write>(
    command: Command,
    service: &mut DeclarationService,
    today: NaiveDate,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Create {
            year,
            month,
            inputs,
        } => {
            let patch = inputs.to_patch();
            let created = if patch.touches_inputs() {
                service.create_with(year, month, &patch, today).await?
            } else {
                service.create(year, month).await?
            };
            writeln!(
                out,
                "Created {} for {}-{:02}",
                created.id, created.year, created.month
            )?;
        }
        Command::List { year, status } => {
            let shown: Vec<&Declaration> = service
                .list()
                .iter()
                .filter(|d| year.is_none_or(|y| d.year == y))
                .filter(|d| status.is_none_or(|s| d.status == s))
                .collect();
            write_list(out, &shown)?;
        }
        Command::Show { declaration } => {
            let id = resolve(service, &declaration)?;
            let declaration = service.get(&id)?;
            write!(out, "{}", declaration_summary(declaration)?)?;
            writeln!(out, "ID: {}", declaration.id)?;
            writeln!(
                out,
                "Montant déjà versé: {}",
                format_amount(declaration.already_paid)
            )?;
            writeln!(
                out,
                "Principal: {}",
                format_amount(declaration.principal_amount)
            )?;
            writeln!(
                out,
                "Pénalité ({}%): {}",
                declaration.penalty_percentage,
                format_amount(declaration.penalty_amount)
            )?;
            writeln!(
                out,
                "Majoration de retard: {}",
                format_amount(declaration.late_fee)
            )?;
        }
        Command::Edit {
            declaration,
            inputs,
            as_of,
        } => {
            let id = resolve(service, &declaration)?;
            let edited = service
                .edit(&id, &inputs.to_patch(), as_of.unwrap_or(today))
                .await?;
            writeln!(out, "Updated {}", edited.id)?;
        }
        Command::Calculate { declaration, as_of } => {
            let id = resolve(service, &declaration)?;
            let fees = service.preview(&id, as_of.unwrap_or(today))?;
            write_breakdown(out, &fees)?;
        }
        Command::Save { declaration, as_of } => {
            let id = resolve(service, &declaration)?;
            let saved = service.save_draft(&id, as_of.unwrap_or(today)).await?;
            writeln!(
                out,
                "Saved {} ({}), total {}",
                saved.id,
                saved.status.label(),
                format_amount(saved.total_amount)
            )?;
        }
        Command::Submit { declaration, as_of } => {
            let id = resolve(service, &declaration)?;
            let submitted = service.submit(&id, as_of.unwrap_or(today)).await?;
            writeln!(
                out,
                "Validated {}; total to pay {} MAD",
                submitted.id,
                format_amount(submitted.total_amount)
            )?;
        }
        Command::Pay { declaration } => {
            let id = resolve(service, &declaration)?;
            let paid = service.mark_paid(&id).await?;
            writeln!(
                out,
                "Paid {} ({} MAD)",
                paid.id,
                format_amount(paid.total_amount)
            )?;
        }
        Command::Delete { declaration } => {
            let id = resolve(service, &declaration)?;
            let removed = service.delete(&id).await?;
            writeln!(
                out,
                "Deleted {} ({}-{:02})",
                removed.id, removed.year, removed.month
            )?;
        }
        Command::Export { output } => {
            let csv = DeclarationExporter::to_csv_string(service.list())?;
            if output == Path::new("-") {
                write!(out, "{csv}")?;
            } else {
                std::fs::write(&output, csv)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                writeln!(
                    out,
                    "Exported {} declarations to {}",
                    service.list().len(),
                    output.display()
                )?;
            }
        }
        Command::Receipt {
            declaration,
            output,
            date,
        } => {
            let id = resolve(service, &declaration)?;
            let receipt = payment_receipt(service.get(&id)?, date.unwrap_or(today))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, receipt)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    writeln!(out, "Receipt written to {}", path.display())?;
                }
                None => write!(out, "{receipt}")?,
            }
        }
    }
    Ok(())
}

/// Finds a declaration by exact id, falling back to a `YYYY-MM` period.
fn resolve(
    service: &DeclarationService,
    key: &str,
) -> Result<DeclarationId, DeclarationError> {
    let id = DeclarationId::from(key);
    if service.get(&id).is_ok() {
        return Ok(id);
    }
    parse_period(key)
        .and_then(|(year, month)| service.find_by_period(year, month))
        .map(|found| found.id.clone())
        .ok_or(DeclarationError::NotFound(id))
}

fn parse_period(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.trim().split_once('-')?;
    Some((year.parse().ok()?, month.parse().ok()?))
}

fn write_list<W: Write>(
    out: &mut W,
    declarations: &[&Declaration],
) -> Result<()> {
    if declarations.is_empty() {
        writeln!(out, "No declarations.")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<36}  {:<7}  {:<9}  {:<9}  {:>12}",
        "ID", "PERIOD", "TYPE", "STATUS", "TOTAL"
    )?;
    for d in declarations {
        writeln!(
            out,
            "{:<36}  {}-{:02}  {:<9}  {:<9}  {:>12}",
            d.id.as_str(),
            d.year,
            d.month,
            d.payment_type.label(),
            d.status.label(),
            format_amount(d.total_amount)
        )?;
    }
    Ok(())
}

fn write_breakdown<W: Write>(
    out: &mut W,
    fees: &FeeBreakdown,
) -> Result<()> {
    let timing = if fees.is_late { "late" } else { "on time" };
    writeln!(out, "Deadline:       {} ({timing})", fees.deadline)?;
    writeln!(out, "Principal:      {}", format_amount(fees.principal_amount))?;
    writeln!(
        out,
        "Penalty ({}%):  {}",
        fees.penalty_percentage,
        format_amount(fees.penalty_amount)
    )?;
    writeln!(out, "Late fee:       {}", format_amount(fees.late_fee))?;
    writeln!(out, "Total to pay:   {}", format_amount(fees.total_amount))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registry_knows_both_backends() {
        assert_eq!(build_registry().available_backends(), vec!["memory", "sqlite"]);
    }

    #[test]
    fn period_keys_parse() {
        assert_eq!(parse_period("2024-01"), Some((2024, 1)));
        assert_eq!(parse_period(" 2023-12 "), Some((2023, 12)));
        assert_eq!(parse_period("2024"), None);
        assert_eq!(parse_period("abc-def"), None);
    }
}
