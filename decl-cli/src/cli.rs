use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use decl_core::{DeclarationPatch, DeclarationStatus, PaymentType, parse_amount};
use decl_data::DEFAULT_EXPORT_FILENAME;
use rust_decimal::Decimal;

use crate::config::ConfigOverrides;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Monthly withholding tax declarations.
///
/// Creates declarations, works out principal, penalty and late fee against
/// the filing deadline, and tracks each one from draft to payment.
#[derive(Debug, Parser)]
#[command(name = "declarations", version, about)]
pub struct Cli {
    /// Settings file (TOML).
    #[arg(long, env = "DECLARATIONS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend, e.g. `sqlite` or `memory`.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Backend connection string, e.g. `sqlite:declarations.db?mode=rwc`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level or filter directive.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append log records to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Silence console logging. File logging is unaffected.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend.clone(),
            connection_string: self.db.clone(),
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

/// Declarations are named by id or by period (`YYYY-MM`).
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a draft for a year and month.
    Create {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// List declarations in storage order.
    List {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = parse_status)]
        status: Option<DeclarationStatus>,
    },

    /// Print a declaration with its calculated amounts.
    Show { declaration: String },

    /// Change filer-entered values. Not allowed once paid; a validated
    /// declaration is recalculated.
    Edit {
        declaration: String,
        #[command(flatten)]
        inputs: InputArgs,
        /// Date to recalculate for, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show what is owed without saving anything.
    Calculate {
        declaration: String,
        /// Date to calculate for, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Recalculate and save without changing status.
    Save {
        declaration: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Validate a draft, fixing its amounts.
    Submit {
        declaration: String,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Record payment of a validated declaration.
    Pay { declaration: String },

    /// Remove a declaration.
    Delete { declaration: String },

    /// Write every declaration to CSV.
    Export {
        /// Output file, or `-` for standard output.
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILENAME)]
        output: PathBuf,
    },

    /// Print the payment receipt of a paid declaration.
    Receipt {
        declaration: String,
        /// Write to this file instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Issue date, YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// Filer-entered values. Amounts accept `1,234.50` style input.
#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// `initial` or `corrective`.
    #[arg(long, value_parser = parse_payment_type)]
    pub payment_type: Option<PaymentType>,

    /// Total remuneration paid out for the month.
    #[arg(long, value_parser = parse_amount_arg, allow_negative_numbers = true)]
    pub remuneration: Option<Decimal>,

    /// Tax withheld on that remuneration.
    #[arg(long, value_parser = parse_amount_arg, allow_negative_numbers = true)]
    pub withholdings: Option<Decimal>,

    /// Amount already paid towards this period.
    #[arg(long, value_parser = parse_amount_arg, allow_negative_numbers = true)]
    pub already_paid: Option<Decimal>,
}

impl InputArgs {
    pub fn to_patch(&self) -> DeclarationPatch {
        DeclarationPatch {
            payment_type: self.payment_type,
            total_remuneration: self.remuneration,
            withholdings: self.withholdings,
            already_paid: self.already_paid,
        }
    }
}

fn parse_amount_arg(s: &str) -> Result<Decimal, String> {
    parse_amount("amount", s).map_err(|e| e.to_string())
}

fn parse_payment_type(s: &str) -> Result<PaymentType, String> {
    PaymentType::parse(s).ok_or_else(|| format!("expected 'initial' or 'corrective', got '{s}'"))
}

fn parse_status(s: &str) -> Result<DeclarationStatus, String> {
    DeclarationStatus::parse(s)
        .ok_or_else(|| format!("expected 'draft', 'validated' or 'paid', got '{s}'"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("declarations").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_with_amounts() {
        let cli = parse(&[
            "create",
            "--year",
            "2024",
            "--month",
            "1",
            "--withholdings",
            "1,000",
            "--already-paid",
            "200",
        ]);

        let Command::Create {
            year,
            month,
            inputs,
        } = cli.command
        else {
            panic!("expected create, got {:?}", cli.command);
        };
        assert_eq!((year, month), (2024, 1));
        assert_eq!(
            inputs.to_patch(),
            DeclarationPatch {
                withholdings: Some(dec!(1000)),
                already_paid: Some(dec!(200)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn negative_amount_is_rejected() {
        let result = Cli::try_parse_from([
            "declarations",
            "edit",
            "2024-01",
            "--withholdings",
            "-5",
        ]);

        let err = result.expect_err("negative amounts must not parse");
        assert!(err.to_string().contains("must not be negative"), "got: {err}");
    }

    #[test]
    fn unknown_payment_type_is_rejected() {
        let result = Cli::try_parse_from([
            "declarations",
            "edit",
            "x",
            "--payment-type",
            "monthly",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn global_flags_become_overrides() {
        let cli = parse(&["list", "--backend", "memory", "--db", "x", "--quiet"]);

        assert!(cli.quiet);
        assert_eq!(
            cli.overrides(),
            ConfigOverrides {
                backend: Some("memory".to_string()),
                connection_string: Some("x".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn as_of_parses_iso_date() {
        let cli = parse(&["submit", "2024-01", "--as-of", "2024-03-01"]);

        let Command::Submit { as_of, .. } = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn export_defaults_to_csv_file() {
        let cli = parse(&["export"]);

        let Command::Export { output } = cli.command else {
            panic!("expected export");
        };
        assert_eq!(output, PathBuf::from("export_declarations_ir.csv"));
    }

    #[test]
    fn list_filters_by_status() {
        let cli = parse(&["list", "--status", "Paid"]);

        let Command::List { status, year } = cli.command else {
            panic!("expected list");
        };
        assert_eq!(status, Some(DeclarationStatus::Paid));
        assert_eq!(year, None);
    }
}
