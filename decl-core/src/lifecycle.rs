//! Status transitions for declarations.
//!
//! ```text
//!   save ─┐        save ─┐
//!         ▼              ▼
//!       Draft ──submit──▶ Validated ──mark_paid──▶ Paid
//! ```
//!
//! The controller never touches the store. Each operation takes the current
//! record and returns the record the caller should commit; the input is left
//! as it was when an operation fails.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::calculations::FeeCalculator;
use crate::error::DeclarationError;
use crate::models::{Declaration, DeclarationPatch, DeclarationStatus, FeeBreakdown};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleController {
    calculator: FeeCalculator,
}

impl LifecycleController {
    pub fn new(calculator: FeeCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculator(&self) -> &FeeCalculator {
        &self.calculator
    }

    /// Amounts the declaration would owe as of `as_of`, without changing it.
    pub fn preview(
        &self,
        declaration: &Declaration,
        as_of: NaiveDate,
    ) -> Result<FeeBreakdown, DeclarationError> {
        self.calculator.calculate(declaration, as_of)
    }

    /// Applies a patch to the filer-provided fields.
    ///
    /// A validated declaration whose inputs change is recalculated as of
    /// `as_of` and stays validated, so the amounts it will be paid with
    /// always follow its inputs. Drafts keep their derived fields until the
    /// next save or submit.
    ///
    /// # Errors
    ///
    /// [`DeclarationError::ImmutableRecord`] once the declaration is paid,
    /// [`DeclarationError::Validation`] for negative amounts.
    pub fn edit(
        &self,
        declaration: &Declaration,
        patch: &DeclarationPatch,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        if !declaration.status.is_editable() {
            warn!(id = %declaration.id, "rejected edit of paid declaration");
            return Err(DeclarationError::ImmutableRecord(declaration.id.clone()));
        }
        patch.validate()?;

        let mut edited = declaration.clone();
        patch.apply_to(&mut edited);

        if edited.status == DeclarationStatus::Validated && !edited.same_inputs(declaration) {
            debug!(id = %edited.id, "validated declaration edited; recalculating");
            return self.recalculated(&edited, DeclarationStatus::Validated, as_of);
        }
        Ok(edited)
    }

    /// Recalculates and keeps the declaration editable.
    ///
    /// Allowed from Draft and Validated; the status is unchanged, so a
    /// validated declaration stays validated.
    pub fn save_draft(
        &self,
        declaration: &Declaration,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        match declaration.status {
            DeclarationStatus::Draft | DeclarationStatus::Validated => {
                self.recalculated(declaration, declaration.status, as_of)
            }
            DeclarationStatus::Paid => Err(self.reject(declaration, DeclarationStatus::Draft)),
        }
    }

    /// Recalculates and moves a draft to Validated, ready for payment.
    pub fn submit(
        &self,
        declaration: &Declaration,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        if declaration.status != DeclarationStatus::Draft {
            return Err(self.reject(declaration, DeclarationStatus::Validated));
        }

        let submitted = self.recalculated(declaration, DeclarationStatus::Validated, as_of)?;
        info!(
            id = %submitted.id,
            total = %submitted.total_amount,
            "declaration validated"
        );
        Ok(submitted)
    }

    /// Records payment of a validated declaration. Amounts are not
    /// recalculated; the declaration is frozen from here on.
    ///
    /// # Errors
    ///
    /// [`DeclarationError::InvalidTransition`] unless validated,
    /// [`DeclarationError::StaleCalculation`] if the principal no longer
    /// matches the inputs.
    pub fn mark_paid(
        &self,
        declaration: &Declaration,
    ) -> Result<Declaration, DeclarationError> {
        if declaration.status != DeclarationStatus::Validated {
            return Err(self.reject(declaration, DeclarationStatus::Paid));
        }
        if !self.calculator.is_current(declaration) {
            warn!(id = %declaration.id, "rejected payment of out-of-date amounts");
            return Err(DeclarationError::StaleCalculation(declaration.id.clone()));
        }

        let mut paid = declaration.clone();
        paid.status = DeclarationStatus::Paid;
        info!(id = %paid.id, total = %paid.total_amount, "declaration paid");
        Ok(paid)
    }

    /// Dispatches a requested status to [`save_draft`](Self::save_draft),
    /// [`submit`](Self::submit) or [`mark_paid`](Self::mark_paid).
    pub fn transition(
        &self,
        declaration: &Declaration,
        requested: DeclarationStatus,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        match requested {
            DeclarationStatus::Draft => self.save_draft(declaration, as_of),
            DeclarationStatus::Validated => self.submit(declaration, as_of),
            DeclarationStatus::Paid => self.mark_paid(declaration),
        }
    }

    fn recalculated(
        &self,
        declaration: &Declaration,
        status: DeclarationStatus,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        let fees = self.calculator.calculate(declaration, as_of)?;
        let mut next = declaration.clone();
        next.apply_fees(&fees);
        next.status = status;
        Ok(next)
    }

    fn reject(
        &self,
        declaration: &Declaration,
        requested: DeclarationStatus,
    ) -> DeclarationError {
        warn!(
            id = %declaration.id,
            from = %declaration.status,
            to = %requested,
            "invalid status transition"
        );
        DeclarationError::InvalidTransition {
            from: declaration.status,
            to: requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::DeclarationId;

    fn date(
        year: i32,
        month: u32,
        day: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn declaration(status: DeclarationStatus) -> Declaration {
        let mut declaration = Declaration::new(DeclarationId::from("jan-2024"), 2024, 1);
        declaration.withholdings = dec!(1000);
        declaration.already_paid = dec!(200);
        declaration.status = status;
        declaration
    }

    /// Installs a subscriber that writes to the test harness for the
    /// duration of one test.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    // =========================================================================
    // save_draft
    // =========================================================================

    #[test]
    fn save_draft_recalculates_and_stays_draft() {
        let controller = LifecycleController::default();

        let saved = controller
            .save_draft(&declaration(DeclarationStatus::Draft), date(2024, 3, 1))
            .unwrap();

        assert_eq!(saved.status, DeclarationStatus::Draft);
        assert_eq!(saved.principal_amount, dec!(800));
        assert_eq!(saved.total_amount, dec!(1000));
    }

    #[test]
    fn save_draft_on_validated_keeps_validated() {
        let controller = LifecycleController::default();

        let saved = controller
            .save_draft(&declaration(DeclarationStatus::Validated), date(2024, 2, 29))
            .unwrap();

        assert_eq!(saved.status, DeclarationStatus::Validated);
        assert_eq!(saved.total_amount, dec!(800));
    }

    #[test]
    fn save_draft_on_paid_is_invalid() {
        let controller = LifecycleController::default();

        let result = controller.save_draft(&declaration(DeclarationStatus::Paid), date(2024, 2, 1));

        assert_eq!(
            result,
            Err(DeclarationError::InvalidTransition {
                from: DeclarationStatus::Paid,
                to: DeclarationStatus::Draft,
            })
        );
    }

    // =========================================================================
    // submit
    // =========================================================================

    #[test]
    fn submit_recalculates_then_validates() {
        let controller = LifecycleController::default();

        let submitted = controller
            .submit(&declaration(DeclarationStatus::Draft), date(2024, 2, 29))
            .unwrap();

        assert_eq!(submitted.status, DeclarationStatus::Validated);
        assert_eq!(submitted.penalty_percentage, Decimal::ZERO);
        assert_eq!(submitted.total_amount, dec!(800));
    }

    #[test]
    fn submit_refreshes_stale_derived_fields() {
        let controller = LifecycleController::default();
        let mut stale = declaration(DeclarationStatus::Draft);
        stale.total_amount = dec!(5);

        let submitted = controller.submit(&stale, date(2024, 3, 1)).unwrap();

        assert_eq!(submitted.penalty_amount, dec!(160));
        assert_eq!(submitted.late_fee, dec!(40));
        assert_eq!(submitted.total_amount, dec!(1000));
    }

    #[test]
    fn submit_twice_is_invalid() {
        let _guard = init_test_tracing();
        let controller = LifecycleController::default();

        let result = controller.submit(&declaration(DeclarationStatus::Validated), date(2024, 2, 1));

        assert_eq!(
            result,
            Err(DeclarationError::InvalidTransition {
                from: DeclarationStatus::Validated,
                to: DeclarationStatus::Validated,
            })
        );
    }

    #[test]
    fn submit_propagates_validation_errors() {
        let controller = LifecycleController::default();
        let mut bad = declaration(DeclarationStatus::Draft);
        bad.already_paid = dec!(-1);

        let result = controller.submit(&bad, date(2024, 2, 1));

        assert!(matches!(result, Err(DeclarationError::Validation { .. })));
    }

    // =========================================================================
    // mark_paid
    // =========================================================================

    #[test]
    fn mark_paid_keeps_amounts() {
        let controller = LifecycleController::default();
        let validated = controller
            .submit(&declaration(DeclarationStatus::Draft), date(2024, 2, 1))
            .unwrap();

        let paid = controller.mark_paid(&validated).unwrap();

        assert_eq!(paid.status, DeclarationStatus::Paid);
        assert_eq!(paid.total_amount, validated.total_amount);
    }

    #[test]
    fn mark_paid_from_draft_is_invalid() {
        let controller = LifecycleController::default();

        let result = controller.mark_paid(&declaration(DeclarationStatus::Draft));

        assert_eq!(
            result,
            Err(DeclarationError::InvalidTransition {
                from: DeclarationStatus::Draft,
                to: DeclarationStatus::Paid,
            })
        );
    }

    #[test]
    fn mark_paid_rejects_amounts_older_than_inputs() {
        let _guard = init_test_tracing();
        let controller = LifecycleController::default();
        let mut validated = controller
            .submit(&declaration(DeclarationStatus::Draft), date(2024, 2, 1))
            .unwrap();
        validated.withholdings = dec!(5000);

        let result = controller.mark_paid(&validated);

        assert_eq!(
            result,
            Err(DeclarationError::StaleCalculation(DeclarationId::from("jan-2024")))
        );
    }

    #[test]
    fn mark_paid_twice_is_invalid() {
        let controller = LifecycleController::default();

        assert!(controller.mark_paid(&declaration(DeclarationStatus::Paid)).is_err());
    }

    // =========================================================================
    // transition
    // =========================================================================

    #[test]
    fn transition_walks_the_full_lifecycle() {
        let controller = LifecycleController::default();
        let as_of = date(2024, 2, 10);

        let draft = controller
            .transition(&declaration(DeclarationStatus::Draft), DeclarationStatus::Draft, as_of)
            .unwrap();
        let validated = controller
            .transition(&draft, DeclarationStatus::Validated, as_of)
            .unwrap();
        let paid = controller
            .transition(&validated, DeclarationStatus::Paid, as_of)
            .unwrap();

        assert_eq!(paid.status, DeclarationStatus::Paid);
        assert_eq!(paid.total_amount, dec!(800));
    }

    #[test]
    fn transition_from_paid_back_to_validated_is_invalid() {
        let controller = LifecycleController::default();

        let result = controller.transition(
            &declaration(DeclarationStatus::Paid),
            DeclarationStatus::Validated,
            date(2024, 2, 1),
        );

        assert!(matches!(
            result,
            Err(DeclarationError::InvalidTransition {
                from: DeclarationStatus::Paid,
                to: DeclarationStatus::Validated,
            })
        ));
    }

    // =========================================================================
    // edit / preview
    // =========================================================================

    #[test]
    fn edit_paid_declaration_is_immutable() {
        let controller = LifecycleController::default();
        let patch = DeclarationPatch {
            withholdings: Some(dec!(1)),
            ..Default::default()
        };

        let result = controller.edit(&declaration(DeclarationStatus::Paid), &patch, date(2024, 2, 1));

        assert_eq!(
            result,
            Err(DeclarationError::ImmutableRecord(DeclarationId::from("jan-2024")))
        );
    }

    #[test]
    fn edit_leaves_input_declaration_untouched() {
        let controller = LifecycleController::default();
        let original = declaration(DeclarationStatus::Draft);
        let patch = DeclarationPatch {
            withholdings: Some(dec!(2000)),
            ..Default::default()
        };

        let edited = controller.edit(&original, &patch, date(2024, 2, 1)).unwrap();

        assert_eq!(edited.withholdings, dec!(2000));
        assert_eq!(edited.total_amount, Decimal::ZERO);
        assert_eq!(original.withholdings, dec!(1000));
    }

    #[test]
    fn edit_of_validated_inputs_recalculates() {
        let controller = LifecycleController::default();
        let validated = controller
            .submit(&declaration(DeclarationStatus::Draft), date(2024, 2, 1))
            .unwrap();
        let patch = DeclarationPatch {
            withholdings: Some(dec!(5000)),
            ..Default::default()
        };

        let edited = controller.edit(&validated, &patch, date(2024, 3, 1)).unwrap();

        assert_eq!(edited.status, DeclarationStatus::Validated);
        assert_eq!(edited.principal_amount, dec!(4800));
        assert_eq!(edited.penalty_amount, dec!(960));
        assert_eq!(edited.late_fee, dec!(240));
        assert_eq!(edited.total_amount, dec!(6000));
    }

    #[test]
    fn edit_of_validated_without_input_change_keeps_amounts() {
        let controller = LifecycleController::default();
        let validated = controller
            .submit(&declaration(DeclarationStatus::Draft), date(2024, 2, 1))
            .unwrap();
        let patch = DeclarationPatch {
            withholdings: Some(dec!(1000)),
            ..Default::default()
        };

        let edited = controller.edit(&validated, &patch, date(2024, 3, 1)).unwrap();

        assert_eq!(edited, validated);
    }

    #[test]
    fn preview_does_not_change_declaration() {
        let controller = LifecycleController::default();
        let original = declaration(DeclarationStatus::Draft);

        let fees = controller.preview(&original, date(2024, 3, 1)).unwrap();

        assert_eq!(fees.total_amount, dec!(1000));
        assert_eq!(original.total_amount, Decimal::ZERO);
    }
}
