//! In-memory collection of declarations.
//!
//! The store keeps records in insertion order and enforces the rules that
//! span more than one record (one declaration per period) or that must hold
//! however a record is written back (forward-only status, paid records are
//! frozen). Every failed operation leaves the collection untouched.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calculations::filing_deadline;
use crate::error::DeclarationError;
use crate::models::{
    Declaration, DeclarationId, DeclarationPatch, DeclarationStatus, validate_amount,
};

/// Whether paid declarations may be deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Any declaration may be deleted.
    #[default]
    Unrestricted,
    /// Deleting a paid declaration fails with [`DeclarationError::ImmutableRecord`].
    ProtectPaid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationStore {
    declarations: Vec<Declaration>,
    delete_policy: DeletePolicy,
}

impl DeclarationStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with previously persisted declarations, order kept.
    ///
    /// # Errors
    ///
    /// [`DeclarationError::DuplicatePeriod`] if two records share a period,
    /// [`DeclarationError::Validation`] if two records share an id.
    pub fn from_declarations(declarations: Vec<Declaration>) -> Result<Self, DeclarationError> {
        let mut ids = HashSet::new();
        let mut periods = HashSet::new();
        for declaration in &declarations {
            if !ids.insert(&declaration.id) {
                return Err(DeclarationError::validation(
                    "id",
                    format!("{} appears more than once", declaration.id),
                ));
            }
            if !periods.insert(declaration.period()) {
                return Err(DeclarationError::DuplicatePeriod {
                    year: declaration.year,
                    month: declaration.month,
                    existing: declaration.id.clone(),
                });
            }
        }

        Ok(Self {
            declarations,
            delete_policy: DeletePolicy::default(),
        })
    }

    pub fn with_delete_policy(
        mut self,
        delete_policy: DeletePolicy,
    ) -> Self {
        self.delete_policy = delete_policy;
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Opens a new draft for `year`/`month`.
    ///
    /// # Errors
    ///
    /// * [`DeclarationError::DuplicatePeriod`] if the period already has a
    ///   declaration; the error names the existing record.
    /// * [`DeclarationError::Validation`] if the month is not 1..=12.
    pub fn create(
        &mut self,
        year: i32,
        month: u32,
    ) -> Result<Declaration, DeclarationError> {
        filing_deadline(year, month)?;

        if let Some(existing) = self.find_by_period(year, month) {
            warn!(year, month, existing = %existing.id, "period already declared");
            return Err(DeclarationError::DuplicatePeriod {
                year,
                month,
                existing: existing.id.clone(),
            });
        }

        let declaration = Declaration::new(DeclarationId::generate(), year, month);
        info!(id = %declaration.id, year, month, "created declaration");
        self.declarations.push(declaration.clone());
        Ok(declaration)
    }

    pub fn get(
        &self,
        id: &DeclarationId,
    ) -> Result<&Declaration, DeclarationError> {
        self.declarations
            .iter()
            .find(|declaration| &declaration.id == id)
            .ok_or_else(|| DeclarationError::NotFound(id.clone()))
    }

    /// Merges `patch` into the stored declaration.
    ///
    /// # Errors
    ///
    /// * [`DeclarationError::NotFound`] if `id` is unknown.
    /// * [`DeclarationError::ImmutableRecord`] if the declaration is paid and
    ///   the patch touches any input field.
    /// * [`DeclarationError::Validation`] if a patched amount is negative.
    pub fn update(
        &mut self,
        id: &DeclarationId,
        patch: &DeclarationPatch,
    ) -> Result<Declaration, DeclarationError> {
        let index = self.position(id)?;
        let declaration = &mut self.declarations[index];

        if !declaration.status.is_editable() && patch.touches_inputs() {
            warn!(%id, "rejected edit of paid declaration");
            return Err(DeclarationError::ImmutableRecord(id.clone()));
        }
        patch.validate()?;

        patch.apply_to(declaration);
        Ok(declaration.clone())
    }

    /// Removes a declaration and returns it.
    ///
    /// # Errors
    ///
    /// * [`DeclarationError::NotFound`] if `id` is unknown.
    /// * [`DeclarationError::ImmutableRecord`] if the declaration is paid and
    ///   the store uses [`DeletePolicy::ProtectPaid`].
    pub fn delete(
        &mut self,
        id: &DeclarationId,
    ) -> Result<Declaration, DeclarationError> {
        let index = self.position(id)?;

        if self.delete_policy == DeletePolicy::ProtectPaid
            && self.declarations[index].status == DeclarationStatus::Paid
        {
            warn!(%id, "rejected deletion of paid declaration");
            return Err(DeclarationError::ImmutableRecord(id.clone()));
        }

        let removed = self.declarations.remove(index);
        info!(%id, status = %removed.status, "deleted declaration");
        Ok(removed)
    }

    /// Every declaration, in insertion order.
    pub fn list(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn find_by_period(
        &self,
        year: i32,
        month: u32,
    ) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|declaration| declaration.period() == (year, month))
    }

    /// Writes back a declaration produced by the lifecycle controller.
    ///
    /// # Errors
    ///
    /// * [`DeclarationError::NotFound`] if no record has this id.
    /// * [`DeclarationError::ImmutableRecord`] if the stored record is paid
    ///   and the new value differs in any way.
    /// * [`DeclarationError::InvalidTransition`] if the status moves
    ///   backward or skips a step.
    /// * [`DeclarationError::DuplicatePeriod`] if the period now collides with
    ///   another record.
    /// * [`DeclarationError::Validation`] if an input amount is negative or
    ///   the period is invalid.
    pub fn commit(
        &mut self,
        declaration: Declaration,
    ) -> Result<Declaration, DeclarationError> {
        let index = self.position(&declaration.id)?;
        let current = &self.declarations[index];

        if current.status == DeclarationStatus::Paid && *current != declaration {
            warn!(id = %declaration.id, "rejected change to paid declaration");
            return Err(DeclarationError::ImmutableRecord(declaration.id));
        }

        if !is_forward_step(current.status, declaration.status) {
            warn!(
                id = %declaration.id,
                from = %current.status,
                to = %declaration.status,
                "rejected status change"
            );
            return Err(DeclarationError::InvalidTransition {
                from: current.status,
                to: declaration.status,
            });
        }

        if current.period() != declaration.period() {
            filing_deadline(declaration.year, declaration.month)?;
            if let Some(other) = self.find_by_period(declaration.year, declaration.month) {
                return Err(DeclarationError::DuplicatePeriod {
                    year: declaration.year,
                    month: declaration.month,
                    existing: other.id.clone(),
                });
            }
        }

        validate_amount("total_remuneration", declaration.total_remuneration)?;
        validate_amount("withholdings", declaration.withholdings)?;
        validate_amount("already_paid", declaration.already_paid)?;

        self.declarations[index] = declaration.clone();
        Ok(declaration)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }

    fn position(
        &self,
        id: &DeclarationId,
    ) -> Result<usize, DeclarationError> {
        self.declarations
            .iter()
            .position(|declaration| &declaration.id == id)
            .ok_or_else(|| DeclarationError::NotFound(id.clone()))
    }
}

/// A status may stay put or advance exactly one step.
fn is_forward_step(
    from: DeclarationStatus,
    to: DeclarationStatus,
) -> bool {
    matches!(
        (from, to),
        (DeclarationStatus::Draft, DeclarationStatus::Draft)
            | (DeclarationStatus::Draft, DeclarationStatus::Validated)
            | (DeclarationStatus::Validated, DeclarationStatus::Validated)
            | (DeclarationStatus::Validated, DeclarationStatus::Paid)
            | (DeclarationStatus::Paid, DeclarationStatus::Paid)
    )
}
