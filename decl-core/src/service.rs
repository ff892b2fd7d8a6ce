//! Declaration workflow backed by persistent storage.
//!
//! [`DeclarationService`] loads the collection once, runs every operation
//! through the [`DeclarationStore`] and [`LifecycleController`], and writes
//! the whole collection back after each successful change. If the write
//! fails the in-memory store is restored, so memory and storage never
//! disagree.

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::calculations::FeeCalculator;
use crate::db::DeclarationRepository;
use crate::error::DeclarationError;
use crate::lifecycle::LifecycleController;
use crate::models::{Declaration, DeclarationId, DeclarationPatch, FeeBreakdown, FeeConfig};
use crate::store::{DeclarationStore, DeletePolicy};

/// Business rules a service is opened with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub fees: FeeConfig,
    pub delete_policy: DeletePolicy,
}

pub struct DeclarationService {
    repository: Box<dyn DeclarationRepository>,
    store: DeclarationStore,
    controller: LifecycleController,
}

impl DeclarationService {
    /// Loads the persisted collection and prepares the workflow.
    ///
    /// # Errors
    ///
    /// * [`DeclarationError::InvalidConfig`] for out-of-range fee rates.
    /// * [`DeclarationError::Repository`] if loading fails.
    /// * [`DeclarationError::DuplicatePeriod`] or
    ///   [`DeclarationError::Validation`] if the stored collection breaks the
    ///   store's rules.
    pub async fn open(
        repository: Box<dyn DeclarationRepository>,
        config: ServiceConfig,
    ) -> Result<Self, DeclarationError> {
        let calculator = FeeCalculator::new(config.fees)?;
        let declarations = repository.load().await?;
        debug!(count = declarations.len(), "loaded declarations");

        let store = DeclarationStore::from_declarations(declarations)?
            .with_delete_policy(config.delete_policy);

        Ok(Self {
            repository,
            store,
            controller: LifecycleController::new(calculator),
        })
    }

    pub fn store(&self) -> &DeclarationStore {
        &self.store
    }

    pub fn list(&self) -> &[Declaration] {
        self.store.list()
    }

    pub fn get(
        &self,
        id: &DeclarationId,
    ) -> Result<&Declaration, DeclarationError> {
        self.store.get(id)
    }

    pub fn find_by_period(
        &self,
        year: i32,
        month: u32,
    ) -> Option<&Declaration> {
        self.store.find_by_period(year, month)
    }

    /// Amounts owed as of `as_of`, nothing is saved.
    pub fn preview(
        &self,
        id: &DeclarationId,
        as_of: NaiveDate,
    ) -> Result<FeeBreakdown, DeclarationError> {
        self.controller.preview(self.store.get(id)?, as_of)
    }

    pub async fn create(
        &mut self,
        year: i32,
        month: u32,
    ) -> Result<Declaration, DeclarationError> {
        let snapshot = self.store.clone();
        let created = self.store.create(year, month)?;
        self.persist(snapshot).await?;
        Ok(created)
    }

    /// Creates a draft and fills it from `patch` in one save, so a
    /// rejected patch or a failed write leaves no half-filled draft behind.
    pub async fn create_with(
        &mut self,
        year: i32,
        month: u32,
        patch: &DeclarationPatch,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        let snapshot = self.store.clone();
        let created = self.store.create(year, month)?;
        let filled = self
            .controller
            .edit(&created, patch, as_of)
            .and_then(|filled| self.store.commit(filled));
        match filled {
            Ok(filled) => {
                self.persist(snapshot).await?;
                Ok(filled)
            }
            Err(e) => {
                self.store = snapshot;
                Err(e)
            }
        }
    }

    /// Applies `patch`. A validated declaration whose inputs change is
    /// recalculated as of `as_of`.
    pub async fn edit(
        &mut self,
        id: &DeclarationId,
        patch: &DeclarationPatch,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        let current = self.store.get(id)?;
        let edited = self.controller.edit(current, patch, as_of)?;
        self.commit(edited).await
    }

    pub async fn save_draft(
        &mut self,
        id: &DeclarationId,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        let current = self.store.get(id)?;
        let saved = self.controller.save_draft(current, as_of)?;
        self.commit(saved).await
    }

    /// Validates a draft. The caller proceeds to payment with the returned
    /// total.
    pub async fn submit(
        &mut self,
        id: &DeclarationId,
        as_of: NaiveDate,
    ) -> Result<Declaration, DeclarationError> {
        let current = self.store.get(id)?;
        let submitted = self.controller.submit(current, as_of)?;
        self.commit(submitted).await
    }

    pub async fn mark_paid(
        &mut self,
        id: &DeclarationId,
    ) -> Result<Declaration, DeclarationError> {
        let current = self.store.get(id)?;
        let paid = self.controller.mark_paid(current)?;
        self.commit(paid).await
    }

    pub async fn delete(
        &mut self,
        id: &DeclarationId,
    ) -> Result<Declaration, DeclarationError> {
        let snapshot = self.store.clone();
        let removed = self.store.delete(id)?;
        self.persist(snapshot).await?;
        Ok(removed)
    }

    async fn commit(
        &mut self,
        declaration: Declaration,
    ) -> Result<Declaration, DeclarationError> {
        let snapshot = self.store.clone();
        let committed = self.store.commit(declaration)?;
        self.persist(snapshot).await?;
        Ok(committed)
    }

    /// Writes the collection; on failure the store goes back to `snapshot`.
    async fn persist(
        &mut self,
        snapshot: DeclarationStore,
    ) -> Result<(), DeclarationError> {
        let saved = self.repository.save(self.store.list()).await;
        match saved {
            Ok(()) => {
                info!(count = self.store.len(), "saved declarations");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "saving declarations failed; changes discarded");
                self.store = snapshot;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::{MemoryRepository, RepositoryError};
    use crate::models::DeclarationStatus;

    /// Shares a [`MemoryRepository`] with the test so saved state can be
    /// inspected, and fails saves while `fail_saves` is set.
    struct SharedRepository {
        inner: Arc<MemoryRepository>,
        fail_saves: Arc<AtomicBool>,
    }

    #[async_trait]
    impl DeclarationRepository for SharedRepository {
        async fn load(&self) -> Result<Vec<Declaration>, RepositoryError> {
            self.inner.load().await
        }

        async fn save(
            &self,
            declarations: &[Declaration],
        ) -> Result<(), RepositoryError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(RepositoryError::Database("disk full".to_string()));
            }
            self.inner.save(declarations).await
        }
    }

    async fn open_service(
        config: ServiceConfig
    ) -> (DeclarationService, Arc<MemoryRepository>, Arc<AtomicBool>) {
        let inner = Arc::new(MemoryRepository::default());
        let fail_saves = Arc::new(AtomicBool::new(false));
        let repository = SharedRepository {
            inner: inner.clone(),
            fail_saves: fail_saves.clone(),
        };
        let service = DeclarationService::open(Box::new(repository), config)
            .await
            .unwrap();
        (service, inner, fail_saves)
    }

    fn date(
        year: i32,
        month: u32,
        day: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn amounts(
        withholdings: rust_decimal::Decimal,
        already_paid: rust_decimal::Decimal,
    ) -> DeclarationPatch {
        DeclarationPatch {
            withholdings: Some(withholdings),
            already_paid: Some(already_paid),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn open_loads_existing_declarations() {
        let existing = Declaration::new(DeclarationId::from("kept"), 2024, 4);
        let repository = MemoryRepository::new(vec![existing.clone()]);

        let service = DeclarationService::open(Box::new(repository), ServiceConfig::default())
            .await
            .unwrap();

        assert_eq!(service.list(), &[existing]);
    }

    #[tokio::test]
    async fn open_rejects_invalid_fee_config() {
        let config = ServiceConfig {
            fees: FeeConfig {
                late_fee_rate: dec!(2),
                ..FeeConfig::default()
            },
            ..ServiceConfig::default()
        };

        let result = DeclarationService::open(Box::new(MemoryRepository::default()), config).await;

        assert!(matches!(result, Err(DeclarationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn full_workflow_is_persisted() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;

        let created = service.create(2024, 1).await.unwrap();
        service
            .edit(&created.id, &amounts(dec!(1000), dec!(200)), date(2024, 2, 1))
            .await
            .unwrap();
        service.save_draft(&created.id, date(2024, 2, 10)).await.unwrap();
        let submitted = service.submit(&created.id, date(2024, 3, 1)).await.unwrap();
        let paid = service.mark_paid(&created.id).await.unwrap();

        assert_eq!(submitted.total_amount, dec!(1000));
        assert_eq!(paid.status, DeclarationStatus::Paid);
        assert_eq!(saved.load().await.unwrap(), vec![paid]);
    }

    #[tokio::test]
    async fn duplicate_period_names_existing_record() {
        let (mut service, _, _) = open_service(ServiceConfig::default()).await;
        let first = service.create(2024, 6).await.unwrap();

        let result = service.create(2024, 6).await;

        assert_eq!(
            result,
            Err(DeclarationError::DuplicatePeriod {
                year: 2024,
                month: 6,
                existing: first.id,
            })
        );
        assert_eq!(service.list().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_rolls_back_store() {
        let (mut service, saved, fail_saves) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 2).await.unwrap();
        fail_saves.store(true, Ordering::SeqCst);

        let result = service.submit(&created.id, date(2024, 3, 1)).await;

        assert!(matches!(result, Err(DeclarationError::Repository(_))));
        assert_eq!(
            service.get(&created.id).unwrap().status,
            DeclarationStatus::Draft
        );
        assert_eq!(saved.load().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_record() {
        let (mut service, _, fail_saves) = open_service(ServiceConfig::default()).await;
        fail_saves.store(true, Ordering::SeqCst);

        assert!(service.create(2024, 2).await.is_err());
        assert!(service.find_by_period(2024, 2).is_none());
    }

    #[tokio::test]
    async fn edit_after_payment_is_rejected() {
        let (mut service, _, _) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 1).await.unwrap();
        service.submit(&created.id, date(2024, 2, 1)).await.unwrap();
        service.mark_paid(&created.id).await.unwrap();

        let result = service
            .edit(&created.id, &amounts(dec!(1), dec!(0)), date(2024, 3, 1))
            .await;

        assert_eq!(result, Err(DeclarationError::ImmutableRecord(created.id)));
    }

    #[tokio::test]
    async fn edit_after_submit_pays_recalculated_amounts() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 1).await.unwrap();
        service
            .edit(&created.id, &amounts(dec!(1000), dec!(200)), date(2024, 2, 1))
            .await
            .unwrap();
        service.submit(&created.id, date(2024, 2, 1)).await.unwrap();

        let edited = service
            .edit(&created.id, &amounts(dec!(5000), dec!(200)), date(2024, 2, 1))
            .await
            .unwrap();
        let paid = service.mark_paid(&created.id).await.unwrap();

        assert_eq!(edited.status, DeclarationStatus::Validated);
        assert_eq!(paid.principal_amount, paid.withholdings - paid.already_paid);
        assert_eq!(paid.principal_amount, dec!(4800));
        assert_eq!(paid.total_amount, dec!(4800));
        assert_eq!(saved.load().await.unwrap(), vec![paid]);
    }

    #[tokio::test]
    async fn create_with_fills_and_saves_once() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;

        let created = service
            .create_with(2024, 1, &amounts(dec!(1000), dec!(200)), date(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(created.withholdings, dec!(1000));
        assert_eq!(created.status, DeclarationStatus::Draft);
        assert_eq!(saved.load().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn create_with_rejected_patch_leaves_no_record() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;

        let result = service
            .create_with(2024, 1, &amounts(dec!(-5), dec!(0)), date(2024, 2, 1))
            .await;

        assert!(matches!(result, Err(DeclarationError::Validation { .. })));
        assert!(service.list().is_empty());
        assert!(saved.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_failed_save_leaves_no_record() {
        let (mut service, _, fail_saves) = open_service(ServiceConfig::default()).await;
        fail_saves.store(true, Ordering::SeqCst);

        let result = service
            .create_with(2024, 1, &amounts(dec!(1000), dec!(0)), date(2024, 2, 1))
            .await;

        assert!(matches!(result, Err(DeclarationError::Repository(_))));
        assert!(service.find_by_period(2024, 1).is_none());
    }

    #[tokio::test]
    async fn pay_without_submit_is_rejected() {
        let (mut service, _, _) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 1).await.unwrap();

        let result = service.mark_paid(&created.id).await;

        assert!(matches!(result, Err(DeclarationError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn protected_paid_declaration_cannot_be_deleted() {
        let config = ServiceConfig {
            delete_policy: DeletePolicy::ProtectPaid,
            ..ServiceConfig::default()
        };
        let (mut service, _, _) = open_service(config).await;
        let created = service.create(2024, 1).await.unwrap();
        service.submit(&created.id, date(2024, 2, 1)).await.unwrap();
        service.mark_paid(&created.id).await.unwrap();

        let result = service.delete(&created.id).await;

        assert!(matches!(result, Err(DeclarationError::ImmutableRecord(_))));
        assert_eq!(service.list().len(), 1);
    }

    #[tokio::test]
    async fn delete_is_persisted() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 1).await.unwrap();

        service.delete(&created.id).await.unwrap();

        assert!(saved.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preview_does_not_persist() {
        let (mut service, saved, _) = open_service(ServiceConfig::default()).await;
        let created = service.create(2024, 1).await.unwrap();
        service
            .edit(&created.id, &amounts(dec!(100), dec!(0)), date(2024, 2, 1))
            .await
            .unwrap();

        let fees = service.preview(&created.id, date(2024, 4, 1)).unwrap();

        assert_eq!(fees.total_amount, dec!(125));
        assert_eq!(saved.load().await.unwrap()[0].total_amount, dec!(0));
    }
}
