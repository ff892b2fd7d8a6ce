use anyhow::{Context, Result};
use async_trait::async_trait;
use decl_core::{
    Declaration, DeclarationId, DeclarationRepository, DeclarationStatus, PaymentType,
    RepositoryError,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

const SELECT_DECLARATIONS: &str = "SELECT id, year, month, payment_type, status,
        total_remuneration, withholdings, already_paid,
        principal_amount, penalty_percentage, penalty_amount, late_fee, total_amount
     FROM declarations ORDER BY position";

const INSERT_DECLARATION: &str = "INSERT INTO declarations (
        id, position, year, month, payment_type, status,
        total_remuneration, withholdings, already_paid,
        principal_amount, penalty_percentage, penalty_amount, late_fee, total_amount
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url`, e.g. `sqlite:declarations.db?mode=rwc` or
    /// `sqlite::memory:`.
    ///
    /// An in-memory database only lives as long as its connection, so those
    /// URLs get a single connection that is never recycled.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_declaration(row: &SqliteRow) -> Result<Declaration, RepositoryError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    let payment_type_str: String = row
        .try_get("payment_type")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let payment_type = PaymentType::parse(&payment_type_str).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid payment type: {}", payment_type_str))
    })?;

    let status_str: String = row
        .try_get("status")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let status = DeclarationStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid status: {}", status_str)))?;

    let month: i64 = row
        .try_get("month")
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
    let month = u32::try_from(month)
        .map_err(|_| RepositoryError::Database(format!("Invalid month: {}", month)))?;

    Ok(Declaration {
        id: DeclarationId::from(id),
        year: row
            .try_get("year")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        month,
        payment_type,
        status,
        total_remuneration: get_decimal(row, "total_remuneration")?,
        withholdings: get_decimal(row, "withholdings")?,
        already_paid: get_decimal(row, "already_paid")?,
        principal_amount: get_decimal(row, "principal_amount")?,
        penalty_percentage: get_decimal(row, "penalty_percentage")?,
        penalty_amount: get_decimal(row, "penalty_amount")?,
        late_fee: get_decimal(row, "late_fee")?,
        total_amount: get_decimal(row, "total_amount")?,
    })
}

#[async_trait]
impl DeclarationRepository for SqliteRepository {
    async fn load(&self) -> Result<Vec<Declaration>, RepositoryError> {
        let rows = sqlx::query(SELECT_DECLARATIONS)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_declaration).collect()
    }

    /// Replaces the stored collection in a single transaction. Nothing is
    /// written unless every row is accepted.
    async fn save(
        &self,
        declarations: &[Declaration],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM declarations")
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        for (position, declaration) in declarations.iter().enumerate() {
            sqlx::query(INSERT_DECLARATION)
                .bind(declaration.id.as_str())
                .bind(position as i64)
                .bind(declaration.year)
                .bind(i64::from(declaration.month))
                .bind(declaration.payment_type.as_str())
                .bind(declaration.status.as_str())
                .bind(decimal_to_text(declaration.total_remuneration))
                .bind(decimal_to_text(declaration.withholdings))
                .bind(decimal_to_text(declaration.already_paid))
                .bind(decimal_to_text(declaration.principal_amount))
                .bind(decimal_to_text(declaration.penalty_percentage))
                .bind(decimal_to_text(declaration.penalty_amount))
                .bind(decimal_to_text(declaration.late_fee))
                .bind(decimal_to_text(declaration.total_amount))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    RepositoryError::Database(format!(
                        "Failed to write declaration {}: {}",
                        declaration.id, e
                    ))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(count = declarations.len(), "wrote declarations table");
        Ok(())
    }
}
