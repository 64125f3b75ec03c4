//! Number sequence allocator.
//!
//! One counter row per (prefix, year). Companies that print the same prefix
//! share a counter, so a formatted number is never handed out twice.
//! Allocation is a single insert-or-increment statement returning the new
//! value, so two callers can never observe the same number, whichever
//! process they run in.

use std::time::Duration;

use chrono::{DateTime, Utc};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::numbering::{CompanyId, DocumentNumber, MAX_SEQUENCE};
use kontrakt_shared::config::NumberingConfig;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, SqlErr, TransactionTrait,
};
use tracing::{debug, warn};

use crate::context::LifecycleContext;
use crate::entities::number_sequences::{self, Column};
use crate::mapping::db_error;

/// Number sequence repository.
#[derive(Debug, Clone)]
pub struct NumberSequenceRepository {
    ctx: LifecycleContext,
}

impl NumberSequenceRepository {
    /// Creates a new number sequence repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Allocates the next sequence value for `company` in `year`.
    ///
    /// # Errors
    ///
    /// - `RetryExhausted` if the increment kept conflicting
    /// - `SequenceExhausted` past the maximum sequence value
    pub async fn allocate(&self, company: &CompanyId, year: i32) -> Result<i64, LifecycleError> {
        allocate(&self.ctx.db, &self.ctx.numbering, company, year, self.ctx.clock.now()).await
    }

    /// Allocates and formats the next document number.
    ///
    /// # Errors
    ///
    /// Same as [`Self::allocate`].
    pub async fn next_number(
        &self,
        company: &CompanyId,
        year: i32,
    ) -> Result<DocumentNumber, LifecycleError> {
        let sequence = self.allocate(company, year).await?;
        DocumentNumber::new(company, year, sequence)
    }

    /// Returns the last allocated value, 0 when nothing was allocated yet.
    ///
    /// # Errors
    ///
    /// Returns `Database` on store failure.
    pub async fn current(&self, company: &CompanyId, year: i32) -> Result<i64, LifecycleError> {
        let row = number_sequences::Entity::find()
            .filter(Column::Prefix.eq(company.prefix()))
            .filter(Column::Year.eq(year))
            .one(&self.ctx.db)
            .await
            .map_err(db_error)?;
        Ok(row.map_or(0, |row| row.last_sequence))
    }

    /// Raises the counter to at least `value`; never lowers it.
    ///
    /// Used when importing numbers issued by an earlier system.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative value, `SequenceExhausted` above the
    /// maximum, `Database` on store failure.
    pub async fn initialize(
        &self,
        company: &CompanyId,
        year: i32,
        value: i64,
    ) -> Result<i64, LifecycleError> {
        if value < 0 {
            return Err(LifecycleError::InvalidArgument(format!(
                "sequence start must not be negative, got {value}"
            )));
        }
        if value > MAX_SEQUENCE {
            return Err(LifecycleError::SequenceExhausted {
                company: company.to_string(),
                year,
            });
        }

        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;
        let backend = txn.get_database_backend();

        let mut insert = Query::insert();
        insert
            .into_table(number_sequences::Entity)
            .columns([Column::Prefix, Column::Year, Column::LastSequence, Column::UpdatedAt]);
        insert
            .values([company.prefix().into(), year.into(), value.into(), now.into()])
            .map_err(|e| LifecycleError::Database(e.to_string()))?;
        insert.on_conflict(
            OnConflict::columns([Column::Prefix, Column::Year])
                .do_nothing()
                .to_owned(),
        );
        txn.execute(backend.build(&insert)).await.map_err(db_error)?;

        number_sequences::Entity::update_many()
            .col_expr(Column::LastSequence, Expr::value(value))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Prefix.eq(company.prefix()))
            .filter(Column::Year.eq(year))
            .filter(Column::LastSequence.lt(value))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        let current = number_sequences::Entity::find()
            .filter(Column::Prefix.eq(company.prefix()))
            .filter(Column::Year.eq(year))
            .one(&txn)
            .await
            .map_err(db_error)?
            .map_or(value, |row| row.last_sequence);

        txn.commit().await.map_err(db_error)?;
        Ok(current)
    }
}

/// Allocates inside `conn`.
///
/// Each attempt runs in its own transaction, or a savepoint when `conn` is
/// already a transaction, so a failed attempt leaves the caller's
/// transaction usable and a committed caller keeps the number it was given.
pub(crate) async fn allocate<C>(
    conn: &C,
    policy: &NumberingConfig,
    company: &CompanyId,
    year: i32,
    now: DateTime<Utc>,
) -> Result<i64, LifecycleError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let attempts = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match try_allocate(conn, company, year, now).await {
            Ok(sequence) if sequence > MAX_SEQUENCE => {
                return Err(LifecycleError::SequenceExhausted {
                    company: company.to_string(),
                    year,
                });
            }
            Ok(sequence) => {
                debug!(company = %company, year, sequence, attempt, "allocated sequence number");
                return Ok(sequence);
            }
            Err(err) if is_retryable(&err) && attempt < attempts => {
                warn!(
                    company = %company,
                    year,
                    attempt,
                    error = %err,
                    "sequence allocation conflicted, retrying"
                );
                tokio::time::sleep(Duration::from_millis(
                    policy.retry_backoff_ms.saturating_mul(u64::from(attempt)),
                ))
                .await;
            }
            Err(err) if is_retryable(&err) => {
                warn!(company = %company, year, attempts, error = %err, "sequence allocation gave up");
                return Err(LifecycleError::RetryExhausted {
                    company: company.to_string(),
                    year,
                    attempts,
                });
            }
            Err(err) => return Err(db_error(err)),
        }
    }
}

/// Allocates and formats a document number inside `conn`.
pub(crate) async fn allocate_number<C>(
    conn: &C,
    policy: &NumberingConfig,
    company: &CompanyId,
    year: i32,
    now: DateTime<Utc>,
) -> Result<DocumentNumber, LifecycleError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let sequence = allocate(conn, policy, company, year, now).await?;
    DocumentNumber::new(company, year, sequence)
}

async fn try_allocate<C>(
    conn: &C,
    company: &CompanyId,
    year: i32,
    now: DateTime<Utc>,
) -> Result<i64, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = conn.begin().await?;

    let mut upsert = Query::insert();
    upsert
        .into_table(number_sequences::Entity)
        .columns([Column::Prefix, Column::Year, Column::LastSequence, Column::UpdatedAt]);
    upsert
        .values([company.prefix().into(), year.into(), 1i64.into(), now.into()])
        .map_err(|e| DbErr::Custom(e.to_string()))?;
    upsert
        .on_conflict(
            OnConflict::columns([Column::Prefix, Column::Year])
                .value(
                    Column::LastSequence,
                    Expr::col((number_sequences::Entity, Column::LastSequence)).add(1),
                )
                .value(Column::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .returning_col(Column::LastSequence);

    let statement = txn.get_database_backend().build(&upsert);
    let row = txn
        .query_one(statement)
        .await?
        .ok_or_else(|| DbErr::Custom("sequence upsert returned no row".to_string()))?;
    let sequence: i64 = row.try_get("", "last_sequence")?;

    txn.commit().await?;
    Ok(sequence)
}

/// Write conflicts and lock timeouts are worth another attempt.
fn is_retryable(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let message = err.to_string().to_lowercase();
    ["database is locked", "could not serialize", "deadlock detected"]
        .iter()
        .any(|needle| message.contains(needle))
}
