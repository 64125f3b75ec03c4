//! Customer repository.
//!
//! Customers are plain records; lifecycle code only needs to know they exist.

use kontrakt_core::activity::{ActivityTarget, NewActivity};
use kontrakt_core::access::Actor;
use kontrakt_core::error::LifecycleError;
use kontrakt_shared::types::CustomerId;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, TransactionTrait};

use super::activity::insert_activity;
use crate::context::LifecycleContext;
use crate::entities::customers;
use crate::mapping::db_error;

/// Input for creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomerInput {
    /// Display name.
    pub name: String,
    /// Optional organization number.
    pub org_number: Option<String>,
}

/// Customer repository for database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    ctx: LifecycleContext,
}

impl CustomerRepository {
    /// Creates a new customer repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Creates a customer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty name or `Database` on store failure.
    pub async fn create(
        &self,
        input: CreateCustomerInput,
        actor: &Actor,
    ) -> Result<customers::Model, LifecycleError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidArgument(
                "customer name must not be empty".to_string(),
            ));
        }

        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let customer = customers::ActiveModel {
            id: Set(self.ctx.next_uuid()),
            name: Set(name.to_string()),
            org_number: Set(input.org_number),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;

        let activity = NewActivity::new(
            ActivityTarget::Customer(CustomerId(customer.id)),
            "Customer created",
        );
        insert_activity(&txn, &self.ctx, activity, actor).await?;

        txn.commit().await.map_err(db_error)?;
        Ok(customer)
    }

    /// Finds a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the customer does not exist.
    pub async fn find(&self, id: CustomerId) -> Result<customers::Model, LifecycleError> {
        ensure_customer(&self.ctx.db, id).await
    }
}

/// Loads a customer, failing with `NotFound` when it does not exist.
pub(crate) async fn ensure_customer<C: ConnectionTrait>(
    conn: &C,
    id: CustomerId,
) -> Result<customers::Model, LifecycleError> {
    customers::Entity::find_by_id(id.0)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| LifecycleError::not_found("customer", id))
}
