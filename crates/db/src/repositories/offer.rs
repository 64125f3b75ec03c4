//! Offer repository for phase transitions and order tracking.
//!
//! Leaving draft allocates the offer number in the same transaction as the
//! phase change, so a rolled-back transition never burns a number.

use chrono::{DateTime, Datelike, Utc};
use kontrakt_core::access::Actor;
use kontrakt_core::activity::{Activity, ActivityTarget, NewActivity};
use kontrakt_core::budget::BudgetParentType;
use kontrakt_core::error::LifecycleError;
use kontrakt_core::offer::{
    NewOffer, Offer, OfferHealth, OfferPhase, OfferPhaseMachine, OfferService, OfferStatus,
    OfferWarning, OrderProgress, PhaseContext,
};
use kontrakt_core::project::ProjectPhaseMachine;
use kontrakt_shared::types::OfferId;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait, Value};
use tracing::{info, warn};

use super::activity::insert_activity;
use super::customer::ensure_customer;
use super::number_sequence::allocate_number;
use super::project::load_project;
use crate::context::LifecycleContext;
use crate::entities::sea_orm_active_enums;
use crate::entities::{budget_items, deals, offers};
use crate::mapping::{db_error, offer_from_model, offer_to_active, offer_to_new_active};

/// An offer after a phase operation.
#[derive(Debug, Clone)]
pub struct OfferTransition {
    /// The offer as persisted.
    pub offer: Offer,
    /// The activity row for the change; `None` for the identity transition.
    pub activity: Option<Activity>,
    /// Data-integrity warnings for the resulting state.
    pub warnings: Vec<OfferWarning>,
}

/// Offer repository for database operations.
#[derive(Debug, Clone)]
pub struct OfferRepository {
    ctx: LifecycleContext,
}

impl OfferRepository {
    /// Creates a new offer repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Creates a draft offer.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a given customer or project does not exist
    /// - `InvalidState` if the project is not in an editable phase
    /// - `InvalidArgument` for an empty title or negative amounts
    pub async fn create_offer(&self, input: NewOffer, actor: &Actor) -> Result<Offer, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;
        let offer = create_offer_in(&txn, &self.ctx, input, actor).await?;
        txn.commit().await.map_err(db_error)?;

        info!(offer_id = %offer.id, user_id = %actor.user_id, "Offer created");
        Ok(offer)
    }

    /// Finds an offer by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the offer does not exist.
    pub async fn find(&self, id: OfferId) -> Result<Offer, LifecycleError> {
        load_offer(&self.ctx.db, id).await
    }

    /// Moves an offer to `target`, allocating its number when it leaves draft.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` for moves outside the transition table
    /// - `InvalidState` when leaving draft without company or responsible user
    /// - `Forbidden` for a non-responsible actor without a manager role
    /// - `RetryExhausted` if the number could not be allocated
    #[tracing::instrument(skip_all, fields(offer_id = %id, target = %target))]
    pub async fn advance_phase(
        &self,
        id: OfferId,
        target: OfferPhase,
        actor: &Actor,
    ) -> Result<OfferTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let offer = load_offer(&txn, id).await?;
        self.ctx
            .access
            .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;

        let transition = advance_offer(&txn, &self.ctx, offer, target, actor).await?;
        txn.commit().await.map_err(db_error)?;
        Ok(transition)
    }

    /// Changes value and/or cost; margin and order reserve follow.
    ///
    /// # Errors
    ///
    /// - `InvalidState` for lost or expired offers
    /// - `InvalidArgument` for negative amounts
    pub async fn update_financials(
        &self,
        id: OfferId,
        value: Option<Decimal>,
        cost: Option<Decimal>,
        actor: &Actor,
    ) -> Result<Offer, LifecycleError> {
        self.modify(id, actor, |offer| {
            OfferService::update_financials(offer, value, cost)
        })
        .await
    }

    /// Updates health and completion of an order.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the offer is in `order`
    /// - `InvalidArgument` for a completion outside 0 to 100
    pub async fn update_execution(
        &self,
        id: OfferId,
        health: Option<OfferHealth>,
        completion_percent: Option<i32>,
        actor: &Actor,
    ) -> Result<Offer, LifecycleError> {
        self.modify(id, actor, |offer| {
            OfferService::update_execution(offer, health, completion_percent)
        })
        .await
    }

    /// Records spend, invoicing, team and forecast of an order.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the offer is in `order`
    /// - `InvalidArgument` for negative amounts or a blank team member
    /// - `Forbidden` for a non-responsible actor without a manager role
    pub async fn record_progress(
        &self,
        id: OfferId,
        progress: OrderProgress,
        actor: &Actor,
    ) -> Result<Offer, LifecycleError> {
        self.modify(id, actor, |offer| OfferService::record_progress(offer, progress))
            .await
    }

    /// Sets the administrative status. Never touches the phase.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for a non-responsible actor without a manager role
    /// - `ConcurrentModification` if the offer changed underneath
    pub async fn set_status(
        &self,
        id: OfferId,
        status: OfferStatus,
        actor: &Actor,
    ) -> Result<Offer, LifecycleError> {
        self.modify(id, actor, |offer| {
            let mut next = offer.clone();
            next.status = status;
            Ok(next)
        })
        .await
    }

    /// Data-integrity warnings for an offer under the configured tolerance.
    #[must_use]
    pub fn warnings(&self, offer: &Offer) -> Vec<OfferWarning> {
        offer.warnings(self.ctx.settings.dw_income_tolerance)
    }

    /// Deletes an offer together with its budget items.
    ///
    /// Deals pointing at the offer lose the link.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the offer does not exist
    /// - `Forbidden` for a non-responsible actor without a manager role
    pub async fn delete(&self, id: OfferId, actor: &Actor) -> Result<(), LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let offer = load_offer(&txn, id).await?;
        self.ctx
            .access
            .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;

        let parent_type: sea_orm_active_enums::BudgetParentType = BudgetParentType::Offer.into();
        budget_items::Entity::delete_many()
            .filter(budget_items::Column::ParentType.eq(parent_type))
            .filter(budget_items::Column::ParentId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        deals::Entity::update_many()
            .col_expr(deals::Column::OfferId, Expr::value(Value::Uuid(None)))
            .filter(deals::Column::OfferId.eq(id.0))
            .exec(&txn)
            .await
            .map_err(db_error)?;

        offers::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(db_error)?;

        insert_activity(
            &txn,
            &self.ctx,
            NewActivity::new(ActivityTarget::Offer(id), "Offer deleted"),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(offer_id = %id, user_id = %actor.user_id, "Offer deleted");
        Ok(())
    }

    async fn modify<F>(&self, id: OfferId, actor: &Actor, change: F) -> Result<Offer, LifecycleError>
    where
        F: FnOnce(&Offer) -> Result<Offer, LifecycleError>,
    {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let offer = load_offer(&txn, id).await?;
        self.ctx
            .access
            .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;

        let next = change(&offer)?;
        let saved = save_offer(&txn, next, offer.version, self.ctx.clock.now()).await?;

        txn.commit().await.map_err(db_error)?;
        Ok(saved)
    }
}

/// Phase entry inputs taken from the context.
pub(crate) fn phase_context(ctx: &LifecycleContext) -> PhaseContext {
    PhaseContext {
        today: ctx.clock.today(),
        validity_days: ctx.settings.offer_validity_days.unsigned_abs(),
    }
}

/// Validates references and inserts a new draft offer.
pub(crate) async fn create_offer_in<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    input: NewOffer,
    actor: &Actor,
) -> Result<Offer, LifecycleError> {
    if let Some(customer_id) = input.customer_id {
        ensure_customer(conn, customer_id).await?;
    }
    if let Some(project_id) = input.project_id {
        let project = load_project(conn, project_id).await?;
        ProjectPhaseMachine::ensure_editable(&project)?;
    }

    let offer = OfferService::create(OfferId(ctx.next_uuid()), input, ctx.clock.now())?;
    offers::Entity::insert(offer_to_new_active(&offer))
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;

    insert_activity(
        conn,
        ctx,
        NewActivity::new(ActivityTarget::Offer(offer.id), "Offer created"),
        actor,
    )
    .await?;
    Ok(offer)
}

/// Applies a phase change to a loaded offer and persists it.
pub(crate) async fn advance_offer<C>(
    conn: &C,
    ctx: &LifecycleContext,
    offer: Offer,
    target: OfferPhase,
    actor: &Actor,
) -> Result<OfferTransition, LifecycleError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let mut working = offer.clone();
    if OfferPhaseMachine::needs_number(&offer, target) {
        if let Some(company) = offer.company_id.as_ref() {
            let number = allocate_number(
                conn,
                &ctx.numbering,
                company,
                ctx.clock.today().year(),
                ctx.clock.now(),
            )
            .await?;
            working.offer_number = Some(number.to_string());
        }
    }

    let Some(change) = OfferPhaseMachine::advance(&working, target, phase_context(ctx))? else {
        let warnings = offer.warnings(ctx.settings.dw_income_tolerance);
        return Ok(OfferTransition {
            offer,
            activity: None,
            warnings,
        });
    };

    let saved = save_offer(conn, change.offer, offer.version, ctx.clock.now()).await?;
    let activity = insert_activity(
        conn,
        ctx,
        NewActivity::transition(ActivityTarget::Offer(saved.id), change.from, change.to),
        actor,
    )
    .await?;

    info!(
        offer_id = %saved.id,
        from = %change.from,
        to = %change.to,
        offer_number = ?saved.offer_number,
        user_id = %actor.user_id,
        "Offer phase changed"
    );

    let warnings = saved.warnings(ctx.settings.dw_income_tolerance);
    for warning in &warnings {
        warn!(offer_id = %saved.id, code = warning.code(), "Offer data-integrity warning");
    }

    Ok(OfferTransition {
        offer: saved,
        activity: Some(activity),
        warnings,
    })
}

/// Loads an offer, failing with `NotFound` when it does not exist.
pub(crate) async fn load_offer<C: ConnectionTrait>(conn: &C, id: OfferId) -> Result<Offer, LifecycleError> {
    let model = offers::Entity::find_by_id(id.0)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| LifecycleError::not_found("offer", id))?;
    offer_from_model(model)
}

/// Writes the lifecycle columns of `next` if the stored row is still at
/// `expected_version`. Synced columns are left alone.
pub(crate) async fn save_offer<C: ConnectionTrait>(
    conn: &C,
    mut next: Offer,
    expected_version: i32,
    now: DateTime<Utc>,
) -> Result<Offer, LifecycleError> {
    next.version = expected_version + 1;
    next.updated_at = now;

    let result = offers::Entity::update_many()
        .set(offer_to_active(&next))
        .filter(offers::Column::Id.eq(next.id.0))
        .filter(offers::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        warn!(offer_id = %next.id, expected_version, "Offer was modified concurrently");
        return Err(LifecycleError::conflict("offer", next.id));
    }
    Ok(next)
}
