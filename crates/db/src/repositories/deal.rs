//! Deal repository for pipeline stage transitions.
//!
//! Every write bumps the deal's `version` under an optimistic check and
//! appends the matching stage history row in the same transaction.

use chrono::{DateTime, Utc};
use kontrakt_core::access::Actor;
use kontrakt_core::activity::{ActivityTarget, NewActivity};
use kontrakt_core::deal::{
    Deal, DealChanges, DealService, DealStage, DealStageHistory, DealStageMachine,
    LossReasonCategory, NewDeal, StageChange,
};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::project::{NewProject, Project};
use kontrakt_shared::types::{DealId, HistoryId, OfferId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::{info, warn};

use super::activity::insert_activity;
use super::customer::ensure_customer;
use super::offer::{load_offer, save_offer};
use super::project::create_project_in;
use crate::context::LifecycleContext;
use crate::entities::{deal_stage_history, deals};
use crate::mapping::{deal_from_model, deal_to_active, db_error, history_from_model, history_to_active};

/// A deal after a stage operation, with the history row it produced.
#[derive(Debug, Clone)]
pub struct DealTransition {
    /// The deal as persisted.
    pub deal: Deal,
    /// The appended history row; `None` for the identity transition.
    pub history: Option<DealStageHistory>,
}

/// Result of winning a deal.
#[derive(Debug, Clone)]
pub struct WonDeal {
    /// The won deal.
    pub deal: Deal,
    /// The `negotiation → won` history row.
    pub history: DealStageHistory,
    /// The project created for the deal, if requested.
    pub project: Option<Project>,
}

/// Deal repository for database operations.
#[derive(Debug, Clone)]
pub struct DealRepository {
    ctx: LifecycleContext,
}

impl DealRepository {
    /// Creates a new deal repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Creates a deal in `lead` and writes its creation history row.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the customer does not exist
    /// - `InvalidArgument` for an empty title or a negative value
    pub async fn create_deal(&self, input: NewDeal, actor: &Actor) -> Result<Deal, LifecycleError> {
        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        ensure_customer(&txn, input.customer_id).await?;

        let deal = DealService::create(
            DealId(self.ctx.next_uuid()),
            input,
            actor,
            &self.ctx.settings,
            now,
        )?;
        deal_to_active(&deal).insert(&txn).await.map_err(db_error)?;

        let history = DealService::creation_history(HistoryId(self.ctx.next_uuid()), &deal, actor, now);
        insert_history(&txn, &history).await?;
        insert_activity(
            &txn,
            &self.ctx,
            NewActivity::new(ActivityTarget::Deal(deal.id), "Deal created"),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(deal_id = %deal.id, customer_id = %deal.customer_id, user_id = %actor.user_id, "Deal created");
        Ok(deal)
    }

    /// Finds a deal by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the deal does not exist.
    pub async fn find(&self, id: DealId) -> Result<Deal, LifecycleError> {
        load_deal(&self.ctx.db, id).await
    }

    /// Edits title, value, currency, expected close date or notes.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for a non-owner without a manager role
    /// - `ConcurrentModification` if the deal changed underneath
    pub async fn update_deal_details(
        &self,
        id: DealId,
        changes: DealChanges,
        actor: &Actor,
    ) -> Result<Deal, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;

        let next = DealService::apply_changes(&deal, changes)?;
        let saved = save_deal(&txn, next, deal.version, self.ctx.clock.now()).await?;

        txn.commit().await.map_err(db_error)?;
        Ok(saved)
    }

    /// Moves a deal along the pipeline.
    ///
    /// The identity transition succeeds without writing anything.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` for moves outside the transition table
    /// - `Forbidden` for a non-owner without a manager role
    /// - `ConcurrentModification` if the deal changed underneath
    #[tracing::instrument(skip_all, fields(deal_id = %id, target = %target))]
    pub async fn advance_stage(
        &self,
        id: DealId,
        target: DealStage,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<DealTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;

        let transition = advance_deal_in(&txn, &self.ctx, deal, target, notes, actor).await?;
        txn.commit().await.map_err(db_error)?;

        if let Some(history) = transition.history.as_ref() {
            log_transition(history, actor);
        }
        Ok(transition)
    }

    /// Wins a deal in negotiation, optionally creating its project.
    ///
    /// When the deal already links an offer without a project, that offer is
    /// attached to the new project.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless the deal is in negotiation
    /// - `Forbidden` for a non-owner without a manager role
    #[tracing::instrument(skip_all, fields(deal_id = %id, create_project = create_project))]
    pub async fn win_deal(
        &self,
        id: DealId,
        create_project: bool,
        actor: &Actor,
        notes: Option<String>,
    ) -> Result<WonDeal, LifecycleError> {
        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;

        let change = DealStageMachine::win(
            &deal,
            notes,
            &self.ctx.settings.probabilities,
            self.ctx.clock.today(),
        )?;
        let (deal, history) = record_stage_change(&txn, &self.ctx, change, actor).await?;

        let project = if create_project {
            let project = create_project_in(
                &txn,
                &self.ctx,
                NewProject {
                    name: deal.title.clone(),
                    customer_id: Some(deal.customer_id),
                    company_id: Some(deal.company_id.clone()),
                    deal_id: Some(deal.id),
                },
                actor,
            )
            .await?;

            if let Some(offer_id) = deal.offer_id {
                let offer = load_offer(&txn, offer_id).await?;
                if offer.project_id.is_none() {
                    let mut linked = offer.clone();
                    linked.project_id = Some(project.id);
                    save_offer(&txn, linked, offer.version, now).await?;
                }
            }
            Some(project)
        } else {
            None
        };

        txn.commit().await.map_err(db_error)?;

        log_transition(&history, actor);
        Ok(WonDeal {
            deal,
            history,
            project,
        })
    }

    /// Marks a deal as lost with a reason category and free-text notes.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the deal is already won or lost
    /// - `Forbidden` for a non-owner without a manager role
    #[tracing::instrument(skip_all, fields(deal_id = %id, category = %category))]
    pub async fn lose_deal(
        &self,
        id: DealId,
        category: LossReasonCategory,
        notes: &str,
        actor: &Actor,
    ) -> Result<DealTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;

        let change = DealStageMachine::lose(
            &deal,
            category,
            notes,
            &self.ctx.settings.probabilities,
            self.ctx.clock.today(),
        )?;
        let (deal, history) = record_stage_change(&txn, &self.ctx, change, actor).await?;
        txn.commit().await.map_err(db_error)?;

        log_transition(&history, actor);
        Ok(DealTransition {
            deal,
            history: Some(history),
        })
    }

    /// Returns a lost deal to `lead`.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the deal is lost
    /// - `Forbidden` for a non-owner without a manager role
    #[tracing::instrument(skip_all, fields(deal_id = %id))]
    pub async fn reopen_deal(&self, id: DealId, actor: &Actor) -> Result<DealTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;

        let change = DealStageMachine::reopen(&deal, &self.ctx.settings.probabilities)?;
        let (deal, history) = record_stage_change(&txn, &self.ctx, change, actor).await?;
        txn.commit().await.map_err(db_error)?;

        log_transition(&history, actor);
        Ok(DealTransition {
            deal,
            history: Some(history),
        })
    }

    /// Links an existing offer to a deal.
    ///
    /// Relinking the same offer is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the deal or the offer does not exist
    /// - `InvalidState` if the deal already links another offer
    /// - `Forbidden` for a non-owner without a manager role
    pub async fn link_offer(
        &self,
        id: DealId,
        offer_id: OfferId,
        actor: &Actor,
    ) -> Result<Deal, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;
        load_offer(&txn, offer_id).await?;

        match deal.offer_id {
            Some(existing) if existing == offer_id => return Ok(deal),
            Some(existing) => {
                return Err(LifecycleError::InvalidState(format!(
                    "deal {id} already links offer {existing}"
                )));
            }
            None => {}
        }

        let mut next = deal.clone();
        next.offer_id = Some(offer_id);
        let saved = save_deal(&txn, next, deal.version, self.ctx.clock.now()).await?;
        insert_activity(
            &txn,
            &self.ctx,
            NewActivity::new(ActivityTarget::Deal(id), "Offer linked").with_body(offer_id.to_string()),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(deal_id = %id, offer_id = %offer_id, user_id = %actor.user_id, "Offer linked to deal");
        Ok(saved)
    }

    /// Returns the stage history, most recent first, creation row included.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the deal does not exist.
    pub async fn stage_history(&self, id: DealId) -> Result<Vec<DealStageHistory>, LifecycleError> {
        load_deal(&self.ctx.db, id).await?;

        let rows = deal_stage_history::Entity::find()
            .filter(deal_stage_history::Column::DealId.eq(id.0))
            .order_by_desc(deal_stage_history::Column::ChangedAt)
            .order_by_desc(deal_stage_history::Column::DealVersion)
            .all(&self.ctx.db)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(history_from_model).collect())
    }
}

fn log_transition(history: &DealStageHistory, actor: &Actor) {
    info!(
        deal_id = %history.deal_id,
        from = ?history.from_stage,
        to = %history.to_stage,
        version = history.deal_version,
        user_id = %actor.user_id,
        "Deal stage changed"
    );
}

/// Loads a deal, failing with `NotFound` when it does not exist.
pub(crate) async fn load_deal<C: ConnectionTrait>(conn: &C, id: DealId) -> Result<Deal, LifecycleError> {
    let model = deals::Entity::find_by_id(id.0)
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| LifecycleError::not_found("deal", id))?;
    deal_from_model(model)
}

/// Writes `next` if the stored row is still at `expected_version`.
///
/// Returns the deal as written, version bumped.
pub(crate) async fn save_deal<C: ConnectionTrait>(
    conn: &C,
    mut next: Deal,
    expected_version: i32,
    now: DateTime<Utc>,
) -> Result<Deal, LifecycleError> {
    next.version = expected_version + 1;
    next.updated_at = now;

    let result = deals::Entity::update_many()
        .set(deal_to_active(&next))
        .filter(deals::Column::Id.eq(next.id.0))
        .filter(deals::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(db_error)?;

    if result.rows_affected == 0 {
        warn!(deal_id = %next.id, expected_version, "Deal was modified concurrently");
        return Err(LifecycleError::conflict("deal", next.id));
    }
    Ok(next)
}

async fn insert_history<C: ConnectionTrait>(
    conn: &C,
    history: &DealStageHistory,
) -> Result<(), LifecycleError> {
    deal_stage_history::Entity::insert(history_to_active(history))
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Moves an already loaded deal to `target` inside `conn`.
///
/// The write is guarded by the version `deal` was loaded at.
pub(crate) async fn advance_deal_in<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    deal: Deal,
    target: DealStage,
    notes: Option<String>,
    actor: &Actor,
) -> Result<DealTransition, LifecycleError> {
    let Some(change) = DealStageMachine::advance(
        &deal,
        target,
        notes,
        &ctx.settings.probabilities,
        ctx.clock.today(),
    )?
    else {
        return Ok(DealTransition { deal, history: None });
    };

    let (deal, history) = record_stage_change(conn, ctx, change, actor).await?;
    Ok(DealTransition {
        deal,
        history: Some(history),
    })
}

/// Persists a stage change and appends its history row.
pub(crate) async fn record_stage_change<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    change: StageChange,
    actor: &Actor,
) -> Result<(Deal, DealStageHistory), LifecycleError> {
    let now = ctx.clock.now();
    let expected_version = change.deal.version;
    let deal = save_deal(conn, change.deal.clone(), expected_version, now).await?;

    let change = StageChange {
        deal: deal.clone(),
        ..change
    };
    let history = DealService::change_history(HistoryId(ctx.next_uuid()), &change, actor, now);
    insert_history(conn, &history).await?;
    Ok((deal, history))
}

#[cfg(test)]
#[path = "deal_tests.rs"]
mod tests;
