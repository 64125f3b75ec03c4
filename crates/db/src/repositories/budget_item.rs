//! Budget item repository.
//!
//! Items of an offer drive its financials: after every item mutation the
//! offer's value and cost are reset to the budget totals.

use kontrakt_core::access::Actor;
use kontrakt_core::budget::{
    BudgetItem, BudgetItemChanges, BudgetParent, BudgetService, BudgetSummary, NewBudgetItem,
};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::offer::OfferService;
use kontrakt_core::project::ProjectPhaseMachine;
use kontrakt_shared::types::BudgetItemId;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;

use super::offer::{load_offer, save_offer};
use super::project::load_project;
use crate::context::LifecycleContext;
use crate::entities::budget_items;
use crate::entities::sea_orm_active_enums::BudgetParentType;
use crate::mapping::{budget_item_from_model, budget_item_to_active, db_error};

/// Budget item repository for database operations.
#[derive(Debug, Clone)]
pub struct BudgetItemRepository {
    ctx: LifecycleContext,
}

impl BudgetItemRepository {
    /// Creates a new budget item repository.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Adds an item, appended after the last one unless a position is given.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent does not exist
    /// - `InvalidState` if the parent cannot be edited
    /// - `InvalidArgument` for a negative cost or a margin outside `0..100`
    pub async fn add_item(
        &self,
        parent: BudgetParent,
        input: NewBudgetItem,
        actor: &Actor,
    ) -> Result<BudgetItem, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        ensure_parent_editable(&txn, &self.ctx, parent, actor).await?;
        let existing = list_in(&txn, parent).await?;

        let item = BudgetService::create_item(
            BudgetItemId(self.ctx.next_uuid()),
            parent,
            input,
            &existing,
            self.ctx.clock.now(),
        )?;
        insert_item(&txn, &item).await?;
        resync_parent(&txn, &self.ctx, parent).await?;

        txn.commit().await.map_err(db_error)?;

        info!(item_id = %item.id, parent = %parent, user_id = %actor.user_id, "Budget item added");
        Ok(item)
    }

    /// Updates an item and re-derives its revenue and profit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the item does not exist
    /// - `InvalidState` if the parent cannot be edited
    /// - `InvalidArgument` for a negative cost or a margin outside `0..100`
    pub async fn update_item(
        &self,
        id: BudgetItemId,
        changes: BudgetItemChanges,
        actor: &Actor,
    ) -> Result<BudgetItem, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let item = load_item(&txn, id).await?;
        ensure_parent_editable(&txn, &self.ctx, item.parent, actor).await?;

        let next = BudgetService::apply_changes(&item, changes, self.ctx.clock.now())?;
        budget_items::Entity::update(budget_item_to_active(&next))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        resync_parent(&txn, &self.ctx, next.parent).await?;

        txn.commit().await.map_err(db_error)?;
        Ok(next)
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the item does not exist
    /// - `InvalidState` if the parent cannot be edited
    pub async fn delete_item(&self, id: BudgetItemId, actor: &Actor) -> Result<(), LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let item = load_item(&txn, id).await?;
        ensure_parent_editable(&txn, &self.ctx, item.parent, actor).await?;

        budget_items::Entity::delete_by_id(id.0)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        resync_parent(&txn, &self.ctx, item.parent).await?;

        txn.commit().await.map_err(db_error)?;

        info!(item_id = %id, parent = %item.parent, user_id = %actor.user_id, "Budget item deleted");
        Ok(())
    }

    /// Lists the items of a parent in display order.
    ///
    /// # Errors
    ///
    /// Returns `Database` on store failure.
    pub async fn list_items(&self, parent: BudgetParent) -> Result<Vec<BudgetItem>, LifecycleError> {
        list_in(&self.ctx.db, parent).await
    }

    /// Totals over the current items of a parent.
    ///
    /// # Errors
    ///
    /// Returns `Database` on store failure.
    pub async fn summarize(&self, parent: BudgetParent) -> Result<BudgetSummary, LifecycleError> {
        let items = list_in(&self.ctx.db, parent).await?;
        Ok(BudgetService::summarize(&items))
    }

    /// Reassigns every display position to follow `ordered`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` unless `ordered` holds exactly the parent's items
    /// - `InvalidState` if the parent cannot be edited
    pub async fn reorder_items(
        &self,
        parent: BudgetParent,
        ordered: &[BudgetItemId],
        actor: &Actor,
    ) -> Result<Vec<BudgetItem>, LifecycleError> {
        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        ensure_parent_editable(&txn, &self.ctx, parent, actor).await?;
        let current: Vec<BudgetItemId> = list_in(&txn, parent)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        for (id, position) in BudgetService::plan_reorder(&current, ordered)? {
            budget_items::Entity::update_many()
                .col_expr(budget_items::Column::DisplayOrder, Expr::value(position))
                .col_expr(budget_items::Column::UpdatedAt, Expr::value(now))
                .filter(budget_items::Column::Id.eq(id.0))
                .exec(&txn)
                .await
                .map_err(db_error)?;
        }

        let items = list_in(&txn, parent).await?;
        txn.commit().await.map_err(db_error)?;
        Ok(items)
    }

    /// Deep-copies every item of `from` onto `to`, after `to`'s own items.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either parent does not exist
    /// - `InvalidState` if `to` cannot be edited
    pub async fn copy_items(
        &self,
        from: BudgetParent,
        to: BudgetParent,
        actor: &Actor,
    ) -> Result<Vec<BudgetItem>, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;
        let copies = copy_items_in(&txn, &self.ctx, from, to, actor).await?;
        txn.commit().await.map_err(db_error)?;

        info!(from = %from, to = %to, count = copies.len(), "Budget items copied");
        Ok(copies)
    }
}

/// Copies items between parents inside the caller's transaction.
pub(crate) async fn copy_items_in<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    from: BudgetParent,
    to: BudgetParent,
    actor: &Actor,
) -> Result<Vec<BudgetItem>, LifecycleError> {
    ensure_parent_exists(conn, from).await?;
    ensure_parent_editable(conn, ctx, to, actor).await?;

    let source = list_in(conn, from).await?;
    if source.is_empty() {
        return Ok(Vec::new());
    }
    let offset = BudgetService::next_display_order(&list_in(conn, to).await?) - 1;

    let mut copies = BudgetService::copy_to(
        &source,
        to,
        || BudgetItemId(ctx.next_uuid()),
        ctx.clock.now(),
    );
    for copy in &mut copies {
        copy.display_order = copy.display_order.saturating_add(offset);
        insert_item(conn, copy).await?;
    }

    resync_parent(conn, ctx, to).await?;
    Ok(copies)
}

pub(crate) async fn list_in<C: ConnectionTrait>(
    conn: &C,
    parent: BudgetParent,
) -> Result<Vec<BudgetItem>, LifecycleError> {
    let parent_type: BudgetParentType = parent.parent_type().into();
    let rows = budget_items::Entity::find()
        .filter(budget_items::Column::ParentType.eq(parent_type))
        .filter(budget_items::Column::ParentId.eq(parent.id()))
        .order_by_asc(budget_items::Column::DisplayOrder)
        .order_by_asc(budget_items::Column::CreatedAt)
        .order_by_asc(budget_items::Column::Id)
        .all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(budget_item_from_model).collect())
}

async fn load_item<C: ConnectionTrait>(conn: &C, id: BudgetItemId) -> Result<BudgetItem, LifecycleError> {
    budget_items::Entity::find_by_id(id.0)
        .one(conn)
        .await
        .map_err(db_error)?
        .map(budget_item_from_model)
        .ok_or_else(|| LifecycleError::not_found("budget item", id))
}

async fn insert_item<C: ConnectionTrait>(conn: &C, item: &BudgetItem) -> Result<(), LifecycleError> {
    budget_items::Entity::insert(budget_item_to_active(item))
        .exec_without_returning(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

async fn ensure_parent_exists<C: ConnectionTrait>(
    conn: &C,
    parent: BudgetParent,
) -> Result<(), LifecycleError> {
    match parent {
        BudgetParent::Offer(id) => load_offer(conn, id).await.map(|_| ()),
        BudgetParent::Project(id) => load_project(conn, id).await.map(|_| ()),
    }
}

/// Offers must be open and modifiable by the actor; projects must be in an
/// editable phase.
async fn ensure_parent_editable<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    parent: BudgetParent,
    actor: &Actor,
) -> Result<(), LifecycleError> {
    match parent {
        BudgetParent::Offer(id) => {
            let offer = load_offer(conn, id).await?;
            ctx.access
                .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;
            if offer.phase.is_closed() {
                return Err(LifecycleError::InvalidState(format!(
                    "offer in phase {} cannot change its budget",
                    offer.phase
                )));
            }
            Ok(())
        }
        BudgetParent::Project(id) => {
            let project = load_project(conn, id).await?;
            ProjectPhaseMachine::ensure_editable(&project)
        }
    }
}

/// Resets an offer parent's value and cost to its budget totals.
async fn resync_parent<C: ConnectionTrait>(
    conn: &C,
    ctx: &LifecycleContext,
    parent: BudgetParent,
) -> Result<(), LifecycleError> {
    let BudgetParent::Offer(offer_id) = parent else {
        return Ok(());
    };

    let summary = BudgetService::summarize(&list_in(conn, parent).await?);
    let offer = load_offer(conn, offer_id).await?;
    if offer.value == summary.total_revenue && offer.cost == summary.total_cost {
        return Ok(());
    }

    let next = OfferService::update_financials(
        &offer,
        Some(summary.total_revenue),
        Some(summary.total_cost),
    )?;
    save_offer(conn, next, offer.version, ctx.clock.now()).await?;
    Ok(())
}
