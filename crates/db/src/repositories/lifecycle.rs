//! Lifecycle orchestrator for flows that span several entities.
//!
//! Each operation runs in one transaction: the phase change, its history
//! and any child entity commit together or not at all.

use kontrakt_core::access::Actor;
use kontrakt_core::activity::{ActivityTarget, NewActivity};
use kontrakt_core::budget::BudgetParent;
use kontrakt_core::deal::DealStage;
use kontrakt_core::error::LifecycleError;
use kontrakt_core::numbering::CompanyId;
use kontrakt_core::offer::{
    NewOffer, Offer, OfferPhase, OfferPhaseMachine, OfferService, OfferWarning,
    DEFAULT_OFFER_PROBABILITY,
};
use kontrakt_core::project::{NewProject, Project};
use kontrakt_shared::types::{DealId, OfferId};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::info;

use super::activity::insert_activity;
use super::budget_item::copy_items_in;
use super::deal::{load_deal, save_deal};
use super::offer::{OfferTransition, advance_offer, create_offer_in, load_offer, save_offer};
use super::project::{create_project_in, load_project};
use crate::context::LifecycleContext;
use crate::entities::deals;
use crate::mapping::db_error;

/// Options for accepting an offer.
#[derive(Debug, Clone, Default)]
pub struct AcceptOffer {
    /// Create a project for the order unless the offer already has one.
    pub create_project: bool,
    /// Name of the created project; defaults to the offer title.
    pub project_name: Option<String>,
    /// Project manager of the order.
    pub manager_id: Option<String>,
}

/// Result of accepting an offer.
#[derive(Debug, Clone)]
pub struct AcceptedOffer {
    /// The offer, now in `order`.
    pub offer: Offer,
    /// The linked project, created or pre-existing, when one was requested.
    pub project: Option<Project>,
    /// Data-integrity warnings for the order.
    pub warnings: Vec<OfferWarning>,
}

/// Cross-entity lifecycle operations.
#[derive(Debug, Clone)]
pub struct LifecycleService {
    ctx: LifecycleContext,
}

impl LifecycleService {
    /// Creates a new lifecycle service.
    #[must_use]
    pub const fn new(ctx: LifecycleContext) -> Self {
        Self { ctx }
    }

    /// Turns an offer into an order, optionally spawning its project.
    ///
    /// Accepting an offer that is already an order keeps its execution
    /// tracking as is.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the offer does not exist
    /// - `InvalidTransition` if `order` is unreachable from the current phase
    /// - `Forbidden` for a non-responsible actor without a manager role
    #[tracing::instrument(skip(self, options, actor), fields(offer_id = %offer_id))]
    pub async fn accept_offer(
        &self,
        offer_id: OfferId,
        options: AcceptOffer,
        actor: &Actor,
    ) -> Result<AcceptedOffer, LifecycleError> {
        let now = self.ctx.clock.now();
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let offer = load_offer(&txn, offer_id).await?;
        self.ctx
            .access
            .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;
        if !OfferPhaseMachine::can_transition(offer.phase, OfferPhase::Order) {
            return Err(LifecycleError::InvalidTransition(format!(
                "offer in phase {} cannot be accepted as an order",
                offer.phase
            )));
        }

        let accepted = advance_offer(&txn, &self.ctx, offer, OfferPhase::Order, actor)
            .await?
            .offer;

        let mut next = match options.manager_id {
            Some(manager_id) => OfferService::assign_manager(&accepted, manager_id)?,
            None => accepted.clone(),
        };

        let project = match (options.create_project, accepted.project_id) {
            (false, _) => None,
            (true, Some(project_id)) => Some(load_project(&txn, project_id).await?),
            (true, None) => {
                let deal_id = find_deal_for_offer(&txn, accepted.id).await?;
                let project = create_project_in(
                    &txn,
                    &self.ctx,
                    NewProject {
                        name: options
                            .project_name
                            .unwrap_or_else(|| accepted.title.clone()),
                        customer_id: accepted.customer_id,
                        company_id: accepted.company_id.clone(),
                        deal_id,
                    },
                    actor,
                )
                .await?;
                next.project_id = Some(project.id);
                Some(project)
            }
        };

        let offer = if next == accepted {
            accepted
        } else {
            save_offer(&txn, next, accepted.version, now).await?
        };

        txn.commit().await.map_err(db_error)?;

        info!(
            offer_id = %offer.id,
            project_id = ?project.as_ref().map(|project| project.id),
            user_id = %actor.user_id,
            "Offer accepted"
        );
        let warnings = offer.warnings(self.ctx.settings.dw_income_tolerance);
        Ok(AcceptedOffer {
            offer,
            project,
            warnings,
        })
    }

    /// Promotes a draft inquiry to a numbered offer in preparation.
    ///
    /// The given responsible user and company only fill fields the offer
    /// does not already have.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the offer is a draft
    /// - `InvalidArgument` if responsible user or company is still missing
    /// - `RetryExhausted` if the number could not be allocated
    #[tracing::instrument(skip(self, responsible_user_id, company_id, actor), fields(offer_id = %offer_id))]
    pub async fn convert_inquiry(
        &self,
        offer_id: OfferId,
        responsible_user_id: Option<String>,
        company_id: Option<CompanyId>,
        actor: &Actor,
    ) -> Result<OfferTransition, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let offer = load_offer(&txn, offer_id).await?;
        self.ctx
            .access
            .authorize(actor, offer.responsible_user_id.as_deref(), "offer")?;
        if offer.phase != OfferPhase::Draft {
            return Err(LifecycleError::InvalidState(format!(
                "only draft offers can be converted, offer is {}",
                offer.phase
            )));
        }

        let mut next = offer.clone();
        if next.responsible_user_id.is_none() {
            next.responsible_user_id = responsible_user_id;
        }
        if next.company_id.is_none() {
            next.company_id = company_id;
        }
        if next.responsible_user_id.is_none() {
            return Err(LifecycleError::InvalidArgument(
                "a responsible user is required to convert an inquiry".to_string(),
            ));
        }
        if next.company_id.is_none() {
            return Err(LifecycleError::InvalidArgument(
                "a company is required to convert an inquiry".to_string(),
            ));
        }

        let offer = if next == offer {
            offer
        } else {
            save_offer(&txn, next, offer.version, self.ctx.clock.now()).await?
        };
        let transition =
            advance_offer(&txn, &self.ctx, offer, OfferPhase::InProgress, actor).await?;

        txn.commit().await.map_err(db_error)?;

        info!(
            offer_id = %transition.offer.id,
            offer_number = ?transition.offer.offer_number,
            user_id = %actor.user_id,
            "Inquiry converted"
        );
        Ok(transition)
    }

    /// Creates a draft offer for a won deal and links it back to the deal.
    ///
    /// With a template, the template's budget items are copied and the
    /// offer's value and cost follow the copied budget.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the deal or the template does not exist
    /// - `InvalidState` unless the deal is won and has no offer yet
    #[tracing::instrument(skip(self, template, actor), fields(deal_id = %deal_id))]
    pub async fn create_offer_from_deal(
        &self,
        deal_id: DealId,
        template: Option<OfferId>,
        actor: &Actor,
    ) -> Result<Offer, LifecycleError> {
        let txn = self.ctx.db.begin().await.map_err(db_error)?;

        let deal = load_deal(&txn, deal_id).await?;
        self.ctx.access.authorize(actor, Some(&deal.owner_id), "deal")?;
        if deal.stage != DealStage::Won {
            return Err(LifecycleError::InvalidState(format!(
                "offers can only be created from won deals, deal is {}",
                deal.stage
            )));
        }
        if let Some(existing) = deal.offer_id {
            return Err(LifecycleError::InvalidState(format!(
                "deal already has offer {existing}"
            )));
        }

        let mut offer = create_offer_in(
            &txn,
            &self.ctx,
            NewOffer {
                title: deal.title.clone(),
                description: deal.notes.clone(),
                customer_id: Some(deal.customer_id),
                project_id: None,
                company_id: Some(deal.company_id.clone()),
                responsible_user_id: Some(deal.owner_id.clone()),
                probability: Some(DEFAULT_OFFER_PROBABILITY),
                value: deal.value,
                cost: Decimal::ZERO,
            },
            actor,
        )
        .await?;

        if let Some(template_id) = template {
            let copies = copy_items_in(
                &txn,
                &self.ctx,
                BudgetParent::Offer(template_id),
                BudgetParent::Offer(offer.id),
                actor,
            )
            .await?;
            if !copies.is_empty() {
                offer = load_offer(&txn, offer.id).await?;
            }
        }

        let mut linked = deal.clone();
        linked.offer_id = Some(offer.id);
        save_deal(&txn, linked, deal.version, self.ctx.clock.now()).await?;
        insert_activity(
            &txn,
            &self.ctx,
            NewActivity::new(ActivityTarget::Deal(deal.id), "Offer created from deal")
                .with_body(offer.id.to_string()),
            actor,
        )
        .await?;

        txn.commit().await.map_err(db_error)?;

        info!(
            deal_id = %deal.id,
            offer_id = %offer.id,
            template_id = ?template,
            user_id = %actor.user_id,
            "Offer created from deal"
        );
        Ok(offer)
    }
}

/// The deal that links `offer_id`, if any.
async fn find_deal_for_offer<C: ConnectionTrait>(
    conn: &C,
    offer_id: OfferId,
) -> Result<Option<DealId>, LifecycleError> {
    let deal = deals::Entity::find()
        .filter(deals::Column::OfferId.eq(offer_id.0))
        .one(conn)
        .await
        .map_err(db_error)?;
    Ok(deal.map(|model| DealId(model.id)))
}
