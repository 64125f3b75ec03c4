//! Conversions between stored rows and core domain types.
//!
//! Reads normalize amounts to two decimals; SQLite hands them back as
//! floating point.

use kontrakt_core::activity::{Activity, ActivityTarget};
use kontrakt_core::budget::{BudgetItem, BudgetParent};
use kontrakt_core::deal::{Deal, DealStageHistory};
use kontrakt_core::error::LifecycleError;
use kontrakt_core::numbering::CompanyId;
use kontrakt_core::offer::{Offer, OrderExecution, WarehouseFigures};
use kontrakt_core::project::Project;
use kontrakt_shared::Currency;
use kontrakt_shared::types::{
    ActivityId, BudgetItemId, CustomerId, DealId, HistoryId, OfferId, ProjectId,
};
use rust_decimal::Decimal;
use sea_orm::{DbErr, Set};

use crate::entities::sea_orm_active_enums::{ActivityTargetType, BudgetParentType};
use crate::entities::{activities, budget_items, deal_stage_history, deals, offers, projects};

/// Wraps a store failure.
pub(crate) fn db_error(err: DbErr) -> LifecycleError {
    LifecycleError::Database(err.to_string())
}

fn amount(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Converts a deal row.
///
/// # Errors
///
/// `Database` if the stored currency is unknown.
pub fn deal_from_model(model: deals::Model) -> Result<Deal, LifecycleError> {
    let currency: Currency = model.currency.parse().map_err(|_| {
        LifecycleError::Database(format!(
            "deal {} has unknown currency '{}'",
            model.id, model.currency
        ))
    })?;

    Ok(Deal {
        id: DealId(model.id),
        title: model.title,
        customer_id: CustomerId(model.customer_id),
        company_id: CompanyId::new(&model.company_id),
        owner_id: model.owner_id,
        stage: model.stage.into(),
        probability: model.probability,
        value: amount(model.value),
        currency,
        expected_close_date: model.expected_close_date,
        actual_close_date: model.actual_close_date,
        lost_reason: model.lost_reason,
        loss_reason_category: model.loss_reason_category.map(Into::into),
        offer_id: model.offer_id.map(OfferId),
        notes: model.notes,
        version: model.version,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Builds a fully set active model for a deal.
#[must_use]
pub fn deal_to_active(deal: &Deal) -> deals::ActiveModel {
    deals::ActiveModel {
        id: Set(deal.id.0),
        title: Set(deal.title.clone()),
        customer_id: Set(deal.customer_id.0),
        company_id: Set(deal.company_id.as_str().to_string()),
        owner_id: Set(deal.owner_id.clone()),
        stage: Set(deal.stage.into()),
        probability: Set(deal.probability),
        value: Set(deal.value),
        currency: Set(deal.currency.code().to_string()),
        expected_close_date: Set(deal.expected_close_date),
        actual_close_date: Set(deal.actual_close_date),
        lost_reason: Set(deal.lost_reason.clone()),
        loss_reason_category: Set(deal.loss_reason_category.map(Into::into)),
        offer_id: Set(deal.offer_id.map(OfferId::into_inner)),
        notes: Set(deal.notes.clone()),
        version: Set(deal.version),
        created_at: Set(deal.created_at),
        updated_at: Set(deal.updated_at),
    }
}

/// Converts a stage history row.
#[must_use]
pub fn history_from_model(model: deal_stage_history::Model) -> DealStageHistory {
    DealStageHistory {
        id: HistoryId(model.id),
        deal_id: DealId(model.deal_id),
        from_stage: model.from_stage.map(Into::into),
        to_stage: model.to_stage.into(),
        changed_by_id: model.changed_by_id,
        changed_by_name: model.changed_by_name,
        notes: model.notes,
        changed_at: model.changed_at,
        deal_version: model.deal_version,
    }
}

/// Builds the active model for a new stage history row.
#[must_use]
pub fn history_to_active(history: &DealStageHistory) -> deal_stage_history::ActiveModel {
    deal_stage_history::ActiveModel {
        id: Set(history.id.0),
        deal_id: Set(history.deal_id.0),
        from_stage: Set(history.from_stage.map(Into::into)),
        to_stage: Set(history.to_stage.into()),
        changed_by_id: Set(history.changed_by_id.clone()),
        changed_by_name: Set(history.changed_by_name.clone()),
        notes: Set(history.notes.clone()),
        changed_at: Set(history.changed_at),
        deal_version: Set(history.deal_version),
    }
}

/// Converts an offer row.
///
/// # Errors
///
/// `Database` if the stored team member list is not a list of strings.
pub fn offer_from_model(model: offers::Model) -> Result<Offer, LifecycleError> {
    let execution = match model.health {
        Some(health) => {
            let team_members = match model.team_members {
                Some(json) => serde_json::from_value(json).map_err(|e| {
                    LifecycleError::Database(format!(
                        "offer {} has malformed team members: {e}",
                        model.id
                    ))
                })?,
                None => Vec::new(),
            };
            Some(OrderExecution {
                manager_id: model.manager_id,
                team_members,
                spent: model.spent.map_or(Decimal::ZERO, amount),
                invoiced: model.invoiced.map_or(Decimal::ZERO, amount),
                health: health.into(),
                completion_percent: model.completion_percent.unwrap_or(0),
                start_date: model.start_date,
                end_date: model.end_date,
                estimated_completion_date: model.estimated_completion_date,
            })
        }
        None => None,
    };

    Ok(Offer {
        id: OfferId(model.id),
        title: model.title,
        description: model.description,
        customer_id: model.customer_id.map(CustomerId),
        project_id: model.project_id.map(ProjectId),
        company_id: model.company_id.as_deref().map(CompanyId::new),
        responsible_user_id: model.responsible_user_id,
        offer_number: model.offer_number,
        phase: model.phase.into(),
        status: model.status.into(),
        probability: model.probability,
        value: amount(model.value),
        cost: amount(model.cost),
        margin_percent: amount(model.margin_percent),
        order_reserve: model.order_reserve.map(amount),
        sent_date: model.sent_date,
        expiration_date: model.expiration_date,
        execution,
        warehouse: WarehouseFigures {
            total_income: amount(model.dw_total_income),
            material_costs: amount(model.dw_material_costs),
            employee_costs: amount(model.dw_employee_costs),
            other_costs: amount(model.dw_other_costs),
            net_result: amount(model.dw_net_result),
            total_fixed_price: amount(model.dw_total_fixed_price),
            last_synced_at: model.dw_last_synced_at,
        },
        version: model.version,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Builds the active model for a new offer, synced figures included.
#[must_use]
pub fn offer_to_new_active(offer: &Offer) -> offers::ActiveModel {
    let warehouse = &offer.warehouse;
    offers::ActiveModel {
        dw_total_income: Set(warehouse.total_income),
        dw_material_costs: Set(warehouse.material_costs),
        dw_employee_costs: Set(warehouse.employee_costs),
        dw_other_costs: Set(warehouse.other_costs),
        dw_net_result: Set(warehouse.net_result),
        dw_total_fixed_price: Set(warehouse.total_fixed_price),
        dw_last_synced_at: Set(warehouse.last_synced_at),
        ..offer_to_active(offer)
    }
}

/// Builds an active model for the lifecycle columns of an offer.
///
/// The synced `dw_*` columns stay `NotSet`; the external sync owns them.
#[must_use]
pub fn offer_to_active(offer: &Offer) -> offers::ActiveModel {
    let execution = offer.execution.as_ref();
    offers::ActiveModel {
        id: Set(offer.id.0),
        title: Set(offer.title.clone()),
        description: Set(offer.description.clone()),
        customer_id: Set(offer.customer_id.map(CustomerId::into_inner)),
        project_id: Set(offer.project_id.map(ProjectId::into_inner)),
        company_id: Set(offer.company_id.as_ref().map(|c| c.as_str().to_string())),
        responsible_user_id: Set(offer.responsible_user_id.clone()),
        offer_number: Set(offer.offer_number.clone()),
        phase: Set(offer.phase.into()),
        status: Set(offer.status.into()),
        probability: Set(offer.probability),
        value: Set(offer.value),
        cost: Set(offer.cost),
        margin_percent: Set(offer.margin_percent),
        order_reserve: Set(offer.order_reserve),
        sent_date: Set(offer.sent_date),
        expiration_date: Set(offer.expiration_date),
        manager_id: Set(execution.and_then(|e| e.manager_id.clone())),
        team_members: Set(execution.map(|e| serde_json::Value::from(e.team_members.clone()))),
        spent: Set(execution.map(|e| e.spent)),
        invoiced: Set(execution.map(|e| e.invoiced)),
        health: Set(execution.map(|e| e.health.into())),
        completion_percent: Set(execution.map(|e| e.completion_percent)),
        start_date: Set(execution.and_then(|e| e.start_date)),
        end_date: Set(execution.and_then(|e| e.end_date)),
        estimated_completion_date: Set(execution.and_then(|e| e.estimated_completion_date)),
        version: Set(offer.version),
        created_at: Set(offer.created_at),
        updated_at: Set(offer.updated_at),
        ..Default::default()
    }
}

/// Converts a project row.
#[must_use]
pub fn project_from_model(model: projects::Model) -> Project {
    Project {
        id: ProjectId(model.id),
        name: model.name,
        customer_id: model.customer_id.map(CustomerId),
        company_id: model.company_id.as_deref().map(CompanyId::new),
        project_number: model.project_number,
        phase: model.phase.into(),
        deal_id: model.deal_id.map(DealId),
        version: model.version,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Builds a fully set active model for a project.
#[must_use]
pub fn project_to_active(project: &Project) -> projects::ActiveModel {
    projects::ActiveModel {
        id: Set(project.id.0),
        name: Set(project.name.clone()),
        customer_id: Set(project.customer_id.map(CustomerId::into_inner)),
        company_id: Set(project.company_id.as_ref().map(|c| c.as_str().to_string())),
        project_number: Set(project.project_number.clone()),
        phase: Set(project.phase.into()),
        deal_id: Set(project.deal_id.map(DealId::into_inner)),
        version: Set(project.version),
        created_at: Set(project.created_at),
        updated_at: Set(project.updated_at),
    }
}

/// Converts a budget item row.
#[must_use]
pub fn budget_item_from_model(model: budget_items::Model) -> BudgetItem {
    let parent = match model.parent_type {
        BudgetParentType::Offer => BudgetParent::Offer(OfferId(model.parent_id)),
        BudgetParentType::Project => BudgetParent::Project(ProjectId(model.parent_id)),
    };
    BudgetItem {
        id: BudgetItemId(model.id),
        parent,
        name: model.name,
        expected_cost: amount(model.expected_cost),
        expected_margin: amount(model.expected_margin),
        expected_revenue: amount(model.expected_revenue),
        expected_profit: amount(model.expected_profit),
        quantity: model.quantity,
        price_per_item: model.price_per_item.map(amount),
        description: model.description,
        display_order: model.display_order,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Builds a fully set active model for a budget item.
#[must_use]
pub fn budget_item_to_active(item: &BudgetItem) -> budget_items::ActiveModel {
    budget_items::ActiveModel {
        id: Set(item.id.0),
        parent_type: Set(item.parent.parent_type().into()),
        parent_id: Set(item.parent.id()),
        name: Set(item.name.clone()),
        expected_cost: Set(item.expected_cost),
        expected_margin: Set(item.expected_margin),
        expected_revenue: Set(item.expected_revenue),
        expected_profit: Set(item.expected_profit),
        quantity: Set(item.quantity),
        price_per_item: Set(item.price_per_item),
        description: Set(item.description.clone()),
        display_order: Set(item.display_order),
        created_at: Set(item.created_at),
        updated_at: Set(item.updated_at),
    }
}

/// Converts an activity row.
#[must_use]
pub fn activity_from_model(model: activities::Model) -> Activity {
    let target = match model.target_type {
        ActivityTargetType::Customer => ActivityTarget::Customer(CustomerId(model.target_id)),
        ActivityTargetType::Deal => ActivityTarget::Deal(DealId(model.target_id)),
        ActivityTargetType::Offer => ActivityTarget::Offer(OfferId(model.target_id)),
        ActivityTargetType::Project => ActivityTarget::Project(ProjectId(model.target_id)),
    };
    Activity {
        id: ActivityId(model.id),
        target,
        title: model.title,
        body: model.body,
        actor_id: model.actor_id,
        actor_name: model.actor_name,
        occurred_at: model.occurred_at,
    }
}

/// Builds the active model for a new activity row.
#[must_use]
pub fn activity_to_active(activity: &Activity) -> activities::ActiveModel {
    activities::ActiveModel {
        id: Set(activity.id.0),
        target_type: Set(activity.target.kind().into()),
        target_id: Set(activity.target.id()),
        title: Set(activity.title.clone()),
        body: Set(activity.body.clone()),
        actor_id: Set(activity.actor_id.clone()),
        actor_name: Set(activity.actor_name.clone()),
        occurred_at: Set(activity.occurred_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use kontrakt_core::offer::{OfferHealth, OfferPhase, OfferStatus};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::entities::sea_orm_active_enums;

    fn offer_row() -> offers::Model {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        offers::Model {
            id: Uuid::from_u128(1),
            title: "Hall".to_string(),
            description: None,
            customer_id: None,
            project_id: None,
            company_id: Some("stalbygg".to_string()),
            responsible_user_id: Some("u-1".to_string()),
            offer_number: Some("ST-2026-001".to_string()),
            phase: sea_orm_active_enums::OfferPhase::Order,
            status: sea_orm_active_enums::OfferStatus::Active,
            probability: 50,
            value: dec!(1000.000000001),
            cost: dec!(800),
            margin_percent: dec!(20),
            order_reserve: Some(dec!(1000)),
            sent_date: None,
            expiration_date: None,
            manager_id: Some("pm-1".to_string()),
            team_members: Some(serde_json::json!(["a", "b"])),
            spent: Some(dec!(0)),
            invoiced: Some(dec!(0)),
            health: Some(sea_orm_active_enums::OfferHealth::AtRisk),
            completion_percent: Some(40),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1),
            end_date: None,
            estimated_completion_date: None,
            dw_total_income: dec!(990),
            dw_material_costs: dec!(0),
            dw_employee_costs: dec!(0),
            dw_other_costs: dec!(0),
            dw_net_result: dec!(0),
            dw_total_fixed_price: dec!(0),
            dw_last_synced_at: Some(at),
            version: 3,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_offer_execution_present_when_health_set() {
        let offer = offer_from_model(offer_row()).unwrap();
        assert_eq!(offer.phase, OfferPhase::Order);
        assert_eq!(offer.status, OfferStatus::Active);
        assert_eq!(offer.value, dec!(1000));
        let execution = offer.execution.unwrap();
        assert_eq!(execution.health, OfferHealth::AtRisk);
        assert_eq!(execution.team_members, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(offer.company_id.unwrap().prefix(), "ST");
    }

    #[test]
    fn test_offer_without_health_has_no_execution() {
        let mut row = offer_row();
        row.health = None;
        assert!(offer_from_model(row).unwrap().execution.is_none());
    }

    #[test]
    fn test_offer_malformed_team_members() {
        let mut row = offer_row();
        row.team_members = Some(serde_json::json!({"lead": 1}));
        let err = offer_from_model(row).unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_lifecycle_update_leaves_synced_columns_unset() {
        let offer = offer_from_model(offer_row()).unwrap();
        let active = offer_to_active(&offer);
        assert!(active.dw_total_income.is_not_set());
        assert!(active.dw_last_synced_at.is_not_set());
        assert!(offer_to_new_active(&offer).dw_total_income.is_set());
    }

    #[test]
    fn test_unknown_currency_is_reported() {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let row = deals::Model {
            id: Uuid::from_u128(9),
            title: "Hall".to_string(),
            customer_id: Uuid::from_u128(2),
            company_id: "tak".to_string(),
            owner_id: "u-1".to_string(),
            stage: sea_orm_active_enums::DealStage::Lead,
            probability: 10,
            value: dec!(1),
            currency: "XXX".to_string(),
            expected_close_date: None,
            actual_close_date: None,
            lost_reason: String::new(),
            loss_reason_category: None,
            offer_id: None,
            notes: None,
            version: 1,
            created_at: at,
            updated_at: at,
        };
        assert!(deal_from_model(row).is_err());
    }
}
