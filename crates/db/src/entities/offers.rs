//! `SeaORM` Entity for offers table.
//!
//! Order execution is stored as nullable columns; `health` is non-null
//! exactly when execution tracking has started.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{OfferHealth, OfferPhase, OfferStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub company_id: Option<String>,
    pub responsible_user_id: Option<String>,
    #[sea_orm(unique)]
    pub offer_number: Option<String>,
    pub phase: OfferPhase,
    pub status: OfferStatus,
    pub probability: i32,
    pub value: Decimal,
    pub cost: Decimal,
    pub margin_percent: Decimal,
    pub order_reserve: Option<Decimal>,
    pub sent_date: Option<Date>,
    pub expiration_date: Option<Date>,
    pub manager_id: Option<String>,
    pub team_members: Option<Json>,
    pub spent: Option<Decimal>,
    pub invoiced: Option<Decimal>,
    pub health: Option<OfferHealth>,
    pub completion_percent: Option<i32>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub estimated_completion_date: Option<Date>,
    pub dw_total_income: Decimal,
    pub dw_material_costs: Decimal,
    pub dw_employee_costs: Decimal,
    pub dw_other_costs: Decimal,
    pub dw_net_result: Decimal,
    pub dw_total_fixed_price: Decimal,
    pub dw_last_synced_at: Option<DateTimeUtc>,
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
