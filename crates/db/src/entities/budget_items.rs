//! `SeaORM` Entity for budget_items table.
//!
//! `(parent_type, parent_id)` names the owning offer or project.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::BudgetParentType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_type: BudgetParentType,
    pub parent_id: Uuid,
    pub name: String,
    pub expected_cost: Decimal,
    pub expected_margin: Decimal,
    pub expected_revenue: Decimal,
    pub expected_profit: Decimal,
    pub quantity: Option<Decimal>,
    pub price_per_item: Option<Decimal>,
    pub description: Option<String>,
    pub display_order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
