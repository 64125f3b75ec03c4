//! `SeaORM` entity definitions for the lifecycle schema.

#![allow(missing_docs)]

pub mod activities;
pub mod budget_items;
pub mod customers;
pub mod deal_stage_history;
pub mod deals;
pub mod number_sequences;
pub mod offers;
pub mod projects;
pub mod sea_orm_active_enums;
