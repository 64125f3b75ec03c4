//! String-backed enums stored in lifecycle tables.
//!
//! Each mirrors a core enum; the `From` impls are the only conversion path.

use kontrakt_core::activity::ActivityTargetKind as CoreTargetKind;
use kontrakt_core::budget::BudgetParentType as CoreParentType;
use kontrakt_core::deal::{DealStage as CoreDealStage, LossReasonCategory as CoreLossReason};
use kontrakt_core::offer::{
    OfferHealth as CoreOfferHealth, OfferPhase as CoreOfferPhase, OfferStatus as CoreOfferStatus,
};
use kontrakt_core::project::ProjectPhase as CoreProjectPhase;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum DealStage {
    #[sea_orm(string_value = "lead")]
    Lead,
    #[sea_orm(string_value = "qualified")]
    Qualified,
    #[sea_orm(string_value = "proposal")]
    Proposal,
    #[sea_orm(string_value = "negotiation")]
    Negotiation,
    #[sea_orm(string_value = "won")]
    Won,
    #[sea_orm(string_value = "lost")]
    Lost,
}

impl From<CoreDealStage> for DealStage {
    fn from(stage: CoreDealStage) -> Self {
        match stage {
            CoreDealStage::Lead => Self::Lead,
            CoreDealStage::Qualified => Self::Qualified,
            CoreDealStage::Proposal => Self::Proposal,
            CoreDealStage::Negotiation => Self::Negotiation,
            CoreDealStage::Won => Self::Won,
            CoreDealStage::Lost => Self::Lost,
        }
    }
}

impl From<DealStage> for CoreDealStage {
    fn from(stage: DealStage) -> Self {
        match stage {
            DealStage::Lead => Self::Lead,
            DealStage::Qualified => Self::Qualified,
            DealStage::Proposal => Self::Proposal,
            DealStage::Negotiation => Self::Negotiation,
            DealStage::Won => Self::Won,
            DealStage::Lost => Self::Lost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum LossReasonCategory {
    #[sea_orm(string_value = "price")]
    Price,
    #[sea_orm(string_value = "timing")]
    Timing,
    #[sea_orm(string_value = "competitor")]
    Competitor,
    #[sea_orm(string_value = "requirements")]
    Requirements,
    #[sea_orm(string_value = "other")]
    Other,
}

impl From<CoreLossReason> for LossReasonCategory {
    fn from(reason: CoreLossReason) -> Self {
        match reason {
            CoreLossReason::Price => Self::Price,
            CoreLossReason::Timing => Self::Timing,
            CoreLossReason::Competitor => Self::Competitor,
            CoreLossReason::Requirements => Self::Requirements,
            CoreLossReason::Other => Self::Other,
        }
    }
}

impl From<LossReasonCategory> for CoreLossReason {
    fn from(reason: LossReasonCategory) -> Self {
        match reason {
            LossReasonCategory::Price => Self::Price,
            LossReasonCategory::Timing => Self::Timing,
            LossReasonCategory::Competitor => Self::Competitor,
            LossReasonCategory::Requirements => Self::Requirements,
            LossReasonCategory::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OfferPhase {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "order")]
    Order,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "lost")]
    Lost,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl From<CoreOfferPhase> for OfferPhase {
    fn from(phase: CoreOfferPhase) -> Self {
        match phase {
            CoreOfferPhase::Draft => Self::Draft,
            CoreOfferPhase::InProgress => Self::InProgress,
            CoreOfferPhase::Sent => Self::Sent,
            CoreOfferPhase::Order => Self::Order,
            CoreOfferPhase::Completed => Self::Completed,
            CoreOfferPhase::Lost => Self::Lost,
            CoreOfferPhase::Expired => Self::Expired,
        }
    }
}

impl From<OfferPhase> for CoreOfferPhase {
    fn from(phase: OfferPhase) -> Self {
        match phase {
            OfferPhase::Draft => Self::Draft,
            OfferPhase::InProgress => Self::InProgress,
            OfferPhase::Sent => Self::Sent,
            OfferPhase::Order => Self::Order,
            OfferPhase::Completed => Self::Completed,
            OfferPhase::Lost => Self::Lost,
            OfferPhase::Expired => Self::Expired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OfferStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl From<CoreOfferStatus> for OfferStatus {
    fn from(status: CoreOfferStatus) -> Self {
        match status {
            CoreOfferStatus::Active => Self::Active,
            CoreOfferStatus::Inactive => Self::Inactive,
            CoreOfferStatus::Archived => Self::Archived,
        }
    }
}

impl From<OfferStatus> for CoreOfferStatus {
    fn from(status: OfferStatus) -> Self {
        match status {
            OfferStatus::Active => Self::Active,
            OfferStatus::Inactive => Self::Inactive,
            OfferStatus::Archived => Self::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OfferHealth {
    #[sea_orm(string_value = "on_track")]
    OnTrack,
    #[sea_orm(string_value = "at_risk")]
    AtRisk,
    #[sea_orm(string_value = "delayed")]
    Delayed,
    #[sea_orm(string_value = "over_budget")]
    OverBudget,
}

impl From<CoreOfferHealth> for OfferHealth {
    fn from(health: CoreOfferHealth) -> Self {
        match health {
            CoreOfferHealth::OnTrack => Self::OnTrack,
            CoreOfferHealth::AtRisk => Self::AtRisk,
            CoreOfferHealth::Delayed => Self::Delayed,
            CoreOfferHealth::OverBudget => Self::OverBudget,
        }
    }
}

impl From<OfferHealth> for CoreOfferHealth {
    fn from(health: OfferHealth) -> Self {
        match health {
            OfferHealth::OnTrack => Self::OnTrack,
            OfferHealth::AtRisk => Self::AtRisk,
            OfferHealth::Delayed => Self::Delayed,
            OfferHealth::OverBudget => Self::OverBudget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProjectPhase {
    #[sea_orm(string_value = "tilbud")]
    Tilbud,
    #[sea_orm(string_value = "working")]
    Working,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl From<CoreProjectPhase> for ProjectPhase {
    fn from(phase: CoreProjectPhase) -> Self {
        match phase {
            CoreProjectPhase::Tilbud => Self::Tilbud,
            CoreProjectPhase::Working => Self::Working,
            CoreProjectPhase::OnHold => Self::OnHold,
            CoreProjectPhase::Completed => Self::Completed,
            CoreProjectPhase::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ProjectPhase> for CoreProjectPhase {
    fn from(phase: ProjectPhase) -> Self {
        match phase {
            ProjectPhase::Tilbud => Self::Tilbud,
            ProjectPhase::Working => Self::Working,
            ProjectPhase::OnHold => Self::OnHold,
            ProjectPhase::Completed => Self::Completed,
            ProjectPhase::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BudgetParentType {
    #[sea_orm(string_value = "offer")]
    Offer,
    #[sea_orm(string_value = "project")]
    Project,
}

impl From<CoreParentType> for BudgetParentType {
    fn from(parent: CoreParentType) -> Self {
        match parent {
            CoreParentType::Offer => Self::Offer,
            CoreParentType::Project => Self::Project,
        }
    }
}

impl From<BudgetParentType> for CoreParentType {
    fn from(parent: BudgetParentType) -> Self {
        match parent {
            BudgetParentType::Offer => Self::Offer,
            BudgetParentType::Project => Self::Project,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ActivityTargetType {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "deal")]
    Deal,
    #[sea_orm(string_value = "offer")]
    Offer,
    #[sea_orm(string_value = "project")]
    Project,
}

impl From<CoreTargetKind> for ActivityTargetType {
    fn from(kind: CoreTargetKind) -> Self {
        match kind {
            CoreTargetKind::Customer => Self::Customer,
            CoreTargetKind::Deal => Self::Deal,
            CoreTargetKind::Offer => Self::Offer,
            CoreTargetKind::Project => Self::Project,
        }
    }
}

impl From<ActivityTargetType> for CoreTargetKind {
    fn from(kind: ActivityTargetType) -> Self {
        match kind {
            ActivityTargetType::Customer => Self::Customer,
            ActivityTargetType::Deal => Self::Deal,
            ActivityTargetType::Offer => Self::Offer,
            ActivityTargetType::Project => Self::Project,
        }
    }
}
