//! Lifecycle schema migration.
//!
//! Creates customers, deals with their stage history, offers, projects,
//! budget items, number sequences and the activity log. Built with the
//! schema builder so the same migration runs on PostgreSQL and SQLite.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        // ============================================================
        // PART 1: CUSTOMERS AND DEALS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Customers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Customers::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Customers::OrgNumber).string_len(32))
                    .col(timestamp(Customers::CreatedAt))
                    .col(timestamp(Customers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Deals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Deals::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Deals::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Deals::CompanyId).string_len(64).not_null())
                    .col(ColumnDef::new(Deals::OwnerId).string_len(128).not_null())
                    .col(ColumnDef::new(Deals::Stage).string_len(32).not_null())
                    .col(ColumnDef::new(Deals::Probability).integer().not_null())
                    .col(amount(backend, Deals::Value).not_null().default(0))
                    .col(ColumnDef::new(Deals::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Deals::ExpectedCloseDate).date())
                    .col(ColumnDef::new(Deals::ActualCloseDate).date())
                    .col(ColumnDef::new(Deals::LostReason).text().not_null().default(""))
                    .col(ColumnDef::new(Deals::LossReasonCategory).string_len(32))
                    .col(ColumnDef::new(Deals::OfferId).uuid())
                    .col(ColumnDef::new(Deals::Notes).text())
                    .col(ColumnDef::new(Deals::Version).integer().not_null().default(1))
                    .col(timestamp(Deals::CreatedAt))
                    .col(timestamp(Deals::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_customer")
                            .from(Deals::Table, Deals::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DealStageHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DealStageHistory::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(DealStageHistory::DealId).uuid().not_null())
                    .col(ColumnDef::new(DealStageHistory::FromStage).string_len(32))
                    .col(ColumnDef::new(DealStageHistory::ToStage).string_len(32).not_null())
                    .col(ColumnDef::new(DealStageHistory::ChangedById).string_len(128).not_null())
                    .col(ColumnDef::new(DealStageHistory::ChangedByName).string_len(255).not_null())
                    .col(ColumnDef::new(DealStageHistory::Notes).text())
                    .col(timestamp(DealStageHistory::ChangedAt))
                    .col(ColumnDef::new(DealStageHistory::DealVersion).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_stage_history_deal")
                            .from(DealStageHistory::Table, DealStageHistory::DealId)
                            .to(Deals::Table, Deals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One history row per deal version keeps the trail causally ordered
        manager
            .create_index(
                Index::create()
                    .name("uq_deal_stage_history_version")
                    .table(DealStageHistory::Table)
                    .col(DealStageHistory::DealId)
                    .col(DealStageHistory::DealVersion)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: OFFERS AND PROJECTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Offers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Offers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Offers::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Offers::Description).text())
                    .col(ColumnDef::new(Offers::CustomerId).uuid())
                    .col(ColumnDef::new(Offers::ProjectId).uuid())
                    .col(ColumnDef::new(Offers::CompanyId).string_len(64))
                    .col(ColumnDef::new(Offers::ResponsibleUserId).string_len(128))
                    .col(ColumnDef::new(Offers::OfferNumber).string_len(32))
                    .col(ColumnDef::new(Offers::Phase).string_len(32).not_null())
                    .col(ColumnDef::new(Offers::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Offers::Probability).integer().not_null())
                    .col(amount(backend, Offers::Value).not_null().default(0))
                    .col(amount(backend, Offers::Cost).not_null().default(0))
                    .col(amount(backend, Offers::MarginPercent).not_null().default(0))
                    .col(amount(backend, Offers::OrderReserve))
                    .col(ColumnDef::new(Offers::SentDate).date())
                    .col(ColumnDef::new(Offers::ExpirationDate).date())
                    .col(ColumnDef::new(Offers::ManagerId).string_len(128))
                    .col(ColumnDef::new(Offers::TeamMembers).json())
                    .col(amount(backend, Offers::Spent))
                    .col(amount(backend, Offers::Invoiced))
                    .col(ColumnDef::new(Offers::Health).string_len(32))
                    .col(ColumnDef::new(Offers::CompletionPercent).integer())
                    .col(ColumnDef::new(Offers::StartDate).date())
                    .col(ColumnDef::new(Offers::EndDate).date())
                    .col(ColumnDef::new(Offers::EstimatedCompletionDate).date())
                    .col(amount(backend, Offers::DwTotalIncome).not_null().default(0))
                    .col(amount(backend, Offers::DwMaterialCosts).not_null().default(0))
                    .col(amount(backend, Offers::DwEmployeeCosts).not_null().default(0))
                    .col(amount(backend, Offers::DwOtherCosts).not_null().default(0))
                    .col(amount(backend, Offers::DwNetResult).not_null().default(0))
                    .col(amount(backend, Offers::DwTotalFixedPrice).not_null().default(0))
                    .col(ColumnDef::new(Offers::DwLastSyncedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Offers::Version).integer().not_null().default(1))
                    .col(timestamp(Offers::CreatedAt))
                    .col(timestamp(Offers::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_offers_offer_number")
                    .table(Offers::Table)
                    .col(Offers::OfferNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Projects::CustomerId).uuid())
                    .col(ColumnDef::new(Projects::CompanyId).string_len(64))
                    .col(ColumnDef::new(Projects::ProjectNumber).string_len(32))
                    .col(ColumnDef::new(Projects::Phase).string_len(32).not_null())
                    .col(ColumnDef::new(Projects::DealId).uuid())
                    .col(ColumnDef::new(Projects::Version).integer().not_null().default(1))
                    .col(timestamp(Projects::CreatedAt))
                    .col(timestamp(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_projects_project_number")
                    .table(Projects::Table)
                    .col(Projects::ProjectNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: BUDGET ITEMS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(BudgetItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BudgetItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(BudgetItems::ParentType).string_len(16).not_null())
                    .col(ColumnDef::new(BudgetItems::ParentId).uuid().not_null())
                    .col(ColumnDef::new(BudgetItems::Name).string_len(255).not_null())
                    .col(amount(backend, BudgetItems::ExpectedCost).not_null())
                    .col(amount(backend, BudgetItems::ExpectedMargin).not_null())
                    .col(amount(backend, BudgetItems::ExpectedRevenue).not_null())
                    .col(amount(backend, BudgetItems::ExpectedProfit).not_null())
                    .col(amount(backend, BudgetItems::Quantity))
                    .col(amount(backend, BudgetItems::PricePerItem))
                    .col(ColumnDef::new(BudgetItems::Description).text())
                    .col(ColumnDef::new(BudgetItems::DisplayOrder).integer().not_null())
                    .col(timestamp(BudgetItems::CreatedAt))
                    .col(timestamp(BudgetItems::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_budget_items_parent")
                    .table(BudgetItems::Table)
                    .col(BudgetItems::ParentType)
                    .col(BudgetItems::ParentId)
                    .col(BudgetItems::DisplayOrder)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: NUMBER SEQUENCES AND ACTIVITY LOG
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(NumberSequences::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NumberSequences::Prefix).string_len(8).not_null())
                    .col(ColumnDef::new(NumberSequences::Year).integer().not_null())
                    .col(
                        ColumnDef::new(NumberSequences::LastSequence)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(timestamp(NumberSequences::UpdatedAt))
                    .primary_key(
                        Index::create()
                            .col(NumberSequences::Prefix)
                            .col(NumberSequences::Year),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activities::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Activities::TargetType).string_len(16).not_null())
                    .col(ColumnDef::new(Activities::TargetId).uuid().not_null())
                    .col(ColumnDef::new(Activities::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Activities::Body).text())
                    .col(ColumnDef::new(Activities::ActorId).string_len(128).not_null())
                    .col(ColumnDef::new(Activities::ActorName).string_len(255).not_null())
                    .col(timestamp(Activities::OccurredAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activities_target")
                    .table(Activities::Table)
                    .col(Activities::TargetType)
                    .col(Activities::TargetId)
                    .col(Activities::OccurredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NumberSequences::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetItems::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Offers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DealStageHistory::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Deals::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

/// Money column: `DECIMAL(15,2)` on PostgreSQL, `REAL` on SQLite.
fn amount<T: IntoIden>(backend: DbBackend, column: T) -> ColumnDef {
    let mut def = ColumnDef::new(column);
    if backend == DbBackend::Sqlite {
        def.double();
    } else {
        def.decimal_len(15, 2);
    }
    def
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    let mut def = ColumnDef::new(column);
    def.timestamp_with_time_zone().not_null();
    def
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Name,
    OrgNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Deals {
    Table,
    Id,
    Title,
    CustomerId,
    CompanyId,
    OwnerId,
    Stage,
    Probability,
    Value,
    Currency,
    ExpectedCloseDate,
    ActualCloseDate,
    LostReason,
    LossReasonCategory,
    OfferId,
    Notes,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DealStageHistory {
    Table,
    Id,
    DealId,
    FromStage,
    ToStage,
    ChangedById,
    ChangedByName,
    Notes,
    ChangedAt,
    DealVersion,
}

#[derive(DeriveIden)]
enum Offers {
    Table,
    Id,
    Title,
    Description,
    CustomerId,
    ProjectId,
    CompanyId,
    ResponsibleUserId,
    OfferNumber,
    Phase,
    Status,
    Probability,
    Value,
    Cost,
    MarginPercent,
    OrderReserve,
    SentDate,
    ExpirationDate,
    ManagerId,
    TeamMembers,
    Spent,
    Invoiced,
    Health,
    CompletionPercent,
    StartDate,
    EndDate,
    EstimatedCompletionDate,
    DwTotalIncome,
    DwMaterialCosts,
    DwEmployeeCosts,
    DwOtherCosts,
    DwNetResult,
    DwTotalFixedPrice,
    DwLastSyncedAt,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    Name,
    CustomerId,
    CompanyId,
    ProjectNumber,
    Phase,
    DealId,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BudgetItems {
    Table,
    Id,
    ParentType,
    ParentId,
    Name,
    ExpectedCost,
    ExpectedMargin,
    ExpectedRevenue,
    ExpectedProfit,
    Quantity,
    PricePerItem,
    Description,
    DisplayOrder,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NumberSequences {
    Table,
    Prefix,
    Year,
    LastSequence,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Activities {
    Table,
    Id,
    TargetType,
    TargetId,
    Title,
    Body,
    ActorId,
    ActorName,
    OccurredAt,
}
