use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CampaignTemplates::Table)
                    .if_not_exists()
                    .col(pk_uuid(CampaignTemplates::Id))
                    .col(string_len(CampaignTemplates::Name, 255).not_null())
                    .col(
                        big_integer(CampaignTemplates::MonthlyBudget)
                            .not_null()
                            .check(Expr::col(CampaignTemplates::MonthlyBudget).gt(0)),
                    )
                    .col(
                        string_len(CampaignTemplates::FloorPolicy, 32)
                            .not_null()
                            .default("general"),
                    )
                    .col(boolean(CampaignTemplates::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone(CampaignTemplates::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CampaignTemplates::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaign_templates_name")
                    .table(CampaignTemplates::Table)
                    .col(CampaignTemplates::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CampaignParticipations::Table)
                    .if_not_exists()
                    .col(pk_uuid(CampaignParticipations::Id))
                    .col(uuid(CampaignParticipations::UserId).not_null())
                    .col(uuid(CampaignParticipations::TemplateId).not_null())
                    .col(
                        big_integer(CampaignParticipations::MonthlyBudget)
                            .not_null()
                            .check(Expr::col(CampaignParticipations::MonthlyBudget).gt(0)),
                    )
                    .col(big_integer_null(CampaignParticipations::PendingMonthlyBudget))
                    .col(
                        string_len(CampaignParticipations::Status, 16)
                            .not_null()
                            .default("active"),
                    )
                    .col(date(CampaignParticipations::NextBillingOn).not_null())
                    .col(timestamp_with_time_zone(CampaignParticipations::StartedAt).not_null())
                    .col(timestamp_with_time_zone(CampaignParticipations::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_participations_template_id")
                            .from(
                                CampaignParticipations::Table,
                                CampaignParticipations::TemplateId,
                            )
                            .to(CampaignTemplates::Table, CampaignTemplates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One tier per campaign context: a user joins each template at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_campaign_participations_user_template")
                    .table(CampaignParticipations::Table)
                    .col(CampaignParticipations::UserId)
                    .col(CampaignParticipations::TemplateId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_campaign_participations_status_billing")
                    .table(CampaignParticipations::Table)
                    .col(CampaignParticipations::Status)
                    .col(CampaignParticipations::NextBillingOn)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CampaignParticipations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CampaignTemplates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CampaignTemplates {
    Table,
    Id,
    Name,
    MonthlyBudget,
    FloorPolicy,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CampaignParticipations {
    Table,
    Id,
    UserId,
    TemplateId,
    MonthlyBudget,
    PendingMonthlyBudget,
    Status,
    NextBillingOn,
    StartedAt,
    UpdatedAt,
}
