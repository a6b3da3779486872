use super::sea_orm_active_enums::ParticipationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_participations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_id: Uuid,
    pub monthly_budget: i64,
    /// Downgraded budget waiting for the next billing cycle
    pub pending_monthly_budget: Option<i64>,
    pub status: ParticipationStatus,
    pub next_billing_on: TimeDate,
    pub started_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaign_templates::Entity",
        from = "Column::TemplateId",
        to = "super::campaign_templates::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    CampaignTemplates,
}

impl Related<super::campaign_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CampaignTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
