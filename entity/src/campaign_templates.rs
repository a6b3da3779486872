use super::sea_orm_active_enums::FloorPolicy;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub monthly_budget: i64,
    pub floor_policy: FloorPolicy,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::campaign_participations::Entity")]
    CampaignParticipations,
}

impl Related<super::campaign_participations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CampaignParticipations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
