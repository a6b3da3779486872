use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which configured balance floor guards a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum FloorPolicy {
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "campaign_template")]
    CampaignTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "top_up")]
    TopUp,
    #[sea_orm(string_value = "deduction")]
    Deduction,
    #[sea_orm(string_value = "campaign_launch")]
    CampaignLaunch,
    #[sea_orm(string_value = "tier_upgrade")]
    TierUpgrade,
}
