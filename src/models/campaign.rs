use entity::sea_orm_active_enums::{FloorPolicy, ParticipationStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    common::{calendar_date, SuccessResponse},
    participation_ext::ParticipationExt,
    wallet::TransactionRecord,
};
use crate::ledger::{BalanceCheck, TierChange};

/// Admin request to publish a campaign template
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(range(min = 1))]
    pub monthly_budget: i64,

    pub floor_policy: Option<FloorPolicy>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: uuid::Uuid,
    pub name: String,
    pub monthly_budget: i64,
    pub floor_policy: FloorPolicy,
    pub is_active: bool,
}

impl From<&entity::campaign_templates::Model> for TemplateRecord {
    fn from(model: &entity::campaign_templates::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            monthly_budget: model.monthly_budget,
            floor_policy: model.floor_policy,
            is_active: model.is_active,
        }
    }
}

pub type TemplateResponse = SuccessResponse<TemplateRecord>;
pub type TemplatesResponse = SuccessResponse<Vec<TemplateRecord>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub template_id: uuid::Uuid,
}

pub type LaunchQuoteResponse = SuccessResponse<LaunchQuoteData>;

/// What launching a campaign today would cost, without committing anything
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchQuoteData {
    pub template: TemplateRecord,
    #[serde(with = "calendar_date")]
    pub reference_date: time::Date,
    pub prorated_charge: i64,
    #[serde(with = "calendar_date")]
    pub next_billing_on: time::Date,
    pub balance_check: BalanceCheck,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LaunchCampaignRequest {
    pub template_id: uuid::Uuid,

    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: String,
}

pub type LaunchCampaignResponse = SuccessResponse<LaunchCampaignData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchCampaignData {
    pub participation: ParticipationRecord,
    pub transaction: TransactionRecord,
    pub balance: i64,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRecord {
    pub id: uuid::Uuid,
    pub template_id: uuid::Uuid,
    pub monthly_budget: i64,
    pub pending_monthly_budget: Option<i64>,
    /// Budget the next billing cycle will charge
    pub next_cycle_budget: i64,
    pub status: ParticipationStatus,
    /// Whether the monthly billing run charges this participation
    pub billing: bool,
    #[serde(with = "calendar_date")]
    pub next_billing_on: time::Date,
}

impl From<&entity::campaign_participations::Model> for ParticipationRecord {
    fn from(model: &entity::campaign_participations::Model) -> Self {
        Self {
            id: model.id,
            template_id: model.template_id,
            monthly_budget: model.monthly_budget,
            pending_monthly_budget: model.pending_monthly_budget,
            next_cycle_budget: model.next_cycle_budget(),
            status: model.status,
            billing: model.is_billing(),
            next_billing_on: model.next_billing_on,
        }
    }
}

pub type ParticipationResponse = SuccessResponse<ParticipationRecord>;
pub type ParticipationsResponse = SuccessResponse<Vec<ParticipationRecord>>;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangeTierRequest {
    #[validate(range(min = 1))]
    pub monthly_budget: i64,

    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: String,
}

pub type TierChangeResponse = SuccessResponse<TierChangeData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChangeData {
    pub change: TierChange,
    /// Charged immediately (upgrades only)
    pub charged: i64,
    #[serde(with = "calendar_date")]
    pub effective_on: time::Date,
    pub participation: ParticipationRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionRecord>,
}
