use entity::sea_orm_active_enums::TransactionKind;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::SuccessResponse;

/// Admin request to credit or debit a user's wallet
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustBalanceRequest {
    #[validate(range(min = 1))]
    pub amount: i64,

    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: String,

    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub limit: Option<u64>,
}

pub type WalletResponse = SuccessResponse<WalletData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    pub user_id: uuid::Uuid,
    pub balance: i64,
    /// General wallet floor
    pub floor: i64,
    /// How far the balance can still drop before hitting the floor
    pub headroom: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

impl WalletData {
    pub fn new(wallet: &entity::wallets::Model, floor: i64) -> Self {
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
            floor,
            headroom: wallet.balance.saturating_sub(floor),
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: uuid::Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub floor_applied: i64,
    pub idempotency_key: String,
    pub reference_id: Option<uuid::Uuid>,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl From<entity::balance_transactions::Model> for TransactionRecord {
    fn from(model: entity::balance_transactions::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            amount: model.amount,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            floor_applied: model.floor_applied,
            idempotency_key: model.idempotency_key,
            reference_id: model.reference_id,
            note: model.note,
            created_at: model.created_at,
        }
    }
}

pub type TransactionsResponse = SuccessResponse<Vec<TransactionRecord>>;

pub type BalanceChangeResponse = SuccessResponse<BalanceChangeData>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeData {
    pub transaction: TransactionRecord,
    pub balance: i64,
}
