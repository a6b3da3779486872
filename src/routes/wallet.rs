use axum::{
    extract::{Query, State},
    Json,
};
use entity::sea_orm_active_enums::FloorPolicy;
use tracing::instrument;

use crate::{
    app_state::AppState,
    error::Result,
    middleware::UserIdentity,
    models::{
        common::SuccessResponse,
        wallet::{
            TransactionRecord, TransactionsQuery, TransactionsResponse, WalletData, WalletResponse,
        },
    },
};

/// GET /api/v1/wallet
#[instrument(skip(state, identity))]
pub async fn get_wallet(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<WalletResponse>> {
    let wallet = state.wallet_service.get_wallet(identity.user_id).await?;
    let floor = state.wallet_service.floor_for(FloorPolicy::General);

    Ok(Json(SuccessResponse::new(WalletData::new(&wallet, floor))))
}

/// GET /api/v1/wallet/transactions
#[instrument(skip(state, identity))]
pub async fn list_transactions(
    State(state): State<AppState>,
    identity: UserIdentity,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>> {
    let transactions = state
        .wallet_service
        .list_transactions(identity.user_id, query.limit)
        .await?;

    Ok(Json(SuccessResponse::new(
        transactions.into_iter().map(TransactionRecord::from).collect(),
    )))
}
