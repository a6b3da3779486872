//! Back-office endpoints. Every handler takes `AdminIdentity`, so non-admin tokens get 403.

use axum::{
    extract::{Path, State},
    Json,
};
use entity::sea_orm_active_enums::FloorPolicy;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::AdminIdentity,
    models::{
        campaign::{CreateTemplateRequest, TemplateRecord, TemplateResponse},
        common::SuccessResponse,
        wallet::{
            AdjustBalanceRequest, BalanceChangeData, BalanceChangeResponse, TransactionRecord,
        },
    },
    services::wallet_service::AppliedChange,
};

/// POST /api/v1/admin/wallets/{userId}/top-up
#[instrument(skip(state, admin, request))]
pub async fn top_up(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdjustBalanceRequest>,
) -> Result<Json<BalanceChangeResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let applied = state
        .wallet_service
        .top_up(
            admin.user_id,
            user_id,
            request.amount,
            &request.idempotency_key,
            request.note,
        )
        .await?;

    Ok(Json(balance_change_response(applied)))
}

/// POST /api/v1/admin/wallets/{userId}/deduct
#[instrument(skip(state, admin, request))]
pub async fn deduct(
    State(state): State<AppState>,
    AdminIdentity(admin): AdminIdentity,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdjustBalanceRequest>,
) -> Result<Json<BalanceChangeResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let applied = state
        .wallet_service
        .deduct(
            admin.user_id,
            user_id,
            request.amount,
            &request.idempotency_key,
            request.note,
        )
        .await?;

    Ok(Json(balance_change_response(applied)))
}

/// POST /api/v1/admin/campaign-templates
#[instrument(skip(state, _admin, request))]
pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<TemplateResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let template = state
        .campaign_service
        .create_template(
            &request.name,
            request.monthly_budget,
            request.floor_policy.unwrap_or(FloorPolicy::General),
        )
        .await?;

    Ok(Json(SuccessResponse::new(TemplateRecord::from(&template))))
}

/// POST /api/v1/admin/campaign-templates/{id}/deactivate
#[instrument(skip(state, _admin))]
pub async fn deactivate_template(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(template_id): Path<Uuid>,
) -> Result<Json<TemplateResponse>> {
    let template = state
        .campaign_service
        .deactivate_template(template_id)
        .await?;

    Ok(Json(SuccessResponse::new(TemplateRecord::from(&template))))
}

fn balance_change_response(applied: AppliedChange) -> BalanceChangeResponse {
    SuccessResponse::new(BalanceChangeData {
        transaction: TransactionRecord::from(applied.transaction),
        balance: applied.balance,
    })
}
