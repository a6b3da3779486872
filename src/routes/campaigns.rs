use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::{
        campaign::{
            ChangeTierRequest, LaunchCampaignData, LaunchCampaignRequest, LaunchCampaignResponse,
            LaunchQuoteData, LaunchQuoteResponse, ParticipationRecord, ParticipationResponse,
            ParticipationsResponse, QuoteQuery, TemplateRecord, TemplatesResponse, TierChangeData,
            TierChangeResponse,
        },
        common::SuccessResponse,
        wallet::TransactionRecord,
    },
};

/// GET /api/v1/campaign-templates
#[instrument(skip(state, _identity))]
pub async fn list_templates(
    State(state): State<AppState>,
    _identity: UserIdentity,
) -> Result<Json<TemplatesResponse>> {
    let templates = state.campaign_service.list_templates().await?;

    Ok(Json(SuccessResponse::new(
        templates.iter().map(TemplateRecord::from).collect(),
    )))
}

/// GET /api/v1/campaigns/quote
#[instrument(skip(state, identity))]
pub async fn quote_launch(
    State(state): State<AppState>,
    identity: UserIdentity,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<LaunchQuoteResponse>> {
    let quote = state
        .campaign_service
        .quote_launch(identity.user_id, query.template_id)
        .await?;

    Ok(Json(SuccessResponse::new(LaunchQuoteData {
        template: TemplateRecord::from(&quote.template),
        reference_date: quote.reference_date,
        prorated_charge: quote.prorated_charge,
        next_billing_on: quote.next_billing_on,
        balance_check: quote.balance_check,
    })))
}

/// POST /api/v1/campaigns/launch
#[instrument(skip(state, identity, request))]
pub async fn launch_campaign(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<LaunchCampaignRequest>,
) -> Result<Json<LaunchCampaignResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let outcome = state
        .campaign_service
        .launch_campaign(identity.user_id, request.template_id, &request.idempotency_key)
        .await?;

    Ok(Json(SuccessResponse::new(LaunchCampaignData {
        participation: ParticipationRecord::from(&outcome.participation),
        transaction: TransactionRecord::from(outcome.transaction),
        balance: outcome.balance,
    })))
}

/// GET /api/v1/participations
#[instrument(skip(state, identity))]
pub async fn list_participations(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<ParticipationsResponse>> {
    let participations = state
        .campaign_service
        .list_participations(identity.user_id)
        .await?;

    Ok(Json(SuccessResponse::new(
        participations.iter().map(ParticipationRecord::from).collect(),
    )))
}

/// POST /api/v1/participations/{id}/tier
#[instrument(skip(state, identity, request))]
pub async fn change_tier(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(participation_id): Path<Uuid>,
    Json(request): Json<ChangeTierRequest>,
) -> Result<Json<TierChangeResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let outcome = state
        .campaign_service
        .change_tier(
            identity.user_id,
            participation_id,
            request.monthly_budget,
            &request.idempotency_key,
        )
        .await?;

    Ok(Json(SuccessResponse::new(TierChangeData {
        change: outcome.change,
        charged: outcome.charged,
        effective_on: outcome.effective_on,
        participation: ParticipationRecord::from(&outcome.participation),
        transaction: outcome.transaction.map(TransactionRecord::from),
    })))
}

/// POST /api/v1/participations/{id}/pause
#[instrument(skip(state, identity))]
pub async fn pause_participation(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(participation_id): Path<Uuid>,
) -> Result<Json<ParticipationResponse>> {
    let participation = state
        .campaign_service
        .pause(identity.user_id, participation_id)
        .await?;

    Ok(Json(SuccessResponse::new(ParticipationRecord::from(
        &participation,
    ))))
}

/// POST /api/v1/participations/{id}/resume
#[instrument(skip(state, identity))]
pub async fn resume_participation(
    State(state): State<AppState>,
    identity: UserIdentity,
    Path(participation_id): Path<Uuid>,
) -> Result<Json<ParticipationResponse>> {
    let participation = state
        .campaign_service
        .resume(identity.user_id, participation_id)
        .await?;

    Ok(Json(SuccessResponse::new(ParticipationRecord::from(
        &participation,
    ))))
}
