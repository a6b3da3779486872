use crate::{
    clock::SharedClock,
    error::{ApiError, Result},
    ledger::{
        classify_tier_change, compute_prorated_charge, next_cycle_start,
        validate_balance_change, TierChange, TierChangeKind,
    },
    services::wallet_service::{ChangeContext, WalletService},
};
use anyhow::anyhow;
use entity::sea_orm_active_enums::{FloorPolicy, ParticipationStatus, TransactionKind};
use sea_orm::{
    entity::*,
    query::*,
    sea_query::{Expr, OnConflict},
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub struct CampaignService {
    db: DatabaseConnection,
    wallet_service: Arc<WalletService>,
    clock: SharedClock,
}

/// Cost of launching a campaign on a given day, computed without writing anything
#[derive(Debug, Clone)]
pub struct LaunchQuote {
    pub template: entity::campaign_templates::Model,
    pub reference_date: time::Date,
    pub prorated_charge: i64,
    pub next_billing_on: time::Date,
    pub balance_check: crate::ledger::BalanceCheck,
}

#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub participation: entity::campaign_participations::Model,
    pub transaction: entity::balance_transactions::Model,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct TierChangeOutcome {
    pub change: TierChange,
    pub charged: i64,
    pub effective_on: time::Date,
    pub participation: entity::campaign_participations::Model,
    pub transaction: Option<entity::balance_transactions::Model>,
}

impl CampaignService {
    pub fn new(
        db: DatabaseConnection,
        wallet_service: Arc<WalletService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            db,
            wallet_service,
            clock,
        }
    }

    /// Publish a new campaign template (admin)
    #[instrument(skip(self))]
    pub async fn create_template(
        &self,
        name: &str,
        monthly_budget: i64,
        floor_policy: FloorPolicy,
    ) -> Result<entity::campaign_templates::Model> {
        if monthly_budget <= 0 {
            return Err(ApiError::BadRequest(format!(
                "Monthly budget must be positive, got {}",
                monthly_budget
            )));
        }

        let now = self.clock.now();
        let template_id = Uuid::new_v4();
        let new_template = entity::campaign_templates::ActiveModel {
            id: Set(template_id),
            name: Set(name.trim().to_string()),
            monthly_budget: Set(monthly_budget),
            floor_policy: Set(floor_policy),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = entity::campaign_templates::Entity::insert(new_template)
            .on_conflict(
                OnConflict::column(entity::campaign_templates::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            return Err(ApiError::Conflict(format!(
                "Campaign template '{}' already exists",
                name.trim()
            )));
        }

        info!(
            template_id = %template_id,
            monthly_budget,
            floor_policy = ?floor_policy,
            "Created campaign template"
        );

        self.find_template(&self.db, template_id).await
    }

    /// Active templates, cheapest tier first
    #[instrument(skip(self))]
    pub async fn list_templates(&self) -> Result<Vec<entity::campaign_templates::Model>> {
        let templates = entity::campaign_templates::Entity::find()
            .filter(entity::campaign_templates::Column::IsActive.eq(true))
            .order_by_asc(entity::campaign_templates::Column::MonthlyBudget)
            .order_by_asc(entity::campaign_templates::Column::Name)
            .all(&self.db)
            .await?;

        Ok(templates)
    }

    #[instrument(skip(self))]
    pub async fn get_template(
        &self,
        template_id: Uuid,
    ) -> Result<entity::campaign_templates::Model> {
        self.find_template(&self.db, template_id).await
    }

    /// Withdraw a template from sale (admin).
    ///
    /// Existing participations keep running; new launches and quotes are refused.
    /// Deactivating an inactive template is a no-op.
    #[instrument(skip(self))]
    pub async fn deactivate_template(
        &self,
        template_id: Uuid,
    ) -> Result<entity::campaign_templates::Model> {
        let template = self.find_template(&self.db, template_id).await?;
        if !template.is_active {
            return Ok(template);
        }

        entity::campaign_templates::Entity::update_many()
            .col_expr(
                entity::campaign_templates::Column::IsActive,
                Expr::value(false),
            )
            .col_expr(
                entity::campaign_templates::Column::UpdatedAt,
                Expr::value(self.clock.now()),
            )
            .filter(entity::campaign_templates::Column::Id.eq(template_id))
            .exec(&self.db)
            .await?;

        info!(template_id = %template_id, name = %template.name, "Deactivated campaign template");

        self.find_template(&self.db, template_id).await
    }

    fn ensure_available(template: &entity::campaign_templates::Model) -> Result<()> {
        if template.is_active {
            Ok(())
        } else {
            Err(ApiError::BadRequest(format!(
                "Campaign template {} is no longer available",
                template.id
            )))
        }
    }

    async fn find_template<C: ConnectionTrait>(
        &self,
        conn: &C,
        template_id: Uuid,
    ) -> Result<entity::campaign_templates::Model> {
        entity::campaign_templates::Entity::find_by_id(template_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Campaign template {} not found", template_id))
            })
    }

    /// Price a launch for today and preview its effect on the balance
    #[instrument(skip(self))]
    pub async fn quote_launch(&self, user_id: Uuid, template_id: Uuid) -> Result<LaunchQuote> {
        let template = self.get_template(template_id).await?;
        Self::ensure_available(&template)?;
        let balance = self.wallet_service.current_balance(user_id).await?;

        let reference_date = self.clock.today();
        let prorated_charge = compute_prorated_charge(template.monthly_budget, reference_date)?;
        let next_billing_on = next_cycle_start(reference_date)?;
        let floor = self.wallet_service.floor_for(template.floor_policy);
        let balance_check = validate_balance_change(balance, -prorated_charge, floor)?;

        Ok(LaunchQuote {
            template,
            reference_date,
            prorated_charge,
            next_billing_on,
            balance_check,
        })
    }

    /// Join a campaign template, charging the prorated remainder of the current month.
    ///
    /// The charge and the participation are committed together; a floor rejection or a
    /// second launch of the same template leaves nothing behind.
    #[instrument(skip(self))]
    pub async fn launch_campaign(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        idempotency_key: &str,
    ) -> Result<LaunchOutcome> {
        let txn = self.db.begin().await?;

        match self
            .launch_in_txn(user_id, template_id, idempotency_key, &txn)
            .await
        {
            Ok(outcome) => {
                txn.commit().await?;
                info!(
                    user_id = %user_id,
                    template_id = %template_id,
                    participation_id = %outcome.participation.id,
                    charge = -outcome.transaction.amount,
                    balance = outcome.balance,
                    "Launched campaign"
                );
                Ok(outcome)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn launch_in_txn(
        &self,
        user_id: Uuid,
        template_id: Uuid,
        idempotency_key: &str,
        txn: &DatabaseTransaction,
    ) -> Result<LaunchOutcome> {
        let template = self.find_template(txn, template_id).await?;
        Self::ensure_available(&template)?;

        let already_joined = entity::campaign_participations::Entity::find()
            .filter(entity::campaign_participations::Column::UserId.eq(user_id))
            .filter(entity::campaign_participations::Column::TemplateId.eq(template_id))
            .one(txn)
            .await?;

        if let Some(existing) = already_joined {
            return Err(ApiError::Conflict(format!(
                "Already participating in campaign template {} (participation {})",
                template_id, existing.id
            )));
        }

        let now = self.clock.now();
        let today = self.clock.today();
        let charge = compute_prorated_charge(template.monthly_budget, today)?;
        let next_billing_on = next_cycle_start(today)?;
        let participation_id = Uuid::new_v4();

        let context = ChangeContext::new(TransactionKind::CampaignLaunch, idempotency_key)
            .with_reference(participation_id)
            .with_note(Some(format!("Launch of '{}'", template.name)));

        let applied = self
            .wallet_service
            .apply_change_in_txn(user_id, -charge, template.floor_policy, context, txn)
            .await?;

        let new_participation = entity::campaign_participations::ActiveModel {
            id: Set(participation_id),
            user_id: Set(user_id),
            template_id: Set(template_id),
            monthly_budget: Set(template.monthly_budget),
            pending_monthly_budget: Set(None),
            status: Set(ParticipationStatus::Active),
            next_billing_on: Set(next_billing_on),
            started_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = entity::campaign_participations::Entity::insert(new_participation)
            .on_conflict(
                OnConflict::columns([
                    entity::campaign_participations::Column::UserId,
                    entity::campaign_participations::Column::TemplateId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        // A concurrent launch won; the caller rolls back the charge
        if inserted == 0 {
            return Err(ApiError::Conflict(format!(
                "Already participating in campaign template {}",
                template_id
            )));
        }

        let participation = self
            .find_participation(txn, user_id, participation_id)
            .await?;

        Ok(LaunchOutcome {
            participation,
            transaction: applied.transaction,
            balance: applied.balance,
        })
    }

    /// Participations of a user, newest first
    #[instrument(skip(self))]
    pub async fn list_participations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entity::campaign_participations::Model>> {
        let participations = entity::campaign_participations::Entity::find()
            .filter(entity::campaign_participations::Column::UserId.eq(user_id))
            .order_by_desc(entity::campaign_participations::Column::StartedAt)
            .all(&self.db)
            .await?;

        Ok(participations)
    }

    async fn find_participation<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        participation_id: Uuid,
    ) -> Result<entity::campaign_participations::Model> {
        // Someone else's participation is reported exactly like a missing one
        entity::campaign_participations::Entity::find_by_id(participation_id)
            .filter(entity::campaign_participations::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Participation {} not found", participation_id))
            })
    }

    /// Move a participation to a new monthly budget.
    ///
    /// Upgrades charge the difference now (against the template's floor) and apply
    /// immediately. Downgrades charge nothing and wait for the next billing cycle.
    /// Re-selecting the current budget cancels a pending downgrade.
    #[instrument(skip(self))]
    pub async fn change_tier(
        &self,
        user_id: Uuid,
        participation_id: Uuid,
        new_budget: i64,
        idempotency_key: &str,
    ) -> Result<TierChangeOutcome> {
        let txn = self.db.begin().await?;

        match self
            .change_tier_in_txn(user_id, participation_id, new_budget, idempotency_key, &txn)
            .await
        {
            Ok(outcome) => {
                txn.commit().await?;
                info!(
                    user_id = %user_id,
                    participation_id = %participation_id,
                    kind = ?outcome.change.kind,
                    difference = outcome.change.difference,
                    charged = outcome.charged,
                    effective_on = %outcome.effective_on,
                    "Changed campaign tier"
                );
                Ok(outcome)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    async fn change_tier_in_txn(
        &self,
        user_id: Uuid,
        participation_id: Uuid,
        new_budget: i64,
        idempotency_key: &str,
        txn: &DatabaseTransaction,
    ) -> Result<TierChangeOutcome> {
        let (participation, template) = entity::campaign_participations::Entity::find_by_id(
            participation_id,
        )
        .filter(entity::campaign_participations::Column::UserId.eq(user_id))
        .find_also_related(entity::campaign_templates::Entity)
        .one(txn)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Participation {} not found", participation_id))
        })?;

        let template = template.ok_or_else(|| {
            ApiError::Internal(anyhow!(
                "Participation {} references a missing template",
                participation_id
            ))
        })?;

        if participation.status != ParticipationStatus::Active {
            return Err(ApiError::Conflict(format!(
                "Participation {} is stopped; resume it before changing tier",
                participation_id
            )));
        }

        let change = classify_tier_change(participation.monthly_budget, new_budget)?;
        let today = self.clock.today();
        let now = self.clock.now();

        let (monthly_budget, pending_monthly_budget, effective_on) = match change.kind {
            TierChangeKind::Upgrade => (new_budget, None, today),
            TierChangeKind::Downgrade => (
                participation.monthly_budget,
                Some(new_budget),
                participation.next_billing_on,
            ),
            TierChangeKind::Unchanged => (participation.monthly_budget, None, today),
        };

        // Compare-and-swap on the budget so two concurrent tier changes cannot both apply
        let updated = entity::campaign_participations::Entity::update_many()
            .col_expr(
                entity::campaign_participations::Column::MonthlyBudget,
                Expr::value(monthly_budget),
            )
            .col_expr(
                entity::campaign_participations::Column::PendingMonthlyBudget,
                Expr::value(pending_monthly_budget),
            )
            .col_expr(
                entity::campaign_participations::Column::UpdatedAt,
                Expr::value(now),
            )
            .filter(entity::campaign_participations::Column::Id.eq(participation_id))
            .filter(
                entity::campaign_participations::Column::MonthlyBudget
                    .eq(participation.monthly_budget),
            )
            .filter(
                entity::campaign_participations::Column::Status.eq(ParticipationStatus::Active),
            )
            .exec(txn)
            .await?;

        if updated.rows_affected != 1 {
            return Err(ApiError::Conflict(format!(
                "Participation {} changed concurrently, please retry",
                participation_id
            )));
        }

        let charged = change.immediate_charge();
        let transaction = if charged > 0 {
            let context = ChangeContext::new(TransactionKind::TierUpgrade, idempotency_key)
                .with_reference(participation_id)
                .with_note(Some(format!(
                    "'{}' budget {} -> {}",
                    template.name, participation.monthly_budget, new_budget
                )));

            let applied = self
                .wallet_service
                .apply_change_in_txn(user_id, -charged, template.floor_policy, context, txn)
                .await?;
            Some(applied.transaction)
        } else {
            None
        };

        let participation = self
            .find_participation(txn, user_id, participation_id)
            .await?;

        Ok(TierChangeOutcome {
            change,
            charged,
            effective_on,
            participation,
            transaction,
        })
    }

    /// Stop billing a participation. The balance is left untouched.
    #[instrument(skip(self))]
    pub async fn pause(
        &self,
        user_id: Uuid,
        participation_id: Uuid,
    ) -> Result<entity::campaign_participations::Model> {
        self.transition(user_id, participation_id, ParticipationStatus::Stopped)
            .await
    }

    /// Re-enable billing for a stopped participation. Missed cycles are never charged.
    #[instrument(skip(self))]
    pub async fn resume(
        &self,
        user_id: Uuid,
        participation_id: Uuid,
    ) -> Result<entity::campaign_participations::Model> {
        self.transition(user_id, participation_id, ParticipationStatus::Active)
            .await
    }

    async fn transition(
        &self,
        user_id: Uuid,
        participation_id: Uuid,
        target: ParticipationStatus,
    ) -> Result<entity::campaign_participations::Model> {
        let participation = self
            .find_participation(&self.db, user_id, participation_id)
            .await?;

        // Same-status transitions are no-ops
        if participation.status == target {
            return Ok(participation);
        }

        let now = self.clock.now();
        let mut update = entity::campaign_participations::Entity::update_many()
            .col_expr(
                entity::campaign_participations::Column::Status,
                Expr::value(target),
            )
            .col_expr(
                entity::campaign_participations::Column::UpdatedAt,
                Expr::value(now),
            );

        if target == ParticipationStatus::Active {
            // A cycle that started while stopped is skipped, not billed late
            let today = self.clock.today();
            if participation.next_billing_on <= today {
                update = update.col_expr(
                    entity::campaign_participations::Column::NextBillingOn,
                    Expr::value(next_cycle_start(today)?),
                );
            }
        }

        let updated = update
            .filter(entity::campaign_participations::Column::Id.eq(participation_id))
            .filter(entity::campaign_participations::Column::Status.eq(participation.status))
            .exec(&self.db)
            .await?;

        if updated.rows_affected != 1 {
            return Err(ApiError::Conflict(format!(
                "Participation {} changed concurrently, please retry",
                participation_id
            )));
        }

        info!(
            user_id = %user_id,
            participation_id = %participation_id,
            from = ?participation.status,
            to = ?target,
            "Changed participation status"
        );

        self.find_participation(&self.db, user_id, participation_id)
            .await
    }
}
