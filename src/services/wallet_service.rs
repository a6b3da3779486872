use crate::{
    clock::SharedClock,
    config::LedgerConfig,
    error::{ApiError, Result},
    ledger::validate_balance_change,
};
use anyhow::anyhow;
use entity::sea_orm_active_enums::{FloorPolicy, TransactionKind};
use sea_orm::{
    entity::*,
    query::*,
    sea_query::{Expr, OnConflict},
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_TRANSACTIONS_LIMIT: u64 = 50;
const MAX_TRANSACTIONS_LIMIT: u64 = 200;

pub struct WalletService {
    db: DatabaseConnection,
    config: LedgerConfig,
    clock: SharedClock,
}

/// Why a balance mutation happens; persisted on its ledger row
#[derive(Debug, Clone)]
pub struct ChangeContext {
    pub kind: TransactionKind,
    pub idempotency_key: String,
    pub reference_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
}

impl ChangeContext {
    pub fn new(kind: TransactionKind, idempotency_key: impl Into<String>) -> Self {
        Self {
            kind,
            idempotency_key: idempotency_key.into(),
            reference_id: None,
            actor_id: None,
            note: None,
        }
    }

    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }
}

/// A committed (or about to be committed, inside a caller's transaction) mutation
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub transaction: entity::balance_transactions::Model,
    pub balance: i64,
}

impl WalletService {
    pub fn new(db: DatabaseConnection, config: &LedgerConfig, clock: SharedClock) -> Self {
        Self {
            db,
            config: config.clone(),
            clock,
        }
    }

    pub fn floor_for(&self, policy: FloorPolicy) -> i64 {
        self.config.floor_for(policy)
    }

    /// Get a user's wallet, creating an empty one on first access
    #[instrument(skip(self))]
    pub async fn get_wallet(&self, user_id: Uuid) -> Result<entity::wallets::Model> {
        self.get_or_create_wallet(&self.db, user_id).await
    }

    /// Balance without creating a wallet; users who never had one sit at zero
    pub async fn current_balance(&self, user_id: Uuid) -> Result<i64> {
        let wallet = entity::wallets::Entity::find()
            .filter(entity::wallets::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        Ok(wallet.map_or(0, |w| w.balance))
    }

    pub async fn get_or_create_wallet<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
    ) -> Result<entity::wallets::Model> {
        if let Some(wallet) = entity::wallets::Entity::find()
            .filter(entity::wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
        {
            return Ok(wallet);
        }

        let now = self.clock.now();
        let new_wallet = entity::wallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            balance: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // Insert with ON CONFLICT DO NOTHING (race condition safety)
        entity::wallets::Entity::insert(new_wallet)
            .on_conflict(
                OnConflict::column(entity::wallets::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        entity::wallets::Entity::find()
            .filter(entity::wallets::Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to find wallet after upsert for user {}",
                    user_id
                ))
            })
    }

    /// Atomically replace the stored balance, but only if it still equals `expected`.
    ///
    /// Returns false when another writer got there first; nothing is written then.
    pub async fn compare_and_swap_balance<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: Uuid,
        expected: i64,
        new_balance: i64,
    ) -> Result<bool> {
        let result = entity::wallets::Entity::update_many()
            .col_expr(entity::wallets::Column::Balance, Expr::value(new_balance))
            .col_expr(entity::wallets::Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(entity::wallets::Column::UserId.eq(user_id))
            .filter(entity::wallets::Column::Balance.eq(expected))
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Apply a signed balance change in its own transaction
    #[instrument(
        skip(self, context),
        fields(kind = ?context.kind, key = %context.idempotency_key)
    )]
    pub async fn apply_change(
        &self,
        user_id: Uuid,
        delta: i64,
        policy: FloorPolicy,
        context: ChangeContext,
    ) -> Result<AppliedChange> {
        let txn = self.db.begin().await?;

        match self
            .apply_change_in_txn(user_id, delta, policy, context, &txn)
            .await
        {
            Ok(applied) => {
                txn.commit().await?;
                Ok(applied)
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e)
            }
        }
    }

    /// Apply a signed balance change within an existing transaction.
    ///
    /// Reads the balance, checks it against the policy's floor, then writes it back
    /// with a compare-and-swap. A stale write re-reads and retries up to
    /// `max_write_attempts` times. The ledger row is inserted in the same transaction,
    /// so if the caller rolls back, neither the balance nor the row survive.
    #[instrument(
        skip(self, context, txn),
        fields(kind = ?context.kind, key = %context.idempotency_key)
    )]
    pub async fn apply_change_in_txn(
        &self,
        user_id: Uuid,
        delta: i64,
        policy: FloorPolicy,
        context: ChangeContext,
        txn: &DatabaseTransaction,
    ) -> Result<AppliedChange> {
        if let Some(existing) = entity::balance_transactions::Entity::find()
            .filter(
                entity::balance_transactions::Column::IdempotencyKey
                    .eq(context.idempotency_key.as_str()),
            )
            .one(txn)
            .await?
        {
            return Err(ApiError::Conflict(format!(
                "Transaction {} already processed at {}",
                context.idempotency_key, existing.created_at
            )));
        }

        let floor = self.floor_for(policy);
        let max_attempts = self.config.max_write_attempts.max(1);
        let mut attempt: u8 = 0;

        let (balance_before, balance_after) = loop {
            attempt += 1;

            let wallet = self.get_or_create_wallet(txn, user_id).await?;
            let check = validate_balance_change(wallet.balance, delta, floor)?;

            if !check.approved {
                info!(
                    user_id = %user_id,
                    balance = wallet.balance,
                    delta,
                    resulting_balance = check.resulting_balance,
                    floor,
                    "Balance change rejected: floor exceeded"
                );
            }
            let resulting_balance = check.into_result()?;

            if self
                .compare_and_swap_balance(txn, user_id, wallet.balance, resulting_balance)
                .await?
            {
                break (wallet.balance, resulting_balance);
            }

            if attempt >= max_attempts {
                warn!(
                    user_id = %user_id,
                    attempts = attempt,
                    "Giving up on stale balance write"
                );
                return Err(ApiError::Conflict(format!(
                    "Balance for user {} changed concurrently, please retry",
                    user_id
                )));
            }

            debug!(user_id = %user_id, attempt, "Stale balance write, re-reading wallet");
        };

        // v7 ids keep ledger rows in insertion order
        let transaction_id = Uuid::now_v7();
        let new_transaction = entity::balance_transactions::ActiveModel {
            id: Set(transaction_id),
            user_id: Set(user_id),
            kind: Set(context.kind),
            amount: Set(delta),
            balance_before: Set(balance_before),
            balance_after: Set(balance_after),
            floor_applied: Set(floor),
            idempotency_key: Set(context.idempotency_key.clone()),
            reference_id: Set(context.reference_id),
            actor_id: Set(context.actor_id),
            note: Set(context.note.clone()),
            created_at: Set(self.clock.now()),
        };

        // A concurrent request with the same key may have committed since the check above
        let inserted = entity::balance_transactions::Entity::insert(new_transaction)
            .on_conflict(
                OnConflict::column(entity::balance_transactions::Column::IdempotencyKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        if inserted == 0 {
            return Err(ApiError::Conflict(format!(
                "Transaction {} already processed",
                context.idempotency_key
            )));
        }

        let transaction = entity::balance_transactions::Entity::find_by_id(transaction_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read balance transaction {} after insert",
                    transaction_id
                ))
            })?;

        info!(
            user_id = %user_id,
            kind = ?context.kind,
            delta,
            balance_before,
            balance_after,
            floor,
            "Applied balance change"
        );

        Ok(AppliedChange {
            transaction,
            balance: balance_after,
        })
    }

    /// Admin credit to a user's wallet
    #[instrument(skip(self, note))]
    pub async fn top_up(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        amount: i64,
        idempotency_key: &str,
        note: Option<String>,
    ) -> Result<AppliedChange> {
        if amount <= 0 {
            return Err(ApiError::BadRequest(format!(
                "Top-up amount must be positive, got {}",
                amount
            )));
        }

        let context = ChangeContext::new(TransactionKind::TopUp, idempotency_key)
            .with_actor(actor_id)
            .with_note(note);

        self.apply_change(user_id, amount, FloorPolicy::General, context)
            .await
    }

    /// Admin debit from a user's wallet, guarded by the general floor
    #[instrument(skip(self, note))]
    pub async fn deduct(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        amount: i64,
        idempotency_key: &str,
        note: Option<String>,
    ) -> Result<AppliedChange> {
        if amount <= 0 {
            return Err(ApiError::BadRequest(format!(
                "Deduction amount must be positive, got {}",
                amount
            )));
        }

        let context = ChangeContext::new(TransactionKind::Deduction, idempotency_key)
            .with_actor(actor_id)
            .with_note(note);

        self.apply_change(user_id, -amount, FloorPolicy::General, context)
            .await
    }

    /// Ledger rows for a user, newest first
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<entity::balance_transactions::Model>> {
        let limit = limit
            .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
            .clamp(1, MAX_TRANSACTIONS_LIMIT);

        let transactions = entity::balance_transactions::Entity::find()
            .filter(entity::balance_transactions::Column::UserId.eq(user_id))
            .order_by_desc(entity::balance_transactions::Column::CreatedAt)
            .order_by_desc(entity::balance_transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(transactions)
    }
}
