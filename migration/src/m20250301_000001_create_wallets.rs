use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One wallet per user; balance may go negative down to the configured floor
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(pk_uuid(Wallets::Id))
                    .col(uuid(Wallets::UserId).not_null())
                    .col(big_integer(Wallets::Balance).not_null().default(0))
                    .col(timestamp_with_time_zone(Wallets::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Wallets::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallets_user_id")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BalanceTransactions::Table)
                    .if_not_exists()
                    .col(pk_uuid(BalanceTransactions::Id))
                    .col(uuid(BalanceTransactions::UserId).not_null())
                    .col(string_len(BalanceTransactions::Kind, 32).not_null())
                    .col(big_integer(BalanceTransactions::Amount).not_null())
                    .col(big_integer(BalanceTransactions::BalanceBefore).not_null())
                    .col(big_integer(BalanceTransactions::BalanceAfter).not_null())
                    .col(big_integer(BalanceTransactions::FloorApplied).not_null())
                    .col(string_len(BalanceTransactions::IdempotencyKey, 128).not_null())
                    .col(uuid_null(BalanceTransactions::ReferenceId))
                    .col(uuid_null(BalanceTransactions::ActorId))
                    .col(string_null(BalanceTransactions::Note))
                    .col(timestamp_with_time_zone(BalanceTransactions::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        // Idempotency: a retried mutation must never be applied twice
        manager
            .create_index(
                Index::create()
                    .name("idx_balance_transactions_idempotency_key")
                    .table(BalanceTransactions::Table)
                    .col(BalanceTransactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_balance_transactions_user_created")
                    .table(BalanceTransactions::Table)
                    .col(BalanceTransactions::UserId)
                    .col(BalanceTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BalanceTransactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    Balance,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BalanceTransactions {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    BalanceBefore,
    BalanceAfter,
    FloorApplied,
    IdempotencyKey,
    ReferenceId,
    ActorId,
    Note,
    CreatedAt,
}
