use crate::setup_test_db;
use entity::sea_orm_active_enums::{FloorPolicy, ParticipationStatus, TransactionKind};
use ledgerguard::{
    clock::{FixedClock, SharedClock},
    config::LedgerConfig,
    ledger::{RejectionReason, TierChangeKind},
    services::{CampaignService, WalletService},
    ApiError,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use time::macros::date;
use uuid::Uuid;

struct Services {
    wallets: Arc<WalletService>,
    campaigns: CampaignService,
}

/// Services frozen on a given calendar day
fn services_on(db: &DatabaseConnection, day: time::Date) -> Services {
    let clock: SharedClock = Arc::new(FixedClock::on(day));
    let wallets = Arc::new(WalletService::new(
        db.clone(),
        &LedgerConfig::default(),
        clock.clone(),
    ));
    let campaigns = CampaignService::new(db.clone(), wallets.clone(), clock);

    Services { wallets, campaigns }
}

fn key() -> String {
    format!("test-{}", Uuid::new_v4())
}

async fn fund(services: &Services, user_id: Uuid, amount: i64) {
    services
        .wallets
        .top_up(Uuid::new_v4(), user_id, amount, &key(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_and_list_templates() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));

    s.campaigns
        .create_template("Premium", 5000, FloorPolicy::CampaignTemplate)
        .await
        .unwrap();
    s.campaigns
        .create_template("Starter", 1000, FloorPolicy::General)
        .await
        .unwrap();

    let templates = s.campaigns.list_templates().await.unwrap();
    let names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Starter", "Premium"]);
    assert!(templates.iter().all(|t| t.is_active));

    let err = s
        .campaigns
        .create_template("Starter", 2000, FloorPolicy::General)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let err = s
        .campaigns
        .create_template("Free", 0, FloorPolicy::General)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let err = s.campaigns.get_template(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_quote_previews_without_writing() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::General)
        .await
        .unwrap();

    let quote = s.campaigns.quote_launch(user_id, template.id).await.unwrap();
    // 16 of June's 30 days remain
    assert_eq!(quote.prorated_charge, 1600);
    assert_eq!(quote.reference_date, date!(2024 - 06 - 15));
    assert_eq!(quote.next_billing_on, date!(2024 - 07 - 01));
    assert!(!quote.balance_check.approved);
    assert_eq!(quote.balance_check.resulting_balance, -1600);
    assert_eq!(quote.balance_check.floor, -1000);
    assert_eq!(
        quote.balance_check.reason,
        Some(RejectionReason::FloorExceeded)
    );

    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, 0);
    assert!(s
        .wallets
        .list_transactions(user_id, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_launch_charges_prorated_amount_against_template_floor() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::CampaignTemplate)
        .await
        .unwrap();

    let outcome = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();

    // Allowed below the general floor because the template carries the -2000 floor
    assert_eq!(outcome.balance, -1600);
    assert_eq!(outcome.transaction.kind, TransactionKind::CampaignLaunch);
    assert_eq!(outcome.transaction.amount, -1600);
    assert_eq!(outcome.transaction.floor_applied, -2000);
    assert_eq!(outcome.transaction.reference_id, Some(outcome.participation.id));

    let participation = &outcome.participation;
    assert_eq!(participation.user_id, user_id);
    assert_eq!(participation.monthly_budget, 3000);
    assert_eq!(participation.pending_monthly_budget, None);
    assert_eq!(participation.status, ParticipationStatus::Active);
    assert_eq!(participation.next_billing_on, date!(2024 - 07 - 01));

    // One tier per campaign context
    let err = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, -1600);
    assert_eq!(
        s.wallets.list_transactions(user_id, None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_rejected_launch_leaves_no_participation() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::General)
        .await
        .unwrap();

    let err = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::FloorExceeded {
            resulting_balance: -1600,
            floor: -1000
        }
    ));

    assert!(s
        .campaigns
        .list_participations(user_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, 0);

    // Once funded, the same launch goes through
    fund(&s, user_id, 1000).await;
    let outcome = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();
    assert_eq!(outcome.balance, -600);
}

#[tokio::test]
async fn test_launch_on_last_day_charges_one_day() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 02 - 29));
    let user_id = Uuid::new_v4();

    let template = s
        .campaigns
        .create_template("Leap", 2900, FloorPolicy::General)
        .await
        .unwrap();

    let outcome = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();
    assert_eq!(outcome.transaction.amount, -100);
    assert_eq!(outcome.participation.next_billing_on, date!(2024 - 03 - 01));
}

#[tokio::test]
async fn test_upgrade_downgrade_and_cancel() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();
    fund(&s, user_id, 5000).await;

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::CampaignTemplate)
        .await
        .unwrap();
    let launched = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();
    assert_eq!(launched.balance, 3400);
    let participation_id = launched.participation.id;

    // Upgrade: full difference now, effective today
    let upgrade = s
        .campaigns
        .change_tier(user_id, participation_id, 4000, &key())
        .await
        .unwrap();
    assert_eq!(upgrade.change.kind, TierChangeKind::Upgrade);
    assert_eq!(upgrade.change.difference, 1000);
    assert_eq!(upgrade.charged, 1000);
    assert_eq!(upgrade.effective_on, date!(2024 - 06 - 15));
    assert_eq!(upgrade.participation.monthly_budget, 4000);
    let transaction = upgrade.transaction.expect("upgrade records a transaction");
    assert_eq!(transaction.kind, TransactionKind::TierUpgrade);
    assert_eq!(transaction.balance_after, 2400);
    assert_eq!(transaction.reference_id, Some(participation_id));

    // Downgrade: nothing charged, waits for the next cycle
    let downgrade = s
        .campaigns
        .change_tier(user_id, participation_id, 2000, &key())
        .await
        .unwrap();
    assert_eq!(downgrade.change.kind, TierChangeKind::Downgrade);
    assert_eq!(downgrade.change.difference, -2000);
    assert_eq!(downgrade.charged, 0);
    assert!(downgrade.transaction.is_none());
    assert_eq!(downgrade.effective_on, date!(2024 - 07 - 01));
    assert_eq!(downgrade.participation.monthly_budget, 4000);
    assert_eq!(downgrade.participation.pending_monthly_budget, Some(2000));
    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, 2400);

    // Re-selecting the current budget cancels the pending downgrade
    let unchanged = s
        .campaigns
        .change_tier(user_id, participation_id, 4000, &key())
        .await
        .unwrap();
    assert_eq!(unchanged.change.kind, TierChangeKind::Unchanged);
    assert_eq!(unchanged.charged, 0);
    assert_eq!(unchanged.participation.pending_monthly_budget, None);
    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, 2400);
}

#[tokio::test]
async fn test_upgrade_past_floor_changes_nothing() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();

    let template = s
        .campaigns
        .create_template("Basic", 1000, FloorPolicy::CampaignTemplate)
        .await
        .unwrap();
    let launched = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();
    // 1000 * 16 / 30 = 533.33
    assert_eq!(launched.balance, -533);

    let err = s
        .campaigns
        .change_tier(user_id, launched.participation.id, 5000, &key())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::FloorExceeded {
            resulting_balance: -4533,
            floor: -2000
        }
    ));

    let participations = s.campaigns.list_participations(user_id).await.unwrap();
    assert_eq!(participations.len(), 1);
    assert_eq!(participations[0].monthly_budget, 1000);
    assert_eq!(s.wallets.get_wallet(user_id).await.unwrap().balance, -533);
}

#[tokio::test]
async fn test_tier_change_guards() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let owner = Uuid::new_v4();
    fund(&s, owner, 1000).await;

    let template = s
        .campaigns
        .create_template("Basic", 600, FloorPolicy::General)
        .await
        .unwrap();
    let participation_id = s
        .campaigns
        .launch_campaign(owner, template.id, &key())
        .await
        .unwrap()
        .participation
        .id;

    // Someone else's participation looks missing
    let err = s
        .campaigns
        .change_tier(Uuid::new_v4(), participation_id, 900, &key())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = s
        .campaigns
        .change_tier(owner, participation_id, 0, &key())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    s.campaigns.pause(owner, participation_id).await.unwrap();
    let err = s
        .campaigns
        .change_tier(owner, participation_id, 900, &key())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_pause_and_resume_never_touch_the_balance() {
    let (db, _dir) = setup_test_db().await;
    let june = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();
    fund(&june, user_id, 2000).await;

    let template = june
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::General)
        .await
        .unwrap();
    let launched = june
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap();
    let participation_id = launched.participation.id;

    let paused = june.campaigns.pause(user_id, participation_id).await.unwrap();
    assert_eq!(paused.status, ParticipationStatus::Stopped);

    // Pausing again is a no-op
    let paused_again = june.campaigns.pause(user_id, participation_id).await.unwrap();
    assert_eq!(paused_again.status, ParticipationStatus::Stopped);
    assert_eq!(paused_again.updated_at, paused.updated_at);

    // Resuming in August skips July instead of billing it late
    let august = services_on(&db, date!(2024 - 08 - 10));
    let resumed = august
        .campaigns
        .resume(user_id, participation_id)
        .await
        .unwrap();
    assert_eq!(resumed.status, ParticipationStatus::Active);
    assert_eq!(resumed.next_billing_on, date!(2024 - 09 - 01));

    let resumed_again = august
        .campaigns
        .resume(user_id, participation_id)
        .await
        .unwrap();
    assert_eq!(resumed_again.next_billing_on, date!(2024 - 09 - 01));

    assert_eq!(august.wallets.get_wallet(user_id).await.unwrap().balance, 400);
    assert_eq!(
        august
            .wallets
            .list_transactions(user_id, None)
            .await
            .unwrap()
            .len(),
        2
    );

    let err = august
        .campaigns
        .pause(Uuid::new_v4(), participation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_resume_within_cycle_keeps_billing_date() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();
    fund(&s, user_id, 2000).await;

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::General)
        .await
        .unwrap();
    let participation_id = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap()
        .participation
        .id;

    s.campaigns.pause(user_id, participation_id).await.unwrap();
    let resumed = s.campaigns.resume(user_id, participation_id).await.unwrap();
    assert_eq!(resumed.next_billing_on, date!(2024 - 07 - 01));
}

#[tokio::test]
async fn test_deactivated_template_is_hidden_and_refused() {
    let (db, _dir) = setup_test_db().await;
    let s = services_on(&db, date!(2024 - 06 - 15));
    let user_id = Uuid::new_v4();
    fund(&s, user_id, 5000).await;

    let template = s
        .campaigns
        .create_template("Growth", 3000, FloorPolicy::General)
        .await
        .unwrap();
    let running = s
        .campaigns
        .launch_campaign(user_id, template.id, &key())
        .await
        .unwrap()
        .participation;

    let deactivated = s.campaigns.deactivate_template(template.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert!(s.campaigns.list_templates().await.unwrap().is_empty());

    // Still readable by id
    let fetched = s.campaigns.get_template(template.id).await.unwrap();
    assert!(!fetched.is_active);

    // Deactivating twice is a no-op
    let again = s.campaigns.deactivate_template(template.id).await.unwrap();
    assert_eq!(again.updated_at, deactivated.updated_at);

    let err = s
        .campaigns
        .quote_launch(user_id, template.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let other_user = Uuid::new_v4();
    fund(&s, other_user, 5000).await;
    let err = s
        .campaigns
        .launch_campaign(other_user, template.id, &key())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert_eq!(s.wallets.get_wallet(other_user).await.unwrap().balance, 5000);
    assert!(s
        .campaigns
        .list_participations(other_user)
        .await
        .unwrap()
        .is_empty());

    // Existing participations keep running and can still change tier
    let upgrade = s
        .campaigns
        .change_tier(user_id, running.id, 4000, &key())
        .await
        .unwrap();
    assert_eq!(upgrade.change.kind, TierChangeKind::Upgrade);
    assert_eq!(upgrade.participation.status, ParticipationStatus::Active);

    let err = s
        .campaigns
        .deactivate_template(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
