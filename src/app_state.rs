use crate::{
    clock::{SharedClock, SystemClock},
    config::Config,
    services::{CampaignService, JWTService, WalletService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: Arc<redis::Client>,
    pub jwt_service: Arc<JWTService>,
    pub wallet_service: Arc<WalletService>,
    pub campaign_service: Arc<CampaignService>,
    pub clock: SharedClock,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Lazily connects on first use
        let redis = redis::Client::open(config.redis.url.as_str())?;

        Ok(Self::from_parts(db, redis, config, Arc::new(SystemClock)))
    }

    /// Wire services around existing connections and a chosen clock
    pub fn from_parts(
        db: DatabaseConnection,
        redis: redis::Client,
        config: Config,
        clock: SharedClock,
    ) -> Self {
        let jwt_service = Arc::new(JWTService::new(Arc::new(config.auth.clone())));
        let wallet_service = Arc::new(WalletService::new(
            db.clone(),
            &config.ledger,
            clock.clone(),
        ));
        let campaign_service = Arc::new(CampaignService::new(
            db.clone(),
            wallet_service.clone(),
            clock.clone(),
        ));

        Self {
            db,
            redis: Arc::new(redis),
            jwt_service,
            wallet_service,
            campaign_service,
            clock,
            config: Arc::new(config),
        }
    }
}
