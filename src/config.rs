use entity::sea_orm_active_enums::FloorPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Browser origins allowed to call the API (the marketplace front end)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Apply pending migrations on startup
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration_minutes: u64,
}

/// Balance floors and write policy for ledger mutations.
///
/// The floors are deliberately separate values: general wallet operations and
/// campaign templates flagged with `FloorPolicy::CampaignTemplate` have their own
/// minimum balance.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_general_floor")]
    pub general_floor: i64,
    #[serde(default = "default_campaign_template_floor")]
    pub campaign_template_floor: i64,
    /// Attempts at the conditional balance write before reporting a conflict
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u8,
}

impl LedgerConfig {
    pub fn floor_for(&self, policy: FloorPolicy) -> i64 {
        match policy {
            FloorPolicy::General => self.general_floor,
            FloorPolicy::CampaignTemplate => self.campaign_template_floor,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            general_floor: default_general_floor(),
            campaign_template_floor: default_campaign_template_floor(),
            max_write_attempts: default_max_write_attempts(),
        }
    }
}

/// Requests per window on rate-limited (mutating) routes, per role
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Turn the Redis limiter off entirely (local runs without Redis)
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    pub user_rpm: u32,
    pub consultant_rpm: u32,
    pub admin_rpm: u32,
    pub window_seconds: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_rpm: 30,
            consultant_rpm: 60,
            admin_rpm: 600,
            window_seconds: 60,
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_general_floor() -> i64 {
    -1000
}

fn default_campaign_template_floor() -> i64 {
    -2000
}

fn default_max_write_attempts() -> u8 {
    3
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("LEDGERGUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
