// Service modules
pub mod campaign_service;
pub mod jwt_service;
pub mod wallet_service;

pub use campaign_service::CampaignService;
pub use jwt_service::JWTService;
pub use wallet_service::WalletService;
