pub use super::balance_transactions::Entity as BalanceTransactions;
pub use super::campaign_participations::Entity as CampaignParticipations;
pub use super::campaign_templates::Entity as CampaignTemplates;
pub use super::wallets::Entity as Wallets;
