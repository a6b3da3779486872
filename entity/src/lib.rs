pub mod prelude;

pub mod balance_transactions;
pub mod campaign_participations;
pub mod campaign_templates;
pub mod sea_orm_active_enums;
pub mod wallets;
