// Request/Response models
pub mod campaign;
pub mod common;
pub mod participation_ext; // Extension methods for entity::campaign_participations
pub mod wallet;
