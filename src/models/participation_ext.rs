/// Extension methods for campaign_participations entity
use entity::{campaign_participations, sea_orm_active_enums::ParticipationStatus};

pub trait ParticipationExt {
    /// Budget the next billing cycle charges: a pending downgrade wins over the current budget
    fn next_cycle_budget(&self) -> i64;

    /// Whether the external billing run should charge this participation
    fn is_billing(&self) -> bool;
}

impl ParticipationExt for campaign_participations::Model {
    fn next_cycle_budget(&self) -> i64 {
        self.pending_monthly_budget.unwrap_or(self.monthly_budget)
    }

    fn is_billing(&self) -> bool {
        self.status == ParticipationStatus::Active
    }
}
