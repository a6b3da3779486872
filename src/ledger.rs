//! Credit-ledger arithmetic and balance guards.
//!
//! Everything in this module is pure: callers pass in the current balance, the
//! proposed change and the reference date, and persist the outcome themselves.
//! Nothing here reads the clock or touches the database.

use serde::Serialize;
use time::{Date, Month};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Precondition violated by the caller (non-positive budget, overflow, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("This would bring the balance to {resulting_balance}, minimum allowed is {floor}")]
    FloorExceeded { resulting_balance: i64, floor: i64 },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    FloorExceeded,
}

/// Outcome of checking a proposed balance mutation against a floor.
///
/// `approved` is true exactly when `reason` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheck {
    pub approved: bool,
    pub resulting_balance: i64,
    pub floor: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
}

impl BalanceCheck {
    /// Turn a rejection into `LedgerError::FloorExceeded`, yielding the new balance otherwise
    pub fn into_result(self) -> LedgerResult<i64> {
        match self.reason {
            None => Ok(self.resulting_balance),
            Some(RejectionReason::FloorExceeded) => Err(LedgerError::FloorExceeded {
                resulting_balance: self.resulting_balance,
                floor: self.floor,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TierChangeKind {
    Upgrade,
    Downgrade,
    #[serde(rename = "none")]
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChange {
    pub kind: TierChangeKind,
    /// `new_budget - current_budget`
    pub difference: i64,
}

impl TierChange {
    /// Amount to charge right now: the difference for an upgrade, nothing otherwise.
    /// Downgrades only take effect from the next billing cycle.
    pub fn immediate_charge(&self) -> i64 {
        match self.kind {
            TierChangeKind::Upgrade => self.difference,
            TierChangeKind::Downgrade | TierChangeKind::Unchanged => 0,
        }
    }
}

/// Charge for the remainder of `reference_date`'s month, the reference day included.
///
/// `round(monthly_budget * remaining_days / days_in_month)` with halves rounded up,
/// never less than 1.
pub fn compute_prorated_charge(monthly_budget: i64, reference_date: Date) -> LedgerResult<i64> {
    if monthly_budget <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "monthly budget must be positive, got {}",
            monthly_budget
        )));
    }

    let days_in_month = i128::from(days_in_month(reference_date));
    let remaining_days = days_in_month - i128::from(reference_date.day()) + 1;

    // Integer half-up rounding; the product cannot overflow in i128
    let numerator = i128::from(monthly_budget) * remaining_days;
    let charge = (2 * numerator + days_in_month) / (2 * days_in_month);

    // charge <= monthly_budget, so it always fits back into i64
    let charge = i64::try_from(charge).map_err(|_| {
        LedgerError::InvalidArgument(format!("prorated charge out of range: {}", charge))
    })?;

    Ok(charge.max(1))
}

/// Check whether `current_balance + delta` stays at or above `floor`.
///
/// Credits use a positive delta, charges a negative one. The floor is always
/// supplied by the call site.
pub fn validate_balance_change(
    current_balance: i64,
    delta: i64,
    floor: i64,
) -> LedgerResult<BalanceCheck> {
    let resulting_balance = current_balance.checked_add(delta).ok_or_else(|| {
        LedgerError::InvalidArgument(format!(
            "balance change overflows: {} + {}",
            current_balance, delta
        ))
    })?;

    if resulting_balance >= floor {
        Ok(BalanceCheck {
            approved: true,
            resulting_balance,
            floor,
            reason: None,
        })
    } else {
        Ok(BalanceCheck {
            approved: false,
            resulting_balance,
            floor,
            reason: Some(RejectionReason::FloorExceeded),
        })
    }
}

pub fn classify_tier_change(current_budget: i64, new_budget: i64) -> LedgerResult<TierChange> {
    if current_budget < 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "current budget must not be negative, got {}",
            current_budget
        )));
    }
    if new_budget <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "new budget must be positive, got {}",
            new_budget
        )));
    }

    let difference = new_budget - current_budget;
    let kind = match difference.signum() {
        1 => TierChangeKind::Upgrade,
        -1 => TierChangeKind::Downgrade,
        _ => TierChangeKind::Unchanged,
    };

    Ok(TierChange { kind, difference })
}

/// First day of the month after `reference_date`: where the next billing cycle starts
pub fn next_cycle_start(reference_date: Date) -> LedgerResult<Date> {
    let (year, month) = match reference_date.month() {
        Month::December => (reference_date.year() + 1, Month::January),
        month => (reference_date.year(), month.next()),
    };

    Date::from_calendar_date(year, month, 1)
        .map_err(|e| LedgerError::InvalidArgument(format!("no next billing cycle: {}", e)))
}

fn days_in_month(date: Date) -> u8 {
    date.month().length(date.year())
}
