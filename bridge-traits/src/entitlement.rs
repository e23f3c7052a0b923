//! Entitlement (subscription status) boundary.
//!
//! The status is derived elsewhere (billing); the core only reads it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current premium status of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementStatus {
    #[default]
    None,
    MonthlySubscription,
    YearlySubscription,
    MonthlyFreeTrial,
    YearlyFreeTrial,
}

impl EntitlementStatus {
    /// Any paid or trial plan unlocks premium features.
    pub fn is_premium(&self) -> bool {
        !matches!(self, EntitlementStatus::None)
    }

    pub fn is_trial(&self) -> bool {
        matches!(
            self,
            EntitlementStatus::MonthlyFreeTrial | EntitlementStatus::YearlyFreeTrial
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::None => "NONE",
            EntitlementStatus::MonthlySubscription => "MONTHLY_SUBSCRIPTION",
            EntitlementStatus::YearlySubscription => "YEARLY_SUBSCRIPTION",
            EntitlementStatus::MonthlyFreeTrial => "MONTHLY_FREE_TRIAL",
            EntitlementStatus::YearlyFreeTrial => "YEARLY_FREE_TRIAL",
        }
    }
}

impl fmt::Display for EntitlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only source of the current entitlement status.
pub trait EntitlementProvider: Send + Sync {
    fn status(&self) -> EntitlementStatus;
}

/// Provider that always reports a fixed status.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedEntitlement(pub EntitlementStatus);

impl EntitlementProvider for FixedEntitlement {
    fn status(&self) -> EntitlementStatus {
        self.0
    }
}
