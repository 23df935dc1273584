use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::error::AttendanceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Trial,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    /// IANA zone name, e.g. "Asia/Jakarta"
    pub timezone: String,
    pub subscription_status: SubscriptionStatus,
}

impl Company {
    pub fn tz(&self) -> Result<Tz, AttendanceError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AttendanceError::InvalidTimezone(self.timezone.clone()))
    }

    /// Only paying or trialing tenants take part in the reconciliation sweep.
    pub fn is_sweepable(&self) -> bool {
        matches!(
            self.subscription_status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        )
    }
}
