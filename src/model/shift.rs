use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::shift_window::parse_clock;
use crate::error::AttendanceError;

/// Upper bound on grace periods an admin can configure.
pub const MAX_GRACE_PERIOD_MINUTES: u32 = 240;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Morning")]
    pub name: String,

    /// Wall-clock start in company time.
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,

    /// Wall-clock end; earlier than `start_time` means the shift wraps midnight.
    #[schema(example = "17:00:00", value_type = String)]
    pub end_time: NaiveTime,

    #[schema(example = 15)]
    pub grace_period_minutes: u32,

    pub is_default: bool,
}

impl Shift {
    pub fn wraps_midnight(&self) -> bool {
        self.end_time < self.start_time
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ShiftUpdate {
    #[schema(example = "Night")]
    pub name: Option<String>,
    #[schema(example = "22:00:00")]
    pub start_time: Option<String>,
    #[schema(example = "06:00:00")]
    pub end_time: Option<String>,
    #[schema(example = 10)]
    pub grace_period_minutes: Option<u32>,
    pub is_default: Option<bool>,
}

impl ShiftUpdate {
    /// Validates against the current shift and returns the merged result.
    /// The input shift is left untouched.
    pub fn merge(&self, current: &Shift) -> Result<Shift, AttendanceError> {
        if self.name.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.grace_period_minutes.is_none()
            && self.is_default.is_none()
        {
            return Err(AttendanceError::Validation("No fields provided for update".into()));
        }

        let mut next = current.clone();

        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AttendanceError::Validation("shift name cannot be empty".into()));
            }
            next.name = name.to_string();
        }
        if let Some(start) = &self.start_time {
            next.start_time = parse_clock(start)?;
        }
        if let Some(end) = &self.end_time {
            next.end_time = parse_clock(end)?;
        }
        if next.start_time == next.end_time {
            return Err(AttendanceError::Validation(
                "shift start and end cannot be equal".into(),
            ));
        }
        if let Some(grace) = self.grace_period_minutes {
            if grace > MAX_GRACE_PERIOD_MINUTES {
                return Err(AttendanceError::Validation(format!(
                    "grace period cannot exceed {MAX_GRACE_PERIOD_MINUTES} minutes"
                )));
            }
            next.grace_period_minutes = grace;
        }
        if let Some(is_default) = self.is_default {
            next.is_default = is_default;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn morning() -> Shift {
        Shift {
            id: 7,
            company_id: 1,
            name: "Morning".into(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            grace_period_minutes: 15,
            is_default: false,
        }
    }

    #[test]
    fn night_shift_wraps() {
        let update = ShiftUpdate {
            start_time: Some("22:00:00".into()),
            end_time: Some("06:00".into()),
            ..Default::default()
        };
        let merged = update.merge(&morning()).unwrap();
        assert!(merged.wraps_midnight());
        assert!(!morning().wraps_midnight());
    }

    #[test]
    fn equal_boundaries_are_rejected() {
        let update = ShiftUpdate {
            end_time: Some("09:00:00".into()),
            ..Default::default()
        };
        assert!(matches!(
            update.merge(&morning()),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[test]
    fn bad_clock_and_grace_are_rejected() {
        let bad_clock = ShiftUpdate {
            start_time: Some("25:00:00".into()),
            ..Default::default()
        };
        assert!(bad_clock.merge(&morning()).is_err());

        let bad_grace = ShiftUpdate {
            grace_period_minutes: Some(MAX_GRACE_PERIOD_MINUTES + 1),
            ..Default::default()
        };
        assert!(bad_grace.merge(&morning()).is_err());
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let update = ShiftUpdate {
            name: Some("  Early  ".into()),
            is_default: Some(true),
            ..Default::default()
        };
        let current = morning();
        let merged = update.merge(&current).unwrap();
        assert_eq!(merged.name, "Early");
        assert!(merged.is_default);
        assert_eq!(merged.start_time, current.start_time);
        assert_eq!(current.name, "Morning");
    }
}
