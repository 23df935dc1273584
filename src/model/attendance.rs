use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Every status an attendance row can carry. Stored as the serialized string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum AttendanceStatus {
    #[serde(rename = "on_time")]
    #[strum(serialize = "on_time")]
    OnTime,
    #[serde(rename = "late")]
    #[strum(serialize = "late")]
    Late,
    #[serde(rename = "present")]
    #[strum(serialize = "present")]
    Present,
    #[serde(rename = "overtime_in")]
    #[strum(serialize = "overtime_in")]
    OvertimeIn,
    #[serde(rename = "overtime_out")]
    #[strum(serialize = "overtime_out")]
    OvertimeOut,
    #[serde(rename = "absent")]
    #[strum(serialize = "absent")]
    Absent,
    #[serde(rename = "on_leave")]
    #[strum(serialize = "on_leave")]
    OnLeave,
    #[serde(rename = "on_sick")]
    #[strum(serialize = "on_sick")]
    OnSick,
    #[serde(rename = "incomplete")]
    #[strum(serialize = "incomplete")]
    Incomplete,
    #[serde(rename = "present (corrected)")]
    #[strum(serialize = "present (corrected)")]
    PresentCorrected,
}

/// The two independent per-employee state tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Regular,
    Overtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AttendanceEvent {
    #[strum(serialize = "check_in")]
    CheckIn { late: bool },
    #[strum(serialize = "check_out")]
    CheckOut,
    #[strum(serialize = "overtime_check_in")]
    OvertimeCheckIn,
    #[strum(serialize = "overtime_check_out")]
    OvertimeCheckOut,
    #[strum(serialize = "mark_incomplete")]
    MarkIncomplete,
    #[strum(serialize = "mark_absent")]
    MarkAbsent,
    #[strum(serialize = "mark_on_leave")]
    MarkOnLeave,
    #[strum(serialize = "mark_on_sick")]
    MarkOnSick,
    #[strum(serialize = "admin_correct")]
    AdminCorrect,
}

impl AttendanceStatus {
    pub fn track(self) -> Track {
        match self {
            AttendanceStatus::OvertimeIn | AttendanceStatus::OvertimeOut => Track::Overtime,
            _ => Track::Regular,
        }
    }

    /// Statuses that still expect a check-out.
    pub fn awaits_check_out(self) -> bool {
        matches!(
            self,
            AttendanceStatus::OnTime | AttendanceStatus::Late | AttendanceStatus::OvertimeIn
        )
    }

    /// Counts as "showed up" on the dashboard.
    pub fn is_present(self) -> bool {
        matches!(
            self,
            AttendanceStatus::OnTime
                | AttendanceStatus::Late
                | AttendanceStatus::Present
                | AttendanceStatus::PresentCorrected
        )
    }

    /// Status of a record created by `event`, if that event may create one.
    pub fn initial(event: AttendanceEvent) -> Option<AttendanceStatus> {
        use AttendanceEvent as E;
        use AttendanceStatus as S;
        match event {
            E::CheckIn { late: false } => Some(S::OnTime),
            E::CheckIn { late: true } => Some(S::Late),
            E::OvertimeCheckIn => Some(S::OvertimeIn),
            E::MarkAbsent => Some(S::Absent),
            E::MarkOnLeave => Some(S::OnLeave),
            E::MarkOnSick => Some(S::OnSick),
            E::AdminCorrect => Some(S::PresentCorrected),
            E::CheckOut | E::OvertimeCheckOut | E::MarkIncomplete => None,
        }
    }

    /// Transition table for existing records. `None` means the event is illegal here.
    pub fn next(self, event: AttendanceEvent) -> Option<AttendanceStatus> {
        use AttendanceEvent as E;
        use AttendanceStatus as S;
        match (self, event) {
            (S::OnTime | S::Late, E::CheckOut) => Some(S::Present),
            (S::OvertimeIn, E::OvertimeCheckOut) => Some(S::OvertimeOut),
            (S::OnTime | S::Late | S::OvertimeIn, E::MarkIncomplete) => Some(S::Incomplete),
            (from, E::AdminCorrect) if from.track() == Track::Regular => Some(S::PresentCorrected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1001)]
    pub id: u64,
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = 7, nullable = true)]
    pub shift_id: Option<u64>,
    /// Date the shift instance starts on, in company time.
    #[schema(example = "2026-03-02", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    #[schema(example = 0)]
    pub overtime_minutes: u32,
    pub is_correction: bool,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(nullable = true)]
    pub corrected_by: Option<u64>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none() && self.status.awaits_check_out()
    }

    pub fn track(&self) -> Track {
        self.status.track()
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub employee_id: u64,
    pub shift_id: Option<u64>,
    pub work_date: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub overtime_minutes: u32,
    pub is_correction: bool,
    pub notes: Option<String>,
    pub corrected_by: Option<u64>,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            employee_id: self.employee_id,
            shift_id: self.shift_id,
            work_date: self.work_date,
            check_in: self.check_in,
            check_out: self.check_out,
            status: self.status,
            overtime_minutes: self.overtime_minutes,
            is_correction: self.is_correction,
            notes: self.notes,
            corrected_by: self.corrected_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceEvent as E;
    use AttendanceStatus as S;

    #[test]
    fn storage_strings_match_legacy_values() {
        assert_eq!(S::PresentCorrected.to_string(), "present (corrected)");
        assert_eq!("overtime_out".parse::<S>().unwrap(), S::OvertimeOut);
        assert_eq!(S::OnTime.as_ref(), "on_time");
        assert_eq!(
            serde_json::to_string(&S::PresentCorrected).unwrap(),
            "\"present (corrected)\""
        );
    }

    #[test]
    fn regular_track_transitions() {
        assert_eq!(S::initial(E::CheckIn { late: true }), Some(S::Late));
        assert_eq!(S::Late.next(E::CheckOut), Some(S::Present));
        assert_eq!(S::OnTime.next(E::MarkIncomplete), Some(S::Incomplete));
        assert_eq!(S::Present.next(E::CheckOut), None);
        assert_eq!(S::Absent.next(E::AdminCorrect), Some(S::PresentCorrected));
    }

    #[test]
    fn overtime_track_is_closed_to_regular_events() {
        assert_eq!(S::initial(E::OvertimeCheckIn), Some(S::OvertimeIn));
        assert_eq!(S::OvertimeIn.next(E::OvertimeCheckOut), Some(S::OvertimeOut));
        assert_eq!(S::OvertimeIn.next(E::CheckOut), None);
        assert_eq!(S::OvertimeOut.next(E::AdminCorrect), None);
        assert_eq!(S::initial(E::CheckOut), None);
    }

    #[test]
    fn only_check_in_states_are_open() {
        let open: Vec<S> = [
            S::OnTime,
            S::Late,
            S::Present,
            S::OvertimeIn,
            S::OvertimeOut,
            S::Absent,
            S::OnLeave,
            S::OnSick,
            S::Incomplete,
            S::PresentCorrected,
        ]
        .into_iter()
        .filter(|s| s.awaits_check_out())
        .collect();
        assert_eq!(open, vec![S::OnTime, S::Late, S::OvertimeIn]);
    }
}
