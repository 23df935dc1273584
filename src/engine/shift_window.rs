use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::AttendanceError;
use crate::model::shift::Shift;

/// How long before shift start a check-in is accepted.
pub const EARLY_CHECK_IN_MINUTES: i64 = 90;
/// How long after shift end an open record may still be checked out.
pub const SWEEP_CUTOFF_HOURS: i64 = 5;

/// Accepts `HH:MM:SS` or `HH:MM`.
pub fn parse_clock(value: &str) -> Result<NaiveTime, AttendanceError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| AttendanceError::Validation(format!("invalid time '{value}', expected HH:MM:SS")))
}

/// Length of a shift; an end earlier than the start wraps past midnight.
pub fn shift_duration(start: NaiveTime, end: NaiveTime) -> Duration {
    let raw = end - start;
    if end < start {
        raw + Duration::hours(24)
    } else {
        raw
    }
}

/// Resolves a company wall-clock time. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward one hour.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// One concrete occurrence of a shift, anchored on the date it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftWindow {
    pub work_date: NaiveDate,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub grace: Duration,
}

impl ShiftWindow {
    /// The instance of `shift` that starts on `work_date`.
    pub fn on(shift: &Shift, work_date: NaiveDate, tz: Tz) -> Self {
        let start = localize(&tz, work_date.and_time(shift.start_time));
        let end_date = if shift.wraps_midnight() {
            work_date.succ_opt().unwrap_or(work_date)
        } else {
            work_date
        };
        let end = localize(&tz, end_date.and_time(shift.end_time)).max(start);

        Self {
            work_date,
            start,
            end,
            grace: Duration::minutes(i64::from(shift.grace_period_minutes)),
        }
    }

    /// The instance relevant to `now`: yesterday's when it is still taking
    /// check-ins (a wrapping shift in progress), otherwise today's.
    pub fn around(shift: &Shift, now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        if let Some(yesterday) = today.pred_opt() {
            let previous = Self::on(shift, yesterday, tz);
            if previous.accepts_check_in(now) {
                return previous;
            }
        }
        Self::on(shift, today, tz)
    }

    /// The instance whose end falls on `date`.
    pub fn ending_on(shift: &Shift, date: NaiveDate, tz: Tz) -> Self {
        let work_date = if shift.wraps_midnight() {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        };
        Self::on(shift, work_date, tz)
    }

    pub fn earliest_check_in(&self) -> DateTime<Tz> {
        self.start - Duration::minutes(EARLY_CHECK_IN_MINUTES)
    }

    /// Check-ins strictly after this instant are late.
    pub fn late_after(&self) -> DateTime<Tz> {
        self.start + self.grace
    }

    /// First instant no longer inside the window.
    pub fn closes_at(&self) -> DateTime<Tz> {
        self.end + self.grace
    }

    pub fn sweep_cutoff(&self) -> DateTime<Tz> {
        self.end + Duration::hours(SWEEP_CUTOFF_HOURS)
    }

    /// `[start, end + grace)`
    pub fn contains(&self, t: DateTime<Tz>) -> bool {
        self.start <= t && t < self.closes_at()
    }

    /// `[start - 90min, end + grace)`
    pub fn accepts_check_in(&self, t: DateTime<Tz>) -> bool {
        self.earliest_check_in() <= t && t < self.closes_at()
    }
}

/// Sweep cutoff for a record taken on `work_date`. Without a known shift the
/// whole calendar day is treated as the instance.
pub fn cutoff_for(shift: Option<&Shift>, work_date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    match shift {
        Some(shift) => ShiftWindow::on(shift, work_date, tz).sweep_cutoff(),
        None => {
            let next_day = work_date.succ_opt().unwrap_or(work_date);
            localize(&tz, next_day.and_time(NaiveTime::MIN)) + Duration::hours(SWEEP_CUTOFF_HOURS)
        }
    }
}

/// Whether `now` falls inside the shift, including an instance that began
/// yesterday and wraps past midnight.
pub fn within_shift(now: DateTime<Tz>, shift: &Shift) -> bool {
    ShiftWindow::around(shift, now).contains(now)
}
