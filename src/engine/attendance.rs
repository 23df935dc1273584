use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{info, instrument, warn};

use crate::engine::clock::Clock;
use crate::engine::geofence::{GeoPoint, is_within_any_location};
use crate::engine::identity::{IdentityGate, RecognitionOutcome};
use crate::engine::locks::EmployeeLocks;
use crate::engine::notify::DashboardNotifier;
use crate::engine::resolver::{Resolution, Resolver};
use crate::engine::shift_window::{ShiftWindow, cutoff_for, within_shift};
use crate::error::{AttendanceError, OvertimeBlock, RepoError};
use crate::model::{
    attendance::{AttendanceEvent, AttendanceRecord, AttendanceStatus, NewAttendance, Track},
    company::Company,
    employee::Employee,
    shift::Shift,
};
use crate::models::{AttendanceOutcome, AttendanceRequest};
use crate::repository::Repositories;

/// Note stored on records closed without a check-out.
pub const INCOMPLETE_NOTE: &str = "Automatically marked incomplete: no check-out recorded.";

/// Applies `event` to an existing record, rejecting moves the table forbids.
pub fn transition(record: &mut AttendanceRecord, event: AttendanceEvent) -> Result<(), AttendanceError> {
    let next = record
        .status
        .next(event)
        .ok_or_else(|| AttendanceError::IllegalTransition {
            from: record.status.to_string(),
            event,
        })?;
    record.status = next;
    Ok(())
}

/// Status for a record created by `event`.
pub fn initial_status(event: AttendanceEvent) -> Result<AttendanceStatus, AttendanceError> {
    AttendanceStatus::initial(event).ok_or_else(|| AttendanceError::IllegalTransition {
        from: "none".into(),
        event,
    })
}

/// Closes a dangling open record as `incomplete`.
pub fn mark_incomplete(record: &mut AttendanceRecord) -> Result<(), AttendanceError> {
    transition(record, AttendanceEvent::MarkIncomplete)?;
    record.is_correction = true;
    record.notes = Some(INCOMPLETE_NOTE.to_string());
    Ok(())
}

/// Everything steps 1-5 establish about a request before any state changes.
struct Verified {
    employee: Employee,
    company: Company,
    tz: Tz,
    now: DateTime<Tz>,
    resolution: Resolution,
    /// False when an open regular record deferred the leave check.
    leave_checked: bool,
}

impl Verified {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }
}

pub struct AttendanceEngine {
    repos: Repositories,
    identity: Arc<dyn IdentityGate>,
    notifier: DashboardNotifier,
    locks: EmployeeLocks,
    clock: Arc<dyn Clock>,
}

impl AttendanceEngine {
    pub fn new(
        repos: Repositories,
        identity: Arc<dyn IdentityGate>,
        notifier: DashboardNotifier,
        locks: EmployeeLocks,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            identity,
            notifier,
            locks,
            clock,
        }
    }

    /* ============================================================
    Shared gate: employee, leave, resolution, face, geofence
    ============================================================ */

    async fn verify_request(&self, request: &AttendanceRequest) -> Result<Verified, AttendanceError> {
        // 1️⃣ Employee, company and company-local "now"
        let employee = self
            .repos
            .employees
            .employee_by_id(request.employee_id)
            .await?
            .ok_or(AttendanceError::NotFound {
                entity: "employee",
                id: request.employee_id,
            })?;

        let company = self
            .repos
            .companies
            .company_by_id(employee.company_id)
            .await?
            .ok_or(AttendanceError::NotFound {
                entity: "company",
                id: employee.company_id,
            })?;

        let tz = company.tz()?;
        let now = self.clock.now().with_timezone(&tz);

        // 2️⃣ Approved leave blocks attendance for the day. A shift checked
        // into before the leave began can still be checked out of.
        let open_regular = self
            .repos
            .attendance
            .open_record(employee.id, Track::Regular)
            .await?;
        let leave_checked = open_regular.is_none();
        if leave_checked {
            self.ensure_not_on_leave(employee.id, now.date_naive()).await?;
        }

        // 3️⃣ Effective shift and locations
        let resolution = Resolver::new(&self.repos).resolve(&employee).await?;

        // 4️⃣ Face verification, fail closed
        let reference = self
            .repos
            .employees
            .latest_face_reference(employee.id)
            .await?
            .ok_or(AttendanceError::NoFaceReference)?;

        match self.identity.verify(&reference, &request.image_data).await {
            RecognitionOutcome::Recognized => {}
            RecognitionOutcome::NotRecognized => return Err(AttendanceError::FaceNotRecognized),
            RecognitionOutcome::Unavailable => return Err(AttendanceError::RecognitionUnavailable),
        }

        // 5️⃣ Geofence
        let point = GeoPoint {
            latitude: request.latitude,
            longitude: request.longitude,
        };
        if !is_within_any_location(point, &resolution.locations) {
            return Err(AttendanceError::OutsideGeofence);
        }

        Ok(Verified {
            employee,
            company,
            tz,
            now,
            resolution,
            leave_checked,
        })
    }

    async fn ensure_not_on_leave(&self, employee_id: u64, date: NaiveDate) -> Result<(), AttendanceError> {
        match self.repos.leaves.approved_leave_on(employee_id, date).await? {
            Some(leave) => Err(AttendanceError::OnApprovedLeave(leave.leave_type)),
            None => Ok(()),
        }
    }

    fn outcome(&self, verified: Verified, message: &str, record: AttendanceRecord) -> AttendanceOutcome {
        self.notifier
            .notify(verified.company.id, record.work_date, verified.now_utc());

        AttendanceOutcome {
            message: message.to_string(),
            timestamp: verified.now.fixed_offset(),
            employee: verified.employee,
            record,
        }
    }

    /// The shift an existing record was taken against, falling back to the
    /// currently resolved one when it is unknown or gone.
    async fn shift_of(&self, record: &AttendanceRecord, resolved: &Shift) -> Result<Shift, AttendanceError> {
        match record.shift_id {
            Some(id) if id != resolved.id => Ok(self
                .repos
                .shifts
                .shift_by_id(id)
                .await?
                .unwrap_or_else(|| resolved.clone())),
            _ => Ok(resolved.clone()),
        }
    }

    /// The employee's open regular record while it can still be checked out
    /// of. One past its cutoff is closed as `incomplete` and `None` returned.
    async fn live_open_regular(&self, v: &Verified) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let attendance = &self.repos.attendance;
        let Some(mut open) = attendance.open_record(v.employee.id, Track::Regular).await? else {
            return Ok(None);
        };

        let shift = self.shift_of(&open, &v.resolution.shift).await?;
        if v.now < cutoff_for(Some(&shift), open.work_date, v.tz) {
            return Ok(Some(open));
        }

        warn!(
            record_id = open.id,
            work_date = %open.work_date,
            "Open record past its cutoff, closing as incomplete"
        );
        mark_incomplete(&mut open)?;
        attendance.update(&open).await?;
        Ok(None)
    }

    /* ============================================================
    Regular check-in / check-out
    ============================================================ */

    #[instrument(
        name = "regular_attendance",
        skip(self, request),
        fields(employee_id = request.employee_id)
    )]
    pub async fn handle_regular_attendance(
        &self,
        request: &AttendanceRequest,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let verified = self.verify_request(request).await?;

        let guard = self.locks.acquire(verified.employee.id).await;
        let (message, record) = self.regular_transition(&verified).await?;
        drop(guard);

        info!(
            company_id = verified.company.id,
            record_id = record.id,
            status = %record.status,
            "{message}"
        );
        Ok(self.outcome(verified, message, record))
    }

    async fn regular_transition(
        &self,
        v: &Verified,
    ) -> Result<(&'static str, AttendanceRecord), AttendanceError> {
        let attendance = &self.repos.attendance;

        if let Some(mut open) = self.live_open_regular(v).await? {
            // check-out
            transition(&mut open, AttendanceEvent::CheckOut)?;
            open.check_out = Some(v.now_utc().max(open.check_in));
            attendance.update(&open).await?;
            return Ok(("Checked out successfully", open));
        }

        let window = ShiftWindow::around(&v.resolution.shift, v.now);
        if !v.leave_checked {
            self.ensure_not_on_leave(v.employee.id, window.work_date).await?;
        }

        if attendance
            .regular_for_date(v.employee.id, window.work_date)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyCompleted);
        }

        if v.now < window.earliest_check_in() {
            return Err(AttendanceError::TooEarlyToCheckIn {
                earliest: window.earliest_check_in().fixed_offset(),
            });
        }
        if v.now >= window.closes_at() {
            return Err(AttendanceError::OutsideShiftWindow);
        }

        let late = v.now > window.late_after();
        let status = initial_status(AttendanceEvent::CheckIn { late })?;

        let record = attendance
            .create(NewAttendance {
                employee_id: v.employee.id,
                shift_id: Some(v.resolution.shift.id),
                work_date: window.work_date,
                check_in: v.now_utc(),
                check_out: None,
                status,
                overtime_minutes: 0,
                is_correction: false,
                notes: None,
                corrected_by: None,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict => AttendanceError::AlreadyCompleted,
                other => other.into(),
            })?;

        let message = if late {
            "Checked in late"
        } else {
            "Checked in successfully"
        };
        Ok((message, record))
    }

    /* ============================================================
    Overtime
    ============================================================ */

    #[instrument(
        name = "overtime_check_in",
        skip(self, request),
        fields(employee_id = request.employee_id)
    )]
    pub async fn handle_overtime_check_in(
        &self,
        request: &AttendanceRequest,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let verified = self.verify_request(request).await?;
        let attendance = &self.repos.attendance;

        let guard = self.locks.acquire(verified.employee.id).await;

        if within_shift(verified.now, &verified.resolution.shift) {
            return Err(AttendanceError::OvertimeNotAllowedNow(OvertimeBlock::DuringShift));
        }
        if self.live_open_regular(&verified).await?.is_some() {
            return Err(AttendanceError::OvertimeNotAllowedNow(
                OvertimeBlock::RegularShiftOpen,
            ));
        }
        if !verified.leave_checked {
            self.ensure_not_on_leave(verified.employee.id, verified.now.date_naive())
                .await?;
        }
        if attendance
            .open_record(verified.employee.id, Track::Overtime)
            .await?
            .is_some()
        {
            return Err(AttendanceError::OvertimeAlreadyOpen);
        }

        let record = attendance
            .create(NewAttendance {
                employee_id: verified.employee.id,
                shift_id: None,
                work_date: verified.now.date_naive(),
                check_in: verified.now_utc(),
                check_out: None,
                status: initial_status(AttendanceEvent::OvertimeCheckIn)?,
                overtime_minutes: 0,
                is_correction: false,
                notes: None,
                corrected_by: None,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict => AttendanceError::OvertimeAlreadyOpen,
                other => other.into(),
            })?;
        drop(guard);

        info!(company_id = verified.company.id, record_id = record.id, "Overtime check-in recorded");
        Ok(self.outcome(verified, "Overtime check-in recorded", record))
    }

    #[instrument(
        name = "overtime_check_out",
        skip(self, request),
        fields(employee_id = request.employee_id)
    )]
    pub async fn handle_overtime_check_out(
        &self,
        request: &AttendanceRequest,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let verified = self.verify_request(request).await?;
        let attendance = &self.repos.attendance;

        let guard = self.locks.acquire(verified.employee.id).await;

        let mut record = attendance
            .open_record(verified.employee.id, Track::Overtime)
            .await?
            .ok_or(AttendanceError::OvertimeNotOpen)?;

        let check_out = verified.now_utc().max(record.check_in);
        let minutes = (check_out - record.check_in).num_minutes().max(0);

        transition(&mut record, AttendanceEvent::OvertimeCheckOut)?;
        record.check_out = Some(check_out);
        record.overtime_minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        attendance.update(&record).await?;
        drop(guard);

        info!(
            company_id = verified.company.id,
            record_id = record.id,
            overtime_minutes = record.overtime_minutes,
            "Overtime check-out recorded"
        );
        Ok(self.outcome(verified, "Overtime check-out recorded", record))
    }

    /// Most recent record of the employee, any track.
    pub async fn latest_attendance(&self, employee_id: u64) -> Result<Option<AttendanceRecord>, AttendanceError> {
        Ok(self.repos.attendance.latest_for_employee(employee_id).await?)
    }
}
