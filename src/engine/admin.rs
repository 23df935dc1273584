use std::sync::Arc;

use tracing::{info, instrument};

use crate::engine::attendance::{initial_status, transition};
use crate::engine::clock::Clock;
use crate::engine::locks::EmployeeLocks;
use crate::engine::notify::DashboardNotifier;
use crate::engine::resolver::Resolver;
use crate::engine::shift_window::{localize, parse_clock, shift_duration};
use crate::error::AttendanceError;
use crate::model::{
    attendance::{AttendanceEvent, AttendanceRecord, NewAttendance},
    employee::{Employee, EmployeeUpdate},
    shift::{Shift, ShiftUpdate},
};
use crate::models::AttendanceCorrection;
use crate::repository::Repositories;

const DEFAULT_CORRECTION_NOTE: &str = "Corrected by admin";

/// Admin / HR operations. Every call is scoped to the caller's company;
/// touching another tenant's rows is `Forbidden`.
pub struct AdminService {
    repos: Repositories,
    locks: EmployeeLocks,
    notifier: DashboardNotifier,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        repos: Repositories,
        locks: EmployeeLocks,
        notifier: DashboardNotifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            locks,
            notifier,
            clock,
        }
    }

    async fn employee_in(&self, company_id: u64, employee_id: u64) -> Result<Employee, AttendanceError> {
        let employee = self
            .repos
            .employees
            .employee_by_id(employee_id)
            .await?
            .ok_or(AttendanceError::NotFound {
                entity: "employee",
                id: employee_id,
            })?;
        if employee.company_id != company_id {
            return Err(AttendanceError::Forbidden);
        }
        Ok(employee)
    }

    /* ============================================================
    Shifts
    ============================================================ */

    #[instrument(name = "update_shift", skip(self, update))]
    pub async fn update_shift(
        &self,
        company_id: u64,
        shift_id: u64,
        update: &ShiftUpdate,
    ) -> Result<Shift, AttendanceError> {
        let current = self
            .repos
            .shifts
            .shift_by_id(shift_id)
            .await?
            .ok_or(AttendanceError::NotFound {
                entity: "shift",
                id: shift_id,
            })?;
        if current.company_id != company_id {
            return Err(AttendanceError::Forbidden);
        }

        let updated = update.merge(&current)?;
        self.repos.shifts.update_shift(&updated).await?;
        if update.is_default == Some(true) {
            // clears the flag on the company's other shifts
            self.repos.shifts.promote_default(company_id, shift_id).await?;
        }

        info!(
            name = %updated.name,
            minutes = shift_duration(updated.start_time, updated.end_time).num_minutes(),
            overnight = updated.wraps_midnight(),
            "Shift updated"
        );
        Ok(updated)
    }

    /* ============================================================
    Employees
    ============================================================ */

    #[instrument(name = "update_employee", skip(self, update))]
    pub async fn update_employee(
        &self,
        company_id: u64,
        employee_id: u64,
        update: &EmployeeUpdate,
    ) -> Result<Employee, AttendanceError> {
        let mut employee = self.employee_in(company_id, employee_id).await?;
        update.validate()?;

        if let Some(shift_id) = update.shift_id {
            let owned = self
                .repos
                .shifts
                .shift_by_id(shift_id)
                .await?
                .is_some_and(|s| s.company_id == company_id);
            if !owned {
                return Err(AttendanceError::Validation(format!(
                    "shift {shift_id} does not belong to this company"
                )));
            }
        }
        if let Some(division_id) = update.division_id {
            let owned = self
                .repos
                .divisions
                .division_by_id(division_id)
                .await?
                .is_some_and(|d| d.company_id == company_id);
            if !owned {
                return Err(AttendanceError::Validation(format!(
                    "division {division_id} does not belong to this company"
                )));
            }
        }

        update.apply(&mut employee)?;
        self.repos.employees.update_employee(&employee).await?;

        info!("Employee updated");
        Ok(employee)
    }

    /* ============================================================
    Attendance correction
    ============================================================ */

    /// Marks the employee present for `correction.work_date`, rewriting the
    /// regular record of that day or creating one.
    #[instrument(
        name = "correct_attendance",
        skip(self, correction),
        fields(employee_id = correction.employee_id)
    )]
    pub async fn correct_attendance(
        &self,
        company_id: u64,
        corrected_by: u64,
        correction: &AttendanceCorrection,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let employee = self.employee_in(company_id, correction.employee_id).await?;
        let company = self
            .repos
            .companies
            .company_by_id(company_id)
            .await?
            .ok_or(AttendanceError::NotFound {
                entity: "company",
                id: company_id,
            })?;
        let tz = company.tz()?;
        let in_time = parse_clock(&correction.check_in)?;
        let out_time = parse_clock(&correction.check_out)?;
        let note = correction
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CORRECTION_NOTE)
            .to_string();

        let _guard = self.locks.acquire(employee.id).await;
        let attendance = &self.repos.attendance;

        let existing = attendance
            .regular_for_date(employee.id, correction.work_date)
            .await?;
        let shift = match existing.as_ref().and_then(|r| r.shift_id) {
            Some(id) => self.repos.shifts.shift_by_id(id).await?,
            None if existing.is_some() => None,
            None => {
                let resolver = Resolver::new(&self.repos);
                let division = resolver.division_of(&employee).await?;
                match resolver.shift_for(&employee, division.as_ref()).await {
                    Ok(shift) => Some(shift),
                    Err(AttendanceError::ShiftNotConfigured) => None,
                    Err(e) => return Err(e),
                }
            }
        };

        // an overnight shift's check-out lands on the next calendar day
        let overnight = out_time < in_time && shift.as_ref().is_some_and(Shift::wraps_midnight);
        let out_date = if overnight {
            correction.work_date.succ_opt().unwrap_or(correction.work_date)
        } else {
            correction.work_date
        };
        let check_in = localize(&tz, correction.work_date.and_time(in_time));
        let check_out = localize(&tz, out_date.and_time(out_time));
        if check_out < check_in {
            return Err(AttendanceError::Validation(
                "check_out cannot be before check_in".into(),
            ));
        }

        let record = match existing {
            Some(mut record) => {
                transition(&mut record, AttendanceEvent::AdminCorrect)?;
                record.check_in = check_in.to_utc();
                record.check_out = Some(check_out.to_utc());
                record.is_correction = true;
                record.notes = Some(note);
                record.corrected_by = Some(corrected_by);
                attendance.update(&record).await?;
                record
            }
            None => {
                attendance
                    .create(NewAttendance {
                        employee_id: employee.id,
                        shift_id: shift.as_ref().map(|s| s.id),
                        work_date: correction.work_date,
                        check_in: check_in.to_utc(),
                        check_out: Some(check_out.to_utc()),
                        status: initial_status(AttendanceEvent::AdminCorrect)?,
                        overtime_minutes: 0,
                        is_correction: true,
                        notes: Some(note),
                        corrected_by: Some(corrected_by),
                    })
                    .await?
            }
        };

        self.notifier.notify(company_id, record.work_date, self.clock.now());
        info!(record_id = record.id, "Attendance corrected");
        Ok(record)
    }
}
