use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::engine::attendance::{initial_status, mark_incomplete};
use crate::engine::clock::Clock;
use crate::engine::resolver::pick_shift;
use crate::engine::shift_window::{ShiftWindow, cutoff_for};
use crate::error::AttendanceError;
use crate::model::{
    attendance::{AttendanceEvent, AttendanceStatus, NewAttendance},
    company::Company,
    division::Division,
    employee::Employee,
    leave_request::LeaveType,
    shift::Shift,
};
use crate::repository::Repositories;

const ABSENT_NOTE: &str = "Automatically marked absent: no attendance recorded.";
const LEAVE_NOTE: &str = "Automatically recorded from approved leave.";
/// An instance is judged on every run within this long after its cutoff.
const LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub run_id: String,
    pub companies_swept: u32,
    pub companies_skipped: u32,
    pub marked_incomplete: u32,
    pub marked_absent: u32,
    pub marked_on_leave: u32,
    pub marked_on_sick: u32,
    pub employees_without_shift: u32,
    pub errors: u32,
}

#[derive(Debug, Default)]
struct CompanyCounts {
    marked_incomplete: u32,
    marked_absent: u32,
    marked_on_leave: u32,
    marked_on_sick: u32,
    employees_without_shift: u32,
    errors: u32,
}

enum CompanySweep {
    Swept(CompanyCounts),
    Skipped,
}

enum EmployeeSweep {
    NoShift,
    /// Statuses of the synthetic records written this run; empty when every
    /// due instance was already recorded.
    Reconciled(Vec<AttendanceStatus>),
}

/// Removes the company from the in-flight set when the sweep of it ends.
struct Claim {
    in_flight: Arc<Mutex<HashSet<u64>>>,
    company_id: u64,
}

impl Drop for Claim {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.company_id);
        }
    }
}

/// Scheduled reconciliation: closes dangling open records and writes
/// absent / on-leave / on-sick records for employees who never showed up.
pub struct DailySweep {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    workers: usize,
    in_flight: Arc<Mutex<HashSet<u64>>>,
}

impl DailySweep {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, workers: usize) -> Self {
        Self {
            repos,
            clock,
            workers: workers.max(1),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn claim(&self, company_id: u64) -> Option<Claim> {
        let mut set = self.in_flight.lock().ok()?;
        if !set.insert(company_id) {
            return None;
        }
        Some(Claim {
            in_flight: self.in_flight.clone(),
            company_id,
        })
    }

    /// Runs the sweep forever, once per `every`.
    pub async fn run_every(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run().await {
                error!(error = %e, "Daily sweep could not start");
            }
        }
    }

    /// Fails only when the company list itself cannot be loaded.
    pub async fn run(&self) -> Result<SweepReport, AttendanceError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("daily_sweep", run_id = %run_id);

        async move {
            let companies = self.repos.companies.sweepable_companies().await?;
            info!(companies = companies.len(), "Sweep started");

            let results: Vec<CompanySweep> = stream::iter(companies)
                .map(|company| self.sweep_company(company))
                .buffer_unordered(self.workers)
                .collect()
                .await;

            let mut report = SweepReport {
                run_id,
                ..Default::default()
            };
            for result in results {
                match result {
                    CompanySweep::Skipped => report.companies_skipped += 1,
                    CompanySweep::Swept(c) => {
                        report.companies_swept += 1;
                        report.marked_incomplete += c.marked_incomplete;
                        report.marked_absent += c.marked_absent;
                        report.marked_on_leave += c.marked_on_leave;
                        report.marked_on_sick += c.marked_on_sick;
                        report.employees_without_shift += c.employees_without_shift;
                        report.errors += c.errors;
                    }
                }
            }

            info!(
                swept = report.companies_swept,
                skipped = report.companies_skipped,
                incomplete = report.marked_incomplete,
                absent = report.marked_absent,
                on_leave = report.marked_on_leave,
                on_sick = report.marked_on_sick,
                errors = report.errors,
                "Sweep finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn sweep_company(&self, company: Company) -> CompanySweep {
        let span = info_span!("sweep_company", company_id = company.id);
        async move {
            let Some(_claim) = self.claim(company.id) else {
                warn!("Sweep already running for company, skipping");
                return CompanySweep::Skipped;
            };

            let tz = match company.tz() {
                Ok(tz) => tz,
                Err(e) => {
                    error!(error = %e, "Skipping company");
                    return CompanySweep::Skipped;
                }
            };

            // 1️⃣ Everything the company pass needs; any failure skips the company
            let shifts: HashMap<u64, Shift> = match self.repos.shifts.shifts_by_company(company.id).await {
                Ok(list) => list.into_iter().map(|s| (s.id, s)).collect(),
                Err(e) => {
                    error!(error = %e, "Failed to load shifts, skipping company");
                    return CompanySweep::Skipped;
                }
            };
            let employees = match self.repos.employees.active_employees_by_company(company.id).await {
                Ok(list) => list,
                Err(e) => {
                    error!(error = %e, "Failed to load employees, skipping company");
                    return CompanySweep::Skipped;
                }
            };

            let now = self.clock.now().with_timezone(&tz);
            let mut counts = CompanyCounts::default();

            // 2️⃣ Close dangling open records from previous days
            self.cleanup(company.id, &shifts, tz, now, &mut counts).await;

            // 3️⃣ Absence / leave marking
            let mut divisions: HashMap<u64, Option<Division>> = HashMap::new();
            for employee in &employees {
                match self
                    .sweep_employee(employee, &shifts, &mut divisions, tz, now)
                    .await
                {
                    Ok(EmployeeSweep::Reconciled(marked)) => {
                        for status in marked {
                            match status {
                                AttendanceStatus::OnLeave => counts.marked_on_leave += 1,
                                AttendanceStatus::OnSick => counts.marked_on_sick += 1,
                                _ => counts.marked_absent += 1,
                            }
                        }
                    }
                    Ok(EmployeeSweep::NoShift) => counts.employees_without_shift += 1,
                    Err(e) => {
                        error!(employee_id = employee.id, error = %e, "Failed to reconcile employee");
                        counts.errors += 1;
                    }
                }
            }

            CompanySweep::Swept(counts)
        }
        .instrument(span)
        .await
    }

    async fn cleanup(
        &self,
        company_id: u64,
        shifts: &HashMap<u64, Shift>,
        tz: Tz,
        now: DateTime<Tz>,
        counts: &mut CompanyCounts,
    ) {
        let yesterday = now.date_naive().pred_opt().unwrap_or(now.date_naive());
        let open = match self
            .repos
            .attendance
            .open_records_until(company_id, yesterday)
            .await
        {
            Ok(open) => open,
            Err(e) => {
                error!(error = %e, "Failed to load open records");
                counts.errors += 1;
                return;
            }
        };

        for mut record in open {
            let shift = record.shift_id.and_then(|id| shifts.get(&id));
            if now < cutoff_for(shift, record.work_date, tz) {
                continue;
            }

            let closed = match mark_incomplete(&mut record) {
                Ok(()) => self.repos.attendance.update(&record).await.map_err(AttendanceError::from),
                Err(e) => Err(e),
            };
            match closed {
                Ok(()) => {
                    debug!(record_id = record.id, employee_id = record.employee_id, "Marked incomplete");
                    counts.marked_incomplete += 1;
                }
                Err(e) => {
                    error!(record_id = record.id, error = %e, "Failed to mark record incomplete");
                    counts.errors += 1;
                }
            }
        }
    }

    async fn sweep_employee(
        &self,
        employee: &Employee,
        shifts: &HashMap<u64, Shift>,
        divisions: &mut HashMap<u64, Option<Division>>,
        tz: Tz,
        now: DateTime<Tz>,
    ) -> Result<EmployeeSweep, AttendanceError> {
        if let Some(division_id) = employee.division_id {
            if !divisions.contains_key(&division_id) {
                let division = self
                    .repos
                    .divisions
                    .division_by_id(division_id)
                    .await?
                    .filter(|d| d.company_id == employee.company_id);
                divisions.insert(division_id, division);
            }
        }
        let division = employee
            .division_id
            .and_then(|id| divisions.get(&id))
            .and_then(Option::as_ref);

        let Some(shift) = pick_shift(employee, division, shifts) else {
            return Ok(EmployeeSweep::NoShift);
        };

        let mut marked = Vec::new();
        for window in due_windows(shift, now, tz) {
            if let Some(status) = self.judge_instance(employee, shift, &window).await? {
                marked.push(status);
            }
        }
        Ok(EmployeeSweep::Reconciled(marked))
    }

    /// Writes the synthetic record for one past instance, unless any record
    /// already exists for its work date.
    async fn judge_instance(
        &self,
        employee: &Employee,
        shift: &Shift,
        window: &ShiftWindow,
    ) -> Result<Option<AttendanceStatus>, AttendanceError> {
        let existing = self
            .repos
            .attendance
            .records_for_date(employee.id, window.work_date)
            .await?;
        if !existing.is_empty() {
            return Ok(None);
        }

        let leave = self
            .repos
            .leaves
            .approved_leave_on(employee.id, window.work_date)
            .await?;
        let (event, note) = match leave.map(|l| l.leave_type) {
            Some(LeaveType::Leave) => (AttendanceEvent::MarkOnLeave, LEAVE_NOTE),
            Some(LeaveType::Sick) => (AttendanceEvent::MarkOnSick, LEAVE_NOTE),
            None => (AttendanceEvent::MarkAbsent, ABSENT_NOTE),
        };
        let status = initial_status(event)?;

        let start = window.start.with_timezone(&Utc);
        let created = self
            .repos
            .attendance
            .create_if_absent(NewAttendance {
                employee_id: employee.id,
                shift_id: Some(shift.id),
                work_date: window.work_date,
                check_in: start,
                check_out: Some(start),
                status,
                overtime_minutes: 0,
                is_correction: true,
                notes: Some(note.to_string()),
                corrected_by: None,
            })
            .await?;

        Ok(created.map(|record| {
            debug!(
                employee_id = employee.id,
                record_id = record.id,
                work_date = %window.work_date,
                status = %status,
                "Synthetic record created"
            );
            status
        }))
    }
}

/// Instances of `shift` whose cutoff passed within the lookback, oldest
/// first. An instance ending late in the evening has its cutoff on the next
/// calendar day, so instances ending up to two days back are considered.
fn due_windows(shift: &Shift, now: DateTime<Tz>, tz: Tz) -> Vec<ShiftWindow> {
    let since = now - ChronoDuration::hours(LOOKBACK_HOURS);
    let mut ends_on = vec![now.date_naive()];
    for _ in 0..2 {
        if let Some(previous) = ends_on.last().and_then(|d| d.pred_opt()) {
            ends_on.push(previous);
        }
    }

    ends_on
        .into_iter()
        .rev()
        .map(|date| ShiftWindow::ending_on(shift, date, tz))
        .filter(|w| since < w.sweep_cutoff() && w.sweep_cutoff() <= now)
        .collect()
}
