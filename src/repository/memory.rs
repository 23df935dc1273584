//! In-memory repositories for tests. Mirrors the unique keys of the MySQL
//! schema and can be told to fail specific calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    AttendanceRepository, CompanyRepository, DashboardCounts, DivisionRepository,
    EmployeeRepository, LeaveRepository, LocationRepository, ShiftRepository,
};
use crate::error::RepoError;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus, NewAttendance, Track},
    attendance_location::AttendanceLocation,
    company::Company,
    division::Division,
    employee::{Employee, EmployeeStatus},
    leave_request::LeaveRequest,
    shift::Shift,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CompanyList,
    EmployeesOf(u64),
    ShiftsOf(u64),
    AttendanceUpdate(u64),
    AttendanceCreate(u64),
}

#[derive(Default)]
pub struct MemoryState {
    pub companies: HashMap<u64, Company>,
    pub employees: HashMap<u64, Employee>,
    pub faces: HashMap<u64, Vec<String>>,
    pub shifts: HashMap<u64, Shift>,
    pub locations: HashMap<u64, AttendanceLocation>,
    pub divisions: HashMap<u64, Division>,
    pub leaves: Vec<LeaveRequest>,
    pub attendance: BTreeMap<u64, AttendanceRecord>,
    next_attendance_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failures: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.failures.lock().unwrap().insert(point);
    }

    pub fn heal(&self, point: FailPoint) {
        self.failures.lock().unwrap().remove(&point);
    }

    fn check(&self, point: FailPoint) -> Result<(), RepoError> {
        if self.failures.lock().unwrap().contains(&point) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn add_company(&self, company: Company) {
        self.state().companies.insert(company.id, company);
    }

    pub fn add_employee(&self, employee: Employee) {
        self.state().employees.insert(employee.id, employee);
    }

    pub fn add_face(&self, employee_id: u64, path: &str) {
        self.state().faces.entry(employee_id).or_default().push(path.to_string());
    }

    pub fn add_shift(&self, shift: Shift) {
        self.state().shifts.insert(shift.id, shift);
    }

    pub fn add_location(&self, location: AttendanceLocation) {
        self.state().locations.insert(location.id, location);
    }

    pub fn add_division(&self, division: Division) {
        self.state().divisions.insert(division.id, division);
    }

    pub fn add_leave(&self, leave: LeaveRequest) {
        self.state().leaves.push(leave);
    }

    /// Inserts a record as-is, bypassing the unique keys.
    pub fn seed_attendance(&self, record: NewAttendance) -> AttendanceRecord {
        let mut state = self.state();
        state.next_attendance_id += 1;
        let stored = record.into_record(state.next_attendance_id);
        state.attendance.insert(stored.id, stored.clone());
        stored
    }

    pub fn attendance_of(&self, employee_id: u64) -> Vec<AttendanceRecord> {
        self.state()
            .attendance
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect()
    }

    pub fn attendance_by_id(&self, id: u64) -> Option<AttendanceRecord> {
        self.state().attendance.get(&id).cloned()
    }
}

fn is_open(status: AttendanceStatus, has_check_out: bool) -> bool {
    !has_check_out && status.awaits_check_out()
}

/// The unique keys of the `attendances` table.
fn violates_unique_keys(existing: &AttendanceRecord, candidate: &AttendanceRecord) -> bool {
    if existing.id == candidate.id || existing.employee_id != candidate.employee_id {
        return false;
    }
    let same_regular_day = existing.track() == Track::Regular
        && candidate.track() == Track::Regular
        && existing.work_date == candidate.work_date;
    let both_open_same_track = existing.track() == candidate.track()
        && is_open(existing.status, existing.check_out.is_some())
        && is_open(candidate.status, candidate.check_out.is_some());
    same_regular_day || both_open_same_track
}

#[async_trait]
impl EmployeeRepository for MemoryStore {
    async fn employee_by_id(&self, id: u64) -> Result<Option<Employee>, RepoError> {
        Ok(self.state().employees.get(&id).cloned())
    }

    async fn active_employees_by_company(&self, company_id: u64) -> Result<Vec<Employee>, RepoError> {
        self.check(FailPoint::EmployeesOf(company_id))?;
        let mut employees: Vec<Employee> = self
            .state()
            .employees
            .values()
            .filter(|e| e.company_id == company_id && e.status == EmployeeStatus::Active)
            .cloned()
            .collect();
        employees.sort_by_key(|e| e.id);
        Ok(employees)
    }

    async fn latest_face_reference(&self, employee_id: u64) -> Result<Option<String>, RepoError> {
        Ok(self
            .state()
            .faces
            .get(&employee_id)
            .and_then(|paths| paths.last().cloned()))
    }

    async fn update_employee(&self, employee: &Employee) -> Result<(), RepoError> {
        self.state().employees.insert(employee.id, employee.clone());
        Ok(())
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn company_by_id(&self, id: u64) -> Result<Option<Company>, RepoError> {
        Ok(self.state().companies.get(&id).cloned())
    }

    async fn sweepable_companies(&self) -> Result<Vec<Company>, RepoError> {
        self.check(FailPoint::CompanyList)?;
        let mut companies: Vec<Company> = self
            .state()
            .companies
            .values()
            .filter(|c| c.is_sweepable())
            .cloned()
            .collect();
        companies.sort_by_key(|c| c.id);
        Ok(companies)
    }
}

#[async_trait]
impl ShiftRepository for MemoryStore {
    async fn shift_by_id(&self, id: u64) -> Result<Option<Shift>, RepoError> {
        Ok(self.state().shifts.get(&id).cloned())
    }

    async fn shifts_by_company(&self, company_id: u64) -> Result<Vec<Shift>, RepoError> {
        self.check(FailPoint::ShiftsOf(company_id))?;
        let mut shifts: Vec<Shift> = self
            .state()
            .shifts
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        shifts.sort_by_key(|s| s.id);
        Ok(shifts)
    }

    async fn update_shift(&self, shift: &Shift) -> Result<(), RepoError> {
        self.state().shifts.insert(shift.id, shift.clone());
        Ok(())
    }

    async fn promote_default(&self, company_id: u64, shift_id: u64) -> Result<(), RepoError> {
        for shift in self.state().shifts.values_mut() {
            if shift.company_id == company_id {
                shift.is_default = shift.id == shift_id;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn locations_by_company(&self, company_id: u64) -> Result<Vec<AttendanceLocation>, RepoError> {
        let mut locations: Vec<AttendanceLocation> = self
            .state()
            .locations
            .values()
            .filter(|l| l.company_id == company_id)
            .cloned()
            .collect();
        locations.sort_by_key(|l| l.id);
        Ok(locations)
    }

    async fn locations_by_ids(&self, ids: &[u64]) -> Result<Vec<AttendanceLocation>, RepoError> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.locations.get(id).cloned()).collect())
    }
}

#[async_trait]
impl DivisionRepository for MemoryStore {
    async fn division_by_id(&self, id: u64) -> Result<Option<Division>, RepoError> {
        Ok(self.state().divisions.get(&id).cloned())
    }
}

#[async_trait]
impl LeaveRepository for MemoryStore {
    async fn approved_leave_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepoError> {
        Ok(self
            .state()
            .leaves
            .iter()
            .find(|l| l.employee_id == employee_id && l.covers(date))
            .cloned())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn create(&self, record: NewAttendance) -> Result<AttendanceRecord, RepoError> {
        self.check(FailPoint::AttendanceCreate(record.employee_id))?;
        let mut state = self.state();
        let candidate = record.into_record(state.next_attendance_id + 1);
        if state
            .attendance
            .values()
            .any(|existing| violates_unique_keys(existing, &candidate))
        {
            return Err(RepoError::Conflict);
        }
        state.next_attendance_id = candidate.id;
        state.attendance.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn create_if_absent(&self, record: NewAttendance) -> Result<Option<AttendanceRecord>, RepoError> {
        self.check(FailPoint::AttendanceCreate(record.employee_id))?;
        let mut state = self.state();
        if state
            .attendance
            .values()
            .any(|r| r.employee_id == record.employee_id && r.work_date == record.work_date)
        {
            return Ok(None);
        }
        state.next_attendance_id += 1;
        let stored = record.into_record(state.next_attendance_id);
        state.attendance.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn update(&self, record: &AttendanceRecord) -> Result<(), RepoError> {
        self.check(FailPoint::AttendanceUpdate(record.id))?;
        let mut state = self.state();
        if state
            .attendance
            .values()
            .any(|existing| violates_unique_keys(existing, record))
        {
            return Err(RepoError::Conflict);
        }
        state.attendance.insert(record.id, record.clone());
        Ok(())
    }

    async fn latest_for_employee(&self, employee_id: u64) -> Result<Option<AttendanceRecord>, RepoError> {
        Ok(self
            .state()
            .attendance
            .values()
            .filter(|r| r.employee_id == employee_id)
            .max_by_key(|r| (r.check_in, r.id))
            .cloned())
    }

    async fn records_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        Ok(self
            .state()
            .attendance
            .values()
            .filter(|r| r.employee_id == employee_id && r.work_date == work_date)
            .cloned()
            .collect())
    }

    async fn regular_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        Ok(self
            .state()
            .attendance
            .values()
            .find(|r| {
                r.employee_id == employee_id && r.work_date == work_date && r.track() == Track::Regular
            })
            .cloned())
    }

    async fn open_record(&self, employee_id: u64, track: Track) -> Result<Option<AttendanceRecord>, RepoError> {
        Ok(self
            .state()
            .attendance
            .values()
            .find(|r| r.employee_id == employee_id && r.track() == track && r.is_open())
            .cloned())
    }

    async fn open_records_until(
        &self,
        company_id: u64,
        up_to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let state = self.state();
        Ok(state
            .attendance
            .values()
            .filter(|r| {
                r.is_open()
                    && r.work_date <= up_to
                    && state
                        .employees
                        .get(&r.employee_id)
                        .is_some_and(|e| e.company_id == company_id)
            })
            .cloned()
            .collect())
    }

    async fn dashboard_counts(&self, company_id: u64, date: NaiveDate) -> Result<DashboardCounts, RepoError> {
        let state = self.state();
        let mut counts = DashboardCounts {
            total_employees: state
                .employees
                .values()
                .filter(|e| e.company_id == company_id && e.status == EmployeeStatus::Active)
                .count() as u64,
            ..Default::default()
        };

        let mut present = HashSet::new();
        let mut absent = HashSet::new();
        let mut on_leave = HashSet::new();
        for record in state.attendance.values().filter(|r| {
            r.work_date == date
                && state
                    .employees
                    .get(&r.employee_id)
                    .is_some_and(|e| e.company_id == company_id)
        }) {
            match record.status {
                s if s.is_present() => {
                    present.insert(record.employee_id);
                }
                AttendanceStatus::Absent => {
                    absent.insert(record.employee_id);
                }
                AttendanceStatus::OnLeave | AttendanceStatus::OnSick => {
                    on_leave.insert(record.employee_id);
                }
                _ => {}
            }
        }
        counts.present = present.len() as u64;
        counts.absent = absent.len() as u64;
        counts.on_leave = on_leave.len() as u64;
        Ok(counts)
    }
}
