//! Narrow per-entity data access traits. The engine, sweep and admin
//! service only ever see these; `mysql` backs them in production and
//! `memory` in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::error::RepoError;
use crate::model::{
    attendance::{AttendanceRecord, NewAttendance, Track},
    attendance_location::AttendanceLocation,
    company::Company,
    division::Division,
    employee::Employee,
    leave_request::LeaveRequest,
    shift::Shift,
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn employee_by_id(&self, id: u64) -> Result<Option<Employee>, RepoError>;
    async fn active_employees_by_company(&self, company_id: u64) -> Result<Vec<Employee>, RepoError>;
    /// Image path of the most recently registered face reference.
    async fn latest_face_reference(&self, employee_id: u64) -> Result<Option<String>, RepoError>;
    async fn update_employee(&self, employee: &Employee) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn company_by_id(&self, id: u64) -> Result<Option<Company>, RepoError>;
    /// Companies with an `active` or `trial` subscription.
    async fn sweepable_companies(&self) -> Result<Vec<Company>, RepoError>;
}

#[async_trait]
pub trait ShiftRepository: Send + Sync {
    async fn shift_by_id(&self, id: u64) -> Result<Option<Shift>, RepoError>;
    async fn shifts_by_company(&self, company_id: u64) -> Result<Vec<Shift>, RepoError>;
    async fn update_shift(&self, shift: &Shift) -> Result<(), RepoError>;
    /// Makes `shift_id` the only default shift of the company.
    async fn promote_default(&self, company_id: u64, shift_id: u64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn locations_by_company(&self, company_id: u64) -> Result<Vec<AttendanceLocation>, RepoError>;
    /// Keeps the order of `ids`; unknown ids are skipped.
    async fn locations_by_ids(&self, ids: &[u64]) -> Result<Vec<AttendanceLocation>, RepoError>;
}

#[async_trait]
pub trait DivisionRepository: Send + Sync {
    async fn division_by_id(&self, id: u64) -> Result<Option<Division>, RepoError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// An approved request of the employee whose range covers `date`.
    async fn approved_leave_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepoError>;
}

/// Per-company counts for one work date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub total_employees: u64,
    pub present: u64,
    pub absent: u64,
    pub on_leave: u64,
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Fails with `RepoError::Conflict` when a unique key is violated.
    async fn create(&self, record: NewAttendance) -> Result<AttendanceRecord, RepoError>;
    /// Inserts only if the employee has no record at all for the work date.
    async fn create_if_absent(&self, record: NewAttendance) -> Result<Option<AttendanceRecord>, RepoError>;
    async fn update(&self, record: &AttendanceRecord) -> Result<(), RepoError>;
    async fn latest_for_employee(&self, employee_id: u64) -> Result<Option<AttendanceRecord>, RepoError>;
    async fn records_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError>;
    async fn regular_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepoError>;
    async fn open_record(&self, employee_id: u64, track: Track) -> Result<Option<AttendanceRecord>, RepoError>;
    /// Open records of the company's employees with `work_date <= up_to`.
    async fn open_records_until(
        &self,
        company_id: u64,
        up_to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError>;
    async fn dashboard_counts(&self, company_id: u64, date: NaiveDate) -> Result<DashboardCounts, RepoError>;
}

/// The full repository set, shared by the engine, sweep and admin service.
#[derive(Clone)]
pub struct Repositories {
    pub employees: Arc<dyn EmployeeRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub shifts: Arc<dyn ShiftRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub divisions: Arc<dyn DivisionRepository>,
    pub leaves: Arc<dyn LeaveRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
}

impl Repositories {
    pub fn mysql(pool: MySqlPool) -> Self {
        let store = Arc::new(mysql::MySqlStore::new(pool));
        Self {
            employees: store.clone(),
            companies: store.clone(),
            shifts: store.clone(),
            locations: store.clone(),
            divisions: store.clone(),
            leaves: store.clone(),
            attendance: store,
        }
    }

    /// Every repository backed by the same in-memory store.
    #[cfg(test)]
    pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            employees: store.clone(),
            companies: store.clone(),
            shifts: store.clone(),
            locations: store.clone(),
            divisions: store.clone(),
            leaves: store.clone(),
            attendance: store,
        }
    }
}
