use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, MySqlPool};

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
    employee::Employee,
    leave_request::LeaveRequest,
    shift::Shift,
};

/// MySQL-backed implementation of every repository trait.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// ===============================
/// Row types
/// ===============================

fn parse_column<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, RepoError> {
    value
        .parse()
        .map_err(|_| RepoError::Corrupt(format!("{column} '{value}'")))
}

#[derive(FromRow)]
struct CompanyRow {
    id: u64,
    name: String,
    timezone: String,
    subscription_status: String,
}

impl TryFrom<CompanyRow> for Company {
    type Error = RepoError;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        Ok(Company {
            id: row.id,
            name: row.name,
            timezone: row.timezone,
            subscription_status: parse_column("subscription_status", &row.subscription_status)?,
        })
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    company_id: u64,
    name: String,
    email: String,
    division_id: Option<u64>,
    shift_id: Option<u64>,
    status: String,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = RepoError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            email: row.email,
            division_id: row.division_id,
            shift_id: row.shift_id,
            status: parse_column("employee status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct ShiftRow {
    id: u64,
    company_id: u64,
    name: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    grace_period_minutes: u32,
    is_default: bool,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            start_time: row.start_time,
            end_time: row.end_time,
            grace_period_minutes: row.grace_period_minutes,
            is_default: row.is_default,
        }
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = RepoError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            status: parse_column("leave status", &row.status)?,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    employee_id: u64,
    shift_id: Option<u64>,
    work_date: NaiveDate,
    check_in: NaiveDateTime,
    check_out: Option<NaiveDateTime>,
    status: String,
    overtime_minutes: u32,
    is_correction: bool,
    notes: Option<String>,
    corrected_by: Option<u64>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = RepoError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            shift_id: row.shift_id,
            work_date: row.work_date,
            check_in: row.check_in.and_utc(),
            check_out: row.check_out.map(|t| t.and_utc()),
            status: parse_column::<AttendanceStatus>("attendance status", &row.status)?,
            overtime_minutes: row.overtime_minutes,
            is_correction: row.is_correction,
            notes: row.notes,
            corrected_by: row.corrected_by,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepoError>
where
    T: TryFrom<R, Error = RepoError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const ATTENDANCE_COLUMNS: &str = "a.id, a.employee_id, a.shift_id, a.work_date, a.check_in, \
     a.check_out, a.status, a.overtime_minutes, a.is_correction, a.notes, a.corrected_by";

const OPEN_STATUSES: &str = "'on_time', 'late', 'overtime_in'";

/// ===============================
/// Employees
/// ===============================

#[async_trait]
impl EmployeeRepository for MySqlStore {
    async fn employee_by_id(&self, id: u64) -> Result<Option<Employee>, RepoError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, company_id, name, email, division_id, shift_id, status
             FROM employees WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Employee::try_from).transpose()
    }

    async fn active_employees_by_company(&self, company_id: u64) -> Result<Vec<Employee>, RepoError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, company_id, name, email, division_id, shift_id, status
             FROM employees
             WHERE company_id = ? AND status = 'active'
             ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn latest_face_reference(&self, employee_id: u64) -> Result<Option<String>, RepoError> {
        let path = sqlx::query_scalar::<_, String>(
            "SELECT image_path FROM face_images
             WHERE employee_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(path)
    }

    async fn update_employee(&self, employee: &Employee) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE employees
             SET name = ?, email = ?, status = ?, division_id = ?, shift_id = ?
             WHERE id = ?",
        )
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(employee.status.as_ref())
        .bind(employee.division_id)
        .bind(employee.shift_id)
        .bind(employee.id)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_write)?;

        Ok(())
    }
}

/// ===============================
/// Companies
/// ===============================

#[async_trait]
impl CompanyRepository for MySqlStore {
    async fn company_by_id(&self, id: u64) -> Result<Option<Company>, RepoError> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, timezone, subscription_status FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Company::try_from).transpose()
    }

    async fn sweepable_companies(&self) -> Result<Vec<Company>, RepoError> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, timezone, subscription_status
             FROM companies
             WHERE subscription_status IN ('active', 'trial')
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }
}

/// ===============================
/// Shifts
/// ===============================

#[async_trait]
impl ShiftRepository for MySqlStore {
    async fn shift_by_id(&self, id: u64) -> Result<Option<Shift>, RepoError> {
        let row = sqlx::query_as::<_, ShiftRow>(
            "SELECT id, company_id, name, start_time, end_time, grace_period_minutes, is_default
             FROM shifts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Shift::from))
    }

    async fn shifts_by_company(&self, company_id: u64) -> Result<Vec<Shift>, RepoError> {
        let rows = sqlx::query_as::<_, ShiftRow>(
            "SELECT id, company_id, name, start_time, end_time, grace_period_minutes, is_default
             FROM shifts WHERE company_id = ? ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Shift::from).collect())
    }

    async fn update_shift(&self, shift: &Shift) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE shifts
             SET name = ?, start_time = ?, end_time = ?, grace_period_minutes = ?, is_default = ?
             WHERE id = ?",
        )
        .bind(&shift.name)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.grace_period_minutes)
        .bind(shift.is_default)
        .bind(shift.id)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_write)?;

        Ok(())
    }

    async fn promote_default(&self, company_id: u64, shift_id: u64) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE shifts SET is_default = FALSE WHERE company_id = ? AND id <> ?")
            .bind(company_id)
            .bind(shift_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE shifts SET is_default = TRUE WHERE company_id = ? AND id = ?")
            .bind(company_id)
            .bind(shift_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// ===============================
/// Locations and divisions
/// ===============================

#[async_trait]
impl LocationRepository for MySqlStore {
    async fn locations_by_company(&self, company_id: u64) -> Result<Vec<AttendanceLocation>, RepoError> {
        let rows = sqlx::query_as::<_, AttendanceLocation>(
            "SELECT id, company_id, name, latitude, longitude, radius
             FROM attendance_locations WHERE company_id = ? ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn locations_by_ids(&self, ids: &[u64]) -> Result<Vec<AttendanceLocation>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, company_id, name, latitude, longitude, radius
             FROM attendance_locations WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, AttendanceLocation>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let mut rows = query.fetch_all(&self.pool).await?;

        // keep the caller's order
        rows.sort_by_key(|loc| ids.iter().position(|id| *id == loc.id));
        Ok(rows)
    }
}

#[async_trait]
impl DivisionRepository for MySqlStore {
    async fn division_by_id(&self, id: u64) -> Result<Option<Division>, RepoError> {
        let Some((id, company_id, name)) = sqlx::query_as::<_, (u64, u64, String)>(
            "SELECT id, company_id, name FROM divisions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let shift_ids = sqlx::query_scalar::<_, u64>(
            "SELECT shift_id FROM division_shifts WHERE division_id = ? ORDER BY position, shift_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let location_ids = sqlx::query_scalar::<_, u64>(
            "SELECT location_id FROM division_locations WHERE division_id = ? ORDER BY position, location_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Division {
            id,
            company_id,
            name,
            shift_ids,
            location_ids,
        }))
    }
}

/// ===============================
/// Leave
/// ===============================

#[async_trait]
impl LeaveRepository for MySqlStore {
    async fn approved_leave_on(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>, RepoError> {
        let row = sqlx::query_as::<_, LeaveRow>(
            "SELECT id, employee_id, leave_type, start_date, end_date, status
             FROM leave_requests
             WHERE employee_id = ? AND status = 'approved'
               AND start_date <= ? AND end_date >= ?
             ORDER BY id
             LIMIT 1",
        )
        .bind(employee_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LeaveRequest::try_from).transpose()
    }
}

/// ===============================
/// Attendance
/// ===============================

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn create(&self, record: NewAttendance) -> Result<AttendanceRecord, RepoError> {
        let result = sqlx::query(
            "INSERT INTO attendances
             (employee_id, shift_id, work_date, check_in, check_out, status,
              overtime_minutes, is_correction, notes, corrected_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.employee_id)
        .bind(record.shift_id)
        .bind(record.work_date)
        .bind(record.check_in.naive_utc())
        .bind(record.check_out.map(|t| t.naive_utc()))
        .bind(record.status.as_ref())
        .bind(record.overtime_minutes)
        .bind(record.is_correction)
        .bind(record.notes.as_deref())
        .bind(record.corrected_by)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_write)?;

        Ok(record.into_record(result.last_insert_id()))
    }

    async fn create_if_absent(&self, record: NewAttendance) -> Result<Option<AttendanceRecord>, RepoError> {
        let result = sqlx::query(
            "INSERT INTO attendances
             (employee_id, shift_id, work_date, check_in, check_out, status,
              overtime_minutes, is_correction, notes, corrected_by)
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
             FROM DUAL
             WHERE NOT EXISTS (
                 SELECT 1 FROM attendances WHERE employee_id = ? AND work_date = ?
             )",
        )
        .bind(record.employee_id)
        .bind(record.shift_id)
        .bind(record.work_date)
        .bind(record.check_in.naive_utc())
        .bind(record.check_out.map(|t| t.naive_utc()))
        .bind(record.status.as_ref())
        .bind(record.overtime_minutes)
        .bind(record.is_correction)
        .bind(record.notes.as_deref())
        .bind(record.corrected_by)
        .bind(record.employee_id)
        .bind(record.work_date)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(None),
            Ok(done) => Ok(Some(record.into_record(done.last_insert_id()))),
            Err(e) => match RepoError::from_write(e) {
                // lost the race to a concurrent insert
                RepoError::Conflict => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn update(&self, record: &AttendanceRecord) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE attendances
             SET shift_id = ?, check_in = ?, check_out = ?, status = ?, overtime_minutes = ?,
                 is_correction = ?, notes = ?, corrected_by = ?
             WHERE id = ?",
        )
        .bind(record.shift_id)
        .bind(record.check_in.naive_utc())
        .bind(record.check_out.map(|t| t.naive_utc()))
        .bind(record.status.as_ref())
        .bind(record.overtime_minutes)
        .bind(record.is_correction)
        .bind(record.notes.as_deref())
        .bind(record.corrected_by)
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(RepoError::from_write)?;

        Ok(())
    }

    async fn latest_for_employee(&self, employee_id: u64) -> Result<Option<AttendanceRecord>, RepoError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances a
             WHERE a.employee_id = ?
             ORDER BY a.check_in DESC, a.id DESC
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn records_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances a
             WHERE a.employee_id = ? AND a.work_date = ?
             ORDER BY a.check_in"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(work_date)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn regular_for_date(
        &self,
        employee_id: u64,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepoError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances a
             WHERE a.employee_id = ? AND a.regular_day = ?
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(work_date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn open_record(&self, employee_id: u64, track: Track) -> Result<Option<AttendanceRecord>, RepoError> {
        let key = match track {
            Track::Regular => "open_regular_key",
            Track::Overtime => "open_overtime_key",
        };
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances a
             WHERE a.{key} = ?
             LIMIT 1"
        );
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn open_records_until(
        &self,
        company_id: u64,
        up_to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, RepoError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances a
             JOIN employees e ON e.id = a.employee_id
             WHERE e.company_id = ?
               AND a.work_date <= ?
               AND a.check_out IS NULL
               AND a.status IN ({OPEN_STATUSES})
             ORDER BY a.work_date, a.id"
        );
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(company_id)
            .bind(up_to)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows)
    }

    async fn dashboard_counts(&self, company_id: u64, date: NaiveDate) -> Result<DashboardCounts, RepoError> {
        let (total, present, absent, on_leave) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT
                 (SELECT COUNT(*) FROM employees WHERE company_id = ? AND status = 'active'),
                 COUNT(DISTINCT CASE WHEN a.status IN ('on_time', 'late', 'present', 'present (corrected)')
                                     THEN a.employee_id END),
                 COUNT(DISTINCT CASE WHEN a.status = 'absent' THEN a.employee_id END),
                 COUNT(DISTINCT CASE WHEN a.status IN ('on_leave', 'on_sick') THEN a.employee_id END)
             FROM attendances a
             JOIN employees e ON e.id = a.employee_id
             WHERE e.company_id = ? AND a.work_date = ?",
        )
        .bind(company_id)
        .bind(company_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let count = |n: i64| u64::try_from(n).unwrap_or_default();
        Ok(DashboardCounts {
            total_employees: count(total),
            present: count(present),
            absent: count(absent),
            on_leave: count(on_leave),
        })
    }
}
