//! Fixtures shared by the engine, sweep and admin tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Jakarta;

use crate::engine::attendance::AttendanceEngine;
use crate::engine::clock::FixedClock;
use crate::engine::geofence::GeoPoint;
use crate::engine::identity::{IdentityGate, RecognitionOutcome};
use crate::engine::locks::EmployeeLocks;
use crate::engine::notify::{BroadcastSink, DashboardNotifier, TaskSpawner};
use crate::engine::shift_window::parse_clock;
use crate::model::{
    attendance::{AttendanceStatus, NewAttendance},
    attendance_location::AttendanceLocation,
    company::{Company, SubscriptionStatus},
    employee::{Employee, EmployeeStatus},
    leave_request::{LeaveRequest, LeaveStatus, LeaveType},
    shift::Shift,
};
use crate::models::AttendanceRequest;
use crate::repository::{Repositories, memory::MemoryStore};

pub const COMPANY: u64 = 1;
pub const EMPLOYEE: u64 = 42;
pub const DAY_SHIFT: u64 = 7;

pub const AT_OFFICE: GeoPoint = GeoPoint {
    latitude: -6.2000,
    longitude: 106.8166,
};

pub fn company(timezone: &str) -> Company {
    Company {
        id: COMPANY,
        name: "Acme".into(),
        timezone: timezone.into(),
        subscription_status: SubscriptionStatus::Active,
    }
}

pub fn employee(id: u64, shift_id: Option<u64>) -> Employee {
    Employee {
        id,
        company_id: COMPANY,
        name: format!("Employee {id}"),
        email: format!("e{id}@acme.co.id"),
        division_id: None,
        shift_id,
        status: EmployeeStatus::Active,
    }
}

fn shift(id: u64, name: &str, start: &str, end: &str, grace: u32) -> Shift {
    Shift {
        id,
        company_id: COMPANY,
        name: name.into(),
        start_time: parse_clock(start).unwrap(),
        end_time: parse_clock(end).unwrap(),
        grace_period_minutes: grace,
        is_default: false,
    }
}

/// 09:00-17:00, 15 minutes grace.
pub fn day_shift(id: u64) -> Shift {
    shift(id, "Day", "09:00:00", "17:00:00", 15)
}

/// 15:00-23:00, 10 minutes grace.
pub fn evening_shift(id: u64) -> Shift {
    shift(id, "Evening", "15:00:00", "23:00:00", 10)
}

/// 22:00-06:00, 10 minutes grace.
pub fn night_shift(id: u64) -> Shift {
    shift(id, "Night", "22:00:00", "06:00:00", 10)
}

pub fn location(id: u64, latitude: f64, longitude: f64) -> AttendanceLocation {
    AttendanceLocation {
        id,
        company_id: COMPANY,
        name: format!("Site {id}"),
        latitude,
        longitude,
        radius: 100,
    }
}

pub fn approved_leave(employee_id: u64, leave_type: LeaveType, from: NaiveDate, to: NaiveDate) -> LeaveRequest {
    LeaveRequest {
        id: employee_id * 100,
        employee_id,
        leave_type,
        start_date: from,
        end_date: to,
        status: LeaveStatus::Approved,
    }
}

/// Jakarta company, day shift 7, one office, employee 42 with a face on file.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_company(company("Asia/Jakarta"));
    store.add_shift(day_shift(DAY_SHIFT));
    store.add_location(location(1, AT_OFFICE.latitude, AT_OFFICE.longitude));
    store.add_employee(employee(EMPLOYEE, Some(DAY_SHIFT)));
    store.add_face(EMPLOYEE, "faces/42.jpg");
    store
}

/// Wall-clock time in Jakarta as a UTC instant.
pub fn jakarta(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Jakarta
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn closed_record(employee_id: u64, work_date: NaiveDate, status: AttendanceStatus) -> NewAttendance {
    let at = work_date.and_hms_opt(2, 0, 0).unwrap().and_utc();
    NewAttendance {
        employee_id,
        shift_id: Some(DAY_SHIFT),
        work_date,
        check_in: at,
        check_out: Some(at),
        status,
        overtime_minutes: 0,
        is_correction: false,
        notes: None,
        corrected_by: None,
    }
}

pub fn open_record(employee_id: u64, work_date: NaiveDate, check_in: DateTime<Utc>) -> NewAttendance {
    NewAttendance {
        employee_id,
        shift_id: Some(DAY_SHIFT),
        work_date,
        check_in,
        check_out: None,
        status: AttendanceStatus::OnTime,
        overtime_minutes: 0,
        is_correction: false,
        notes: None,
        corrected_by: None,
    }
}

pub fn request(employee_id: u64, at: GeoPoint) -> AttendanceRequest {
    AttendanceRequest {
        employee_id,
        latitude: at.latitude,
        longitude: at.longitude,
        image_data: "aGVsbG8=".into(),
    }
}

/// Identity gate returning a configurable outcome.
pub struct ScriptedGate {
    outcome: Mutex<RecognitionOutcome>,
    calls: AtomicUsize,
}

impl ScriptedGate {
    pub fn new(outcome: RecognitionOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, outcome: RecognitionOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGate for ScriptedGate {
    async fn verify(&self, _reference: &str, _live: &str) -> RecognitionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.outcome.lock().unwrap()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub gate: Arc<ScriptedGate>,
    pub sink: Arc<BroadcastSink>,
    pub engine: AttendanceEngine,
}

pub fn harness(store: Arc<MemoryStore>, now: DateTime<Utc>) -> Harness {
    let repos = Repositories::memory(store.clone());
    let clock = Arc::new(FixedClock::at(now));
    let gate = Arc::new(ScriptedGate::new(RecognitionOutcome::Recognized));
    let sink = Arc::new(BroadcastSink::new(16));
    let notifier = DashboardNotifier::new(repos.attendance.clone(), sink.clone(), TaskSpawner::new(4));
    let engine = AttendanceEngine::new(
        repos,
        gate.clone(),
        notifier,
        EmployeeLocks::default(),
        clock.clone(),
    );
    Harness {
        store,
        clock,
        gate,
        sink,
        engine,
    }
}
