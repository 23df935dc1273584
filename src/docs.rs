use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::employee::{Employee, EmployeeStatus, EmployeeUpdate};
use crate::model::shift::{Shift, ShiftUpdate};
use crate::models::{AttendanceCorrection, AttendanceOutcome, AttendanceRequest};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance & Shift Reconciliation

Geofenced, face-verified attendance for multi-company HR.

### 🔹 Key Features
- **Attendance**
  - One endpoint for check-in and check-out, resolved against the employee's shift
  - Overtime check-in / check-out outside the regular shift window
- **Administration**
  - Shift edits, employee assignment edits and attendance corrections
- **Reconciliation**
  - A background sweep marks absences, approved leave and forgotten check-outs

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.
Administrative endpoints accept only the **Admin** or **HR** role and act inside the caller's company.

### 📦 Response Format
- JSON responses; errors carry a `message` field

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::record_attendance,
        crate::api::attendance::overtime_check_in,
        crate::api::attendance::overtime_check_out,
        crate::api::attendance::latest_attendance,
        crate::api::attendance::correct_attendance,

        crate::api::shift::update_shift,

        crate::api::employee::update_employee
    ),
    components(
        schemas(
            AttendanceRequest,
            AttendanceOutcome,
            AttendanceCorrection,
            AttendanceRecord,
            AttendanceStatus,
            Employee,
            EmployeeStatus,
            EmployeeUpdate,
            Shift,
            ShiftUpdate
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance and overtime APIs"),
        (name = "Shift", description = "Shift management APIs"),
        (name = "Employee", description = "Employee management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
