use crate::auth::auth::AuthUser;
use crate::engine::{admin::AdminService, attendance::AttendanceEngine};
use crate::model::attendance::AttendanceRecord;
use crate::models::{AttendanceCorrection, AttendanceOutcome, AttendanceRequest};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Regular check-in / check-out
///
/// The first request of a shift checks in, the next one checks out.
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Checked in or out", body = AttendanceOutcome),
        (status = 400, description = "Too early, outside the shift window or on leave", body = Object, example = json!({
            "message": "Outside the shift window, use overtime check-in instead"
        })),
        (status = 403, description = "Outside the geofence or face not recognized", body = Object, example = json!({
            "message": "You are outside the allowed attendance area"
        })),
        (status = 409, description = "Attendance already completed", body = Object, example = json!({
            "message": "Attendance for this shift is already completed"
        })),
        (status = 422, description = "Shift or locations not configured"),
        (status = 503, description = "Face recognition service unavailable"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<AttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_own_employee(payload.employee_id)?;

    let outcome = engine.handle_regular_attendance(&payload).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Overtime check-in
#[utoipa::path(
    post,
    path = "/api/overtime/check-in",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Overtime check-in recorded", body = AttendanceOutcome),
        (status = 400, description = "Inside the shift window or a regular check-in is open", body = Object, example = json!({
            "message": "Overtime check-in not allowed: the regular shift is in progress"
        })),
        (status = 409, description = "An overtime check-in is already open"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn overtime_check_in(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<AttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_own_employee(payload.employee_id)?;

    let outcome = engine.handle_overtime_check_in(&payload).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Overtime check-out
#[utoipa::path(
    post,
    path = "/api/overtime/check-out",
    request_body = AttendanceRequest,
    responses(
        (status = 200, description = "Overtime check-out recorded", body = AttendanceOutcome),
        (status = 400, description = "No open overtime check-in", body = Object, example = json!({
            "message": "No open overtime check-in found"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn overtime_check_out(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
    payload: web::Json<AttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_own_employee(payload.employee_id)?;

    let outcome = engine.handle_overtime_check_out(&payload).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Latest attendance record of the caller
#[utoipa::path(
    get,
    path = "/api/attendance/latest",
    responses(
        (status = 200, description = "Most recent record", body = AttendanceRecord),
        (status = 404, description = "Nothing recorded yet", body = Object, example = json!({
            "message": "No attendance recorded yet"
        })),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn latest_attendance(
    auth: AuthUser,
    engine: web::Data<AttendanceEngine>,
) -> actix_web::Result<impl Responder> {
    let employee_id: u64 = auth
        .employee_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))?;

    match engine.latest_attendance(employee_id).await? {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No attendance recorded yet"
        }))),
    }
}

/// Admin attendance correction
#[utoipa::path(
    post,
    path = "/api/attendance/correction",
    request_body = AttendanceCorrection,
    responses(
        (status = 200, description = "Attendance corrected", body = Object, example = json!({
            "message": "Attendance corrected",
            "record": {"id": 1001, "status": "present (corrected)"}
        })),
        (status = 400, description = "Invalid times", body = Object, example = json!({
            "message": "check_out cannot be before check_in"
        })),
        (status = 403, description = "HR/Admin only, or employee of another company"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn correct_attendance(
    auth: AuthUser,
    admin: web::Data<AdminService>,
    payload: web::Json<AttendanceCorrection>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let record = admin
        .correct_attendance(auth.company_id, auth.user_id, &payload)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance corrected",
        "record": record
    })))
}
