use crate::auth::auth::AuthUser;
use crate::engine::admin::AdminService;
use crate::model::employee::{Employee, EmployeeUpdate};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Update an employee
#[utoipa::path(
    put,
    path = "/api/employee/{id}",
    params(
        ("id", Path, description = "Employee id")
    ),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid update", body = Object, example = json!({
            "message": "No fields provided for update"
        })),
        (status = 403, description = "HR/Admin only, or employee of another company"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "employee 42 not found"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Something went wrong, Contact with system admin"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    admin: web::Data<AdminService>,
    path: web::Path<u64>,
    payload: web::Json<EmployeeUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let employee = admin
        .update_employee(auth.company_id, path.into_inner(), &payload)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully",
        "employee": employee
    })))
}
