use crate::auth::auth::AuthUser;
use crate::engine::admin::AdminService;
use crate::model::shift::{Shift, ShiftUpdate};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Update a shift
#[utoipa::path(
    put,
    path = "/api/shift/{id}",
    params(
        ("id", Path, description = "Shift id")
    ),
    request_body = ShiftUpdate,
    responses(
        (status = 200, description = "Shift updated", body = Shift),
        (status = 400, description = "Invalid update", body = Object, example = json!({
            "message": "shift start and end cannot be equal"
        })),
        (status = 403, description = "HR/Admin only, or shift of another company"),
        (status = 404, description = "Shift not found", body = Object, example = json!({
            "message": "shift 7 not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    admin: web::Data<AdminService>,
    path: web::Path<u64>,
    payload: web::Json<ShiftUpdate>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let shift = admin
        .update_shift(auth.company_id, path.into_inner(), &payload)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Shift updated successfully",
        "shift": shift
    })))
}
