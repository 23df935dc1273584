use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{attendance::AttendanceRecord, employee::Employee};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = json!(-6.2))]
    pub latitude: f64,
    #[schema(example = 106.8166)]
    pub longitude: f64,
    /// Base64 encoded live capture.
    #[schema(example = "/9j/4AAQSkZJRgABAQ...")]
    pub image_data: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceOutcome {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub employee: Employee,
    /// Time of the transition in company time.
    #[schema(value_type = String, format = "date-time", example = "2026-03-02T08:55:00+07:00")]
    pub timestamp: DateTime<FixedOffset>,
    pub record: AttendanceRecord,
}

/// Admin marks an employee present for a work date.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttendanceCorrection {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "09:00:00")]
    pub check_in: String,
    #[schema(example = "17:00:00")]
    pub check_out: String,
    #[schema(example = "Forgot to check out, confirmed by supervisor")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub company_id: u64,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
