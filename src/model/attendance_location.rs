use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceLocation {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters.
    pub radius: u32,
}
