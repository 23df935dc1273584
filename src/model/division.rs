use serde::{Deserialize, Serialize};

/// A company sub-group. Non-empty `shift_ids` / `location_ids` override the
/// employee-level assignment; both lists keep their configured order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Division {
    pub id: u64,
    pub company_id: u64,
    pub name: String,
    pub shift_ids: Vec<u64>,
    pub location_ids: Vec<u64>,
}
