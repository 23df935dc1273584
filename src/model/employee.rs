use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AttendanceError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "company_id": 1,
        "name": "Siti Rahma",
        "email": "siti@acme.co.id",
        "division_id": 3,
        "shift_id": 7,
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 42)]
    pub id: u64,

    #[schema(example = 1)]
    pub company_id: u64,

    #[schema(example = "Siti Rahma")]
    pub name: String,

    #[schema(example = "siti@acme.co.id")]
    pub email: String,

    #[schema(example = 3, nullable = true)]
    pub division_id: Option<u64>,

    #[schema(example = 7, nullable = true)]
    pub shift_id: Option<u64>,

    pub status: EmployeeStatus,
}

/// Fields an admin may change on an employee. Assignments use explicit
/// set/clear pairs so "leave unchanged" and "remove" stay distinguishable.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeeUpdate {
    #[schema(example = "Siti Rahma")]
    pub name: Option<String>,
    #[schema(example = "siti@acme.co.id", format = "email")]
    pub email: Option<String>,
    pub status: Option<EmployeeStatus>,
    #[schema(example = 7)]
    pub shift_id: Option<u64>,
    #[serde(default)]
    pub clear_shift: bool,
    #[schema(example = 3)]
    pub division_id: Option<u64>,
    #[serde(default)]
    pub clear_division: bool,
}

impl EmployeeUpdate {
    pub fn validate(&self) -> Result<(), AttendanceError> {
        if self.is_empty() {
            return Err(AttendanceError::Validation("No fields provided for update".into()));
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AttendanceError::Validation("name cannot be empty".into()));
            }
        }
        if let Some(email) = &self.email {
            let email = email.trim();
            let well_formed = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !well_formed {
                return Err(AttendanceError::Validation("email is not valid".into()));
            }
        }
        if self.shift_id.is_some() && self.clear_shift {
            return Err(AttendanceError::Validation(
                "shift_id and clear_shift are mutually exclusive".into(),
            ));
        }
        if self.division_id.is_some() && self.clear_division {
            return Err(AttendanceError::Validation(
                "division_id and clear_division are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.status.is_none()
            && self.shift_id.is_none()
            && !self.clear_shift
            && self.division_id.is_none()
            && !self.clear_division
    }

    /// Validates, then merges into `employee`. Nothing is changed on error.
    pub fn apply(&self, employee: &mut Employee) -> Result<(), AttendanceError> {
        self.validate()?;

        if let Some(name) = &self.name {
            employee.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            employee.email = email.trim().to_lowercase();
        }
        if let Some(status) = self.status {
            employee.status = status;
        }
        if self.clear_shift {
            employee.shift_id = None;
        } else if let Some(shift_id) = self.shift_id {
            employee.shift_id = Some(shift_id);
        }
        if self.clear_division {
            employee.division_id = None;
        } else if let Some(division_id) = self.division_id {
            employee.division_id = Some(division_id);
        }
        Ok(())
    }
}
