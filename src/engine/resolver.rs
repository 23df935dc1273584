use std::collections::HashMap;

use crate::error::AttendanceError;
use crate::model::{
    attendance_location::AttendanceLocation, division::Division, employee::Employee, shift::Shift,
};
use crate::repository::Repositories;

/// The shift and geofence set that actually apply to an employee.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub shift: Shift,
    pub locations: Vec<AttendanceLocation>,
}

/// Shift ids to try, highest precedence first: the division's primary
/// shift, then the employee's own assignment.
pub fn shift_candidates(employee: &Employee, division: Option<&Division>) -> Vec<u64> {
    division
        .and_then(|d| d.shift_ids.first().copied())
        .into_iter()
        .chain(employee.shift_id)
        .collect()
}

/// Picks the effective shift out of a preloaded company shift map.
pub fn pick_shift<'a>(
    employee: &Employee,
    division: Option<&Division>,
    company_shifts: &'a HashMap<u64, Shift>,
) -> Option<&'a Shift> {
    shift_candidates(employee, division)
        .into_iter()
        .find_map(|id| company_shifts.get(&id))
}

pub struct Resolver<'a> {
    repos: &'a Repositories,
}

impl<'a> Resolver<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// The employee's division, if it still exists in the same company.
    /// A dangling id is treated as "no division".
    pub async fn division_of(&self, employee: &Employee) -> Result<Option<Division>, AttendanceError> {
        let Some(division_id) = employee.division_id else {
            return Ok(None);
        };
        let division = self.repos.divisions.division_by_id(division_id).await?;
        Ok(division.filter(|d| d.company_id == employee.company_id))
    }

    pub async fn shift_for(
        &self,
        employee: &Employee,
        division: Option<&Division>,
    ) -> Result<Shift, AttendanceError> {
        for shift_id in shift_candidates(employee, division) {
            if let Some(shift) = self.repos.shifts.shift_by_id(shift_id).await? {
                if shift.company_id == employee.company_id {
                    return Ok(shift);
                }
            }
        }
        Err(AttendanceError::ShiftNotConfigured)
    }

    pub async fn locations_for(
        &self,
        employee: &Employee,
        division: Option<&Division>,
    ) -> Result<Vec<AttendanceLocation>, AttendanceError> {
        if let Some(division) = division.filter(|d| !d.location_ids.is_empty()) {
            let locations: Vec<AttendanceLocation> = self
                .repos
                .locations
                .locations_by_ids(&division.location_ids)
                .await?
                .into_iter()
                .filter(|l| l.company_id == employee.company_id)
                .collect();
            if !locations.is_empty() {
                return Ok(locations);
            }
        }

        let locations = self
            .repos
            .locations
            .locations_by_company(employee.company_id)
            .await?;
        if locations.is_empty() {
            return Err(AttendanceError::NoValidLocations);
        }
        Ok(locations)
    }

    pub async fn resolve(&self, employee: &Employee) -> Result<Resolution, AttendanceError> {
        let division = self.division_of(employee).await?;
        let shift = self.shift_for(employee, division.as_ref()).await?;
        let locations = self.locations_for(employee, division.as_ref()).await?;
        Ok(Resolution { shift, locations })
    }
}
