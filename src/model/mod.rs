pub mod attendance;
pub mod attendance_location;
pub mod company;
pub mod division;
pub mod employee;
pub mod leave_request;
pub mod role;
pub mod shift;
