pub mod admin;
pub mod attendance;
pub mod clock;
pub mod geofence;
pub mod identity;
pub mod locks;
pub mod notify;
pub mod resolver;
pub mod shift_window;
pub mod sweep;

#[cfg(test)]
pub mod testkit;
