use crate::{
    api::{attendance, employee, shift},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Governor::new(&cfg))
}

/// Rate limiters for the two route groups, built once at startup and shared
/// by every worker.
#[derive(Clone)]
pub struct Limiters {
    attendance: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    admin: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            attendance: Arc::new(build_limiter(config.rate_attendance_per_min)?),
            admin: Arc::new(build_limiter(config.rate_admin_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // employee self-service
            .service(
                web::resource("/attendance")
                    .wrap(limiters.attendance.clone())
                    .route(web::post().to(attendance::record_attendance)),
            )
            .service(
                web::resource("/attendance/latest")
                    .wrap(limiters.attendance.clone())
                    .route(web::get().to(attendance::latest_attendance)),
            )
            .service(
                web::scope("/overtime")
                    .wrap(limiters.attendance.clone())
                    // /overtime/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::overtime_check_in)),
                    )
                    // /overtime/check-out
                    .service(
                        web::resource("/check-out")
                            .route(web::post().to(attendance::overtime_check_out)),
                    ),
            )
            // HR / Admin
            .service(
                web::resource("/attendance/correction")
                    .wrap(limiters.admin.clone())
                    .route(web::post().to(attendance::correct_attendance)),
            )
            .service(
                web::resource("/shift/{id}")
                    .wrap(limiters.admin.clone())
                    .route(web::put().to(shift::update_shift)),
            )
            .service(
                web::resource("/employee/{id}")
                    .wrap(limiters.admin.clone())
                    .route(web::put().to(employee::update_employee)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_zero_and_large_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120).is_ok());
        assert!(build_limiter(100_000).is_ok());
    }
}
