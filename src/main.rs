use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;
use tokio::sync::broadcast::error::RecvError;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod model;
mod models;
mod repository;
mod routes;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::engine::{
    admin::AdminService,
    attendance::AttendanceEngine,
    clock::{Clock, SystemClock},
    identity::TcpFaceOracle,
    locks::EmployeeLocks,
    notify::{BroadcastSink, DashboardNotifier, TaskSpawner},
    sweep::DailySweep,
};
use crate::repository::Repositories;
use crate::routes::Limiters;
use tracing::{debug, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;
    let repos = Repositories::mysql(pool);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let locks = EmployeeLocks::default();
    let sink = Arc::new(BroadcastSink::new(256));
    let notifier = DashboardNotifier::new(
        repos.attendance.clone(),
        sink.clone(),
        TaskSpawner::new(config.notify_concurrency),
    );
    let identity = Arc::new(TcpFaceOracle::new(
        config.face_oracle_addr.clone(),
        config.face_oracle_timeout(),
    ));

    let engine = Data::new(AttendanceEngine::new(
        repos.clone(),
        identity,
        notifier.clone(),
        locks.clone(),
        clock.clone(),
    ));
    let admin = Data::new(AdminService::new(repos.clone(), locks, notifier, clock.clone()));

    // Daily reconciliation on a timer
    let sweep = Arc::new(DailySweep::new(repos, clock, config.sweep_workers));
    actix_web::rt::spawn(sweep.run_every(config.sweep_interval()));

    // Dashboard updates; a live transport would subscribe the same way
    let mut updates = sink.subscribe();
    actix_web::rt::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(summary) => debug!(
                    company_id = summary.company_id,
                    present = summary.present_today,
                    absent = summary.absent_today,
                    on_leave = summary.on_leave_today,
                    "Dashboard updated"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dashboard listener lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let limiters = Limiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine.clone())
            .app_data(admin.clone())
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
