use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, error, warn};

use crate::repository::AttendanceRepository;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub company_id: u64,
    pub date: NaiveDate,
    pub total_employees: u64,
    pub present_today: u64,
    pub absent_today: u64,
    pub on_leave_today: u64,
    pub generated_at: DateTime<Utc>,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn push_company_dashboard_update(
        &self,
        company_id: u64,
        summary: DashboardSummary,
    ) -> anyhow::Result<()>;
}

/// In-process fan-out; a live-dashboard transport subscribes to it.
pub struct BroadcastSink {
    tx: broadcast::Sender<DashboardSummary>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardSummary> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl NotificationSink for BroadcastSink {
    async fn push_company_dashboard_update(
        &self,
        company_id: u64,
        summary: DashboardSummary,
    ) -> anyhow::Result<()> {
        match self.tx.send(summary) {
            Ok(receivers) => debug!(company_id, receivers, "Dashboard update pushed"),
            Err(_) => debug!(company_id, "Dashboard update dropped, no subscribers"),
        }
        Ok(())
    }
}

/// Runs background jobs with bounded concurrency. When every permit is
/// taken the job is dropped, never queued.
#[derive(Clone)]
pub struct TaskSpawner {
    permits: Arc<Semaphore>,
}

impl TaskSpawner {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Returns whether the job was accepted.
    pub fn spawn<F>(&self, job: &'static str, fut: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(job, "Background task limit reached, dropping job");
                return false;
            }
        };

        tokio::spawn(async move {
            if let Err(e) = fut.await {
                error!(job, error = %e, "Background task failed");
            }
            drop(permit);
        });
        true
    }
}

/// Recomputes and pushes a company's dashboard summary off the request path.
#[derive(Clone)]
pub struct DashboardNotifier {
    attendance: Arc<dyn AttendanceRepository>,
    sink: Arc<dyn NotificationSink>,
    spawner: TaskSpawner,
}

impl DashboardNotifier {
    pub fn new(
        attendance: Arc<dyn AttendanceRepository>,
        sink: Arc<dyn NotificationSink>,
        spawner: TaskSpawner,
    ) -> Self {
        Self {
            attendance,
            sink,
            spawner,
        }
    }

    pub fn notify(&self, company_id: u64, date: NaiveDate, now: DateTime<Utc>) -> bool {
        let attendance = self.attendance.clone();
        let sink = self.sink.clone();

        self.spawner.spawn("dashboard_update", async move {
            let counts = attendance.dashboard_counts(company_id, date).await?;
            let summary = DashboardSummary {
                company_id,
                date,
                total_employees: counts.total_employees,
                present_today: counts.present,
                absent_today: counts.absent,
                on_leave_today: counts.on_leave,
                generated_at: now,
            };
            sink.push_company_dashboard_update(company_id, summary).await
        })
    }
}
