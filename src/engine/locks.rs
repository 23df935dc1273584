use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-employee critical sections. Idle entries expire; the unique keys on
/// `attendances` still hold if an entry is evicted while in use.
#[derive(Clone)]
pub struct EmployeeLocks {
    locks: Cache<u64, Arc<Mutex<()>>>,
}

impl EmployeeLocks {
    pub fn new(max_capacity: u64, idle: Duration) -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Waits until no other request for `employee_id` is in its section.
    pub async fn acquire(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(employee_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for EmployeeLocks {
    fn default() -> Self {
        Self::new(100_000, Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_employee_is_serialized() {
        let locks = EmployeeLocks::default();
        let guard = locks.acquire(42).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.acquire(42).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn different_employees_do_not_block() {
        let locks = EmployeeLocks::default();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
    }
}
