//! # Storage Policy
//!
//! Operation timeouts and bounded retry for transient storage failures.
//!
//! ```text
//! service call
//!     │
//!     ▼
//! timed(op) ──── exceeds operation_timeout ──► DbError::Timeout
//!     │
//!     ▼
//! retry_transient(op)
//!     │
//!     ├── Ok / business error / permanent DbError ──► returned as-is
//!     │
//!     └── Busy | PoolExhausted ──► sleep(next_backoff) ──► try again
//!                                  (at most max_write_retries times)
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{DbError, InventoryError, InventoryResult};
use crate::pool::DbConfig;

/// Timeout and retry settings shared by the services.
#[derive(Debug, Clone)]
pub struct StoragePolicy {
    pub operation_timeout: Duration,
    pub max_write_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl StoragePolicy {
    pub fn from_config(config: &DbConfig) -> Self {
        StoragePolicy {
            operation_timeout: config.operation_timeout,
            max_write_retries: config.max_write_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }

    /// Runs `fut` under the operation timeout.
    ///
    /// The future is dropped on expiry, so an open transaction inside it
    /// rolls back.
    pub async fn timed<T, E, F>(&self, operation: &'static str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DbError>,
    {
        match timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Storage operation timed out"
                );
                Err(DbError::Timeout {
                    operation,
                    after: self.operation_timeout,
                }
                .into())
            }
        }
    }

    /// Retries `attempt` while it fails with a transient storage error.
    pub async fn retry_transient<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> InventoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InventoryResult<T>>,
    {
        let mut backoff = self.backoff();
        let mut retries = 0u32;

        loop {
            match attempt().await {
                Err(InventoryError::Db(err))
                    if err.is_transient() && retries < self.max_write_retries =>
                {
                    retries += 1;
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(err.into());
                    };
                    warn!(
                        operation,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Creates the exponential backoff configuration.
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            // Bounded by attempt count instead
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbResult;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stockroom_core::{CoreError, EntityKind};

    fn policy(retries: u32) -> StoragePolicy {
        StoragePolicy {
            operation_timeout: Duration::from_millis(50),
            max_write_retries: retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_timed_maps_expiry_to_timeout() {
        let result: DbResult<()> = policy(0)
            .timed("slow_query", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(DbError::Timeout {
                operation: "slow_query",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = &AtomicU32::new(0);
        let result = policy(3)
            .retry_transient("write", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DbError::Busy("database is locked".into()).into())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = &AtomicU32::new(0);
        let result: InventoryResult<()> = policy(2)
            .retry_transient("write", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::PoolExhausted.into())
            })
            .await;

        assert!(matches!(result, Err(InventoryError::Db(DbError::PoolExhausted))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: InventoryResult<()> = policy(5)
            .retry_transient("write", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CoreError::not_found(EntityKind::Product, 1).into())
            })
            .await;

        assert!(result.unwrap_err().is_business());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
