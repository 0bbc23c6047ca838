//! # contract: interfaces between the sync pipeline and the outside world
//!
//! The pipeline talks to the bucket only through [`RemoteStore`] and waits only
//! through [`Clock`]. Production code wires in the S3 client and tokio's timer;
//! tests substitute mocks (generated by `mockall`, exported under the
//! `test-export-mocks` feature) or hand-written fakes.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::StoreError;

/// Read and upload access to a flat-keyed object store.
///
/// Implementations must be safe to share between upload workers.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every key starting with `prefix`, following pagination to the end.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Upload the file at `local_path` to `key` with the given storage class.
    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        storage_class: &str,
    ) -> Result<(), StoreError>;
}

/// Time source used for throttling upload workers.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Suspend the calling task only.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by tokio's timer. Honors `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
