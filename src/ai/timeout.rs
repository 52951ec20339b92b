//! Timeouts and Cancellation
//!
//! Every external call is bounded by a timeout and can be abandoned through a
//! `CancellationToken`.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, guarded};
//!
//! let config = TimeoutConfig::default();
//! let result = guarded(
//!     config.retrieval,
//!     &cancel,
//!     async { /* search call */ },
//!     "search",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::constants::{network as net_constants, retrieval as retrieval_constants};
use crate::types::{ChefError, Result};

/// Timeouts for the external calls made per turn
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Search request (default: 30 seconds)
    pub retrieval: Duration,
    /// One completion attempt (default: 2 minutes)
    pub completion: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            retrieval: Duration::from_secs(retrieval_constants::TIMEOUT_SECS),
            completion: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retrieval: Duration::from_secs(config.retrieval.timeout_secs),
            completion: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ChefError::timeout(operation_name, timeout)),
    }
}

/// Execute an async operation unless the token is cancelled first.
///
/// The pending future is dropped on cancellation, aborting its request.
pub async fn with_cancellation<T, F>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChefError::Cancelled),
        result = future => result,
    }
}

/// Timeout plus cancellation
pub async fn guarded<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    future: F,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    with_cancellation(cancel, with_timeout(timeout, future, operation_name)).await
}
