//! Timeout helpers shared by the client and the shutdown path.

use std::future::Future;
use std::time::Duration;

use crate::error::{LoginError, Result};

/// How long a client waits for a reply before giving up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long in-flight requests get to finish on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Await `fut`, turning an elapsed deadline into [`LoginError::Timeout`].
pub async fn with_timeout_error<F, T>(fut: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(LoginError::Timeout),
    }
}
