//! Timeout enforcement.
//!
//! Every read gets a deadline here regardless of what the read primitive
//! does internally; an elapsed deadline is reported as `ReadError::Timeout`.

use std::future::Future;
use std::time::Duration;

use crate::reader::ReadError;

/// Run `fut` with a deadline of `limit`.
pub async fn with_read_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ReadError>
where
    F: Future<Output = Result<T, ReadError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ReadError::Timeout(limit)),
    }
}
