//! Adapter for synchronous read functions.

use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::reader::{ReadError, ValueReader};

/// Wraps a blocking `read(endpoint, register)` function.
///
/// Each call runs on tokio's blocking pool so a slow client library never
/// stalls the scheduler task. The function should enforce its own socket
/// timeout; the engine's read timeout only stops waiting for it.
pub struct BlockingReader<F> {
    read: Arc<F>,
}

impl<F> BlockingReader<F>
where
    F: Fn(&Endpoint, u16) -> Result<u16, ReadError> + Send + Sync + 'static,
{
    pub fn new(read: F) -> Self {
        Self { read: Arc::new(read) }
    }
}

impl<F> ValueReader for BlockingReader<F>
where
    F: Fn(&Endpoint, u16) -> Result<u16, ReadError> + Send + Sync + 'static,
{
    async fn read_value(&self, endpoint: &Endpoint, register: u16) -> Result<u16, ReadError> {
        let read = self.read.clone();
        let endpoint = endpoint.clone();
        tokio::task::spawn_blocking(move || read(&endpoint, register))
            .await
            .map_err(|e| ReadError::Connection(format!("blocking read aborted: {}", e)))?
    }
}
