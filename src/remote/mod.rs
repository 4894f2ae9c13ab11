//! The remote authoritative source and how its paginated listings are read.

pub mod http;
pub mod memory;
pub mod page;
pub mod snapshot;

pub use http::HttpRemoteSource;
pub use memory::MemoryRemoteSource;
pub use page::{CountField, EndpointConfig, OrderBy, RemotePage};
pub use snapshot::{
    CancelHandle, CancelToken, FetchOptions, PagePolicy, SnapshotFetch, cancel_pair,
    fetch_snapshot,
};

use crate::core::Result;
use async_trait::async_trait;

/// Paginated listing endpoint of the remote business API.
///
/// Implementations return `CacheError::FetchUnavailable` for transport failures
/// and non-success responses. Pages are 1-indexed.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_page(
        &self,
        endpoint: &EndpointConfig,
        page: u32,
        order: OrderBy,
    ) -> Result<RemotePage>;
}
