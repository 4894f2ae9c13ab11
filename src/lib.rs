// ============================================================================
// MirrorCache Library
// ============================================================================

pub mod cache;
pub mod config;
pub mod core;
pub mod entities;
pub mod facade;
pub mod remote;
pub mod storage;
pub mod sync;

// Re-export main types for convenience
pub use cache::{CacheEntity, EntityCache, RemoteRecord};
pub use config::CacheConfig;
pub use core::{CacheError, MismatchKind, MismatchRecord, Result, ValidationReport};
pub use facade::{CacheHost, HostRequest};
pub use remote::{
    EndpointConfig, FetchOptions, HttpRemoteSource, MemoryRemoteSource, PagePolicy, RemoteSource,
    SnapshotFetch,
};
pub use storage::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use sync::{BootstrapOutcome, StaleNestedPolicy, ValidateOptions};
