//! Named-operation boundary between the host process and the UI.

mod host;

pub use host::{CacheHost, HostRequest};
