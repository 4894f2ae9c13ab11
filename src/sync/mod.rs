//! Keeping entity caches in line with the remote source.

pub mod bootstrap;
pub mod policy;
pub mod reconcile;

pub use bootstrap::{BootstrapOutcome, initialize};
pub use policy::{StaleNestedPolicy, ValidateOptions};
pub use reconcile::{reconcile, validate};
