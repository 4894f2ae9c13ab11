use crate::cache::{CacheEntity, EntityCache};
use crate::core::Result;
use crate::remote::{EndpointConfig, FetchOptions, RemoteSource, SnapshotFetch, fetch_snapshot};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BootstrapOutcome {
    /// The cache already had entities; nothing was fetched or written.
    AlreadySeeded { count: usize },
    Seeded { count: usize },
    /// A page after the first failed and `PagePolicy::KeepAccumulated` was in effect.
    #[serde(rename_all = "camelCase")]
    Partial {
        count: usize,
        failed_page: u32,
        reason: String,
    },
}

/// Seeds an empty cache from the remote listing.
///
/// A non-empty cache is left alone, which makes repeated calls no-ops. A failure
/// on the first page returns the error without writing anything; failures on
/// later pages are handled by `fetch.policy`.
pub async fn initialize<E: CacheEntity>(
    cache: &mut EntityCache<E>,
    remote: &dyn RemoteSource,
    endpoint: &EndpointConfig,
    fetch: &FetchOptions,
) -> Result<BootstrapOutcome> {
    if !cache.is_empty() {
        return Ok(BootstrapOutcome::AlreadySeeded { count: cache.len() });
    }

    let fetched = fetch_snapshot::<E::Remote>(remote, endpoint, fetch).await?;
    let partial = match &fetched {
        SnapshotFetch::Partial {
            failed_page,
            reason,
            ..
        } => Some((*failed_page, reason.clone())),
        _ => None,
    };

    let entities: Vec<E> = fetched.items().iter().map(E::from_remote).collect();
    let count = entities.len();
    cache.replace_all(entities)?;

    match partial {
        Some((failed_page, reason)) => {
            warn!(
                collection = %cache.key(),
                count,
                failed_page,
                "cache seeded from a partial listing"
            );
            Ok(BootstrapOutcome::Partial {
                count,
                failed_page,
                reason,
            })
        }
        None => {
            info!(collection = %cache.key(), count, "cache seeded");
            Ok(BootstrapOutcome::Seeded { count })
        }
    }
}
