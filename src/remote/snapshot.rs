//! Sequential pagination of a full remote listing.
//!
//! Page 1 must be read first because it declares how many pages exist, so
//! pages are requested strictly one after another.

use super::{EndpointConfig, OrderBy, RemotePage, RemoteSource};
use crate::cache::RemoteRecord;
use crate::core::{CacheError, Result};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

/// What to do when a page after the first cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePolicy {
    /// Fail the whole fetch.
    Abort,
    /// Stop and hand back what was accumulated so far as [`SnapshotFetch::Partial`].
    #[default]
    KeepAccumulated,
}

/// Cancellation observed at every page boundary.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub order: OrderBy,
    /// Upper bound for a single page request.
    pub page_timeout: Duration,
    pub policy: PagePolicy,
    pub cancel: Option<CancelToken>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            order: OrderBy::Asc,
            page_timeout: Duration::from_secs(30),
            policy: PagePolicy::default(),
            cancel: None,
        }
    }
}

impl FetchOptions {
    pub fn with_policy(mut self, policy: PagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Result of reading a full listing.
///
/// Unreachable remotes are not represented here: they come back as
/// `Err(CacheError::FetchUnavailable)`, so "remote has nothing" ([`SnapshotFetch::Empty`])
/// can never be confused with "remote could not be read".
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotFetch<T> {
    Complete(Vec<T>),
    Empty,
    Partial {
        items: Vec<T>,
        failed_page: u32,
        reason: String,
    },
}

impl<T> SnapshotFetch<T> {
    pub fn items(&self) -> &[T] {
        match self {
            SnapshotFetch::Complete(items) => items,
            SnapshotFetch::Empty => &[],
            SnapshotFetch::Partial { items, .. } => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            SnapshotFetch::Complete(items) => items,
            SnapshotFetch::Empty => Vec::new(),
            SnapshotFetch::Partial { items, .. } => items,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SnapshotFetch::Partial { .. })
    }
}

/// Reads every page of `endpoint` and decodes the items as `R`.
///
/// A failure on page 1 is always an error. Later failures follow `options.policy`.
/// Malformed items and cancellation abort regardless of policy. Items repeated
/// across pages keep their first occurrence. When the endpoint declares an item
/// total, a run that delivers fewer distinct items is unavailable, not complete.
pub async fn fetch_snapshot<R: RemoteRecord>(
    remote: &dyn RemoteSource,
    endpoint: &EndpointConfig,
    options: &FetchOptions,
) -> Result<SnapshotFetch<R>> {
    let collection = endpoint.collection.as_str();
    let mut seen = HashSet::new();
    let mut items: Vec<R> = Vec::new();

    check_cancelled(options, collection, 1)?;
    let first = fetch_page_bounded(remote, endpoint, 1, options).await?;
    let total_pages = first.total_pages;
    let declared_items = first.total_items;
    accumulate(collection, first, &mut items, &mut seen)?;

    for page in 2..=total_pages {
        check_cancelled(options, collection, page)?;
        match fetch_page_bounded(remote, endpoint, page, options).await {
            Ok(fetched) => accumulate(collection, fetched, &mut items, &mut seen)?,
            Err(err) if err.is_fetch_failure() && options.policy == PagePolicy::KeepAccumulated => {
                warn!(
                    collection,
                    page,
                    total_pages,
                    accumulated = items.len(),
                    error = %err,
                    "page fetch failed, keeping accumulated items"
                );
                return Ok(SnapshotFetch::Partial {
                    items,
                    failed_page: page,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    if let Some(declared) = declared_items {
        if (items.len() as u64) < declared {
            return Err(CacheError::FetchUnavailable {
                collection: collection.to_string(),
                page: total_pages.max(1),
                reason: format!(
                    "listing declared {} items but only {} distinct items were delivered",
                    declared,
                    items.len()
                ),
            });
        }
    }

    debug!(collection, total_pages, count = items.len(), "snapshot fetched");
    if items.is_empty() {
        Ok(SnapshotFetch::Empty)
    } else {
        Ok(SnapshotFetch::Complete(items))
    }
}

fn check_cancelled(options: &FetchOptions, collection: &str, page: u32) -> Result<()> {
    match &options.cancel {
        Some(token) if token.is_cancelled() => Err(CacheError::FetchCancelled {
            collection: collection.to_string(),
            page,
        }),
        _ => Ok(()),
    }
}

async fn fetch_page_bounded(
    remote: &dyn RemoteSource,
    endpoint: &EndpointConfig,
    page: u32,
    options: &FetchOptions,
) -> Result<RemotePage> {
    debug!(collection = %endpoint.collection, page, "fetching page");
    timeout(
        options.page_timeout,
        remote.fetch_page(endpoint, page, options.order),
    )
    .await
    .map_err(|_| CacheError::FetchUnavailable {
        collection: endpoint.collection.clone(),
        page,
        reason: format!("timed out after {}ms", options.page_timeout.as_millis()),
    })?
}

fn accumulate<R: RemoteRecord>(
    collection: &str,
    page: RemotePage,
    items: &mut Vec<R>,
    seen: &mut HashSet<String>,
) -> Result<()> {
    for raw in page.items {
        let record = R::decode(collection, raw)?;
        if seen.insert(record.id().to_string()) {
            items.push(record);
        } else {
            warn!(collection, id = record.id(), "duplicate id across pages ignored");
        }
    }
    Ok(())
}
