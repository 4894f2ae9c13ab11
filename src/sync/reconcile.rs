//! Diff and repair of a cache against a full remote snapshot.
//!
//! Cached entities are processed first in cache order, then remote-only
//! entities in snapshot order. That sequence fixes the collection order left
//! behind by an auto-fixing run.

use super::ValidateOptions;
use crate::cache::{CacheEntity, EntityCache, RemoteRecord};
use crate::core::{MismatchRecord, Result, ValidationReport};
use crate::remote::{EndpointConfig, FetchOptions, PagePolicy, RemoteSource, fetch_snapshot};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Fetches the full remote listing and reconciles `cache` against it.
///
/// The fetch always aborts on any failed page, whatever `fetch.policy` says:
/// reconciling against a partial snapshot would report (and with
/// `remove_orphaned`, delete) entities that were merely on an unread page. On
/// error the cache is left untouched.
pub async fn validate<E: CacheEntity>(
    cache: &mut EntityCache<E>,
    remote: &dyn RemoteSource,
    endpoint: &EndpointConfig,
    options: &ValidateOptions,
    fetch: &FetchOptions,
) -> Result<ValidationReport> {
    let fetch = fetch.clone().with_policy(PagePolicy::Abort);
    let snapshot = fetch_snapshot::<E::Remote>(remote, endpoint, &fetch)
        .await?
        .into_items();
    reconcile(cache, &snapshot, options)
}

/// Reconciles `cache` against an already fetched, complete snapshot.
pub fn reconcile<E: CacheEntity>(
    cache: &mut EntityCache<E>,
    snapshot: &[E::Remote],
    options: &ValidateOptions,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(cache.key());
    let remote_by_id: HashMap<&str, &E::Remote> =
        snapshot.iter().map(|r| (r.id(), r)).collect();

    for id in cache.ids() {
        let Some(remote) = remote_by_id.get(id.as_str()) else {
            if options.remove_orphaned {
                cache.remove(&id)?;
                warn!(collection = %cache.key(), id = %id, "orphan removed");
                report.removed.push(id);
            }
            continue;
        };

        let Some(cached) = cache.get(&id) else {
            continue;
        };
        let fresh = E::from_remote(remote);
        let mut corrected = cached.clone();
        let mut changed = false;

        for ((field, cached_value), (_, remote_value)) in
            cached.remote_fields().into_iter().zip(fresh.remote_fields())
        {
            if cached_value == remote_value {
                continue;
            }
            report.mismatches.push(MismatchRecord::field(
                id.as_str(),
                field,
                cached_value,
                remote_value.clone(),
            ));
            if options.auto_fix {
                corrected.set_remote_field(field, remote_value)?;
                changed = true;
            }
        }

        if let Some(nested) = E::nested_field() {
            changed |= diff_nested(&id, nested, &fresh, &mut corrected, options, &mut report);
        }

        if changed {
            cache.add(corrected)?;
        }
    }

    if options.auto_fix {
        for remote in snapshot {
            if cache.contains(remote.id()) {
                continue;
            }
            cache.add(E::from_remote(remote))?;
            report.added.push(remote.id().to_string());
        }
    }

    info!(
        collection = %cache.key(),
        mismatches = report.mismatches.len(),
        removed = report.removed.len(),
        added = report.added.len(),
        auto_fix = options.auto_fix,
        "reconciliation finished"
    );
    Ok(report)
}

/// Compares nested keys of `corrected` with `fresh`, recording and (per policy)
/// applying the differences. Returns whether `corrected` was modified.
fn diff_nested<E: CacheEntity>(
    id: &str,
    nested: &str,
    fresh: &E,
    corrected: &mut E,
    options: &ValidateOptions,
    report: &mut ValidationReport,
) -> bool {
    let cached_keys = corrected.nested_keys();
    let remote_keys = fresh.nested_keys();
    let cached_set: HashSet<&str> = cached_keys.iter().map(String::as_str).collect();
    let remote_set: HashSet<&str> = remote_keys.iter().map(String::as_str).collect();
    let mut changed = false;

    for key in remote_keys.iter().filter(|k| !cached_set.contains(k.as_str())) {
        report
            .mismatches
            .push(MismatchRecord::missing_nested(id, nested, key));
        if options.auto_fix {
            corrected.adopt_nested(key, fresh);
            changed = true;
        }
    }

    for key in cached_keys.iter().filter(|k| !remote_set.contains(k.as_str())) {
        report
            .mismatches
            .push(MismatchRecord::stale_nested(id, nested, key));
        if options.prunes_stale_nested() {
            changed |= corrected.remove_nested(key);
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MismatchKind;
    use crate::entities::{
        CounterpartyPriceList, Employee, Product, RemoteCounterpartyPriceList, RemoteEmployee,
        RemoteProduct,
    };
    use crate::storage::MemoryRecordStore;
    use serde_json::json;
    use std::sync::Arc;

    fn remote_employees(items: serde_json::Value) -> Vec<RemoteEmployee> {
        items
            .as_array()
            .unwrap()
            .iter()
            .map(|v| RemoteEmployee::decode("employees", v.clone()).unwrap())
            .collect()
    }

    fn employee_cache(store: Arc<MemoryRecordStore>) -> EntityCache<Employee> {
        let mut cache = EntityCache::<Employee>::open(store).unwrap();
        cache.add(Employee::new("1", "A")).unwrap();
        cache.add(Employee::new("2", "B")).unwrap();
        cache
    }

    #[test]
    fn test_scenario_full_fix() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut cache = employee_cache(store);
        let snapshot = remote_employees(json!([
            {"id": "2", "name": "B2"},
            {"id": "3", "name": "C"}
        ]));

        let report = reconcile(&mut cache, &snapshot, &ValidateOptions::full_fix()).unwrap();

        assert_eq!(
            report.mismatches,
            vec![MismatchRecord::field("2", "name", json!("B"), json!("B2"))]
        );
        assert_eq!(report.removed, vec!["1"]);
        assert_eq!(report.added, vec!["3"]);
        assert_eq!(cache.ids(), vec!["2", "3"]);
        assert_eq!(cache.get("2").unwrap().name, "B2");
        assert_eq!(cache.get("3").unwrap(), &Employee::new("3", "C"));
    }

    #[test]
    fn test_report_only_leaves_cache_untouched() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut cache = employee_cache(store.clone());
        let before = store.raw("employees");
        let writes = store.write_count();

        let snapshot = remote_employees(json!([{"id": "2", "name": "B2"}, {"id": "3", "name": "C"}]));
        let report = reconcile(&mut cache, &snapshot, &ValidateOptions::report_only()).unwrap();

        assert!(!report.mismatches.is_empty());
        assert!(report.removed.is_empty() && report.added.is_empty());
        assert_eq!(store.raw("employees"), before);
        assert_eq!(store.write_count(), writes);
    }

    #[test]
    fn test_orphans_removed_without_auto_fix() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut cache = employee_cache(store);
        let snapshot = remote_employees(json!([{"id": "2", "name": "B2"}]));

        let options = ValidateOptions::report_only().remove_orphaned(true);
        let report = reconcile(&mut cache, &snapshot, &options).unwrap();

        assert_eq!(report.removed, vec!["1"]);
        assert_eq!(cache.get("2").unwrap().name, "B");
    }

    #[test]
    fn test_cache_only_fields_survive_correction() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut cache = employee_cache(store);
        cache.update("2", |e| {
            e.accumulated = 99.0;
            Ok(())
        })
        .unwrap();

        let snapshot = remote_employees(json!([{"id": "2", "name": "B2", "position": "Driver"}]));
        reconcile(&mut cache, &snapshot, &ValidateOptions::full_fix()).unwrap();

        let corrected = cache.get("2").unwrap();
        assert_eq!(corrected.position, "Driver");
        assert_eq!(corrected.accumulated, 99.0);
    }

    fn product_cache(scales: &[&str]) -> EntityCache<Product> {
        let mut cache = EntityCache::<Product>::open(Arc::new(MemoryRecordStore::new())).unwrap();
        let remote = remote_product(scales);
        let mut product = Product::from_remote(&remote[0]);
        for scale in &mut product.scales {
            scale.last_prices = vec![1.5];
        }
        cache.add(product).unwrap();
        cache
    }

    fn remote_product(scales: &[&str]) -> Vec<RemoteProduct> {
        vec![
            RemoteProduct::decode(
                "products",
                json!({
                    "id": "p1",
                    "name": "Flour",
                    "unit": "kg",
                    "scales": scales.iter().map(|s| json!({"name": s})).collect::<Vec<_>>()
                }),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_nested_diff_with_auto_fix() {
        let mut cache = product_cache(&["x", "y"]);
        let snapshot = remote_product(&["y", "z"]);

        let report =
            reconcile(&mut cache, &snapshot, &ValidateOptions::report_only().auto_fix(true)).unwrap();

        let kinds: Vec<_> = report.mismatches.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MismatchKind::MissingNested, MismatchKind::StaleNested]);

        let product = cache.get("p1").unwrap();
        assert_eq!(product.nested_keys(), vec!["y", "z"]);
        assert_eq!(product.scale("y").unwrap().last_prices, vec![1.5]);
        assert!(product.scale("z").unwrap().last_prices.is_empty());
    }

    #[test]
    fn test_stale_nested_kept_under_remove_orphaned_policy() {
        let mut cache = product_cache(&["x", "y"]);
        let snapshot = remote_product(&["y", "z"]);

        let options = ValidateOptions::report_only()
            .auto_fix(true)
            .stale_nested(crate::sync::StaleNestedPolicy::FollowRemoveOrphaned);
        reconcile(&mut cache, &snapshot, &options).unwrap();

        assert_eq!(cache.get("p1").unwrap().nested_keys(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_stale_nested_pruned_when_orphans_are_removed_too() {
        let mut cache = product_cache(&["x", "y"]);
        let snapshot = remote_product(&["y", "z"]);

        let options = ValidateOptions::full_fix()
            .stale_nested(crate::sync::StaleNestedPolicy::FollowRemoveOrphaned);
        let report = reconcile(&mut cache, &snapshot, &options).unwrap();

        assert_eq!(report.mismatches.len(), 2);
        let product = cache.get("p1").unwrap();
        assert_eq!(product.nested_keys(), vec!["y", "z"]);
        assert_eq!(product.scale("y").unwrap().last_prices, vec![1.5]);
    }

    fn remote_price_list(products: &[&str]) -> Vec<RemoteCounterpartyPriceList> {
        vec![
            RemoteCounterpartyPriceList::decode(
                "counterparty_prices",
                json!({
                    "id": "c1",
                    "name": "Mill",
                    "products": products.iter().map(|p| json!({"productId": p})).collect::<Vec<_>>()
                }),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_price_list_products_follow_remote_and_keep_prices() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut cache = EntityCache::<CounterpartyPriceList>::open(store.clone()).unwrap();
        cache
            .add(CounterpartyPriceList::from_remote(&remote_price_list(&["p1", "p2"])[0]))
            .unwrap();
        cache.set_price("c1", "p1", 7.5).unwrap();
        cache.set_price("c1", "p2", 3.0).unwrap();

        let snapshot = remote_price_list(&["p2", "p3"]);
        let report = reconcile(&mut cache, &snapshot, &ValidateOptions::full_fix()).unwrap();

        assert_eq!(
            report.mismatches,
            vec![
                MismatchRecord::missing_nested("c1", "products", "p3"),
                MismatchRecord::stale_nested("c1", "products", "p1"),
            ]
        );
        let list = cache.get("c1").unwrap();
        assert_eq!(list.nested_keys(), vec!["p2", "p3"]);
        assert_eq!(list.price_of("p2"), Some(3.0));
        assert_eq!(list.price_of("p3"), Some(0.0));
        assert_eq!(list.price_of("p1"), None);

        let reopened = EntityCache::<CounterpartyPriceList>::open(store).unwrap();
        assert_eq!(reopened.get("c1").unwrap().price_of("p2"), Some(3.0));
    }
}
