use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

use super::asset::{AssetHandle, SharedAsset};
use crate::config::DepotConfig;
use crate::error::DepotError;

type PendingAsset<K, V> = Shared<BoxFuture<'static, Result<Arc<SharedAsset<K, V>>, DepotError>>>;

enum AssetEntry<K, V> {
    Resolved(Arc<SharedAsset<K, V>>),
    Pending(PendingAsset<K, V>),
    /// The factory last run for this key failed; the depot itself never
    /// fails an operation, so this failure is cached and replayed to
    /// every subsequent `get_or_create` call instead of retrying.
    Failed(DepotError),
}

struct DepotState<K, V> {
    assets: HashMap<K, AssetEntry<K, V>>,
    deletion_candidates: LinkedHashMap<K, ()>,
    inactive_bytes: u64,
    /// The number of assets with at least one live [`AssetHandle`].
    live_asset_count: u64,
    /// A strong reference to this same `DepotInner`, held exactly while
    /// `live_asset_count > 0`. Without it, a depot with no remaining
    /// external [`super::SharedAssetDepot`] clones but live asset handles
    /// outstanding would be dropped out from under those handles, since
    /// they only hold a `Weak` reference back to it.
    self_keep_alive: Option<Arc<DepotInner<K, V>>>,
}

pub(super) struct DepotInner<K, V> {
    config: DepotConfig,
    state: Mutex<DepotState<K, V>>,
}

impl<K, V> DepotInner<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(super) fn mark_deletion_candidate(self: &Arc<Self>, key: K, size_bytes: u64) {
        let mut state = self.state.lock();
        state.deletion_candidates.insert(key, ());
        state.inactive_bytes += size_bytes;
        tracing::trace!(inactive_bytes = state.inactive_bytes, "asset became inactive");

        state.live_asset_count = state.live_asset_count.saturating_sub(1);
        if state.live_asset_count == 0 {
            state.self_keep_alive = None;
        }

        while state.inactive_bytes > self.config.inactive_asset_size_limit_bytes {
            let Some((evict_key, _)) = state.deletion_candidates.pop_front() else {
                break;
            };
            if let Some(AssetEntry::Resolved(asset)) = state.assets.remove(&evict_key) {
                state.inactive_bytes = state.inactive_bytes.saturating_sub(asset.size_bytes);
                tracing::debug!(inactive_bytes = state.inactive_bytes, "evicted inactive asset");
            }
        }
    }

    pub(super) fn unmark_deletion_candidate(self: &Arc<Self>, key: &K) {
        let mut state = self.state.lock();
        if state.deletion_candidates.remove(key).is_some() {
            if let Some(AssetEntry::Resolved(asset)) = state.assets.get(key) {
                state.inactive_bytes = state.inactive_bytes.saturating_sub(asset.size_bytes);
            }
        }

        state.live_asset_count += 1;
        if state.live_asset_count == 1 {
            state.self_keep_alive = Some(Arc::clone(self));
        }
    }
}

/// A thread-safe, reference-counted cache of expensive-to-build tile
/// assets, keyed by `K` (a tile identifier, a decode request, etc).
///
/// Concurrent `get_or_create` calls for the same key that race while the
/// asset is being built share a single in-flight factory call: the
/// second caller observes the first's pending future rather than
/// starting its own build.
pub struct SharedAssetDepot<K, V> {
    inner: Arc<DepotInner<K, V>>,
}

impl<K, V> Clone for SharedAssetDepot<K, V> {
    fn clone(&self) -> Self {
        SharedAssetDepot { inner: Arc::clone(&self.inner) }
    }
}

impl<K, V> SharedAssetDepot<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates an empty depot with the given eviction limit.
    pub fn new(config: DepotConfig) -> Self {
        SharedAssetDepot {
            inner: Arc::new(DepotInner {
                config,
                state: Mutex::new(DepotState {
                    assets: HashMap::new(),
                    deletion_candidates: LinkedHashMap::new(),
                    inactive_bytes: 0,
                    live_asset_count: 0,
                    self_keep_alive: None,
                }),
            }),
        }
    }

    /// The number of assets currently tracked, resolved or pending,
    /// referenced or not.
    pub fn len(&self) -> usize {
        self.inner.state.lock().assets.len()
    }

    /// Whether the depot currently holds no assets at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size, in bytes, of assets with no live [`AssetHandle`]s.
    pub fn inactive_bytes(&self) -> u64 {
        self.inner.state.lock().inactive_bytes
    }

    /// Returns the asset cached under `key`, building it with `factory`
    /// if it is not already present, in flight, or cached as a failure.
    ///
    /// Never holds the depot's lock while `factory` runs: a second
    /// caller racing on the same key observes this call's pending
    /// future and shares its result (including its error) rather than
    /// invoking its own factory. The depot itself never fails this
    /// call on its own account; it may return a cached failure from an
    /// earlier `factory` instead of running a new one.
    pub async fn get_or_create<F, Fut>(&self, key: K, factory: F) -> Result<AssetHandle<K, V>, DepotError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, u64), DepotError>> + Send + 'static,
    {
        enum Lookup<K, V> {
            Resolved(Arc<SharedAsset<K, V>>),
            Pending(PendingAsset<K, V>),
            Failed(DepotError),
        }

        let lookup = {
            let mut state = self.inner.state.lock();
            match state.assets.get(&key) {
                Some(AssetEntry::Resolved(asset)) => Lookup::Resolved(Arc::clone(asset)),
                Some(AssetEntry::Pending(pending)) => Lookup::Pending(pending.clone()),
                Some(AssetEntry::Failed(error)) => Lookup::Failed(error.clone()),
                None => {
                    tracing::debug!("no cached asset, spawning factory");
                    let pending = Self::spawn_factory(Arc::clone(&self.inner), key.clone(), factory);
                    state.assets.insert(key, AssetEntry::Pending(pending.clone()));
                    Lookup::Pending(pending)
                }
            }
        };

        match lookup {
            Lookup::Resolved(asset) => Ok(AssetHandle::new(asset)),
            Lookup::Pending(pending) => pending.await.map(AssetHandle::new),
            Lookup::Failed(error) => Err(error),
        }
    }

    fn spawn_factory<F, Fut>(inner: Arc<DepotInner<K, V>>, key: K, factory: F) -> PendingAsset<K, V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, u64), DepotError>> + Send + 'static,
    {
        let future = async move {
            let result = factory().await;
            let mut state = inner.state.lock();
            match result {
                Ok((value, size_bytes)) => {
                    let asset = Arc::new(SharedAsset {
                        key: key.clone(),
                        value,
                        size_bytes,
                        depot: Arc::downgrade(&inner),
                        strong_count: AtomicUsize::new(0),
                    });
                    state.assets.insert(key, AssetEntry::Resolved(Arc::clone(&asset)));
                    Ok(asset)
                }
                Err(error) => {
                    tracing::warn!(error = %error, "asset factory failed");
                    state.assets.insert(key, AssetEntry::Failed(error.clone()));
                    Err(error)
                }
            }
        };
        future.boxed().shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_get_or_create_shares_one_factory_call() {
        let depot: SharedAssetDepot<&'static str, u32> = SharedAssetDepot::new(DepotConfig::default());
        let calls = Arc::new(AtomicU32::new(0));

        let build = |calls: Arc<AtomicU32>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, DepotError>((42u32, 4))
        };

        let (a, b) = tokio::join!(
            depot.get_or_create("tile-0-0", { let calls = Arc::clone(&calls); || build(calls) }),
            depot.get_or_create("tile-0-0", { let calls = Arc::clone(&calls); || build(calls) }),
        );

        assert_eq!(*a.unwrap(), 42);
        assert_eq!(*b.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_all_handles_marks_asset_inactive_and_eviction_can_reclaim_it() {
        let depot: SharedAssetDepot<&'static str, Vec<u8>> =
            SharedAssetDepot::new(DepotConfig { inactive_asset_size_limit_bytes: 1 });

        let handle = depot
            .get_or_create("big", || async { Ok::<_, DepotError>((vec![0u8; 8], 8)) })
            .await
            .unwrap();
        assert_eq!(depot.len(), 1);
        drop(handle);
        // The dropped asset's own size (8) already exceeds the 1-byte
        // limit, so it is evicted immediately on the 1->0 edge.
        assert_eq!(depot.len(), 0);

        depot
            .get_or_create("small", || async { Ok::<_, DepotError>((vec![0u8; 1], 1)) })
            .await
            .unwrap();

        assert_eq!(depot.len(), 1);
    }

    #[tokio::test]
    async fn factory_error_is_cached_and_replayed_instead_of_retried() {
        let depot: SharedAssetDepot<&'static str, u32> = SharedAssetDepot::new(DepotConfig::default());

        let result = depot
            .get_or_create("broken", || async { Err(DepotError::Factory("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(depot.len(), 1);

        // A later call on the same key must replay the cached failure
        // rather than invoking a fresh, would-be-successful factory.
        let retried = depot.get_or_create("broken", || async { Ok::<_, DepotError>((7u32, 4)) }).await;
        assert!(retried.is_err());
    }

    #[tokio::test]
    async fn self_keep_alive_outlives_the_last_external_depot_handle() {
        let depot: SharedAssetDepot<&'static str, u32> = SharedAssetDepot::new(DepotConfig::default());
        let handle = depot
            .get_or_create("tile", || async { Ok::<_, DepotError>((1u32, 4)) })
            .await
            .unwrap();

        let weak_inner = Arc::downgrade(&depot.inner);
        drop(depot);

        // Every SharedAssetDepot clone is gone, but the live handle's asset
        // keeps the inner state alive via its self-reference.
        assert!(weak_inner.upgrade().is_some());

        drop(handle);
        // The last live asset just transitioned onto the deletion list,
        // clearing the self-reference; nothing keeps the inner state alive.
        assert!(weak_inner.upgrade().is_none());
    }
}
