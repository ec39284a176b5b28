use std::hash::Hash;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use super::cache::DepotInner;

/// A cached value plus the bookkeeping the depot needs to know when it
/// has become unreferenced.
///
/// The depot never hands this out directly; callers only ever see an
/// [`AssetHandle`], which keeps `strong_count` honest.
pub struct SharedAsset<K, V> {
    pub(super) key: K,
    pub(super) value: V,
    pub(super) size_bytes: u64,
    pub(super) depot: Weak<DepotInner<K, V>>,
    pub(super) strong_count: AtomicUsize,
}

/// A live reference to a [`SharedAsset`] held in a
/// [`crate::depot::SharedAssetDepot`].
///
/// Cloning and dropping this type walk `SharedAsset::strong_count`
/// across the 0-to-1 and 1-to-0 edges and notify the owning depot on
/// each: a fresh or resurrected handle is removed from the depot's
/// deletion-candidate list, and the last handle going away adds the
/// asset back onto it. The underlying `V` is reclaimed by ordinary
/// `Arc` drop once the depot's own table entry is evicted.
pub struct AssetHandle<K, V>
where
    K: Eq + Hash + Clone,
{
    asset: Arc<SharedAsset<K, V>>,
}

impl<K, V> AssetHandle<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(super) fn new(asset: Arc<SharedAsset<K, V>>) -> Self {
        if asset.strong_count.fetch_add(1, Ordering::AcqRel) == 0 {
            if let Some(depot) = asset.depot.upgrade() {
                depot.unmark_deletion_candidate(&asset.key);
            }
        }
        AssetHandle { asset }
    }

    /// The key this asset is cached under.
    pub fn key(&self) -> &K {
        &self.asset.key
    }

    /// The size, in bytes, this asset counts against
    /// `DepotConfig::inactive_asset_size_limit_bytes` once unreferenced.
    pub fn size_bytes(&self) -> u64 {
        self.asset.size_bytes
    }
}

impl<K, V> Deref for AssetHandle<K, V>
where
    K: Eq + Hash + Clone,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.asset.value
    }
}

impl<K, V> Clone for AssetHandle<K, V>
where
    K: Eq + Hash + Clone,
{
    fn clone(&self) -> Self {
        AssetHandle::new(Arc::clone(&self.asset))
    }
}

impl<K, V> Drop for AssetHandle<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if self.asset.strong_count.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let Some(depot) = self.asset.depot.upgrade() {
                depot.mark_deletion_candidate(self.asset.key.clone(), self.asset.size_bytes);
            }
        }
    }
}
