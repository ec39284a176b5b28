//! Thread-safe, reference-counted cache of expensive-to-build tile
//! assets: decoded meshes, upsampled children, property table views
//! over loaded buffers.

mod asset;
mod cache;

pub use asset::{AssetHandle, SharedAsset};
pub use cache::SharedAssetDepot;
