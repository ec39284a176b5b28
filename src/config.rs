use serde_derive::Deserialize;

/// Tunables for quantized-mesh decode and raster-overlay upsampling.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Multiplier applied to `level_max_geometric_error * rectangle_width`
    /// to compute a decoded tile's skirt height.
    ///
    /// Matches `QuantizedMeshLoader::calculateSkirtHeight`'s constant.
    pub skirt_height_multiplier: f64,

    /// Tolerance used when testing whether a clip vertex lies on the
    /// `u = 0.5` or `v = 0.5` threshold during raster-overlay upsampling.
    pub clip_epsilon: f64,

    /// Triangles with a cross-product magnitude below this value are
    /// skipped during normal generation, rather than contributing a
    /// near-arbitrary direction to their vertices' accumulated normals.
    pub degenerate_triangle_epsilon: f64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        RefinementConfig {
            skirt_height_multiplier: 5.0,
            clip_epsilon: 1e-4,
            degenerate_triangle_epsilon: 1e-12,
        }
    }
}

/// Tunables for the shared asset depot.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// Total size, in bytes, of assets with zero live references the
    /// depot will keep before evicting the oldest ones.
    ///
    /// Matches `SharedAssetDepot::kDefaultInactiveAssetSizeLimitBytes`.
    pub inactive_asset_size_limit_bytes: u64,
}

impl Default for DepotConfig {
    fn default() -> Self {
        DepotConfig {
            inactive_asset_size_limit_bytes: 16 * 1024 * 1024,
        }
    }
}
