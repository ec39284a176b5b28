use serde_derive::{Deserialize, Serialize};

/// A single contiguous range of available tiles at one subtree level,
/// as carried in a quantized-mesh tile's `available` JSON extension.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct QuadtreeTileRectangularRange {
    /// Minimum tile-space X coordinate, inclusive.
    #[serde(rename = "startX")]
    pub start_x: u32,
    /// Minimum tile-space Y coordinate, inclusive.
    #[serde(rename = "startY")]
    pub start_y: u32,
    /// Maximum tile-space X coordinate, inclusive.
    #[serde(rename = "endX")]
    pub end_x: u32,
    /// Maximum tile-space Y coordinate, inclusive.
    #[serde(rename = "endY")]
    pub end_y: u32,
}

/// Descendant tile availability advertised by a quantized-mesh tile,
/// decoded from extension id 4.
///
/// Dropped by the distilled algorithm description but always produced
/// by a real terrain loader (`QuantizedMeshLoader::loadMetadata`): it
/// lets a caller skip network requests for descendant tiles it already
/// knows don't exist.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AvailabilityMetadata {
    /// How many additional quadtree levels this tile's metadata covers.
    #[serde(rename = "subtreeLevels", default)]
    pub subtree_levels: u32,

    /// Available tile ranges, indexed by level relative to this tile
    /// (index 0 is this tile's own level).
    #[serde(default)]
    pub available: Vec<Vec<QuadtreeTileRectangularRange>>,
}

/// Per-vertex water/land classification attached to a decoded tile.
#[derive(Clone, Debug, PartialEq)]
pub enum WaterMask {
    /// The entire tile is land.
    AllLand,
    /// The entire tile is water.
    AllWater,
    /// A 256x256 raster, row-major, `0` land .. `255` water.
    Raster(Box<[u8; 65536]>),
}
