//! Core engine for streaming quadtree-tiled geospatial meshes: typed,
//! zero-copy access to packed metadata columns (`property_table`),
//! quantized-mesh terrain decode and raster-overlay upsampling
//! (`quadtree`), and a thread-safe cache of expensive-to-build tile
//! assets (`depot`).
//!
//! This crate decodes, refines, and caches tiles; it does not fetch
//! them, upload them to a GPU, or decide which ones to request.

/// Tunable parameters for refinement and caching.
pub mod config;

/// Non-fatal warnings accumulated while decoding or upsampling a tile.
pub mod diagnostics;

/// Error types returned by this crate's fallible operations.
pub mod error;

/// Zero-copy typed access over packed binary metadata columns.
pub mod property_table;

/// Quantized-mesh decode and raster-overlay upsampling.
pub mod quadtree;

/// Thread-safe, reference-counted cache of tile assets.
pub mod depot;

pub use config::{DepotConfig, RefinementConfig};
pub use diagnostics::RefinementDiagnostics;
pub use error::{DepotError, PropertyViewError, UpsampleError};
