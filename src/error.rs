use thiserror::Error;

/// The result of constructing or looking up a [`crate::property_table::PropertyTableView`].
///
/// Mirrors `CesiumGltf::PropertyTableViewStatus`: these are reported as
/// data, not raised as exceptions, so callers can decide whether a
/// missing schema is fatal for their use case.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyTableViewStatus {
    /// The table and its class were both found and are internally consistent.
    Valid,
    /// The model has no `EXT_structural_metadata` extension.
    ErrorMissingMetadataExtension,
    /// The extension is present but declares no schema.
    ErrorMissingSchema,
    /// The table's `class` name does not appear in the schema.
    ErrorClassNotFound,
}

/// Failure constructing a single property's typed view.
///
/// One variant per failure class in `CesiumGltf::PropertyTablePropertyViewStatus`.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum PropertyViewError {
    /// No property with this name exists on the table's class.
    #[error("no such property")]
    NonexistentProperty,
    /// The requested scalar/vector/matrix shape does not match the schema.
    #[error("property type mismatch")]
    TypeMismatch,
    /// The requested component type does not match the schema.
    #[error("component type mismatch")]
    ComponentTypeMismatch,
    /// The requested array-ness does not match the schema.
    #[error("array type mismatch")]
    ArrayTypeMismatch,
    /// The requested normalization does not match the schema.
    #[error("normalization mismatch")]
    NormalizationMismatch,
    /// The class property declares `normalized` on a non-integer
    /// component type (normalization is only meaningful for integers).
    #[error("normalization requested on a non-integer component type")]
    InvalidNormalization,
    /// The class declares a `count` that the table itself does not have.
    #[error("invalid property table count")]
    InvalidPropertyTableCount,
    /// The property's buffer view index does not resolve.
    #[error("invalid buffer view")]
    InvalidBufferView,
    /// A buffer view's byte length is not a multiple of its element size.
    #[error("buffer view size is not divisible by the component type size")]
    BufferViewSizeNotDivisibleByTypeSize,
    /// A fixed-size buffer view's byte length disagrees with the table's row count.
    #[error("buffer view size does not match the property table count")]
    BufferViewSizeDoesNotMatchPropertyTableCount,
    /// A variable-length array property declares both a fixed `count` and an offset buffer.
    #[error("array declares both a fixed count and an offset buffer")]
    ArrayCountAndOffsetBufferCoexist,
    /// A variable-length array property declares neither a fixed `count` nor an offset buffer.
    #[error("array declares neither a fixed count nor an offset buffer")]
    ArrayCountAndOffsetBufferDontExist,
    /// The array offset buffer's declared component type is not an unsigned integer type.
    #[error("invalid array offset type")]
    InvalidArrayOffsetType,
    /// A computed byte range fell outside the backing buffer.
    #[error("buffer view out of bounds")]
    BufferViewOutOfBounds,
    /// An offset read from an offset buffer fell outside the backing buffer.
    #[error("offset out of bounds")]
    OffsetOutOfBounds,
    /// Offsets in an offset buffer were not monotonically non-decreasing.
    #[error("offsets are not sorted")]
    OffsetsNotSorted,
}

/// Non-fatal decode or upsample anomaly, collected in a [`crate::diagnostics::RefinementDiagnostics`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RefinementWarning {
    /// An index referenced a vertex beyond the decoded vertex count; it
    /// was clamped to the last valid vertex.
    IndexOutOfRange {
        /// The out-of-range index as read from the wire format.
        index: u32,
        /// The number of vertices actually decoded.
        vertex_count: u32,
    },
    /// A triangle had a near-zero area and was skipped during normal
    /// generation.
    DegenerateTriangle {
        /// The index of the degenerate triangle, in triangle order.
        triangle_index: u32,
    },
}

/// Hard failure decoding a quantized-mesh terrain tile.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum QuantizedMeshError {
    /// The buffer was too short to contain a full 92-byte header.
    #[error("buffer too short for quantized-mesh header ({available} bytes available)")]
    InvalidHeader {
        /// The number of bytes actually available.
        available: usize,
    },
    /// The buffer ended in the middle of a declared section.
    #[error("buffer truncated while reading {section}")]
    TruncatedBuffer {
        /// The section being read when the buffer ran out.
        section: &'static str,
    },
    /// An extension declared a length that would read past the end of the buffer.
    #[error("extension {extension_id} declares a length that overruns the buffer")]
    InvalidExtensionLength {
        /// The extension's wire identifier.
        extension_id: u32,
    },
    /// The JSON metadata extension's body did not parse as valid metadata.
    #[error("malformed metadata extension: {message}")]
    MalformedMetadata {
        /// A human-readable description of the parse failure.
        message: String,
    },
}

/// Hard failure upsampling a parent tile's mesh for a child quadrant.
#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum UpsampleError {
    /// The parent primitive's rendering mode is not `TRIANGLES`.
    #[error("only TRIANGLES primitives can be upsampled")]
    UnsupportedPrimitiveMode,
    /// The parent mesh has no `POSITION` attribute.
    #[error("parent primitive has no POSITION attribute")]
    MissingPositions,
    /// The parent mesh has no texture coordinate attribute to clip against.
    #[error("parent primitive has no texture coordinate attribute")]
    MissingTexCoords,
    /// An accessor referenced by the parent primitive could not be resolved.
    #[error("invalid accessor reference")]
    InvalidAccessor,
    /// The parent primitive's `extras` is missing or does not carry the
    /// skirt metadata (`noSkirtIndicesBegin`/`noSkirtIndicesCount` and the
    /// four per-side `skirt*Height` fields) upsampling depends on.
    #[error("parent primitive is missing skirt metadata")]
    MissingSkirtMetadata,
}

/// Failure building or retrieving an asset from a [`crate::depot::SharedAssetDepot`].
#[derive(Error, Clone, Debug)]
pub enum DepotError {
    /// The factory supplied to `get_or_create` returned an error.
    ///
    /// The factory's error is stringified once and replayed to every
    /// concurrent waiter, since arbitrary factory error types are not
    /// required to be `Clone`.
    #[error("asset factory failed: {0}")]
    Factory(String),
}

impl PartialEq for DepotError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DepotError::Factory(a), DepotError::Factory(b)) => a == b,
        }
    }
}
