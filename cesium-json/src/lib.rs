//! Binary data model shared by the quadtree refinement engine and the
//! property table view: buffers, buffer views, accessors, meshes, and
//! primitives, plus the generic `Index`/`Validate` machinery that ties
//! them together.

/// Contains `Accessor` and other related data structures.
pub mod accessor;

/// Contains `Buffer`, `View`, and other related data structures.
pub mod buffer;

/// Contains `Extras`.
pub mod extras;

/// Contains `Mesh` and other related data structures.
pub mod mesh;

/// Contains `Path`.
pub mod path;

/// Contains `Root`.
pub mod root;

/// Contains functions and types that validate the data model against its
/// own internal invariants.
pub mod validation;

pub use accessor::Accessor;
pub use buffer::Buffer;
pub use mesh::Mesh;

pub use self::extras::Extras;
pub use self::path::Path;
pub use self::root::{Get, Index, Root};
pub use serde_json::{from_reader, from_slice, from_str, from_value};
pub use serde_json::Error;
