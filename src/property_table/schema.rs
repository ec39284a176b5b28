use cesium_json::Index;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The numeric representation underlying a scalar, vector, or matrix
/// property value.
///
/// Reuses [`cesium_json::accessor::ComponentType`] directly: the
/// property table view dispatches over the same ten-member set the
/// data model's accessors already carry, rather than duplicating the
/// enum under a second name.
pub type PropertyComponentType = cesium_json::accessor::ComponentType;

/// The shape of a single property's value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    /// A single numeric component.
    Scalar,
    /// Two numeric components.
    Vec2,
    /// Three numeric components.
    Vec3,
    /// Four numeric components.
    Vec4,
    /// A 2x2 numeric matrix.
    Mat2,
    /// A 3x3 numeric matrix.
    Mat3,
    /// A 4x4 numeric matrix.
    Mat4,
    /// A UTF-8 string.
    String,
    /// A single bit-packed boolean.
    Boolean,
    /// An index into an enum value list, stored as an integer component type.
    Enum,
}

impl PropertyType {
    /// Returns the number of scalar components this type's numeric forms
    /// (`Scalar`..`Mat4`) carry. `String`, `Boolean`, and `Enum` values are
    /// always a single logical unit and return `1`.
    pub fn component_count(self) -> usize {
        match self {
            PropertyType::Scalar | PropertyType::String | PropertyType::Boolean | PropertyType::Enum => 1,
            PropertyType::Vec2 => 2,
            PropertyType::Vec3 => 3,
            PropertyType::Vec4 | PropertyType::Mat2 => 4,
            PropertyType::Mat3 => 9,
            PropertyType::Mat4 => 16,
        }
    }

    /// Returns `true` for the numeric shapes that carry a
    /// [`PropertyComponentType`] (everything but `String` and `Boolean`).
    pub fn is_numeric(self) -> bool {
        !matches!(self, PropertyType::String | PropertyType::Boolean)
    }
}

/// Declares the static shape of a property on a class, independent of any
/// particular table's data.
///
/// Mirrors `CesiumGltf::ClassProperty`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassProperty {
    /// The shape of this property's values.
    #[serde(rename = "type")]
    pub ty: PropertyType,

    /// The numeric representation of this property's values, required
    /// when `ty` is numeric and meaningless otherwise.
    pub component_type: Option<PropertyComponentType>,

    /// Whether each row holds a single value (`false`) or an array of
    /// values (`true`).
    #[serde(default)]
    pub array: bool,

    /// For fixed-length array properties, the number of elements per row.
    /// `None` for variable-length arrays, which are driven by an
    /// `array_offsets` buffer on the property instead.
    pub count: Option<u64>,

    /// Whether integer component values should be read back normalized
    /// to `[0, 1]` or `[-1, 1]`.
    #[serde(default)]
    pub normalized: bool,

    /// The component type used to encode offsets into a variable-length
    /// array or string property's data buffer.
    pub offset_type: Option<PropertyComponentType>,

    /// The value substituted when a row's property data is entirely
    /// absent from the table (the `EmptyPropertyWithDefault` case).
    pub default: Option<Value>,

    /// Whether every row must have a non-default value; when `false` and
    /// `default` is set, a property can be omitted from the table
    /// entirely.
    #[serde(default)]
    pub required: bool,

    /// The raw (pre-normalization, pre-offset/scale) value that marks a
    /// row as having no data. A row whose raw value equals this is
    /// resolved to `default` (or `None` if absent) instead of being
    /// scaled like an ordinary value.
    pub no_data: Option<Value>,

    /// Added to the (possibly normalized) raw value when resolving a
    /// row. Componentwise for vector/matrix types.
    pub offset: Option<Value>,

    /// Multiplied with the (possibly normalized) raw value when
    /// resolving a row, before `offset` is added. Componentwise for
    /// vector/matrix types.
    pub scale: Option<Value>,
}

/// A named group of [`ClassProperty`] declarations.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ClassSchema {
    /// The class's properties, keyed by name.
    pub properties: BTreeMap<String, ClassProperty>,
}

/// The set of classes a metadata extension's property tables can
/// reference.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Schema {
    /// Declared classes, keyed by name.
    pub classes: BTreeMap<String, ClassSchema>,
}

/// Points a single property at the buffer views holding its packed data.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTableProperty {
    /// The buffer view holding this property's packed values (or, for
    /// variable-length arrays/strings, the concatenated value data).
    pub values: Index<cesium_json::buffer::View>,

    /// For variable-length array properties, the buffer view holding
    /// per-row offsets into `values`.
    pub array_offsets: Option<Index<cesium_json::buffer::View>>,

    /// For string properties, the buffer view holding per-row offsets
    /// into `values`.
    pub string_offsets: Option<Index<cesium_json::buffer::View>>,

    /// The component type `string_offsets` is encoded with. Required
    /// whenever `string_offsets` is present.
    pub string_offset_type: Option<PropertyComponentType>,
}

/// A table of rows, each an instance of a declared class, whose property
/// data is packed into buffer views.
///
/// Mirrors `CesiumGltf::PropertyTable`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PropertyTable {
    /// The name of the class in the [`Schema`] that this table's rows
    /// are instances of.
    pub class: String,

    /// The number of rows in the table.
    pub count: u64,

    /// The table's properties, keyed by property name.
    pub properties: BTreeMap<String, PropertyTableProperty>,
}
