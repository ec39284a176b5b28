use crate::validation::{Checked, Error, USize64};
use crate::{buffer, Extras, Index, Path, Root};
use cesium_derive::Validate;
use serde::{de, ser};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The component data type underlying an accessor's values.
///
/// This is the full ten-member set the property table view dispatches
/// over, a superset of the six types a renderer-facing glTF accessor
/// restricts itself to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ComponentType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit IEEE float.
    F32,
    /// 64-bit IEEE float.
    F64,
}

/// All component types, in the order used for dispatch tables.
pub const ALL_COMPONENT_TYPES: &[ComponentType] = &[
    ComponentType::I8,
    ComponentType::U8,
    ComponentType::I16,
    ComponentType::U16,
    ComponentType::I32,
    ComponentType::U32,
    ComponentType::I64,
    ComponentType::U64,
    ComponentType::F32,
    ComponentType::F64,
];

/// Component types valid for index (`Primitive::indices`) accessors.
pub const VALID_INDEX_TYPES: &[ComponentType] =
    &[ComponentType::U8, ComponentType::U16, ComponentType::U32];

/// Specifies whether an accessor holds a scalar, vector, or matrix quantity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Type {
    /// Scalar quantity.
    Scalar,
    /// 2D vector.
    Vec2,
    /// 3D vector.
    Vec3,
    /// 4D vector.
    Vec4,
    /// 2x2 matrix.
    Mat2,
    /// 3x3 matrix.
    Mat3,
    /// 4x4 matrix.
    Mat4,
}

/// All valid accessor type names, as they appear in JSON.
pub const VALID_ACCESSOR_TYPES: &[&str] =
    &["SCALAR", "VEC2", "VEC3", "VEC4", "MAT2", "MAT3", "MAT4"];

/// A typed view into a buffer view.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[cesium(validate_hook = "accessor_validate_hook")]
pub struct Accessor {
    /// The parent buffer view this accessor reads from.
    #[serde(rename = "bufferView")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<Index<buffer::View>>,

    /// The offset relative to the start of the parent `BufferView`, in bytes.
    #[serde(default, rename = "byteOffset")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<USize64>,

    /// The number of components within the buffer view, not the number of
    /// bytes.
    pub count: USize64,

    /// The data type of components in this accessor.
    #[serde(rename = "componentType")]
    pub component_type: Checked<ComponentType>,

    /// Optional application specific data.
    #[serde(default)]
    #[cfg_attr(feature = "extras", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(not(feature = "extras"), serde(skip_serializing))]
    pub extras: Extras,

    /// Specifies if the attribute is a scalar, vector, or matrix.
    #[serde(rename = "type")]
    pub type_: Checked<Type>,

    /// Minimum value of each component in this attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    /// Maximum value of each component in this attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,

    /// Optional user-defined name for this object.
    #[cfg(feature = "names")]
    #[cfg_attr(feature = "names", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,

    /// Specifies whether integer data values should be normalized to
    /// `[0, 1]` (unsigned) or `[-1, 1]` (signed) when read as floats.
    #[serde(default)]
    pub normalized: bool,
}

fn accessor_validate_hook<P, R>(accessor: &Accessor, _root: &Root, path: P, report: &mut R)
where
    P: Fn() -> Path,
    R: FnMut(&dyn Fn() -> Path, Error),
{
    if accessor.buffer_view.is_none() {
        report(&|| path().field("bufferView"), Error::Missing);
    }
}

impl<'de> de::Deserialize<'de> for Checked<ComponentType> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Checked<ComponentType>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "one of I8, U8, I16, U16, I32, U32, I64, U64, F32, F64")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                use crate::validation::Checked::*;
                use ComponentType::*;
                Ok(match value {
                    "I8" => Valid(I8),
                    "U8" => Valid(U8),
                    "I16" => Valid(I16),
                    "U16" => Valid(U16),
                    "I32" => Valid(I32),
                    "U32" => Valid(U32),
                    "I64" => Valid(I64),
                    "U64" => Valid(U64),
                    "F32" => Valid(F32),
                    "F64" => Valid(F64),
                    _ => Invalid,
                })
            }
        }
        deserializer.deserialize_str(Visitor)
    }
}

impl<'de> de::Deserialize<'de> for ComponentType {
    /// Deserializes a bare (non-[`Checked`]) `ComponentType`, for contexts
    /// like [`crate::Root`]-external property schemas where an unrecognized
    /// tag should be a hard parse error rather than a recoverable
    /// [`Checked::Invalid`].
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        match <Checked<ComponentType> as de::Deserialize>::deserialize(deserializer)? {
            Checked::Valid(component_type) => Ok(component_type),
            Checked::Invalid => Err(de::Error::custom(
                "invalid component type, expected one of I8, U8, I16, U16, I32, U32, I64, U64, F32, F64",
            )),
        }
    }
}

impl ser::Serialize for ComponentType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(match self {
            ComponentType::I8 => "I8",
            ComponentType::U8 => "U8",
            ComponentType::I16 => "I16",
            ComponentType::U16 => "U16",
            ComponentType::I32 => "I32",
            ComponentType::U32 => "U32",
            ComponentType::I64 => "I64",
            ComponentType::U64 => "U64",
            ComponentType::F32 => "F32",
            ComponentType::F64 => "F64",
        })
    }
}

impl<'de> de::Deserialize<'de> for Checked<Type> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Checked<Type>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "any of: {:?}", VALID_ACCESSOR_TYPES)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                use crate::validation::Checked::*;
                use Type::*;
                Ok(match value {
                    "SCALAR" => Valid(Scalar),
                    "VEC2" => Valid(Vec2),
                    "VEC3" => Valid(Vec3),
                    "VEC4" => Valid(Vec4),
                    "MAT2" => Valid(Mat2),
                    "MAT3" => Valid(Mat3),
                    "MAT4" => Valid(Mat4),
                    _ => Invalid,
                })
            }
        }
        deserializer.deserialize_str(Visitor)
    }
}

impl ser::Serialize for Type {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(match *self {
            Type::Scalar => "SCALAR",
            Type::Vec2 => "VEC2",
            Type::Vec3 => "VEC3",
            Type::Vec4 => "VEC4",
            Type::Mat2 => "MAT2",
            Type::Mat3 => "MAT3",
            Type::Mat4 => "MAT4",
        })
    }
}

impl ComponentType {
    /// Returns the number of bytes this component type occupies.
    pub fn size(&self) -> usize {
        use ComponentType::*;
        match *self {
            I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
        }
    }
}

impl Type {
    /// Returns the number of scalar components this type represents.
    pub fn multiplicity(&self) -> usize {
        use Type::*;
        match *self {
            Scalar => 1,
            Vec2 => 2,
            Vec3 => 3,
            Vec4 | Mat2 => 4,
            Mat3 => 9,
            Mat4 => 16,
        }
    }
}
