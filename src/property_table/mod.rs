//! Zero-copy, typed access over packed binary metadata columns attached
//! to a tile, modeled on `CesiumGltf::PropertyTableView`.

mod array_view;
mod schema;
mod view;

pub use array_view::PropertyArrayView;
pub use schema::{ClassProperty, ClassSchema, PropertyComponentType, PropertyTable, PropertyTableProperty, PropertyType, Schema};
pub use view::{
    BooleanPropertyView, MetadataModel, PropertyArrayValueView, PropertyDispatch, PropertyScalar, PropertyTablePropertyView,
    PropertyTableView, PropertyValue, PropertyValueView, StringPropertyView,
};
