use cesium_json::accessor::{Accessor, ComponentType, Type};
use cesium_json::buffer::{Buffer, View};
use cesium_json::validation::{Checked, USize64};
use cesium_json::Index;
use serde_json::Value;

/// Accumulates one tile's worth of attribute/index data into a single
/// packed buffer, handing back `Index<Accessor>` references as each
/// attribute is appended.
///
/// Mirrors the way `QuantizedMeshLoader` and the upsampler both pack
/// every attribute of a tile into one interleaved-free binary blob
/// rather than a buffer per attribute.
pub struct ModelBuilder {
    bytes: Vec<u8>,
    buffer_views: Vec<View>,
    accessors: Vec<Accessor>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder {
            bytes: Vec::new(),
            buffer_views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    fn align_to(&mut self, alignment: usize) {
        let padding = (alignment - self.bytes.len() % alignment) % alignment;
        self.bytes.resize(self.bytes.len() + padding, 0);
    }

    /// Appends a `Pod` slice as a new buffer view plus accessor, returning
    /// the new accessor's index. `min`/`max` are per-component bounds
    /// already computed by the caller (tightened to the actual data, not
    /// the full value range).
    pub fn push_accessor<T: bytemuck::Pod>(
        &mut self,
        data: &[T],
        component_type: ComponentType,
        type_: Type,
        normalized: bool,
        min: Option<Value>,
        max: Option<Value>,
    ) -> Index<Accessor> {
        self.align_to(component_type.size().max(4));
        let byte_offset = self.bytes.len();
        self.bytes.extend_from_slice(bytemuck::cast_slice(data));
        let byte_length = self.bytes.len() - byte_offset;

        let view_index = Index::new(self.buffer_views.len() as u32);
        self.buffer_views.push(View {
            buffer: Index::new(0),
            byte_length: USize64(byte_length as u64),
            byte_offset: Some(USize64(byte_offset as u64)),
            byte_stride: None,
            extras: None,
        });

        let accessor_index = Index::new(self.accessors.len() as u32);
        self.accessors.push(Accessor {
            buffer_view: Some(view_index),
            byte_offset: None,
            count: USize64(data.len() as u64),
            component_type: Checked::Valid(component_type),
            extras: None,
            type_: Checked::Valid(type_),
            min,
            max,
            normalized,
        });
        accessor_index
    }

    /// Appends raw index bytes (already the correct width for `component_type`)
    /// as an accessor, without going through `push_accessor`'s `Pod` bound
    /// (index widths vary at runtime between `u16` and `u32`).
    pub fn push_index_accessor(&mut self, indices: &[u32], component_type: ComponentType) -> Index<Accessor> {
        match component_type {
            ComponentType::U16 => {
                let narrowed: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                self.push_accessor(&narrowed, component_type, Type::Scalar, false, None, None)
            }
            _ => self.push_accessor(indices, ComponentType::U32, Type::Scalar, false, None, None),
        }
    }

    /// Consumes the builder, returning the packed buffer bytes plus the
    /// buffer views and accessors that reference it (buffer index `0`).
    pub fn finish(self) -> (Buffer, Vec<View>, Vec<Accessor>, Vec<u8>) {
        let buffer = Buffer {
            byte_length: USize64(self.bytes.len() as u64),
            extras: None,
        };
        (buffer, self.buffer_views, self.accessors, self.bytes)
    }
}

/// Builds a `[min, max]` JSON pair from per-component extrema accumulated
/// while writing a `Vec3` attribute.
pub fn vec3_bounds(min: [f32; 3], max: [f32; 3]) -> (Option<Value>, Option<Value>) {
    (
        Some(serde_json::json!([min[0], min[1], min[2]])),
        Some(serde_json::json!([max[0], max[1], max[2]])),
    )
}
