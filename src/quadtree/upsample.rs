use super::clip::{clip_polygon_at_axis_aligned_threshold, ParentAttributes};
use super::geometry::{geodetic_surface_normal, Rectangle, WGS84_RADII};
use super::metadata::WaterMask;
use super::model_builder::{vec3_bounds, ModelBuilder};
use super::skirt::inherited_interior_skirt_height;
use super::vertex::{ClipVertex, ClipVertexKey, ScratchVertex};
use crate::config::RefinementConfig;
use crate::diagnostics::RefinementDiagnostics;
use crate::error::UpsampleError;
use cesium_json::accessor::{ComponentType, Type};
use cesium_json::mesh::{Mesh, Mode, Primitive, Semantic};
use cesium_json::validation::Checked;
use cesium_json::{Index, Root};
use std::collections::{BTreeMap, HashMap};

/// Identifies which of a tile's four quadtree children is being
/// upsampled, by that child's own absolute tile-space coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileQuadrantId {
    /// The child tile's X coordinate at its level.
    pub child_x: u32,
    /// The child tile's Y coordinate at its level.
    pub child_y: u32,
}

impl TileQuadrantId {
    /// Whether this child occupies the upper half of its parent's `u`
    /// range (the east half, by this format's convention).
    pub fn keep_above_u(&self) -> bool {
        self.child_x % 2 == 1
    }

    /// Whether this child occupies the upper half of its parent's `v`
    /// range (the north half).
    pub fn keep_above_v(&self) -> bool {
        self.child_y % 2 == 1
    }
}

struct ParentPrimitive {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Option<Vec<[f32; 3]>>,
    indices: Vec<u32>,
}

fn read_parent_primitive(root: &Root, buffer_bytes: &[u8], primitive: &Primitive) -> Result<ParentPrimitive, UpsampleError> {
    if primitive.mode != Checked::Valid(Mode::Triangles) {
        return Err(UpsampleError::UnsupportedPrimitiveMode);
    }
    let position_index = primitive
        .attributes
        .get(&Checked::Valid(Semantic::Positions))
        .ok_or(UpsampleError::MissingPositions)?;
    let uv_index = primitive
        .attributes
        .get(&Checked::Valid(Semantic::TexCoords(0)))
        .ok_or(UpsampleError::MissingTexCoords)?;
    let normal_index = primitive.attributes.get(&Checked::Valid(Semantic::Normals));
    let indices_index = primitive.indices.as_ref().ok_or(UpsampleError::InvalidAccessor)?;

    let positions = read_vec3(root, buffer_bytes, position_index)?;
    let uvs = read_vec2(root, buffer_bytes, uv_index)?;
    let normals = normal_index.map(|i| read_vec3(root, buffer_bytes, i)).transpose()?;
    let indices = read_indices(root, buffer_bytes, indices_index)?;

    Ok(ParentPrimitive { positions, uvs, normals, indices })
}

fn accessor_bytes<'a>(
    root: &Root,
    buffer_bytes: &'a [u8],
    index: &Index<cesium_json::Accessor>,
) -> Result<(&'a [u8], usize), UpsampleError> {
    let accessor = root.get(index).ok_or(UpsampleError::InvalidAccessor)?;
    let view_index = accessor.buffer_view.as_ref().ok_or(UpsampleError::InvalidAccessor)?;
    let view = root.get(view_index).ok_or(UpsampleError::InvalidAccessor)?;
    let start = view.byte_offset.map(|o| o.as_usize()).unwrap_or(0);
    let end = start + view.byte_length.as_usize();
    let bytes = buffer_bytes.get(start..end).ok_or(UpsampleError::InvalidAccessor)?;
    Ok((bytes, accessor.count.as_usize()))
}

fn read_vec3(root: &Root, buffer_bytes: &[u8], index: &Index<cesium_json::Accessor>) -> Result<Vec<[f32; 3]>, UpsampleError> {
    let (bytes, count) = accessor_bytes(root, buffer_bytes, index)?;
    if bytes.len() < count * 12 {
        return Err(UpsampleError::InvalidAccessor);
    }
    Ok(bytemuck::cast_slice::<u8, [f32; 3]>(&bytes[..count * 12]).to_vec())
}

fn read_vec2(root: &Root, buffer_bytes: &[u8], index: &Index<cesium_json::Accessor>) -> Result<Vec<[f32; 2]>, UpsampleError> {
    let (bytes, count) = accessor_bytes(root, buffer_bytes, index)?;
    if bytes.len() < count * 8 {
        return Err(UpsampleError::InvalidAccessor);
    }
    Ok(bytemuck::cast_slice::<u8, [f32; 2]>(&bytes[..count * 8]).to_vec())
}

/// The skirt bookkeeping a decoded parent primitive's `extras` carries:
/// which slice of its index buffer is real geometry (as opposed to
/// skirt quads), and each side's skirt height, for a child upsample to
/// inherit.
struct ParentSkirtMetadata {
    no_skirt_indices_begin: usize,
    no_skirt_indices_count: usize,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
    mesh_center: [f64; 3],
}

fn read_parent_skirt_metadata(primitive: &Primitive) -> Result<ParentSkirtMetadata, UpsampleError> {
    let extras = primitive.extras.as_ref().ok_or(UpsampleError::MissingSkirtMetadata)?;
    let u32_field = |key: &str| -> Result<usize, UpsampleError> {
        extras
            .get(key)
            .and_then(|value| value.as_u64())
            .map(|value| value as usize)
            .ok_or(UpsampleError::MissingSkirtMetadata)
    };
    let f64_field = |key: &str| -> Result<f64, UpsampleError> {
        extras.get(key).and_then(|value| value.as_f64()).ok_or(UpsampleError::MissingSkirtMetadata)
    };
    let mesh_center = extras
        .get("meshCenter")
        .and_then(|value| value.as_array())
        .filter(|array| array.len() == 3)
        .and_then(|array| {
            Some([array[0].as_f64()?, array[1].as_f64()?, array[2].as_f64()?])
        })
        .ok_or(UpsampleError::MissingSkirtMetadata)?;
    Ok(ParentSkirtMetadata {
        no_skirt_indices_begin: u32_field("noSkirtIndicesBegin")?,
        no_skirt_indices_count: u32_field("noSkirtIndicesCount")?,
        west: f64_field("skirtWestHeight")?,
        south: f64_field("skirtSouthHeight")?,
        east: f64_field("skirtEastHeight")?,
        north: f64_field("skirtNorthHeight")?,
        mesh_center,
    })
}

fn read_indices(root: &Root, buffer_bytes: &[u8], index: &Index<cesium_json::Accessor>) -> Result<Vec<u32>, UpsampleError> {
    let accessor = root.get(index).ok_or(UpsampleError::InvalidAccessor)?;
    let (bytes, count) = accessor_bytes(root, buffer_bytes, index)?;
    match accessor.component_type {
        Checked::Valid(ComponentType::U16) => {
            if bytes.len() < count * 2 {
                return Err(UpsampleError::InvalidAccessor);
            }
            Ok(bytemuck::cast_slice::<u8, u16>(&bytes[..count * 2]).iter().map(|&i| i as u32).collect())
        }
        Checked::Valid(ComponentType::U32) => {
            if bytes.len() < count * 4 {
                return Err(UpsampleError::InvalidAccessor);
            }
            Ok(bytemuck::cast_slice::<u8, u32>(&bytes[..count * 4]).to_vec())
        }
        _ => Err(UpsampleError::InvalidAccessor),
    }
}

struct OutputVertices {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    next_vertex_index: u32,
    vertex_map: HashMap<ClipVertexKey, u32>,
}

impl OutputVertices {
    fn new() -> Self {
        OutputVertices {
            positions: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
            next_vertex_index: 0,
            vertex_map: HashMap::new(),
        }
    }

    /// Appends a new vertex and returns its index, tracked through an
    /// explicit counter rather than derived from `self.positions.len()`
    /// divided by anything: the index a vertex receives is simply the
    /// counter's value at the moment it is materialized.
    fn push(&mut self, position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> u32 {
        let index = self.next_vertex_index;
        self.positions.push(position);
        self.uvs.push(uv);
        self.normals.push(normal);
        self.next_vertex_index += 1;
        index
    }

    fn materialize(
        &mut self,
        vertex: ClipVertex,
        scratch: &[ScratchVertex],
        parent: &ParentPrimitive,
        quadrant: TileQuadrantId,
    ) -> u32 {
        let key = match vertex {
            ClipVertex::Direct(i) => Some(ClipVertexKey::Direct(i)),
            ClipVertex::Back(i) => scratch[i as usize].key,
        };
        if let Some(key) = key {
            if let Some(&existing) = self.vertex_map.get(&key) {
                return existing;
            }
        }

        let (position, uv, normal) = match vertex {
            ClipVertex::Direct(i) => (
                parent.positions[i as usize],
                parent.uvs[i as usize],
                parent.normals.as_ref().map(|n| n[i as usize]).unwrap_or([0.0, 0.0, 1.0]),
            ),
            ClipVertex::Back(i) => {
                let scratch_vertex = &scratch[i as usize];
                (scratch_vertex.position, scratch_vertex.uv, scratch_vertex.normal.unwrap_or([0.0, 0.0, 1.0]))
            }
        };
        let child_uv = translate_uv_to_child(uv, quadrant);
        let index = self.push(position, child_uv, normal);
        if let Some(key) = key {
            self.vertex_map.insert(key, index);
        }
        index
    }
}

/// Maps a parent-space UV into the child's local `[0, 1]^2` space.
fn translate_uv_to_child(uv: [f32; 2], quadrant: TileQuadrantId) -> [f32; 2] {
    let offset_u = if quadrant.keep_above_u() { 1.0 } else { 0.0 };
    let offset_v = if quadrant.keep_above_v() { 1.0 } else { 0.0 };
    [uv[0] * 2.0 - offset_u, uv[1] * 2.0 - offset_v]
}

const BOUNDARY_EPSILON: f32 = 1e-4;

/// Collects the indices of vertices lying on one child-local UV edge
/// (`axis == 0` selects `u`, `axis == 1` selects `v`), sorted along the
/// other axis so consecutive entries are adjacent along the edge.
fn edge_vertices(uvs: &[[f32; 2]], axis: usize, value: f32) -> Vec<u32> {
    let other = 1 - axis;
    let mut vertices: Vec<u32> = (0..uvs.len() as u32)
        .filter(|&i| (uvs[i as usize][axis] - value).abs() < BOUNDARY_EPSILON)
        .collect();
    vertices.sort_by(|&a, &b| uvs[a as usize][other].partial_cmp(&uvs[b as usize][other]).unwrap());
    vertices
}

/// Appends skirt geometry along all four edges of the child's local
/// `[0, 1]^2` UV rectangle.
///
/// Two of those edges coincide with the parent tile's own boundary (the
/// side the quadrant didn't cut) and inherit that side's parent skirt
/// height unchanged; the other two are the new interior cut this
/// upsample introduced and get half the shortest of the parent's four
/// sides, per [`inherited_interior_skirt_height`].
fn add_skirts(
    output: &mut OutputVertices,
    indices: &mut Vec<u32>,
    child_id: TileQuadrantId,
    child_rectangle: Rectangle,
    parent_skirt: &ParentSkirtMetadata,
) -> ParentSkirtMetadata {
    let interior_skirt_height =
        inherited_interior_skirt_height([parent_skirt.west, parent_skirt.south, parent_skirt.east, parent_skirt.north]);

    // West/east: west (u=0) is the inherited parent boundary unless this
    // child keeps the upper half, in which case west is the new interior
    // cut and east is the inherited boundary; symmetric for south/north.
    let west_height = if child_id.keep_above_u() { interior_skirt_height } else { parent_skirt.west };
    let east_height = if child_id.keep_above_u() { parent_skirt.east } else { interior_skirt_height };
    let south_height = if child_id.keep_above_v() { interior_skirt_height } else { parent_skirt.south };
    let north_height = if child_id.keep_above_v() { parent_skirt.north } else { interior_skirt_height };

    let vertex_count = output.positions.len();
    let west = edge_vertices(&output.uvs[..vertex_count], 0, 0.0);
    let east = edge_vertices(&output.uvs[..vertex_count], 0, 1.0);
    let south = edge_vertices(&output.uvs[..vertex_count], 1, 0.0);
    let north = edge_vertices(&output.uvs[..vertex_count], 1, 1.0);

    for (edge, height) in [(&west, west_height), (&east, east_height), (&south, south_height), (&north, north_height)] {
        add_skirt_for_edge(output, indices, edge, child_rectangle, height);
    }

    ParentSkirtMetadata {
        no_skirt_indices_begin: 0,
        no_skirt_indices_count: 0,
        west: west_height,
        south: south_height,
        east: east_height,
        north: north_height,
        mesh_center: parent_skirt.mesh_center,
    }
}

fn add_skirt_for_edge(
    output: &mut OutputVertices,
    indices: &mut Vec<u32>,
    edge: &[u32],
    child_rectangle: Rectangle,
    skirt_height: f64,
) {
    if edge.len() < 2 {
        return;
    }
    let mut skirt_indices = Vec::with_capacity(edge.len());
    for &source in edge {
        let uv = output.uvs[source as usize];
        let longitude = child_rectangle.west + uv[0] as f64 * child_rectangle.width();
        let latitude = child_rectangle.south + uv[1] as f64 * child_rectangle.height();
        let normal = geodetic_surface_normal(WGS84_RADII, longitude, latitude);
        let shoulder = output.positions[source as usize];
        let skirt_position = [
            shoulder[0] - (normal[0] * skirt_height) as f32,
            shoulder[1] - (normal[1] * skirt_height) as f32,
            shoulder[2] - (normal[2] * skirt_height) as f32,
        ];
        let skirt_normal = output.normals[source as usize];
        skirt_indices.push(output.push(skirt_position, uv, skirt_normal));
    }
    for (edge_pair, skirt_pair) in edge.windows(2).zip(skirt_indices.windows(2)) {
        let (a, b) = (edge_pair[0], edge_pair[1]);
        let (skirt_a, skirt_b) = (skirt_pair[0], skirt_pair[1]);
        indices.extend_from_slice(&[a, b, skirt_a]);
        indices.extend_from_slice(&[skirt_a, b, skirt_b]);
    }
}

/// Upsamples `parent`'s mesh into the geometry that belongs to one
/// quadtree child, clipping every parent triangle against the child's
/// UV quadrant and re-triangulating.
///
/// Only `parent`'s non-skirt triangles (the `noSkirtIndicesBegin`/
/// `noSkirtIndicesCount` range its `extras` declares) are clipped;
/// skirt quads are re-synthesized fresh for the child instead of being
/// carried over and re-clipped.
///
/// Returns `Ok(None)` if no parent triangle intersects the child's
/// quadrant at all (the "empty" case).
pub fn upsample_for_child(
    parent_root: &Root,
    parent_buffer_bytes: &[u8],
    child_id: TileQuadrantId,
    child_rectangle: Rectangle,
    parent_water_mask: Option<&WaterMask>,
    config: &RefinementConfig,
) -> Result<(Option<QuantizedMeshUpsampleResult>, RefinementDiagnostics), UpsampleError> {
    let diagnostics = RefinementDiagnostics::new();
    let primitive = parent_root
        .meshes
        .first()
        .and_then(|mesh| mesh.primitives.first())
        .ok_or(UpsampleError::InvalidAccessor)?;
    let parent = read_parent_primitive(parent_root, parent_buffer_bytes, primitive)?;
    let skirt_metadata = read_parent_skirt_metadata(primitive)?;

    let non_skirt_end = skirt_metadata
        .no_skirt_indices_begin
        .checked_add(skirt_metadata.no_skirt_indices_count)
        .ok_or(UpsampleError::MissingSkirtMetadata)?;
    let non_skirt_indices = parent
        .indices
        .get(skirt_metadata.no_skirt_indices_begin..non_skirt_end)
        .ok_or(UpsampleError::MissingSkirtMetadata)?;

    let keep_above_u = child_id.keep_above_u();
    let keep_above_v = child_id.keep_above_v();

    let attributes = ParentAttributes {
        positions: &parent.positions,
        uvs: &parent.uvs,
        normals: parent.normals.as_deref(),
    };

    let mut scratch: Vec<ScratchVertex> = Vec::new();
    let mut output = OutputVertices::new();
    let mut indices: Vec<u32> = Vec::new();

    for triangle in non_skirt_indices.chunks_exact(3) {
        scratch.clear();
        let initial = vec![
            ClipVertex::Direct(triangle[0]),
            ClipVertex::Direct(triangle[1]),
            ClipVertex::Direct(triangle[2]),
        ];
        let after_u = clip_polygon_at_axis_aligned_threshold(
            &initial,
            &mut scratch,
            &attributes,
            true,
            0.5,
            keep_above_u,
            config.clip_epsilon,
        );
        let after_v = clip_polygon_at_axis_aligned_threshold(
            &after_u,
            &mut scratch,
            &attributes,
            false,
            0.5,
            keep_above_v,
            config.clip_epsilon,
        );
        if after_v.len() < 3 {
            continue;
        }

        let materialized: Vec<u32> = after_v
            .iter()
            .map(|&vertex| output.materialize(vertex, &scratch, &parent, child_id))
            .collect();
        for i in 1..materialized.len() - 1 {
            indices.push(materialized[0]);
            indices.push(materialized[i]);
            indices.push(materialized[i + 1]);
        }
    }

    if output.positions.is_empty() {
        return Ok((None, diagnostics));
    }

    let no_skirt_indices_count = indices.len() as u32;
    let no_skirt_vertices_count = output.next_vertex_index;
    let child_skirt = add_skirts(&mut output, &mut indices, child_id, child_rectangle, &skirt_metadata);

    let (min, max) = bounds(&output.positions);
    let (min_json, max_json) = vec3_bounds(min, max);

    let mut builder = ModelBuilder::new();
    let position_accessor = builder.push_accessor(&output.positions, ComponentType::F32, Type::Vec3, false, min_json, max_json);
    let normal_accessor = builder.push_accessor(&output.normals, ComponentType::F32, Type::Vec3, false, None, None);
    let uv_accessor = builder.push_accessor(&output.uvs, ComponentType::F32, Type::Vec2, false, None, None);
    let index_component_type = if output.positions.len() > 65536 { ComponentType::U32 } else { ComponentType::U16 };
    let indices_accessor = builder.push_index_accessor(&indices, index_component_type);

    let mut child_attributes = BTreeMap::new();
    child_attributes.insert(Checked::Valid(Semantic::Positions), position_accessor);
    child_attributes.insert(Checked::Valid(Semantic::Normals), normal_accessor);
    child_attributes.insert(Checked::Valid(Semantic::TexCoords(0)), uv_accessor);

    let child_primitive = Primitive {
        attributes: child_attributes,
        extras: Some(serde_json::json!({
            "noSkirtIndicesBegin": 0,
            "noSkirtIndicesCount": no_skirt_indices_count,
            "noSkirtVerticesBegin": 0,
            "noSkirtVerticesCount": no_skirt_vertices_count,
            "meshCenter": child_skirt.mesh_center,
            "skirtWestHeight": child_skirt.west,
            "skirtSouthHeight": child_skirt.south,
            "skirtEastHeight": child_skirt.east,
            "skirtNorthHeight": child_skirt.north,
        })),
        indices: Some(indices_accessor),
        mode: Checked::Valid(Mode::Triangles),
    };

    let (buffer, buffer_views, accessors, buffer_bytes) = builder.finish();
    let root = Root {
        accessors,
        buffers: vec![buffer],
        buffer_views,
        meshes: vec![Mesh { extras: None, primitives: vec![child_primitive] }],
    };

    Ok((
        Some(QuantizedMeshUpsampleResult {
            root,
            buffer_bytes,
            water_mask: parent_water_mask.map(|mask| translate_water_mask(mask, child_id)),
        }),
        diagnostics,
    ))
}

/// The result of successfully upsampling a parent tile into one child
/// quadrant.
pub struct QuantizedMeshUpsampleResult {
    /// The child's decoded mesh, buffers, and accessors.
    pub root: Root,
    /// Raw bytes of `root.buffers[0]`.
    pub buffer_bytes: Vec<u8>,
    /// The parent's water mask, translated into the child's UV space, if
    /// the parent carried one.
    pub water_mask: Option<WaterMask>,
}

fn bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    (min, max)
}

/// Translates a whole-tile water mask raster into the 256x256 sub-window
/// that corresponds to one child quadrant.
pub fn translate_water_mask(mask: &WaterMask, quadrant: TileQuadrantId) -> WaterMask {
    match mask {
        WaterMask::AllLand | WaterMask::AllWater => mask.clone(),
        WaterMask::Raster(raster) => {
            const SIZE: usize = 256;
            let mut child_raster = Box::new([0u8; SIZE * SIZE]);
            let start_x = if quadrant.keep_above_u() { SIZE / 2 } else { 0 };
            let start_y = if quadrant.keep_above_v() { SIZE / 2 } else { 0 };
            for y in 0..SIZE / 2 {
                for x in 0..SIZE / 2 {
                    let source = (start_y + y) * SIZE + (start_x + x);
                    for dy in 0..2 {
                        for dx in 0..2 {
                            let dest = (y * 2 + dy) * SIZE + (x * 2 + dx);
                            child_raster[dest] = raster[source];
                        }
                    }
                }
            }
            WaterMask::Raster(child_raster)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_parity_matches_even_odd_child_coordinates() {
        assert!(!TileQuadrantId { child_x: 0, child_y: 0 }.keep_above_u());
        assert!(TileQuadrantId { child_x: 1, child_y: 0 }.keep_above_u());
        assert!(!TileQuadrantId { child_x: 0, child_y: 0 }.keep_above_v());
        assert!(TileQuadrantId { child_x: 0, child_y: 1 }.keep_above_v());
    }

    #[test]
    fn uv_translation_maps_child_quadrant_onto_unit_square() {
        let quadrant = TileQuadrantId { child_x: 1, child_y: 0 };
        let translated = translate_uv_to_child([0.75, 0.25], quadrant);
        assert_eq!(translated, [0.5, 0.5]);
    }
}
