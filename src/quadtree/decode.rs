use super::geometry::{geodetic_surface_normal, geodetic_to_ecef, Rectangle, WGS84_RADII};
use super::header::{QuantizedMeshHeader, HEADER_SIZE};
use super::metadata::{AvailabilityMetadata, WaterMask};
use super::model_builder::{vec3_bounds, ModelBuilder};
use super::skirt::calculate_skirt_height;
use crate::config::RefinementConfig;
use crate::diagnostics::RefinementDiagnostics;
use crate::error::{QuantizedMeshError, RefinementWarning};
use byteorder::{ByteOrder, LittleEndian};
use cesium_json::accessor::{ComponentType, Type};
use cesium_json::mesh::{Mesh, Mode, Primitive, Semantic};
use cesium_json::validation::Checked;
use cesium_json::Root;
use std::collections::BTreeMap;

const EXTENSION_OCT_ENCODED_NORMALS: u32 = 1;
const EXTENSION_WATER_MASK: u32 = 2;
const EXTENSION_METADATA: u32 = 4;

/// A fully decoded quantized-mesh terrain tile: its renderable geometry,
/// water classification, and descendant-availability metadata.
pub struct QuantizedMeshTile {
    /// The decoded mesh, buffers, and accessors.
    pub root: Root,
    /// Raw bytes of `root.buffers[0]`.
    pub buffer_bytes: Vec<u8>,
    /// Per-vertex or whole-tile water classification, if the tile carries one.
    pub water_mask: Option<WaterMask>,
    /// Descendant tile availability, if the tile carries it.
    pub availability: Option<AvailabilityMetadata>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], QuantizedMeshError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(QuantizedMeshError::TruncatedBuffer { section })?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(QuantizedMeshError::TruncatedBuffer { section })?;
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, QuantizedMeshError> {
        Ok(LittleEndian::read_u32(self.take(4, section)?))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn align4(&mut self) {
        let padding = (4 - self.offset % 4) % 4;
        self.offset += padding.min(self.remaining());
    }
}

fn zig_zag_decode(value: u16) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

fn decode_delta_stream(cursor: &mut Cursor, count: usize, section: &'static str) -> Result<Vec<u16>, QuantizedMeshError> {
    let mut out = Vec::with_capacity(count);
    let mut accumulator: i32 = 0;
    for _ in 0..count {
        let raw = LittleEndian::read_u16(cursor.take(2, section)?);
        accumulator += zig_zag_decode(raw);
        out.push(accumulator.clamp(0, 32767) as u16);
    }
    Ok(out)
}

fn decode_indices(cursor: &mut Cursor, count: usize, wide: bool, section: &'static str) -> Result<Vec<u32>, QuantizedMeshError> {
    let mut out = Vec::with_capacity(count);
    let mut highest: u32 = 0;
    for _ in 0..count {
        let code = if wide {
            cursor.u32(section)?
        } else {
            LittleEndian::read_u16(cursor.take(2, section)?) as u32
        };
        let index = highest - code;
        out.push(index);
        if code == 0 {
            highest += 1;
        }
    }
    Ok(out)
}

fn decode_index_list(cursor: &mut Cursor, wide: bool, section: &'static str) -> Result<Vec<u32>, QuantizedMeshError> {
    let count = cursor.u32(section)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let value = if wide {
            cursor.u32(section)?
        } else {
            LittleEndian::read_u16(cursor.take(2, section)?) as u32
        };
        out.push(value);
    }
    Ok(out)
}

fn oct_decode(x: u8, y: u8) -> [f32; 3] {
    let mut nx = (x as f32) / 255.0 * 2.0 - 1.0;
    let mut ny = (y as f32) / 255.0 * 2.0 - 1.0;
    let nz = 1.0 - (nx.abs() + ny.abs());
    if nz < 0.0 {
        let old_nx = nx;
        nx = (1.0 - ny.abs()) * old_nx.signum();
        ny = (1.0 - old_nx.abs()) * ny.signum();
    }
    let length = (nx * nx + ny * ny + nz * nz).sqrt();
    [nx / length, ny / length, nz / length]
}

fn generate_normals(
    positions: &[[f32; 3]],
    indices: &[u32],
    epsilon: f64,
    diagnostics: &mut RefinementDiagnostics,
) -> Vec<[f32; 3]> {
    let mut accumulated = vec![[0.0f32; 3]; positions.len()];
    for (triangle_index, triangle) in indices.chunks_exact(3).enumerate() {
        let (a, b, c) = (triangle[0] as usize, triangle[1] as usize, triangle[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
        let e1 = sub(pb, pa);
        let e2 = sub(pc, pa);
        let cross = cross(e1, e2);
        let magnitude = (cross[0] as f64 * cross[0] as f64
            + cross[1] as f64 * cross[1] as f64
            + cross[2] as f64 * cross[2] as f64)
            .sqrt();
        if magnitude < epsilon {
            diagnostics.push(RefinementWarning::DegenerateTriangle {
                triangle_index: triangle_index as u32,
            });
            continue;
        }
        for &index in &[a, b, c] {
            accumulated[index][0] += cross[0];
            accumulated[index][1] += cross[1];
            accumulated[index][2] += cross[2];
        }
    }
    for normal in &mut accumulated {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > f32::EPSILON {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        } else {
            *normal = [0.0, 0.0, 1.0];
        }
    }
    accumulated
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
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

/// Decodes a quantized-mesh terrain tile, reconstructing renderable
/// geometry, synthesizing normals when the tile doesn't carry its own,
/// and appending skirts along every tile edge.
///
/// `level_max_geometric_error` is the level-of-detail metadata the
/// caller already knows for this tile (it is not encoded in the wire
/// format itself) and drives the skirt height.
pub fn decode_quantized_mesh(
    bytes: &[u8],
    rectangle: Rectangle,
    level_max_geometric_error: f64,
    config: &RefinementConfig,
) -> Result<(QuantizedMeshTile, RefinementDiagnostics), QuantizedMeshError> {
    let mut diagnostics = RefinementDiagnostics::new();
    let header = QuantizedMeshHeader::parse(bytes)?;
    let mut cursor = Cursor::new(bytes);
    cursor.offset = HEADER_SIZE;

    let vertex_count = cursor.u32("vertex count")? as usize;
    let u = decode_delta_stream(&mut cursor, vertex_count, "u stream")?;
    let v = decode_delta_stream(&mut cursor, vertex_count, "v stream")?;
    let height = decode_delta_stream(&mut cursor, vertex_count, "height stream")?;

    let wide_indices = vertex_count > 65536;
    if wide_indices {
        cursor.align4();
    }
    let triangle_count = cursor.u32("triangle count")? as usize;
    let mut indices = decode_indices(&mut cursor, triangle_count * 3, wide_indices, "triangle indices")?;

    let west_indices = decode_index_list(&mut cursor, wide_indices, "west edge indices")?;
    let south_indices = decode_index_list(&mut cursor, wide_indices, "south edge indices")?;
    let east_indices = decode_index_list(&mut cursor, wide_indices, "east edge indices")?;
    let north_indices = decode_index_list(&mut cursor, wide_indices, "north edge indices")?;

    for index in &indices {
        if *index as usize >= vertex_count {
            diagnostics.push(RefinementWarning::IndexOutOfRange {
                index: *index,
                vertex_count: vertex_count as u32,
            });
        }
    }

    let mut oct_normals: Option<Vec<[f32; 3]>> = None;
    let mut water_mask = None;
    let mut availability = None;
    while cursor.remaining() >= 8 {
        let extension_id = cursor.u32("extension id")?;
        let extension_length = cursor.u32("extension length")? as usize;
        let data = cursor.take(extension_length, "extension data")?;
        match extension_id {
            EXTENSION_OCT_ENCODED_NORMALS => {
                if data.len() == vertex_count * 2 {
                    oct_normals = Some(
                        data.chunks_exact(2)
                            .map(|pair| oct_decode(pair[0], pair[1]))
                            .collect(),
                    );
                }
            }
            EXTENSION_WATER_MASK => {
                water_mask = Some(if data.len() == 1 {
                    if data[0] == 0 {
                        WaterMask::AllLand
                    } else {
                        WaterMask::AllWater
                    }
                } else if data.len() == 65536 {
                    let mut raster = Box::new([0u8; 65536]);
                    raster.copy_from_slice(data);
                    WaterMask::Raster(raster)
                } else {
                    return Err(QuantizedMeshError::InvalidExtensionLength { extension_id });
                });
            }
            EXTENSION_METADATA => {
                let length_bytes = data
                    .get(0..4)
                    .ok_or(QuantizedMeshError::InvalidExtensionLength { extension_id })?;
                let json_length = LittleEndian::read_u32(length_bytes) as usize;
                let json_bytes = data
                    .get(4..4 + json_length)
                    .ok_or(QuantizedMeshError::InvalidExtensionLength { extension_id })?;
                let value: serde_json::Value = serde_json::from_slice(json_bytes).map_err(|e| {
                    QuantizedMeshError::MalformedMetadata { message: e.to_string() }
                })?;
                if let Some(available) = value.get("available") {
                    let ranges = serde_json::from_value(available.clone()).map_err(|e| {
                        QuantizedMeshError::MalformedMetadata { message: e.to_string() }
                    })?;
                    availability = Some(AvailabilityMetadata {
                        subtree_levels: value
                            .get("metadataAvailability")
                            .and_then(|v| v.as_u64())
                            .unwrap_or(0) as u32,
                        available: ranges,
                    });
                }
            }
            _ => {}
        }
    }

    // Reconstruct positions, relative to the tile's declared center.
    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(vertex_count);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(vertex_count);
    let mut heights: Vec<f64> = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let u_fraction = u[i] as f64 / 32767.0;
        let v_fraction = v[i] as f64 / 32767.0;
        let height_fraction = height[i] as f64 / 32767.0;
        let longitude = rectangle.west + u_fraction * rectangle.width();
        let latitude = rectangle.south + v_fraction * rectangle.height();
        let h = header.min_height as f64 + height_fraction * (header.max_height - header.min_height) as f64;
        let ecef = geodetic_to_ecef(WGS84_RADII, longitude, latitude, h);
        positions.push([
            (ecef[0] - header.center[0]) as f32,
            (ecef[1] - header.center[1]) as f32,
            (ecef[2] - header.center[2]) as f32,
        ]);
        uvs.push([u_fraction as f32, v_fraction as f32]);
        heights.push(h);
    }

    let mut normals = oct_normals.unwrap_or_else(|| {
        generate_normals(&positions, &indices, config.degenerate_triangle_epsilon, &mut diagnostics)
    });

    let no_skirt_indices_begin = 0u32;
    let no_skirt_indices_count = indices.len() as u32;
    let no_skirt_vertices_begin = 0u32;
    let no_skirt_vertices_count = vertex_count as u32;

    // Sort each edge's vertex list along the edge before stitching skirt
    // quads, so consecutive entries are actually adjacent along the edge
    // rather than in wire order.
    let mut west_indices = west_indices;
    let mut south_indices = south_indices;
    let mut east_indices = east_indices;
    let mut north_indices = north_indices;
    sort_edge_indices_by_uv(&mut west_indices, &uvs, Axis::Latitude);
    sort_edge_indices_by_uv(&mut east_indices, &uvs, Axis::Latitude);
    sort_edge_indices_by_uv(&mut south_indices, &uvs, Axis::Longitude);
    sort_edge_indices_by_uv(&mut north_indices, &uvs, Axis::Longitude);

    let skirt_height = calculate_skirt_height(config.skirt_height_multiplier, level_max_geometric_error, rectangle.width());
    for (edge, edge_indices) in [
        (Edge::West, &west_indices),
        (Edge::South, &south_indices),
        (Edge::East, &east_indices),
        (Edge::North, &north_indices),
    ] {
        add_skirt_for_edge(
            edge,
            edge_indices,
            &mut positions,
            &mut uvs,
            &mut normals,
            &heights,
            &mut indices,
            &rectangle,
            header.center,
            skirt_height,
        );
    }

    let (min, max) = bounds(&positions);
    let (min_json, max_json) = vec3_bounds(min, max);

    let index_component_type = if positions.len() > 65536 { ComponentType::U32 } else { ComponentType::U16 };

    let mut builder = ModelBuilder::new();
    let position_accessor = builder.push_accessor(&positions, ComponentType::F32, Type::Vec3, false, min_json, max_json);
    let normal_accessor = builder.push_accessor(&normals, ComponentType::F32, Type::Vec3, false, None, None);
    let uv_accessor = builder.push_accessor(&uvs, ComponentType::F32, Type::Vec2, false, None, None);
    let indices_accessor = builder.push_index_accessor(&indices, index_component_type);

    let mut attributes = BTreeMap::new();
    attributes.insert(Checked::Valid(Semantic::Positions), position_accessor);
    attributes.insert(Checked::Valid(Semantic::Normals), normal_accessor);
    attributes.insert(Checked::Valid(Semantic::TexCoords(0)), uv_accessor);

    let primitive = Primitive {
        attributes,
        extras: Some(serde_json::json!({
            "noSkirtIndicesBegin": no_skirt_indices_begin,
            "noSkirtIndicesCount": no_skirt_indices_count,
            "noSkirtVerticesBegin": no_skirt_vertices_begin,
            "noSkirtVerticesCount": no_skirt_vertices_count,
            "meshCenter": [header.center[0], header.center[1], header.center[2]],
            "skirtWestHeight": skirt_height,
            "skirtSouthHeight": skirt_height,
            "skirtEastHeight": skirt_height,
            "skirtNorthHeight": skirt_height,
        })),
        indices: Some(indices_accessor),
        mode: Checked::Valid(Mode::Triangles),
    };

    let (buffer, buffer_views, accessors, buffer_bytes) = builder.finish();
    let root = Root {
        accessors,
        buffers: vec![buffer],
        buffer_views,
        meshes: vec![Mesh {
            extras: None,
            primitives: vec![primitive],
        }],
    };

    Ok((
        QuantizedMeshTile {
            root,
            buffer_bytes,
            water_mask,
            availability,
        },
        diagnostics,
    ))
}

/// Which border of the tile an edge-vertex list runs along. Determines
/// both the sort axis used to order the list before stitching and the
/// direction of the small inward horizontal nudge applied to its skirt
/// vertices.
#[derive(Clone, Copy)]
enum Edge {
    West,
    South,
    East,
    North,
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Longitude,
    Latitude,
}

/// Sorts an edge's vertex indices along the edge (`uvs`' `u` component
/// for south/north edges, `v` component for west/east edges) so that
/// consecutive entries are adjacent along the border, not in wire order.
fn sort_edge_indices_by_uv(edge_indices: &mut [u32], uvs: &[[f32; 2]], axis: Axis) {
    let component = if axis == Axis::Longitude { 0 } else { 1 };
    edge_indices.sort_by(|&a, &b| {
        let (a, b) = (a as usize, b as usize);
        let (ka, kb) = (
            uvs.get(a).map(|uv| uv[component]).unwrap_or(f32::MAX),
            uvs.get(b).map(|uv| uv[component]).unwrap_or(f32::MAX),
        );
        ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[allow(clippy::too_many_arguments)]
fn add_skirt_for_edge(
    edge: Edge,
    edge_indices: &[u32],
    positions: &mut Vec<[f32; 3]>,
    uvs: &mut Vec<[f32; 2]>,
    normals: &mut Vec<[f32; 3]>,
    heights: &[f64],
    indices: &mut Vec<u32>,
    rectangle: &Rectangle,
    center: [f64; 3],
    skirt_height: f64,
) {
    if edge_indices.len() < 2 {
        return;
    }
    // Pull the border's vertices slightly toward the tile's interior before
    // dropping them down, so a skirt quad never lies exactly on the plane a
    // neighboring tile's own skirt occupies.
    let longitude_offset = rectangle.width() * 0.0001;
    let latitude_offset = rectangle.height() * 0.0001;

    let mut skirt_vertex_indices = Vec::with_capacity(edge_indices.len());
    for &source in edge_indices {
        let source = source as usize;
        if source >= positions.len() {
            continue;
        }
        let uv = uvs[source];
        let mut longitude = rectangle.west + uv[0] as f64 * rectangle.width();
        let mut latitude = rectangle.south + uv[1] as f64 * rectangle.height();
        match edge {
            Edge::West => longitude += longitude_offset,
            Edge::East => longitude -= longitude_offset,
            Edge::South => latitude += latitude_offset,
            Edge::North => latitude -= latitude_offset,
        }
        let normal = geodetic_surface_normal(WGS84_RADII, longitude, latitude);
        let ecef = geodetic_to_ecef(WGS84_RADII, longitude, latitude, heights[source]);
        let skirt_position = [
            (ecef[0] - center[0] - normal[0] * skirt_height) as f32,
            (ecef[1] - center[1] - normal[1] * skirt_height) as f32,
            (ecef[2] - center[2] - normal[2] * skirt_height) as f32,
        ];
        positions.push(skirt_position);
        uvs.push(uv);
        normals.push(normals[source]);
        skirt_vertex_indices.push((positions.len() - 1) as u32);
    }
    for window in edge_indices.windows(2).zip(skirt_vertex_indices.windows(2)) {
        let ((a, b), (skirt_a, skirt_b)) = ((window.0[0], window.0[1]), (window.1[0], window.1[1]));
        indices.extend_from_slice(&[a, b, *skirt_a]);
        indices.extend_from_slice(&[*skirt_a, b, *skirt_b]);
    }
}

#[cfg(test)]
mod skirt_edge_tests {
    use super::*;

    #[test]
    fn edge_indices_sort_along_their_axis() {
        let uvs = vec![[0.0, 0.8], [0.0, 0.1], [0.0, 0.5]];
        let mut edge = vec![0u32, 1, 2];
        sort_edge_indices_by_uv(&mut edge, &uvs, Axis::Latitude);
        assert_eq!(edge, vec![1, 2, 0]);
    }
}
