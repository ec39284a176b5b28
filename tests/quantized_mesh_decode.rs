mod support;

use cesium_json::mesh::Semantic;
use cesium_json::validation::Checked;
use cesium_tiles::config::RefinementConfig;
use cesium_tiles::quadtree::{decode_quantized_mesh, Rectangle};

fn small_rectangle() -> Rectangle {
    Rectangle {
        west: -0.01,
        south: -0.01,
        east: 0.01,
        north: 0.01,
    }
}

#[test]
fn decode_reconstructs_base_vertices_and_appends_skirts_on_every_edge() {
    let bytes = support::build_quad_tile_bytes();
    let config = RefinementConfig::default();
    let (tile, diagnostics) = decode_quantized_mesh(&bytes, small_rectangle(), 5.0, &config).unwrap();

    assert!(diagnostics.is_empty());

    let primitive = &tile.root.meshes[0].primitives[0];
    let position_accessor = primitive.attributes.get(&Checked::Valid(Semantic::Positions)).unwrap();
    let accessor = tile.root.get(position_accessor).unwrap();
    // 4 base corner vertices plus 2 skirt vertices per tile edge (4 edges,
    // each with exactly 2 boundary vertices here).
    assert_eq!(accessor.count.as_usize(), 4 + 4 * 2);

    let indices_accessor = primitive.indices.as_ref().unwrap();
    let index_count = tile.root.get(indices_accessor).unwrap().count.as_usize();
    // 2 base triangles (6 indices) plus 2 triangles per skirt edge (4 edges).
    assert_eq!(index_count, 2 * 3 + 4 * 2 * 3);
}

#[test]
fn decode_rejects_buffer_truncated_mid_section() {
    let mut bytes = support::build_quad_tile_bytes();
    bytes.truncate(100);
    let config = RefinementConfig::default();
    let result = decode_quantized_mesh(&bytes, small_rectangle(), 5.0, &config);
    assert!(result.is_err());
}
