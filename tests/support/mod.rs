//! Shared helpers for building synthetic wire-format fixtures, used by
//! more than one integration test.

use byteorder::{ByteOrder, LittleEndian};

fn zig_zag_encode(value: i32) -> u16 {
    ((value << 1) ^ (value >> 31)) as u16
}

fn push_delta_stream(bytes: &mut Vec<u8>, values: &[u16]) {
    let mut accumulator: i32 = 0;
    for &value in values {
        let delta = value as i32 - accumulator;
        accumulator = value as i32;
        let mut encoded = [0u8; 2];
        LittleEndian::write_u16(&mut encoded, zig_zag_encode(delta));
        bytes.extend_from_slice(&encoded);
    }
}

fn push_u32(bytes: &mut Vec<u8>, value: u32) {
    let mut encoded = [0u8; 4];
    LittleEndian::write_u32(&mut encoded, value);
    bytes.extend_from_slice(&encoded);
}

fn push_u16(bytes: &mut Vec<u8>, value: u16) {
    let mut encoded = [0u8; 2];
    LittleEndian::write_u16(&mut encoded, value);
    bytes.extend_from_slice(&encoded);
}

fn push_f64(bytes: &mut Vec<u8>, value: f64) {
    let mut encoded = [0u8; 8];
    LittleEndian::write_f64(&mut encoded, value);
    bytes.extend_from_slice(&encoded);
}

fn push_f32(bytes: &mut Vec<u8>, value: f32) {
    let mut encoded = [0u8; 4];
    LittleEndian::write_f32(&mut encoded, value);
    bytes.extend_from_slice(&encoded);
}

/// Builds a minimal quantized-mesh tile covering a single unit quad: four
/// corner vertices (one at each combination of `u, v in {0, 32767}`) and
/// two triangles, with every tile edge carrying exactly the two corner
/// vertices on that edge. No normal/water-mask/metadata extensions.
pub fn build_quad_tile_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();

    // Header: center, min/max height, bounding sphere, occlusion point.
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    push_f32(&mut bytes, 0.0); // min height
    push_f32(&mut bytes, 10.0); // max height
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 1.0);
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    push_f64(&mut bytes, 0.0);
    assert_eq!(bytes.len(), 92);

    // Vertex count and u/v/height delta streams, corner order:
    // 0: (0, 0), 1: (max, 0), 2: (0, max), 3: (max, max).
    push_u32(&mut bytes, 4);
    push_delta_stream(&mut bytes, &[0, 32767, 0, 32767]);
    push_delta_stream(&mut bytes, &[0, 0, 32767, 32767]);
    push_delta_stream(&mut bytes, &[16384, 16384, 16384, 16384]);

    // Two triangles, (0, 1, 2) and (1, 3, 2), high-watermark encoded.
    push_u32(&mut bytes, 2);
    for code in [0u16, 0, 0, 2, 0, 2] {
        push_u16(&mut bytes, code);
    }

    // Edge vertex lists: west/south/east/north.
    push_u32(&mut bytes, 2);
    push_u16(&mut bytes, 0);
    push_u16(&mut bytes, 2);
    push_u32(&mut bytes, 2);
    push_u16(&mut bytes, 0);
    push_u16(&mut bytes, 1);
    push_u32(&mut bytes, 2);
    push_u16(&mut bytes, 1);
    push_u16(&mut bytes, 3);
    push_u32(&mut bytes, 2);
    push_u16(&mut bytes, 2);
    push_u16(&mut bytes, 3);

    bytes
}
