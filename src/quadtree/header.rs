use crate::error::QuantizedMeshError;
use byteorder::{ByteOrder, LittleEndian};

/// Fixed 92-byte header at the front of a quantized-mesh terrain tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizedMeshHeader {
    /// Tile center, in coordinates relative to the ellipsoid's center.
    pub center: [f64; 3],
    /// Minimum height of any vertex in the tile, in meters.
    pub min_height: f32,
    /// Maximum height of any vertex in the tile, in meters.
    pub max_height: f32,
    /// Center of a bounding sphere that contains the entire tile.
    pub bounding_sphere_center: [f64; 3],
    /// Radius of the bounding sphere, in meters.
    pub bounding_sphere_radius: f64,
    /// A point used for horizon occlusion testing.
    pub horizon_occlusion_point: [f64; 3],
}

pub const HEADER_SIZE: usize = 92;

impl QuantizedMeshHeader {
    /// Parses the fixed header from the front of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, QuantizedMeshError> {
        if bytes.len() < HEADER_SIZE {
            return Err(QuantizedMeshError::InvalidHeader {
                available: bytes.len(),
            });
        }
        let f64_at = |offset: usize| LittleEndian::read_f64(&bytes[offset..offset + 8]);
        Ok(QuantizedMeshHeader {
            center: [f64_at(0), f64_at(8), f64_at(16)],
            min_height: LittleEndian::read_f32(&bytes[24..28]),
            max_height: LittleEndian::read_f32(&bytes[28..32]),
            bounding_sphere_center: [f64_at(32), f64_at(40), f64_at(48)],
            bounding_sphere_radius: f64_at(56),
            horizon_occlusion_point: [f64_at(64), f64_at(72), f64_at(80)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_short_buffer() {
        let bytes = [0u8; HEADER_SIZE - 1];
        assert_eq!(
            QuantizedMeshHeader::parse(&bytes),
            Err(QuantizedMeshError::InvalidHeader {
                available: HEADER_SIZE - 1
            })
        );
    }

    #[test]
    fn parse_reads_fields_in_order() {
        let mut bytes = [0u8; HEADER_SIZE];
        LittleEndian::write_f64(&mut bytes[0..8], 1.0);
        LittleEndian::write_f64(&mut bytes[8..16], 2.0);
        LittleEndian::write_f64(&mut bytes[16..24], 3.0);
        LittleEndian::write_f32(&mut bytes[24..28], -10.0);
        LittleEndian::write_f32(&mut bytes[28..32], 100.0);
        let header = QuantizedMeshHeader::parse(&bytes).unwrap();
        assert_eq!(header.center, [1.0, 2.0, 3.0]);
        assert_eq!(header.min_height, -10.0);
        assert_eq!(header.max_height, 100.0);
    }
}
