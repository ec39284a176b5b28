/// Computes the downward skirt height for a freshly decoded tile.
///
/// Matches `QuantizedMeshLoader::calculateSkirtHeight`: proportional to
/// the level's geometric error and the tile's angular width, so skirts
/// stay visible at a tile's native resolution without growing
/// unreasonably large at coarse levels.
pub fn calculate_skirt_height(skirt_height_multiplier: f64, level_max_geometric_error: f64, rectangle_width: f64) -> f64 {
    skirt_height_multiplier * level_max_geometric_error * rectangle_width
}

/// Skirt height a child tile's newly introduced interior edges should
/// use when upsampling: half of the shortest of the parent's four
/// (west, south, east, north) skirt heights. Edges the child shares
/// with the parent's own boundary keep that side's parent height
/// unchanged instead of this value.
pub fn inherited_interior_skirt_height(parent_heights: [f64; 4]) -> f64 {
    parent_heights.iter().copied().fold(f64::INFINITY, f64::min) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skirt_height_scales_with_its_inputs() {
        assert_eq!(calculate_skirt_height(5.0, 2.0, 3.0), 30.0);
    }

    #[test]
    fn interior_skirt_height_is_half_the_shortest_parent_side() {
        assert_eq!(inherited_interior_skirt_height([10.0, 4.0, 7.0, 6.0]), 2.0);
    }
}
