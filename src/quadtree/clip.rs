use super::vertex::{ClipVertex, ClipVertexKey, ScratchVertex};

/// Read-only access to a parent primitive's per-vertex attributes, used
/// while clipping so the clip routine never has to care how a `Direct`
/// vertex's data is actually stored.
pub struct ParentAttributes<'a> {
    pub positions: &'a [[f32; 3]],
    pub uvs: &'a [[f32; 2]],
    pub normals: Option<&'a [[f32; 3]]>,
}

impl<'a> ParentAttributes<'a> {
    fn position(&self, scratch: &[ScratchVertex], vertex: ClipVertex) -> [f32; 3] {
        match vertex {
            ClipVertex::Direct(i) => self.positions[i as usize],
            ClipVertex::Back(i) => scratch[i as usize].position,
        }
    }

    fn uv(&self, scratch: &[ScratchVertex], vertex: ClipVertex) -> [f32; 2] {
        match vertex {
            ClipVertex::Direct(i) => self.uvs[i as usize],
            ClipVertex::Back(i) => scratch[i as usize].uv,
        }
    }

    fn normal(&self, scratch: &[ScratchVertex], vertex: ClipVertex) -> Option<[f32; 3]> {
        match vertex {
            ClipVertex::Direct(i) => self.normals.map(|normals| normals[i as usize]),
            ClipVertex::Back(i) => scratch[i as usize].normal,
        }
    }
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t]
}

fn lerp2(a: [f32; 2], b: [f32; 2], t: f32) -> [f32; 2] {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]
}

/// Clips `polygon` (the triangle or intermediate polygon from a previous
/// clip pass, wound consistently) against the half-plane `u`/`v
/// >= threshold` (`keep_above`) or `<= threshold` (`!keep_above`),
/// using the Sutherland-Hodgman algorithm: walk each edge, keep vertices
/// on the retained side, and insert one interpolated vertex per edge
/// that crosses the threshold.
///
/// New vertices are appended to `scratch`; first-pass intersections
/// (both edge endpoints `Direct`) are tagged with a
/// [`ClipVertexKey`] so triangles sharing a parent edge converge on the
/// same child vertex. Returns an empty polygon if every vertex falls on
/// the discarded side (the "empty" case `upsample_for_child` reports as
/// `Ok(None)` once every triangle clips away).
pub fn clip_polygon_at_axis_aligned_threshold(
    polygon: &[ClipVertex],
    scratch: &mut Vec<ScratchVertex>,
    attributes: &ParentAttributes,
    clip_u_axis: bool,
    threshold: f64,
    keep_above: bool,
    epsilon: f64,
) -> Vec<ClipVertex> {
    if polygon.is_empty() {
        return Vec::new();
    }

    let coordinate = |scratch: &[ScratchVertex], vertex: ClipVertex| -> f64 {
        let uv = attributes.uv(scratch, vertex);
        (if clip_u_axis { uv[0] } else { uv[1] }) as f64
    };
    let is_inside = |coordinate: f64| -> bool {
        if keep_above {
            coordinate >= threshold - epsilon
        } else {
            coordinate <= threshold + epsilon
        }
    };

    let n = polygon.len();
    let mut output = Vec::with_capacity(n + 1);
    for i in 0..n {
        let current = polygon[i];
        let previous = polygon[(i + n - 1) % n];
        let current_coordinate = coordinate(scratch, current);
        let previous_coordinate = coordinate(scratch, previous);
        let current_inside = is_inside(current_coordinate);
        let previous_inside = is_inside(previous_coordinate);

        if current_inside != previous_inside {
            let span = current_coordinate - previous_coordinate;
            let t = if span.abs() > f64::EPSILON {
                ((threshold - previous_coordinate) / span).clamp(0.0, 1.0) as f32
            } else {
                0.0
            };
            let position = lerp3(
                attributes.position(scratch, previous),
                attributes.position(scratch, current),
                t,
            );
            let uv = lerp2(attributes.uv(scratch, previous), attributes.uv(scratch, current), t);
            let normal = match (attributes.normal(scratch, previous), attributes.normal(scratch, current)) {
                (Some(a), Some(b)) => Some(lerp3(a, b, t)),
                _ => None,
            };
            let key = match (previous, current) {
                (ClipVertex::Direct(a), ClipVertex::Direct(b)) => Some(ClipVertexKey::edge_intersection(a, b)),
                _ => None,
            };
            scratch.push(ScratchVertex { position, uv, normal, key });
            output.push(ClipVertex::Back((scratch.len() - 1) as u32));
        }

        if current_inside {
            output.push(current);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clipping_a_triangle_fully_inside_returns_it_unchanged() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.6, 0.6], [0.9, 0.6], [0.6, 0.9]];
        let attributes = ParentAttributes { positions: &positions, uvs: &uvs, normals: None };
        let mut scratch = Vec::new();
        let polygon = vec![ClipVertex::Direct(0), ClipVertex::Direct(1), ClipVertex::Direct(2)];
        let result = clip_polygon_at_axis_aligned_threshold(&polygon, &mut scratch, &attributes, true, 0.5, true, 1e-4);
        assert_eq!(result, polygon);
    }

    #[test]
    fn clipping_a_triangle_fully_outside_returns_empty() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let uvs = [[0.1, 0.1], [0.2, 0.1], [0.1, 0.2]];
        let attributes = ParentAttributes { positions: &positions, uvs: &uvs, normals: None };
        let mut scratch = Vec::new();
        let polygon = vec![ClipVertex::Direct(0), ClipVertex::Direct(1), ClipVertex::Direct(2)];
        let result = clip_polygon_at_axis_aligned_threshold(&polygon, &mut scratch, &attributes, true, 0.5, true, 1e-4);
        assert!(result.is_empty());
    }

    #[test]
    fn clipping_a_straddling_triangle_inserts_two_edge_vertices() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let attributes = ParentAttributes { positions: &positions, uvs: &uvs, normals: None };
        let mut scratch = Vec::new();
        let polygon = vec![ClipVertex::Direct(0), ClipVertex::Direct(1), ClipVertex::Direct(2)];
        let result = clip_polygon_at_axis_aligned_threshold(&polygon, &mut scratch, &attributes, true, 0.5, true, 1e-4);
        assert_eq!(scratch.len(), 2);
        for vertex in &scratch {
            assert_relative_eq!(vertex.uv[0], 0.5, epsilon = 1e-6);
        }
        assert!(result.iter().any(|v| matches!(v, ClipVertex::Direct(1))));
        assert!(result.iter().any(|v| matches!(v, ClipVertex::Direct(2))));
    }
}
