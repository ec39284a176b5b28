/// A vertex referenced while clipping a single parent triangle against an
/// axis-aligned UV threshold.
///
/// Redesigns the original algorithm's sign-bit-overloaded vertex index
/// (negative meant "newly clipped", non-negative meant "an existing
/// parent vertex") as a closed, checked two-variant enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipVertex {
    /// An existing parent-mesh vertex, by index into the parent's
    /// attribute accessors.
    Direct(u32),
    /// A vertex produced by this clip operation, by index into the
    /// current triangle's scratch polygon buffer.
    Back(u32),
}

/// Identifies a clip vertex stably enough to deduplicate it across the
/// triangles that share it.
///
/// `Direct` vertices trivially dedupe on the parent index. Vertices
/// produced by intersecting the *original* triangle edges against the
/// first clip axis also dedupe, keyed by the unordered pair of parent
/// vertices the edge connects, so two triangles sharing a parent edge
/// that both get cut by the same `u = 0.5` (or `v = 0.5`) plane emit a
/// single shared child vertex rather than a visible seam. Vertices
/// produced by the second clip pass are intersections of the
/// *intermediate*, per-triangle polygon from the first pass; since that
/// polygon is never shared between triangles, those vertices are never
/// looked up through the map and always materialize fresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClipVertexKey {
    /// An unmodified parent vertex.
    Direct(u32),
    /// The point where the original parent edge between `low` and
    /// `high` (parent vertex indices, `low < high`) crosses the first
    /// clip axis.
    EdgeIntersection { low: u32, high: u32 },
}

impl ClipVertexKey {
    /// Builds the key for the edge between two parent vertices,
    /// canonicalizing the order so either traversal direction produces
    /// the same key.
    pub fn edge_intersection(a: u32, b: u32) -> Self {
        if a < b {
            ClipVertexKey::EdgeIntersection { low: a, high: b }
        } else {
            ClipVertexKey::EdgeIntersection { low: b, high: a }
        }
    }
}

/// A vertex produced mid-clip: its interpolated attributes, plus the key
/// to deduplicate it by if it came from the first clip pass.
#[derive(Clone, Copy, Debug)]
pub struct ScratchVertex {
    /// Interpolated position.
    pub position: [f32; 3],
    /// Interpolated texture coordinates.
    pub uv: [f32; 2],
    /// Interpolated normal, if the parent primitive carried one.
    pub normal: Option<[f32; 3]>,
    /// Present for first-pass edge intersections (dedup key); `None` for
    /// second-pass intersections, which are always triangle-local.
    pub key: Option<ClipVertexKey>,
}
