use crate::error::RefinementWarning;

/// Warnings accumulated while decoding or upsampling a tile.
///
/// Unlike a hard [`crate::error::QuantizedMeshError`] or
/// [`crate::error::UpsampleError`], these never abort the operation —
/// they describe anomalies that were recovered from (an out-of-range
/// index was clamped, a degenerate triangle was skipped) and are
/// returned alongside the successful result so callers can log or
/// surface them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RefinementDiagnostics {
    warnings: Vec<RefinementWarning>,
}

impl RefinementDiagnostics {
    /// Creates an empty diagnostics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning, logging it at `tracing::warn!` as it is recorded.
    pub fn push(&mut self, warning: RefinementWarning) {
        tracing::warn!(?warning, "refinement warning");
        self.warnings.push(warning);
    }

    /// Returns every warning recorded so far, in recording order.
    pub fn warnings(&self) -> &[RefinementWarning] {
        &self.warnings
    }

    /// Returns `true` if no warnings were recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Merges another diagnostics accumulator into this one, in order.
    pub fn extend(&mut self, other: RefinementDiagnostics) {
        self.warnings.extend(other.warnings);
    }
}
