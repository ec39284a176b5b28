/// Application-specific data attached to a data-model object.
///
/// Unlike the teacher crate's opaque, passthrough `extras` field, this
/// crate's refinement code reads structured data back out of `extras`
/// (availability rectangles, skirt flags, water mask metadata), so it is
/// backed directly by `serde_json::Value` rather than a boxed `RawValue`.
pub type Extras = Option<serde_json::Value>;
