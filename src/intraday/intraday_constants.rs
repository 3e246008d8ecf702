/// Marker value flagging the once-per-day close sample
pub const MARKER_CLOSE: &str = "CLOSE";

/// Conventional chart tail length: one trading day of 10s samples fits well
/// under this, so UIs default to it.
pub const DEFAULT_TAIL_POINTS: usize = 240;
