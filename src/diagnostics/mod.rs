// Diagnostics — frame-rate estimation and pipeline statistics.

pub mod fps;
pub mod stats;
