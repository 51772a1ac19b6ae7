//! Camera frame pipeline: semi-planar YUV ingestion, grayscale processing,
//! buffer pre-rotation, and GPU presentation.
//!
//! The crate is split along the producer/consumer seam. `EdgePipeline` runs
//! on the capture side: it normalizes `YUV_420_888`-style planar frames into
//! a packed layout, runs a pluggable [`ImageProcessor`] over them, resolves
//! 90/270 capture rotations by permuting the grayscale buffer, and publishes
//! the result into a single-slot lock-free handoff. The render side holds
//! the other end of that slot and draws the newest frame each tick with a
//! wgpu pipeline, handling the remaining 180/flip cases as texture-coordinate
//! transforms and reporting throughput through a windowed FPS estimator.

pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod process;
pub mod render;

pub use diagnostics::fps::{FpsCounter, FpsReading};
pub use diagnostics::stats::StatsSnapshot;
pub use error::{PipelineError, Result};
pub use frame::handoff::FrameSlot;
pub use frame::{CanonicalFrame, PackedFrame, PlanarFrame, PlanarSource, PlaneView};
pub use pipeline::{EdgePipeline, RenderHandles};
pub use process::{ImageProcessor, LumaExtract};
pub use render::{render_tick, resize, RenderSettings, RenderState, TexturePath};
