// GPU renderer — wgpu resources, texture upload, and per-tick drawing.

pub mod draw;
pub mod matrix;
pub mod state;

pub use draw::{render_tick, resize};
pub use state::{RenderSettings, RenderState, TexturePath};
