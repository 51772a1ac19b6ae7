use thiserror::Error;

/// Pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame dimensions must be even and non-zero: {width}x{height}")]
    BadDimensions { width: usize, height: usize },

    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    BadRotation(i32),

    #[error("processor produced {got} bytes, expected {expected}")]
    ProcessorOutput { got: usize, expected: usize },

    #[error("renderer initialisation failed: {0}")]
    RenderInit(String),

    #[error("surface lost: {0}")]
    SurfaceLost(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
