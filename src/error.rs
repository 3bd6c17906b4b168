use thiserror::Error;

/// Library error type for compositor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Non-positive or NaN dimensions reached the layout resolver.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The drawing surface lacks a capability the pipeline needs.
    #[error("unsupported surface: {0}")]
    UnsupportedSurface(String),

    /// Face bounds were required but the face data carried none.
    #[error("face bounds are required for layout but none were supplied")]
    MissingFaceData,

    /// The decoded bitmap never arrived (decode failed or was canceled).
    #[error("image unavailable: {0}")]
    ImageUnavailable(String),

    /// A backing pixmap could not be allocated.
    #[error("surface allocation failed: {0}")]
    Surface(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
