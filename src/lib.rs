pub mod config;
pub mod error;
pub mod faces;
pub mod geometry;
pub mod grid;
pub mod processing {
    pub mod color;
    pub mod hex_clip;
    pub mod layout;
}
pub mod render {
    pub mod paint;
    pub mod pipeline;
    pub mod surface;
}

pub use error::{Error, Result};
pub use render::pipeline::Compositor;
