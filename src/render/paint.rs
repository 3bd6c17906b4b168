use std::fmt;
use std::sync::Arc;

use palette::Srgba;
use serde::Deserialize;
use tiny_skia::{
    BlendMode, Color, GradientStop, Pixmap, RadialGradient, Shader, SpreadMode, Transform,
};

use crate::geometry::Point;

/// Straight-alpha 8-bit sRGB color.
pub type Rgba8 = Srgba<u8>;

pub const WHITE: Rgba8 = Srgba::new(255, 255, 255, 255);
pub const BLACK: Rgba8 = Srgba::new(0, 0, 0, 255);
pub const NEUTRAL: Rgba8 = Srgba::new(128, 128, 128, 255);
/// Provisional background painted before the real one has been sampled.
pub const MARKER_BLUE: Rgba8 = Srgba::new(0, 0, 255, 255);

pub fn rgba(c: [u8; 4]) -> Rgba8 {
    Srgba::new(c[0], c[1], c[2], c[3])
}

/// Same color with its alpha replaced.
pub fn with_alpha(c: Rgba8, alpha: f32) -> Rgba8 {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Srgba::new(c.red, c.green, c.blue, a)
}

pub fn to_skia(c: Rgba8) -> Color {
    Color::from_rgba8(c.red, c.green, c.blue, c.alpha)
}

/// Compositing rule for new paint over existing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeMode {
    #[default]
    SourceOver,
    Multiply,
    Overlay,
}

impl CompositeMode {
    pub const ALL: [Self; 3] = [Self::SourceOver, Self::Multiply, Self::Overlay];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceOver => "source-over",
            Self::Multiply => "multiply",
            Self::Overlay => "overlay",
        }
    }

    pub fn to_skia(self) -> BlendMode {
        match self {
            Self::SourceOver => BlendMode::SourceOver,
            Self::Multiply => BlendMode::Multiply,
            Self::Overlay => BlendMode::Overlay,
        }
    }
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Radial gradient in canvas-space.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradientSpec {
    pub center: Point,
    pub radius: f32,
    pub stops: Vec<(f32, Rgba8)>,
}

impl RadialGradientSpec {
    pub fn to_shader(&self, transform: Transform) -> Option<Shader<'static>> {
        let center = tiny_skia::Point::from_xy(self.center.x, self.center.y);
        let stops = self
            .stops
            .iter()
            .map(|(pos, color)| GradientStop::new(pos.clamp(0.0, 1.0), to_skia(*color)))
            .collect();
        RadialGradient::new(
            center,
            center,
            self.radius.max(f32::EPSILON),
            stops,
            SpreadMode::Pad,
            transform,
        )
    }
}

#[derive(Debug, Clone)]
pub enum FillStyle {
    Solid(Rgba8),
    Radial(RadialGradientSpec),
    /// A captured surface, painted 1:1 from the canvas origin.
    Pattern(Arc<Pixmap>),
}

impl Default for FillStyle {
    fn default() -> Self {
        Self::Solid(BLACK)
    }
}

impl From<Rgba8> for FillStyle {
    fn from(c: Rgba8) -> Self {
        Self::Solid(c)
    }
}

/// A caller-supplied one-off fill; unset fields use the paint defaults.
#[derive(Debug, Clone)]
pub struct Fill {
    pub style: FillStyle,
    pub composite: Option<CompositeMode>,
    pub alpha: Option<f32>,
}

impl Fill {
    pub fn new(style: impl Into<FillStyle>) -> Self {
        Self {
            style: style.into(),
            composite: None,
            alpha: None,
        }
    }

    pub fn with_composite(mut self, mode: CompositeMode) -> Self {
        self.composite = Some(mode);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_modes_map_to_blend_modes() {
        assert_eq!(CompositeMode::SourceOver.to_skia(), BlendMode::SourceOver);
        assert_eq!(CompositeMode::Multiply.to_skia(), BlendMode::Multiply);
        assert_eq!(CompositeMode::Overlay.to_skia(), BlendMode::Overlay);
        assert_eq!(CompositeMode::default().to_string(), "source-over");
    }

    #[test]
    fn with_alpha_replaces_alpha_only() {
        let c = with_alpha(NEUTRAL, 0.25);
        assert_eq!((c.red, c.green, c.blue), (128, 128, 128));
        assert_eq!(c.alpha, 64);
    }

    #[test]
    fn gradient_builds_a_shader() {
        let spec = RadialGradientSpec {
            center: Point::new(50.0, 50.0),
            radius: 40.0,
            stops: vec![(0.0, WHITE), (1.0, BLACK)],
        };
        assert!(spec.to_shader(Transform::identity()).is_some());
    }
}
