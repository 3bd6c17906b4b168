//! The drawing-surface contract and its tiny-skia backed implementation.
//!
//! The surface mirrors an immediate-mode 2D canvas: a current path, a paint
//! state (fill, stroke, alpha, compositing mode, transform) with save/restore,
//! and image blits with independent source and destination rectangles.
//! Coordinates passed in are canvas-space; the backing store may be larger by
//! the device pixel ratio.

use std::sync::Arc;

use image::RgbaImage;
use palette::Srgba;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, PathBuilder, Pattern, Pixmap, Shader, SpreadMode,
    Stroke, Transform,
};
use tracing::trace;

use crate::error::{Error, Result};
use crate::geometry::{Point, Rect, Size, arc_to_cubics};
use crate::processing::hex_clip::PathCommand;
use crate::render::paint::{CompositeMode, FillStyle, Rgba8, WHITE, to_skia};

/// A decoded bitmap supplied by the asset loader, held premultiplied.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixmap: Pixmap,
}

impl SourceImage {
    pub fn from_rgba_image(img: &RgbaImage) -> Result<Self> {
        let mut pixmap = Pixmap::new(img.width(), img.height()).ok_or_else(|| {
            Error::Surface(format!(
                "cannot hold a {}x{} image",
                img.width(),
                img.height()
            ))
        })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width() as f32, self.height() as f32)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Operations the render pipeline needs from its drawing target.
pub trait DrawingSurface {
    /// Canvas-space size.
    fn size(&self) -> Size;

    /// Reallocates the backing store for a new canvas size, dropping pixels,
    /// path and paint state.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn supports(&self, _mode: CompositeMode) -> bool {
        true
    }

    fn clear(&mut self);

    fn set_fill_style(&mut self, style: FillStyle);
    fn set_stroke_style(&mut self, color: Rgba8);
    fn set_line_width(&mut self, width: f32);
    fn set_global_alpha(&mut self, alpha: f32);
    fn global_alpha(&self) -> f32;
    fn set_composite(&mut self, mode: CompositeMode);
    fn composite(&self) -> CompositeMode;

    fn fill_rect(&mut self, rect: Rect);
    fn stroke_rect(&mut self, rect: Rect);

    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    /// Angles in radians; a line joins the current point to the arc start.
    fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32, anticlockwise: bool);
    fn close_path(&mut self);
    /// Fills the current path with the current fill style.
    fn fill(&mut self);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn rotate(&mut self, degrees: f32);

    fn draw_image(&mut self, image: &SourceImage, src: Rect, dst: Rect);

    /// Straight-alpha pixels of a canvas-space region, clipped to the surface.
    fn read_region(&self, rect: Rect) -> Vec<Rgba8>;

    /// Copy of the current pixels, usable as a [`FillStyle::Pattern`].
    fn snapshot(&self) -> Arc<Pixmap>;

    fn append(&mut self, commands: &[PathCommand]) {
        for cmd in commands {
            match *cmd {
                PathCommand::MoveTo(p) => self.move_to(p),
                PathCommand::LineTo(p) => self.line_to(p),
                PathCommand::Arc {
                    center,
                    radius,
                    start_deg,
                    end_deg,
                    anticlockwise,
                } => self.arc(
                    center,
                    radius,
                    start_deg.to_radians(),
                    end_deg.to_radians(),
                    anticlockwise,
                ),
                PathCommand::Close => self.close_path(),
            }
        }
    }
}

#[derive(Debug, Clone)]
struct PaintState {
    fill: FillStyle,
    stroke: Rgba8,
    line_width: f32,
    alpha: f32,
    composite: CompositeMode,
    transform: Transform,
}

impl Default for PaintState {
    fn default() -> Self {
        Self {
            fill: FillStyle::default(),
            stroke: WHITE,
            line_width: 1.0,
            alpha: 1.0,
            composite: CompositeMode::SourceOver,
            transform: Transform::identity(),
        }
    }
}

/// Path segment already mapped into device pixels.
#[derive(Debug, Clone, Copy)]
enum Segment {
    Move(Point),
    Line(Point),
    Cubic(Point, Point, Point),
    Close,
}

fn allocate(width: u32, height: u32, ratio: f32) -> Result<Pixmap> {
    if width == 0 || height == 0 || !ratio.is_finite() || ratio <= 0.0 {
        return Err(Error::InvalidGeometry(format!(
            "surface needs positive size and pixel ratio, got {width}x{height} @ {ratio}"
        )));
    }
    let device_w = (width as f32 * ratio).round().max(1.0) as u32;
    let device_h = (height as f32 * ratio).round().max(1.0) as u32;
    let pixmap = Pixmap::new(device_w, device_h)
        .ok_or_else(|| Error::Surface(format!("cannot allocate {device_w}x{device_h} pixmap")))?;
    trace!(width, height, ratio, device_w, device_h, "allocated surface");
    Ok(pixmap)
}

#[derive(Debug)]
pub struct PixmapSurface {
    pixmap: Pixmap,
    logical: Size,
    pixel_ratio: f32,
    state: PaintState,
    stack: Vec<PaintState>,
    segments: Vec<Segment>,
    has_current_point: bool,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_pixel_ratio(width, height, 1.0)
    }

    /// A surface whose backing store is `ratio` times the canvas size.
    pub fn with_pixel_ratio(width: u32, height: u32, ratio: f32) -> Result<Self> {
        let pixmap = allocate(width, height, ratio)?;
        Ok(Self {
            pixmap,
            logical: Size::new(width as f32, height as f32),
            pixel_ratio: ratio,
            state: PaintState::default(),
            stack: Vec::new(),
            segments: Vec::new(),
            has_current_point: false,
        })
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha copy of the backing store at device resolution.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Depth of the save/restore stack.
    pub fn state_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    fn device_transform(&self) -> Transform {
        Transform::from_scale(self.pixel_ratio, self.pixel_ratio).pre_concat(self.state.transform)
    }

    fn map(&self, p: Point) -> Point {
        let mut pts = [tiny_skia::Point::from_xy(p.x, p.y)];
        self.device_transform().map_points(&mut pts);
        Point::new(pts[0].x, pts[0].y)
    }

    /// Paint for the current fill style. `shader_transform` maps the style's
    /// canvas-space coordinates into the space the geometry is drawn in.
    fn fill_paint<'a>(
        &self,
        style: &'a FillStyle,
        shader_transform: Transform,
        pattern_transform: Transform,
    ) -> Paint<'a> {
        let alpha = self.state.alpha.clamp(0.0, 1.0);
        let mut shader = match style {
            FillStyle::Solid(c) => Shader::SolidColor(to_skia(*c)),
            FillStyle::Radial(spec) => spec
                .to_shader(shader_transform)
                .unwrap_or(Shader::SolidColor(to_skia(
                    spec.stops.last().map(|(_, c)| *c).unwrap_or(WHITE),
                ))),
            FillStyle::Pattern(pixmap) => Pattern::new(
                Pixmap::as_ref(pixmap),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                pattern_transform,
            ),
        };
        shader.apply_opacity(alpha);
        Paint {
            shader,
            blend_mode: self.state.composite.to_skia(),
            anti_alias: true,
            ..Default::default()
        }
    }

    fn build_path(&self) -> Option<tiny_skia::Path> {
        let mut pb = PathBuilder::new();
        for seg in &self.segments {
            match *seg {
                Segment::Move(p) => pb.move_to(p.x, p.y),
                Segment::Line(p) => pb.line_to(p.x, p.y),
                Segment::Cubic(a, b, c) => pb.cubic_to(a.x, a.y, b.x, b.y, c.x, c.y),
                Segment::Close => pb.close(),
            }
        }
        pb.finish()
    }
}

impl DrawingSurface for PixmapSurface {
    fn size(&self) -> Size {
        self.logical
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.pixmap = allocate(width, height, self.pixel_ratio)?;
        self.logical = Size::new(width as f32, height as f32);
        self.state = PaintState::default();
        self.stack.clear();
        self.begin_path();
        Ok(())
    }

    fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    fn set_fill_style(&mut self, style: FillStyle) {
        self.state.fill = style;
    }

    fn set_stroke_style(&mut self, color: Rgba8) {
        self.state.stroke = color;
    }

    fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        if alpha.is_finite() {
            self.state.alpha = alpha.clamp(0.0, 1.0);
        }
    }

    fn global_alpha(&self) -> f32 {
        self.state.alpha
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.state.composite = mode;
    }

    fn composite(&self) -> CompositeMode {
        self.state.composite
    }

    fn fill_rect(&mut self, rect: Rect) {
        let Some(r) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
            return;
        };
        let path = PathBuilder::from_rect(r);
        let transform = self.device_transform();
        let style = self.state.fill.clone();
        let pattern_transform = transform.invert().unwrap_or_default();
        let paint = self.fill_paint(&style, Transform::identity(), pattern_transform);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let Some(r) = tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) else {
            return;
        };
        let path = PathBuilder::from_rect(r);
        let mut paint = Paint {
            blend_mode: self.state.composite.to_skia(),
            anti_alias: true,
            ..Default::default()
        };
        paint.set_color(to_skia(self.state.stroke));
        paint.shader.apply_opacity(self.state.alpha);
        let stroke = Stroke {
            width: self.state.line_width,
            ..Default::default()
        };
        let transform = self.device_transform();
        self.pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }

    fn begin_path(&mut self) {
        self.segments.clear();
        self.has_current_point = false;
    }

    fn move_to(&mut self, p: Point) {
        let d = self.map(p);
        self.segments.push(Segment::Move(d));
        self.has_current_point = true;
    }

    fn line_to(&mut self, p: Point) {
        if !self.has_current_point {
            self.move_to(p);
            return;
        }
        let d = self.map(p);
        self.segments.push(Segment::Line(d));
    }

    fn arc(&mut self, center: Point, radius: f32, start: f32, end: f32, anticlockwise: bool) {
        let cubics = arc_to_cubics(center, radius, start, end, anticlockwise);
        let Some(first) = cubics.first() else {
            return;
        };
        self.line_to(first.p0);
        for c in &cubics {
            let (p1, p2, p3) = (self.map(c.p1), self.map(c.p2), self.map(c.p3));
            self.segments.push(Segment::Cubic(p1, p2, p3));
        }
    }

    fn close_path(&mut self) {
        if self.has_current_point {
            self.segments.push(Segment::Close);
        }
    }

    fn fill(&mut self) {
        let Some(path) = self.build_path() else {
            return;
        };
        let style = self.state.fill.clone();
        let device = self.device_transform();
        let paint = self.fill_paint(&style, device, Transform::identity());
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.state.transform = self.state.transform.pre_translate(dx, dy);
    }

    fn rotate(&mut self, degrees: f32) {
        self.state.transform = self.state.transform.pre_rotate(degrees);
    }

    fn draw_image(&mut self, image: &SourceImage, src: Rect, dst: Rect) {
        if src.width <= 0.0 || src.height <= 0.0 {
            return;
        }
        let Some(r) = tiny_skia::Rect::from_xywh(dst.x, dst.y, dst.width, dst.height) else {
            return;
        };
        let image_to_canvas = Transform::from_translate(dst.x, dst.y)
            .pre_scale(dst.width / src.width, dst.height / src.height)
            .pre_translate(-src.x, -src.y);
        let paint = Paint {
            shader: Pattern::new(
                Pixmap::as_ref(image.pixmap()),
                SpreadMode::Pad,
                FilterQuality::Bilinear,
                self.state.alpha,
                image_to_canvas,
            ),
            blend_mode: self.state.composite.to_skia(),
            anti_alias: false,
            ..Default::default()
        };
        let path = PathBuilder::from_rect(r);
        let transform = self.device_transform();
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, transform, None);
    }

    fn read_region(&self, rect: Rect) -> Vec<Rgba8> {
        let ratio = self.pixel_ratio;
        let max_x = self.pixmap.width() as i64;
        let max_y = self.pixmap.height() as i64;
        let x0 = ((rect.x * ratio).floor() as i64).clamp(0, max_x);
        let y0 = ((rect.y * ratio).floor() as i64).clamp(0, max_y);
        let x1 = (((rect.x + rect.width) * ratio).ceil() as i64).clamp(0, max_x);
        let y1 = (((rect.y + rect.height) * ratio).ceil() as i64).clamp(0, max_y);

        let mut out = Vec::with_capacity(((x1 - x0).max(0) * (y1 - y0).max(0)) as usize);
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some(px) = self.pixmap.pixel(x as u32, y as u32) {
                    let c = px.demultiply();
                    out.push(Srgba::new(c.red(), c.green(), c.blue(), c.alpha()));
                }
            }
        }
        out
    }

    fn snapshot(&self) -> Arc<Pixmap> {
        Arc::new(self.pixmap.clone())
    }
}
