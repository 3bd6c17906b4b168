//! The render pipeline: owns the drawing surface for one image's display
//! lifecycle and runs load → layout → render, plus the overlay passes.
//!
//! Layout and geometry are resolved completely before the first surface call
//! of a pass, so an invalid input never leaves a half-drawn frame or a
//! half-updated [`RenderContext`].

use std::mem;
use std::sync::Arc;

use tiny_skia::Pixmap;
use tracing::{debug, info, trace, warn};

use crate::config::{Configuration, GradientConfig, Treatment, VignetteConfig};
use crate::error::{Error, Result};
use crate::faces::FaceData;
use crate::geometry::{Point, Rect, Size};
use crate::grid::GridMapper;
use crate::processing::color::{AverageSampler, ColorSampler, sample_square};
use crate::processing::hex_clip::{HexGeometry, build_hex_path};
use crate::processing::layout::{
    ImagePlacement, LayoutRequest, LayoutState, hex_radius, initial_layout, resolve_layout,
};
use crate::render::paint::{
    BLACK, CompositeMode, Fill, FillStyle, NEUTRAL, RadialGradientSpec, Rgba8, WHITE, rgba,
    with_alpha,
};
use crate::render::surface::{DrawingSurface, PixmapSurface, SourceImage};

/// Line width of the debug rectangle, in canvas pixels.
const DEBUG_RECT_LINE_WIDTH: f32 = 5.0;
/// Opacity of the neutral color used when a treatment disables its own
/// background color.
const NEUTRAL_SCRIM_ALPHA: f32 = 0.25;

pub type ReadyCallback = Box<dyn FnOnce(Result<()>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Drawn over the marker color so the background can be sampled.
    Provisional,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Loading,
    LayingOut,
    Rendering(RenderPhase),
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundFill {
    #[default]
    Unset,
    Resolved(Rgba8),
}

impl BackgroundFill {
    pub fn color(&self) -> Option<Rgba8> {
        match self {
            Self::Unset => None,
            Self::Resolved(c) => Some(*c),
        }
    }
}

/// Gradient description in canvas terms; see [`Compositor::create_simple_gradient`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientOptions {
    pub center_color: Rgba8,
    pub edge_color: Rgba8,
    /// Radius as a fraction of canvas height.
    pub radius_factor: f32,
    /// Centre on the canvas instead of the eyes midpoint.
    pub centered: bool,
    pub inner_stop: f32,
    pub outer_stop: f32,
}

impl Default for GradientOptions {
    fn default() -> Self {
        Self {
            center_color: WHITE,
            edge_color: BLACK,
            radius_factor: 1.0,
            centered: false,
            inner_stop: 0.0,
            outer_stop: 1.0,
        }
    }
}

impl From<&GradientConfig> for GradientOptions {
    fn from(cfg: &GradientConfig) -> Self {
        Self {
            center_color: rgba(cfg.center_color),
            edge_color: rgba(cfg.edge_color),
            radius_factor: cfg.radius_factor,
            centered: cfg.centered,
            inner_stop: cfg.inner_stop,
            outer_stop: cfg.outer_stop,
        }
    }
}

impl From<&VignetteConfig> for GradientOptions {
    fn from(cfg: &VignetteConfig) -> Self {
        Self {
            center_color: rgba(cfg.center_color),
            edge_color: rgba(cfg.edge_color),
            radius_factor: cfg.radius_factor,
            centered: true,
            inner_stop: cfg.inner_stop,
            outer_stop: cfg.outer_stop,
        }
    }
}

/// Everything derived for the image currently on display.
#[derive(Debug, Default)]
pub struct RenderContext {
    pub image: Option<SourceImage>,
    pub faces: FaceData,
    pub layout: Option<LayoutState>,
    pub hex: HexGeometry,
    pub background: BackgroundFill,
    /// Canvas-space origin of the hex clip.
    pub eyes_midpoint: Point,
    pub scrim_alpha: f32,
    pub snapshot: Option<Arc<Pixmap>>,
    pub vignette: Option<RadialGradientSpec>,
    pub is_drawing: bool,
}

impl RenderContext {
    pub fn grid(&self) -> Option<GridMapper> {
        self.layout.map(|l| GridMapper::new(l.projection()))
    }
}

/// Result of a layout pass, committed to the context only once complete.
struct LayoutPlan {
    layout: LayoutState,
    hex: HexGeometry,
    eyes_midpoint: Point,
    vignette: RadialGradientSpec,
}

struct PendingLoad {
    faces: FaceData,
    on_ready: ReadyCallback,
}

pub struct Compositor<S: DrawingSurface> {
    surface: S,
    config: Configuration,
    sampler: Box<dyn ColorSampler>,
    pixel_ratio: f32,
    state: PipelineState,
    ctx: RenderContext,
    pending: Option<PendingLoad>,
    render_passes: usize,
}

impl<S: DrawingSurface> Compositor<S> {
    pub fn new(surface: S, config: Configuration) -> Result<Self> {
        ensure_capabilities(&surface)?;
        let pixel_ratio = config.device_pixel_ratio;
        Ok(Self {
            surface,
            config,
            sampler: Box::new(AverageSampler),
            pixel_ratio,
            state: PipelineState::Idle,
            ctx: RenderContext::default(),
            pending: None,
            render_passes: 0,
        })
    }

    pub fn with_sampler(mut self, sampler: Box<dyn ColorSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Render passes issued by the most recent base redraw.
    pub fn last_render_passes(&self) -> usize {
        self.render_passes
    }

    pub fn is_drawing(&self) -> bool {
        self.ctx.is_drawing
    }

    /// Marks a host-driven redraw (an animation, say) in progress. Debug
    /// rectangles are skipped while set.
    pub fn set_drawing(&mut self, drawing: bool) {
        self.ctx.is_drawing = drawing;
    }

    pub fn set_scrim_alpha(&mut self, alpha: f32) {
        self.ctx.scrim_alpha = alpha.clamp(0.0, 1.0);
    }

    /// A backing surface at `ratio` (the configured pixel ratio when `None`).
    pub fn create_hidpi_surface(
        &self,
        width: u32,
        height: u32,
        ratio: Option<f32>,
    ) -> Result<PixmapSurface> {
        create_hidpi_surface(width, height, ratio.unwrap_or(self.pixel_ratio))
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "pipeline state");
            self.state = next;
        }
    }

    fn canvas(&self) -> Size {
        self.surface.size()
    }

    /// Records the face data for an upcoming image; `on_ready` fires once
    /// [`finish_load`](Self::finish_load) delivers the bitmap and layout
    /// completes, or with the error that stopped it.
    pub fn begin_load(&mut self, faces: FaceData, on_ready: impl FnOnce(Result<()>) + 'static) {
        if self.pending.is_some() {
            debug!("replacing pending load");
        }
        self.pending = Some(PendingLoad {
            faces,
            on_ready: Box::new(on_ready),
        });
        self.transition(PipelineState::Loading);
    }

    /// Delivers the decoded bitmap (or the decode failure) for the pending
    /// load. A failure leaves the previous image's state untouched.
    pub fn finish_load(&mut self, decoded: Result<SourceImage>) {
        let Some(PendingLoad { faces, on_ready }) = self.pending.take() else {
            warn!("decoded image arrived with no pending load");
            return;
        };
        let result = decoded.and_then(|image| self.install(image, faces));
        if let Err(err) = &result {
            warn!(error = %err, "image load failed");
            self.transition(PipelineState::Idle);
        }
        on_ready(result);
    }

    /// [`begin_load`](Self::begin_load) and [`finish_load`](Self::finish_load)
    /// in one step, for callers that decode synchronously.
    pub fn load_image(
        &mut self,
        faces: FaceData,
        decoded: Result<SourceImage>,
        on_ready: impl FnOnce(Result<()>) + 'static,
    ) {
        self.begin_load(faces, on_ready);
        self.finish_load(decoded);
    }

    fn install(&mut self, image: SourceImage, faces: FaceData) -> Result<()> {
        self.transition(PipelineState::LayingOut);
        let plan = self.plan_layout(self.canvas(), image.size(), &faces, None)?;

        self.ctx.image = Some(image);
        self.ctx.faces = faces;
        self.ctx.background = BackgroundFill::Unset;
        self.ctx.snapshot = None;
        self.commit(plan);

        self.redraw_base_image()?;
        info!(
            hex_r = self.ctx.hex.radius,
            faces = self.ctx.faces.face_count(),
            "image ready"
        );
        Ok(())
    }

    /// Canvas resize: re-resolves the layout from the current hex radius,
    /// then redraws.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let canvas = Size::new(width as f32, height as f32);
        let image = self.loaded_image_size()?;
        self.transition(PipelineState::LayingOut);
        let plan = match self.plan_layout(canvas, image, &self.ctx.faces, Some(self.ctx.hex.radius))
        {
            Ok(plan) => plan,
            Err(err) => {
                self.transition(PipelineState::Idle);
                return Err(err);
            }
        };
        if let Err(err) = self.surface.resize(width, height) {
            self.transition(PipelineState::Idle);
            return Err(err);
        }
        self.commit(plan);
        self.ctx.snapshot = None;
        self.redraw_base_image()?;
        Ok(())
    }

    /// A new face set for the image on display.
    pub fn update_faces(&mut self, faces: FaceData) -> Result<()> {
        let image = self.loaded_image_size()?;
        self.transition(PipelineState::LayingOut);
        let plan = match self.plan_layout(self.canvas(), image, &faces, None) {
            Ok(plan) => plan,
            Err(err) => {
                self.transition(PipelineState::Idle);
                return Err(err);
            }
        };
        self.ctx.faces = faces;
        self.commit(plan);
        self.redraw_base_image()?;
        Ok(())
    }

    fn loaded_image_size(&self) -> Result<Size> {
        self.ctx
            .image
            .as_ref()
            .map(SourceImage::size)
            .ok_or_else(|| Error::ImageUnavailable("no image has been loaded".into()))
    }

    /// Resolves layout, hex geometry and derived overlays without touching the
    /// surface or the context. With no `current_hex_r`, the radius is first
    /// derived from the faces under a plain cover fit.
    fn plan_layout(
        &self,
        canvas: Size,
        image: Size,
        faces: &FaceData,
        current_hex_r: Option<f32>,
    ) -> Result<LayoutPlan> {
        let bounds = faces.bounds().ok_or(Error::MissingFaceData)?;
        let face_count = faces.layout_face_count();

        let current_hex_r = match current_hex_r {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => {
                let initial = initial_layout(canvas, image)?;
                hex_radius(&bounds, initial.projection().scale, face_count)
            }
        };

        let resolved = resolve_layout(
            &LayoutRequest {
                canvas,
                image,
                face_bounds: bounds,
                face_count,
                current_hex_r,
                letterbox_small_images: self.config.layout.letterbox_small_images,
            },
            &self.config.hex.band(),
        )?;
        let layout = resolved.layout;
        let grid = GridMapper::new(layout.projection());

        let hex_r = hex_radius(&bounds, grid.projection().scale, face_count);
        let hex = HexGeometry::generate(hex_r, self.config.hex.corner_fraction);
        if hex.is_empty() {
            return Err(Error::InvalidGeometry(format!(
                "hex radius must be positive, got {hex_r}"
            )));
        }

        let eyes = faces.eyes_midpoint().unwrap_or_else(|| bounds.center());
        let eyes_midpoint = grid.to_canvas(eyes);
        let vignette = simple_gradient(
            canvas,
            eyes_midpoint,
            &GradientOptions::from(&self.config.vignette),
        );
        trace!(hex_r, eyes_x = eyes_midpoint.x, eyes_y = eyes_midpoint.y, "planned layout");

        Ok(LayoutPlan {
            layout,
            hex,
            eyes_midpoint,
            vignette,
        })
    }

    fn commit(&mut self, plan: LayoutPlan) {
        self.ctx.layout = Some(plan.layout);
        self.ctx.hex = plan.hex;
        self.ctx.eyes_midpoint = plan.eyes_midpoint;
        self.ctx.vignette = Some(plan.vignette);
    }

    fn with_drawing<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let prev = mem::replace(&mut self.ctx.is_drawing, true);
        let out = f(self);
        self.ctx.is_drawing = prev;
        out
    }

    /// Background fill and base image. With no background resolved yet, a
    /// provisional pass over the marker color is sampled first; there is never
    /// more than one such pass. Returns the number of passes drawn.
    pub fn redraw_base_image(&mut self) -> Result<usize> {
        let layout = self
            .ctx
            .layout
            .ok_or_else(|| Error::ImageUnavailable("no layout has been resolved".into()))?;
        if self.ctx.image.is_none() {
            return Err(Error::ImageUnavailable("no image has been loaded".into()));
        }
        let placement = layout.placement();

        let passes = self.with_drawing(|this| {
            let mut passes = 0;
            if this.ctx.background == BackgroundFill::Unset {
                this.transition(PipelineState::Rendering(RenderPhase::Provisional));
                this.render_pass(&placement, this.config.background.marker());
                passes += 1;

                let sampled = this.sample_background(placement.sample_at);
                if sampled == this.config.background.marker() {
                    warn!("sampled background matches the marker color; keeping it");
                }
                this.ctx.background = BackgroundFill::Resolved(sampled);
            }
            this.transition(PipelineState::Rendering(RenderPhase::Final));
            let background = this
                .ctx
                .background
                .color()
                .unwrap_or_else(|| this.config.background.fallback());
            this.render_pass(&placement, background);
            passes + 1
        });

        self.render_passes = passes;
        self.transition(PipelineState::Idle);
        Ok(passes)
    }

    fn render_pass(&mut self, placement: &ImagePlacement, background: Rgba8) {
        let canvas = self.canvas();
        let surface = &mut self.surface;
        surface.clear();
        surface.set_composite(CompositeMode::SourceOver);
        surface.set_global_alpha(1.0);
        surface.set_fill_style(background.into());
        surface.fill_rect(Rect::from_origin_size(Point::default(), canvas));
        if let Some(image) = &self.ctx.image {
            surface.draw_image(image, placement.source, placement.dest);
        }
    }

    fn sample_background(&mut self, at: Point) -> Rgba8 {
        let region = sample_square(at, self.config.background.sample_size);
        let pixels = self.surface.read_region(region);
        let color = self
            .sampler
            .sample(&pixels)
            .unwrap_or_else(|| self.config.background.fallback());
        debug!(
            x = at.x,
            y = at.y,
            r = color.red,
            g = color.green,
            b = color.blue,
            "sampled background"
        );
        color
    }

    /// Starts a fresh path around the whole canvas, clockwise from the origin.
    pub fn retrace_canvas(&mut self) {
        self.surface.begin_path();
        self.trace_canvas_rect();
    }

    fn trace_canvas_rect(&mut self) {
        let Size { width, height } = self.canvas();
        self.surface.move_to(Point::new(0.0, 0.0));
        self.surface.line_to(Point::new(width, 0.0));
        self.surface.line_to(Point::new(width, height));
        self.surface.line_to(Point::new(0.0, height));
        self.surface.line_to(Point::new(0.0, 0.0));
    }

    /// Sets the current path to the canvas with the hexagon punched out, so
    /// the next `fill` paints everything outside the clip.
    pub fn cut_out_hex(&mut self) -> Result<()> {
        if self.ctx.hex.is_empty() {
            return Err(Error::InvalidGeometry("no hex geometry to cut out".into()));
        }
        let eyes = self.ctx.eyes_midpoint;
        let commands = build_hex_path(&self.ctx.hex.vertices, eyes);

        self.surface.save();
        self.retrace_canvas();
        self.surface.translate(eyes.x, eyes.y);
        self.surface.rotate(self.config.hex.rotation_deg);
        self.surface.translate(-eyes.x, -eyes.y);
        self.surface.append(&commands);
        self.surface.close_path();
        self.surface.restore();
        Ok(())
    }

    pub fn draw_scrim(&mut self) -> Result<()> {
        self.draw_scrim_then(|_| ())
    }

    /// Darkens the canvas by `scrim_alpha × scrim.max-alpha`, then runs
    /// `then`. A zero scrim redraws the base content instead of filling.
    pub fn draw_scrim_then(&mut self, then: impl FnOnce(&mut S)) -> Result<()> {
        let scrim_alpha = self.ctx.scrim_alpha;
        if scrim_alpha <= 0.0 {
            let layout = self
                .ctx
                .layout
                .ok_or_else(|| Error::ImageUnavailable("no layout has been resolved".into()))?;
            let background = self
                .ctx
                .background
                .color()
                .unwrap_or_else(|| self.config.background.fallback());
            self.render_pass(&layout.placement(), background);
        } else {
            let canvas = self.canvas();
            let alpha = scrim_alpha * self.config.scrim.max_alpha;
            trace!(alpha, "drawing scrim");
            self.surface.save();
            self.surface.set_composite(CompositeMode::SourceOver);
            self.surface.set_global_alpha(alpha);
            self.surface.set_fill_style(BLACK.into());
            self.surface
                .fill_rect(Rect::from_origin_size(Point::default(), canvas));
            self.surface.restore();
        }
        then(&mut self.surface);
        Ok(())
    }

    /// Keeps a copy of the current surface for [`redraw_current_canvas`](Self::redraw_current_canvas).
    pub fn snapshot_canvas(&mut self) {
        self.ctx.snapshot = Some(self.surface.snapshot());
    }

    /// Repaints the whole canvas from the last snapshot.
    pub fn redraw_current_canvas(&mut self) -> Result<()> {
        let snapshot = self
            .ctx
            .snapshot
            .clone()
            .ok_or_else(|| Error::ImageUnavailable("no canvas snapshot to redraw".into()))?;
        self.surface.save();
        self.surface.set_composite(CompositeMode::SourceOver);
        self.surface.set_global_alpha(1.0);
        self.surface.set_fill_style(FillStyle::Pattern(snapshot));
        self.retrace_canvas();
        self.surface.fill();
        self.surface.restore();
        Ok(())
    }

    /// Multiplies the treatment color over the current path.
    pub fn draw_background_with_alpha(&mut self, treatment: &Treatment, alpha: f32) {
        let color = if treatment.no_emotion_scrim {
            with_alpha(NEUTRAL, NEUTRAL_SCRIM_ALPHA)
        } else {
            rgba(treatment.background)
        };
        self.surface.save();
        self.surface.set_composite(CompositeMode::Multiply);
        self.surface.set_global_alpha(alpha);
        self.surface.set_fill_style(color.into());
        self.surface.fill();
        self.surface.restore();
    }

    /// Overlays the vignette gradient on the current path.
    pub fn draw_vignette_with_alpha(&mut self, alpha: f32) {
        let Some(vignette) = self.ctx.vignette.clone() else {
            debug!("no vignette prepared; skipping");
            return;
        };
        self.surface.save();
        self.surface.set_composite(CompositeMode::Overlay);
        self.surface.set_global_alpha(alpha);
        self.surface.set_fill_style(FillStyle::Radial(vignette));
        self.surface.fill();
        self.surface.restore();
    }

    /// Fills the whole canvas with `fill`, then puts compositing back to
    /// `source-over` at alpha 1.
    pub fn apply_fill(&mut self, fill: &Fill) {
        let canvas = self.canvas();
        self.surface.set_fill_style(fill.style.clone());
        self.surface
            .set_composite(fill.composite.unwrap_or(CompositeMode::SourceOver));
        self.surface.set_global_alpha(fill.alpha.unwrap_or(1.0));
        self.surface
            .fill_rect(Rect::from_origin_size(Point::default(), canvas));
        self.surface.set_composite(CompositeMode::SourceOver);
        self.surface.set_global_alpha(1.0);
    }

    pub fn create_simple_gradient(&self, options: &GradientOptions) -> RadialGradientSpec {
        simple_gradient(self.canvas(), self.ctx.eyes_midpoint, options)
    }

    /// Debug outline of a face-space rectangle over a fresh base redraw and
    /// scrim. Returns `false` without drawing while another redraw is in
    /// progress.
    pub fn draw_rect(&mut self, rect: Rect, alpha: f32) -> Result<bool> {
        if self.ctx.is_drawing {
            debug!("redraw in progress; skipping debug rectangle");
            return Ok(false);
        }
        let grid = self
            .ctx
            .grid()
            .ok_or_else(|| Error::ImageUnavailable("no layout has been resolved".into()))?;
        let origin = grid.to_canvas(rect.origin());
        let outline = Rect::new(
            origin.x,
            origin.y,
            grid.to_canvas_len(rect.width),
            grid.to_canvas_len(rect.height),
        );
        let stroke = with_alpha(WHITE, alpha);

        self.with_drawing(|this| -> Result<()> {
            let layout = this
                .ctx
                .layout
                .ok_or_else(|| Error::ImageUnavailable("no layout has been resolved".into()))?;
            let background = this
                .ctx
                .background
                .color()
                .unwrap_or_else(|| this.config.background.fallback());
            this.render_pass(&layout.placement(), background);
            this.draw_scrim_then(|surface| {
                surface.save();
                surface.set_line_width(DEBUG_RECT_LINE_WIDTH);
                surface.set_stroke_style(stroke);
                surface.stroke_rect(outline);
                surface.restore();
            })
        })?;
        Ok(true)
    }

    /// Every overlay pass for one treatment: base image, scrim, the multiply
    /// background and vignette outside the hexagon, then the treatment's
    /// gradient.
    pub fn compose(&mut self, treatment: &Treatment) -> Result<()> {
        if self.ctx.layout.is_none() {
            return Err(Error::ImageUnavailable("no image has been loaded".into()));
        }
        self.with_drawing(|this| -> Result<()> {
            this.redraw_base_image()?;
            this.snapshot_canvas();

            this.set_scrim_alpha(treatment.scrim_alpha);
            this.draw_scrim()?;

            this.cut_out_hex()?;
            this.draw_background_with_alpha(treatment, treatment.background_alpha);
            this.draw_vignette_with_alpha(treatment.vignette_alpha);

            if let Some(gradient) = &treatment.gradient {
                let spec = this.create_simple_gradient(&GradientOptions::from(gradient));
                this.apply_fill(
                    &Fill::new(FillStyle::Radial(spec))
                        .with_composite(gradient.composite)
                        .with_alpha(gradient.alpha),
                );
            }
            Ok(())
        })?;
        info!(passes = self.render_passes, "composed treatment");
        Ok(())
    }
}

fn ensure_capabilities<S: DrawingSurface>(surface: &S) -> Result<()> {
    for mode in CompositeMode::ALL {
        if !surface.supports(mode) {
            return Err(Error::UnsupportedSurface(format!(
                "compositing mode '{mode}' is not available"
            )));
        }
    }
    Ok(())
}

fn simple_gradient(canvas: Size, eyes: Point, options: &GradientOptions) -> RadialGradientSpec {
    let center = if options.centered {
        Point::new(canvas.width / 2.0, canvas.height / 2.0)
    } else {
        eyes
    };
    RadialGradientSpec {
        center,
        radius: canvas.height * options.radius_factor,
        stops: vec![
            (options.inner_stop, options.center_color),
            (options.outer_stop, options.edge_color),
        ],
    }
}

/// A surface whose backing store is `ratio` times `width × height`.
pub fn create_hidpi_surface(width: u32, height: u32, ratio: f32) -> Result<PixmapSurface> {
    debug!(width, height, ratio, "creating hidpi surface");
    PixmapSurface::with_pixel_ratio(width, height, ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faces::FaceBounds;
    use image::RgbaImage;

    fn faces() -> FaceData {
        FaceData {
            bounds: Some(FaceBounds {
                left: 30.0,
                right: 70.0,
                top: 30.0,
                bottom: 60.0,
            }),
            ..Default::default()
        }
    }

    fn image(w: u32, h: u32) -> SourceImage {
        let img = RgbaImage::from_pixel(w, h, image::Rgba([40, 120, 60, 255]));
        SourceImage::from_rgba_image(&img).unwrap()
    }

    fn loaded() -> Compositor<PixmapSurface> {
        let surface = PixmapSurface::new(100, 100).unwrap();
        let mut c = Compositor::new(surface, Configuration::default()).unwrap();
        c.load_image(faces(), Ok(image(100, 100)), |r| r.unwrap());
        c
    }

    #[test]
    fn load_resolves_background_in_two_passes() {
        let c = loaded();
        assert_eq!(c.state(), PipelineState::Idle);
        assert_eq!(c.last_render_passes(), 2);
        let bg = c.context().background.color().unwrap();
        assert!(bg.green > 100, "{bg:?}");
        assert_eq!(c.context().hex.vertices.len(), 12);
    }

    #[test]
    fn second_redraw_reuses_the_background() {
        let mut c = loaded();
        assert_eq!(c.redraw_base_image().unwrap(), 1);
    }

    #[test]
    fn gradient_origin_follows_the_centered_flag() {
        let c = loaded();
        let eyes = c.context().eyes_midpoint;
        let spec = c.create_simple_gradient(&GradientOptions::default());
        assert_eq!(spec.center, eyes);
        assert!((spec.radius - 100.0).abs() < 1e-4);
        assert_eq!(spec.stops, vec![(0.0, WHITE), (1.0, BLACK)]);

        let spec = c.create_simple_gradient(&GradientOptions {
            centered: true,
            radius_factor: 0.5,
            ..Default::default()
        });
        assert_eq!(spec.center, Point::new(50.0, 50.0));
        assert!((spec.radius - 50.0).abs() < 1e-4);
    }

    #[test]
    fn debug_rect_is_skipped_while_drawing() {
        let mut c = loaded();
        c.set_drawing(true);
        assert!(!c.draw_rect(Rect::new(30.0, 30.0, 40.0, 30.0), 0.8).unwrap());
        c.set_drawing(false);
        assert!(c.draw_rect(Rect::new(30.0, 30.0, 40.0, 30.0), 0.8).unwrap());
        assert!(!c.is_drawing());
    }

    #[test]
    fn compose_needs_an_image() {
        let surface = PixmapSurface::new(10, 10).unwrap();
        let mut c = Compositor::new(surface, Configuration::default()).unwrap();
        assert!(matches!(
            c.compose(&Treatment::default()),
            Err(Error::ImageUnavailable(_))
        ));
    }

    #[test]
    fn hidpi_surface_uses_configured_ratio() {
        let surface = PixmapSurface::new(10, 10).unwrap();
        let config = Configuration {
            device_pixel_ratio: 2.0,
            ..Default::default()
        };
        let c = Compositor::new(surface, config).unwrap();
        let hi = c.create_hidpi_surface(10, 8, None).unwrap();
        assert_eq!((hi.pixmap().width(), hi.pixmap().height()), (20, 16));
        let lo = c.create_hidpi_surface(10, 8, Some(1.0)).unwrap();
        assert_eq!(lo.pixmap().width(), 10);
    }
}
