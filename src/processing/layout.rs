//! Scale and crop resolution: fits the source image into the canvas so the
//! face hexagon lands inside the configured radius band.

use tracing::debug;

use crate::error::{Error, Result};
use crate::faces::FaceBounds;
use crate::geometry::{Point, Rect, Size, distance};
use crate::grid::Projection;

const SQRT_3: f32 = 1.732_050_8;

/// Hex radius limits, as fractions of the canvas height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexBand {
    pub min_fraction: f32,
    pub max_fraction: f32,
    /// Largest single-step radius change, as a fraction of the current radius.
    pub max_diff_fraction: f32,
}

impl Default for HexBand {
    fn default() -> Self {
        Self {
            min_fraction: 0.15,
            max_fraction: 0.35,
            max_diff_fraction: 0.25,
        }
    }
}

impl HexBand {
    pub fn scaled(&self, canvas_height: f32) -> (f32, f32) {
        (
            self.min_fraction * canvas_height,
            self.max_fraction * canvas_height,
        )
    }
}

/// Which of the two drawing branches a layout pass selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutBranch {
    /// The crop fits inside the image; the crop is stretched over the canvas.
    Cropped,
    /// Even with its width clamped to the image, the crop is taller than the
    /// image; the image spans the canvas width and sits on its bottom edge.
    Letterboxed,
}

/// Derived placement state, recomputed on every layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub canvas: Size,
    pub image: Size,
    /// Image pixels per canvas pixel when the image covers the canvas.
    pub image_scale: f32,
    /// `sub_rect.width / canvas.width`.
    pub resized_image_scale: f32,
    /// Top-left of `sub_rect` in image pixels.
    pub offset: Point,
    pub sub_rect: Size,
    /// The crop the target radius asked for, before clamping to the image.
    pub requested_sub_rect: Size,
    /// Image-space point that maps onto the canvas origin. Above the image's
    /// top edge when letterboxed.
    pub resized_image_offset: Point,
    pub branch: LayoutBranch,
}

/// Source and destination rectangles for blitting the base image, plus the
/// canvas point sampled for the background fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub source: Rect,
    pub dest: Rect,
    pub sample_at: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRequest {
    pub canvas: Size,
    pub image: Size,
    pub face_bounds: FaceBounds,
    pub face_count: usize,
    pub current_hex_r: f32,
    pub letterbox_small_images: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLayout {
    pub layout: LayoutState,
    pub target_hex_r: f32,
}

fn validate_dimensions(canvas: Size, image: Size) -> Result<()> {
    if !canvas.is_positive() {
        return Err(Error::InvalidGeometry(format!(
            "canvas must have positive dimensions, got {}x{}",
            canvas.width, canvas.height
        )));
    }
    if !image.is_positive() {
        return Err(Error::InvalidGeometry(format!(
            "image must have positive dimensions, got {}x{}",
            image.width, image.height
        )));
    }
    Ok(())
}

/// Image pixels per canvas pixel for a cover fit: the tighter of the two
/// canvas/image ratios decides.
pub fn image_cover_scale(canvas: Size, image: Size) -> Result<f32> {
    validate_dimensions(canvas, image)?;
    let widths_ratio = canvas.width / image.width;
    let heights_ratio = canvas.height / image.height;
    Ok(1.0 / widths_ratio.max(heights_ratio))
}

/// Largest canvas-aspect rectangle of the image at the cover scale.
pub fn cover_sub_rect(canvas: Size, image: Size) -> Result<Size> {
    let scale = image_cover_scale(canvas, image)?;
    Ok(canvas.scaled(scale))
}

/// Placement used before the first layout pass: plain centred cover fit.
pub fn initial_layout(canvas: Size, image: Size) -> Result<LayoutState> {
    let image_scale = image_cover_scale(canvas, image)?;
    let sub_rect = canvas.scaled(image_scale);
    let offset = centered_offset(image, sub_rect);
    Ok(LayoutState {
        canvas,
        image,
        image_scale,
        resized_image_scale: sub_rect.width / canvas.width,
        offset,
        sub_rect,
        requested_sub_rect: sub_rect,
        resized_image_offset: offset,
        branch: LayoutBranch::Cropped,
    })
}

/// Next hex radius: pulled towards the band, never moving by more than
/// `max_diff_fraction` of the current radius in one step.
pub fn target_hex_radius(current: f32, canvas_height: f32, band: &HexBand) -> f32 {
    let (scaled_min, scaled_max) = band.scaled(canvas_height);
    let max_step = current * band.max_diff_fraction;
    if current < scaled_min {
        if scaled_min - current > max_step {
            current + max_step
        } else {
            scaled_min
        }
    } else if current > scaled_max {
        if current - scaled_max > max_step {
            current - max_step
        } else {
            scaled_max
        }
    } else {
        current
    }
}

/// Face-bounds width that yields a hexagon of `target_hex_r`.
///
/// A single face uses half the reference span of a group.
pub fn target_face_span(target_hex_r: f32, face_count: usize) -> f32 {
    let mut span = target_hex_r;
    if face_count.max(1) == 1 {
        span /= 2.0;
    }
    span * SQRT_3
}

/// Hex radius in canvas pixels for the given face bounds and projection scale.
pub fn hex_radius(bounds: &FaceBounds, projection_scale: f32, face_count: usize) -> f32 {
    let (bottom_left, top_right) = bounds.diagonal();
    let mut r = distance(bottom_left, top_right) / projection_scale / SQRT_3;
    if face_count.max(1) == 1 {
        r *= 1.5;
    }
    r
}

pub fn resolve_layout(request: &LayoutRequest, band: &HexBand) -> Result<ResolvedLayout> {
    let LayoutRequest {
        canvas,
        image,
        face_bounds,
        face_count,
        current_hex_r,
        letterbox_small_images,
    } = *request;

    validate_dimensions(canvas, image)?;
    if !face_bounds.is_valid() {
        return Err(Error::InvalidGeometry(format!(
            "face bounds must have positive width, got {face_bounds:?}"
        )));
    }
    if !current_hex_r.is_finite() || current_hex_r <= 0.0 {
        return Err(Error::InvalidGeometry(format!(
            "hex radius must be positive, got {current_hex_r}"
        )));
    }

    let target_hex_r = target_hex_radius(current_hex_r, canvas.height, band);
    let target_span = target_face_span(target_hex_r, face_count);
    let new_image_scale = face_bounds.width() / target_span;

    let requested = canvas.scaled(new_image_scale);
    // the canvas frame in image pixels, width clamped to the image
    let mut frame = requested;
    if image.width < frame.width {
        frame.width = image.width;
        frame.height = canvas.aspect() * frame.width;
    }

    let branch = if letterbox_small_images && frame.height > image.height {
        LayoutBranch::Letterboxed
    } else {
        LayoutBranch::Cropped
    };
    let (sub_rect, offset, resized_image_offset) = match branch {
        LayoutBranch::Cropped => {
            let mut sub_rect = frame;
            if image.height < sub_rect.height {
                sub_rect.height = image.height;
                sub_rect.width = sub_rect.height / canvas.aspect();
            }
            let offset = centered_offset(image, sub_rect);
            (sub_rect, offset, offset)
        }
        LayoutBranch::Letterboxed => {
            // full image height, bottom-anchored; only the frame width is drawn
            let sub_rect = Size::new(frame.width, image.height);
            let offset = centered_offset(image, sub_rect);
            let origin = Point::new(offset.x, -(frame.height - image.height));
            (sub_rect, offset, origin)
        }
    };

    let layout = LayoutState {
        canvas,
        image,
        image_scale: image_cover_scale(canvas, image)?,
        resized_image_scale: sub_rect.width / canvas.width,
        offset,
        sub_rect,
        requested_sub_rect: requested,
        resized_image_offset,
        branch,
    };

    debug!(
        target_hex_r,
        image_scale = layout.image_scale,
        resized_image_scale = layout.resized_image_scale,
        sub_w = sub_rect.width,
        sub_h = sub_rect.height,
        ?branch,
        "resolved layout"
    );

    Ok(ResolvedLayout {
        layout,
        target_hex_r,
    })
}

fn centered_offset(image: Size, sub_rect: Size) -> Point {
    Point::new(
        (image.width - sub_rect.width) / 2.0,
        (image.height - sub_rect.height) / 2.0,
    )
}

impl LayoutState {
    /// Mapping between image pixels and canvas pixels for this layout.
    pub fn projection(&self) -> Projection {
        Projection {
            scale: self.resized_image_scale,
            origin: self.resized_image_offset,
        }
    }

    pub fn placement(&self) -> ImagePlacement {
        let source = Rect::from_origin_size(self.offset, self.sub_rect);
        match self.branch {
            LayoutBranch::Cropped => {
                let sample_offset = self.image_scale / self.resized_image_scale;
                ImagePlacement {
                    source,
                    dest: Rect::from_origin_size(Point::default(), self.canvas),
                    sample_at: Point::new(
                        (self.canvas.width / 2.0).min(self.offset.x.abs()),
                        -self.offset.y.min(0.0) * sample_offset,
                    ),
                }
            }
            LayoutBranch::Letterboxed => {
                let dy = -self.resized_image_offset.y / self.resized_image_scale;
                ImagePlacement {
                    source,
                    dest: Rect::new(0.0, dy, self.canvas.width, self.canvas.height - dy),
                    sample_at: Point::new(self.canvas.width / 2.0, dy),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> FaceBounds {
        FaceBounds {
            left: 300.0,
            right: 500.0,
            top: 200.0,
            bottom: 350.0,
        }
    }

    #[test]
    fn cover_scale_uses_tighter_ratio() {
        let s = image_cover_scale(Size::new(400.0, 400.0), Size::new(800.0, 600.0)).unwrap();
        assert!((s - 1.5).abs() < 1e-5);
        let sub = cover_sub_rect(Size::new(400.0, 400.0), Size::new(800.0, 600.0)).unwrap();
        assert!((sub.width - 600.0).abs() < 1e-3 && (sub.height - 600.0).abs() < 1e-3);
    }

    #[test]
    fn growth_is_limited_per_step() {
        let band = HexBand::default();
        // far below the band: grow by max_diff only
        let r = target_hex_radius(10.0, 400.0, &band);
        assert!((r - 12.5).abs() < 1e-4);
        // just below: snap to the minimum
        let r = target_hex_radius(55.0, 400.0, &band);
        assert!((r - 60.0).abs() < 1e-4);
        // far above: shrink by max_diff only
        let r = target_hex_radius(400.0, 400.0, &band);
        assert!((r - 300.0).abs() < 1e-4);
        // just above: snap to the maximum
        let r = target_hex_radius(150.0, 400.0, &band);
        assert!((r - 140.0).abs() < 1e-4);
        // inside: unchanged
        assert_eq!(target_hex_radius(100.0, 400.0, &band), 100.0);
    }

    #[test]
    fn single_face_span_is_half_of_group_span() {
        let single = target_face_span(90.0, 1);
        let group = target_face_span(90.0, 3);
        assert!((group - 2.0 * single).abs() < 1e-4);
        assert_eq!(target_face_span(90.0, 0), single);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let req = LayoutRequest {
            canvas: Size::new(0.0, 400.0),
            image: Size::new(800.0, 600.0),
            face_bounds: bounds(),
            face_count: 2,
            current_hex_r: 90.0,
            letterbox_small_images: true,
        };
        assert!(matches!(
            resolve_layout(&req, &HexBand::default()),
            Err(Error::InvalidGeometry(_))
        ));
        let req = LayoutRequest {
            canvas: Size::new(400.0, 400.0),
            image: Size::new(800.0, f32::NAN),
            ..req
        };
        assert!(matches!(
            resolve_layout(&req, &HexBand::default()),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn tall_crop_switches_to_letterbox() {
        let req = LayoutRequest {
            canvas: Size::new(400.0, 400.0),
            image: Size::new(300.0, 200.0),
            face_bounds: FaceBounds {
                left: 50.0,
                right: 250.0,
                top: 20.0,
                bottom: 180.0,
            },
            face_count: 2,
            current_hex_r: 20.0,
            letterbox_small_images: true,
        };
        let resolved = resolve_layout(&req, &HexBand::default()).unwrap();
        let layout = resolved.layout;
        assert_eq!(layout.branch, LayoutBranch::Letterboxed);
        // width clamped to the image, the whole image height drawn
        assert!((layout.sub_rect.width - 300.0).abs() < 1e-3);
        assert!((layout.sub_rect.height - 200.0).abs() < 1e-3);
        assert!((layout.resized_image_scale - 0.75).abs() < 1e-5);
        assert_eq!(layout.projection().scale, layout.resized_image_scale);

        let placement = layout.placement();
        assert_eq!(placement.source, Rect::new(0.0, 0.0, 300.0, 200.0));
        assert!(placement.dest.x.abs() < 1e-3);
        assert!((placement.dest.width - 400.0).abs() < 1e-3);
        assert!((placement.dest.y - 400.0 / 3.0).abs() < 1e-2);
        assert!((placement.dest.y + placement.dest.height - 400.0).abs() < 1e-3);
        assert_eq!(placement.sample_at, Point::new(200.0, placement.dest.y));

        // the image's bottom-left corner lands on the canvas's
        let grid = crate::grid::GridMapper::new(layout.projection());
        let corner = grid.to_canvas(Point::new(0.0, 200.0));
        assert!(corner.x.abs() < 1e-3 && (corner.y - 400.0).abs() < 1e-2);

        let cropped = resolve_layout(
            &LayoutRequest {
                letterbox_small_images: false,
                ..req
            },
            &HexBand::default(),
        )
        .unwrap();
        assert_eq!(cropped.layout.branch, LayoutBranch::Cropped);
        assert!(cropped.layout.sub_rect.height <= 200.0 + 1e-3);
        assert!(cropped.layout.sub_rect.width <= 300.0 + 1e-3);
    }

    #[test]
    fn wide_only_overflow_stays_cropped() {
        // clamping the width alone already fits the crop inside the image
        let req = LayoutRequest {
            canvas: Size::new(400.0, 400.0),
            image: Size::new(300.0, 600.0),
            face_bounds: FaceBounds {
                left: 50.0,
                right: 250.0,
                top: 100.0,
                bottom: 300.0,
            },
            face_count: 2,
            current_hex_r: 20.0,
            letterbox_small_images: true,
        };
        let layout = resolve_layout(&req, &HexBand::default()).unwrap().layout;
        assert_eq!(layout.branch, LayoutBranch::Cropped);
        assert!((layout.sub_rect.width - 300.0).abs() < 1e-3);
        assert!((layout.sub_rect.height - 300.0).abs() < 1e-3);
        assert_eq!(layout.placement().dest, Rect::new(0.0, 0.0, 400.0, 400.0));
    }
}
