use palette::{LinSrgb, Srgb, Srgba};

use crate::geometry::{Point, Rect};
use crate::render::paint::Rgba8;

/// Picks a representative color for a small square of the rendered surface.
pub trait ColorSampler {
    /// `region` holds the pixels of the square, row-major. `None` means the
    /// sampler found nothing usable.
    fn sample(&mut self, region: &[Rgba8]) -> Option<Rgba8>;
}

/// Square of `size` canvas pixels with its top-left corner at `at`.
pub fn sample_square(at: Point, size: u32) -> Rect {
    let size = size.max(1) as f32;
    Rect::new(at.x, at.y, size, size)
}

/// Alpha-weighted mean in linear light, returned opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageSampler;

impl ColorSampler for AverageSampler {
    fn sample(&mut self, region: &[Rgba8]) -> Option<Rgba8> {
        average_color(region)
    }
}

pub fn average_color(pixels: &[Rgba8]) -> Option<Rgba8> {
    let mut accum = [0f64; 3];
    let mut total = 0f64;
    for px in pixels {
        let alpha = (px.alpha as f64) / 255.0;
        if alpha <= 0.0 {
            continue;
        }
        let lin: LinSrgb<f32> = Srgb::new(px.red, px.green, px.blue)
            .into_format::<f32>()
            .into_linear();
        total += alpha;
        accum[0] += lin.red as f64 * alpha;
        accum[1] += lin.green as f64 * alpha;
        accum[2] += lin.blue as f64 * alpha;
    }
    if total <= f64::EPSILON {
        return None;
    }
    let mean = LinSrgb::new(
        (accum[0] / total) as f32,
        (accum[1] / total) as f32,
        (accum[2] / total) as f32,
    );
    let srgb: Srgb<u8> = Srgb::from_linear(mean);
    Some(Srgba::new(srgb.red, srgb.green, srgb.blue, 255))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(a: Rgba8, b: Rgba8) -> bool {
        [(a.red, b.red), (a.green, b.green), (a.blue, b.blue), (a.alpha, b.alpha)]
            .iter()
            .all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    #[test]
    fn average_of_uniform_region_is_that_color() {
        let px = vec![Srgba::new(10, 20, 30, 255); 9];
        let avg = average_color(&px).unwrap();
        assert!(near(avg, Srgba::new(10, 20, 30, 255)), "{avg:?}");
    }

    #[test]
    fn transparent_pixels_are_ignored() {
        let px = vec![Srgba::new(200, 0, 0, 255), Srgba::new(0, 0, 255, 0)];
        let avg = average_color(&px).unwrap();
        assert!(near(avg, Srgba::new(200, 0, 0, 255)), "{avg:?}");
        assert_eq!(average_color(&[Srgba::new(1, 2, 3, 0)]), None);
        assert_eq!(AverageSampler.sample(&[]), None);
    }

    #[test]
    fn square_hangs_below_and_right_of_the_point() {
        let r = sample_square(Point::new(50.0, 20.0), 10);
        assert_eq!(r, Rect::new(50.0, 20.0, 10.0, 10.0));
        assert_eq!(sample_square(Point::default(), 0).width, 1.0);
    }
}
