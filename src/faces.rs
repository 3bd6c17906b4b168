//! Face-detection output as consumed by the compositor.
//!
//! All coordinates here are face-space: pixels of the source image the
//! detector ran on. Nothing in this module knows about the canvas.

use serde::Deserialize;

use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FaceBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl FaceBounds {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// Bottom-left and top-right corners; their distance drives the hex radius.
    pub fn diagonal(&self) -> (Point, Point) {
        (
            Point::new(self.left, self.bottom),
            Point::new(self.right, self.top),
        )
    }

    pub fn union(&self, other: &FaceBounds) -> FaceBounds {
        FaceBounds {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.left, self.right, self.top, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DetectedFace {
    pub bounds: FaceBounds,
    #[serde(default)]
    pub eyes_midpoint: Option<Point>,
}

/// Everything the detector reported for one image.
///
/// Explicit `bounds`/`eyes-midpoint` win over values aggregated from `faces`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FaceData {
    pub faces: Vec<DetectedFace>,
    pub bounds: Option<FaceBounds>,
    pub eyes_midpoint: Option<Point>,
}

impl FaceData {
    pub fn from_faces(faces: Vec<DetectedFace>) -> Self {
        Self {
            faces,
            ..Default::default()
        }
    }

    pub fn bounds(&self) -> Option<FaceBounds> {
        self.bounds.or_else(|| {
            self.faces
                .iter()
                .map(|f| f.bounds)
                .reduce(|acc, b| acc.union(&b))
        })
    }

    pub fn eyes_midpoint(&self) -> Option<Point> {
        if let Some(p) = self.eyes_midpoint {
            return Some(p);
        }
        let eyes: Vec<Point> = self.faces.iter().filter_map(|f| f.eyes_midpoint).collect();
        if eyes.is_empty() {
            return self.bounds().map(|b| b.center());
        }
        let n = eyes.len() as f32;
        let sum = eyes
            .iter()
            .fold(Point::default(), |acc, p| acc.offset(p.x, p.y));
        Some(Point::new(sum.x / n, sum.y / n))
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Face count used by the layout math; zero faces behave like one.
    pub fn layout_face_count(&self) -> usize {
        self.faces.len().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(left: f32, right: f32, top: f32, bottom: f32, eyes: Option<Point>) -> DetectedFace {
        DetectedFace {
            bounds: FaceBounds {
                left,
                right,
                top,
                bottom,
            },
            eyes_midpoint: eyes,
        }
    }

    #[test]
    fn bounds_union_covers_all_faces() {
        let data = FaceData::from_faces(vec![
            face(10.0, 50.0, 20.0, 70.0, None),
            face(40.0, 90.0, 5.0, 60.0, None),
        ]);
        let b = data.bounds().unwrap();
        assert_eq!((b.left, b.right, b.top, b.bottom), (10.0, 90.0, 5.0, 70.0));
    }

    #[test]
    fn eyes_midpoint_averages_faces_then_falls_back_to_center() {
        let data = FaceData::from_faces(vec![
            face(0.0, 10.0, 0.0, 10.0, Some(Point::new(2.0, 4.0))),
            face(0.0, 10.0, 0.0, 10.0, Some(Point::new(6.0, 8.0))),
        ]);
        assert_eq!(data.eyes_midpoint(), Some(Point::new(4.0, 6.0)));

        let data = FaceData::from_faces(vec![face(0.0, 10.0, 0.0, 20.0, None)]);
        assert_eq!(data.eyes_midpoint(), Some(Point::new(5.0, 10.0)));
    }

    #[test]
    fn zero_faces_count_as_one_for_layout() {
        let data = FaceData::default();
        assert_eq!(data.face_count(), 0);
        assert_eq!(data.layout_face_count(), 1);
        assert!(data.bounds().is_none());
    }

    #[test]
    fn parses_kebab_case_json() {
        let json = r#"{
            "faces": [{"bounds": {"left": 1, "right": 3, "top": 2, "bottom": 5}, "eyes-midpoint": {"x": 2, "y": 3}}]
        }"#;
        let data: FaceData = serde_json::from_str(json).unwrap();
        assert_eq!(data.face_count(), 1);
        assert_eq!(data.eyes_midpoint(), Some(Point::new(2.0, 3.0)));
    }
}
