//! Rounded-hexagon clip path.
//!
//! The vertex list from [`rounded_hexagon`] alternates corners and edge
//! points. Corners become straight segments; each edge point is replaced by a
//! 60 degree arc whose centre is nudged off the pair midpoint by
//! [`CORNER_BIASES`].

use crate::geometry::{Point, distance, normalize_degrees, rounded_hexagon};

/// Offset of an arc centre from the corner-pair midpoint, in units of the arc
/// radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerBias {
    pub x_bias: f32,
    pub y_bias: f32,
}

const THIRD_SQRT_3: f32 = 0.577_350_26;
const QUARTER_SQRT_2: f32 = 0.353_553_4;

/// One entry per hexagon corner, keyed by `index / 2`.
pub const CORNER_BIASES: [CornerBias; 6] = [
    CornerBias {
        x_bias: -THIRD_SQRT_3,
        y_bias: 0.0,
    },
    CornerBias {
        x_bias: -QUARTER_SQRT_2,
        y_bias: 0.5,
    },
    CornerBias {
        x_bias: THIRD_SQRT_3,
        y_bias: 0.5,
    },
    CornerBias {
        x_bias: THIRD_SQRT_3,
        y_bias: 0.0,
    },
    CornerBias {
        x_bias: QUARTER_SQRT_2,
        y_bias: -0.5,
    },
    CornerBias {
        x_bias: -THIRD_SQRT_3,
        y_bias: -0.5,
    },
];

/// Immediate-mode path instruction, angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    Arc {
        center: Point,
        radius: f32,
        start_deg: f32,
        end_deg: f32,
        anticlockwise: bool,
    },
    Close,
}

impl PathCommand {
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        match self {
            Self::MoveTo(p) => Self::MoveTo(p.offset(dx, dy)),
            Self::LineTo(p) => Self::LineTo(p.offset(dx, dy)),
            Self::Arc {
                center,
                radius,
                start_deg,
                end_deg,
                anticlockwise,
            } => Self::Arc {
                center: center.offset(dx, dy),
                radius,
                start_deg,
                end_deg,
                anticlockwise,
            },
            Self::Close => Self::Close,
        }
    }
}

/// Start and end angle of the arc rounding corner `k`.
pub fn corner_sweep(k: usize) -> (f32, f32) {
    let start = normalize_degrees(30.0 - 60.0 * k as f32);
    let end = normalize_degrees(start - 60.0);
    (start, end)
}

/// Radius and vertex list of the current hexagon, in canvas pixels around the
/// origin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HexGeometry {
    pub radius: f32,
    pub vertices: Vec<Point>,
}

impl HexGeometry {
    pub fn generate(radius: f32, corner_fraction: f32) -> Self {
        Self {
            radius,
            vertices: rounded_hexagon(radius, radius * corner_fraction),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// The hexagon outline around the origin.
pub fn hex_outline(vertices: &[Point]) -> Vec<PathCommand> {
    let mut commands = Vec::with_capacity(vertices.len());
    for (i, vertex) in vertices.iter().enumerate() {
        if i == 0 {
            commands.push(PathCommand::MoveTo(*vertex));
            continue;
        }
        if i % 2 == 0 {
            commands.push(PathCommand::LineTo(*vertex));
            continue;
        }

        let prev = vertices[i - 1];
        let radius = distance(prev, *vertex) / 2.0;
        let k = (i / 2) % CORNER_BIASES.len();
        let bias = CORNER_BIASES[k];
        let center = prev
            .midpoint(*vertex)
            .offset(radius * bias.x_bias, radius * bias.y_bias);
        let (start_deg, end_deg) = corner_sweep(k);
        commands.push(PathCommand::Arc {
            center,
            radius,
            start_deg,
            end_deg,
            anticlockwise: true,
        });
    }
    commands
}

/// The hexagon outline with its origin moved to `center`.
pub fn build_hex_path(vertices: &[Point], center: Point) -> Vec<PathCommand> {
    hex_outline(vertices)
        .into_iter()
        .map(|cmd| cmd.translated(center.x, center.y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeps_step_backwards_by_sixty_degrees() {
        let expected = [(30.0, 330.0), (330.0, 270.0), (270.0, 210.0), (210.0, 150.0), (150.0, 90.0), (90.0, 30.0)];
        for (k, want) in expected.iter().enumerate() {
            assert_eq!(corner_sweep(k), *want);
        }
    }

    #[test]
    fn bias_table_is_symmetric_in_y() {
        let y_sum: f32 = CORNER_BIASES.iter().map(|b| b.y_bias).sum();
        assert!(y_sum.abs() < 1e-6);
        assert_eq!(CORNER_BIASES[0].y_bias, 0.0);
        assert_eq!(CORNER_BIASES[3].y_bias, 0.0);
    }

    #[test]
    fn outline_alternates_lines_and_arcs() {
        let hex = HexGeometry::generate(120.0, 1.0 / 6.0);
        let commands = hex_outline(&hex.vertices);
        assert_eq!(commands.len(), 12);
        assert!(matches!(commands[0], PathCommand::MoveTo(_)));
        for (i, cmd) in commands.iter().enumerate().skip(1) {
            if i % 2 == 0 {
                assert!(matches!(cmd, PathCommand::LineTo(_)), "index {i}");
            } else {
                match cmd {
                    PathCommand::Arc {
                        radius,
                        anticlockwise,
                        ..
                    } => {
                        assert!((radius - 10.0).abs() < 1e-3);
                        assert!(*anticlockwise);
                    }
                    other => panic!("expected arc at {i}, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn arc_centre_applies_bias() {
        let hex = HexGeometry::generate(60.0, 1.0 / 6.0);
        let commands = hex_outline(&hex.vertices);
        let PathCommand::Arc { center, radius, .. } = commands[3] else {
            panic!("expected arc");
        };
        let mid = hex.vertices[2].midpoint(hex.vertices[3]);
        assert!((center.x - (mid.x - radius * QUARTER_SQRT_2)).abs() < 1e-4);
        assert!((center.y - (mid.y + radius * 0.5)).abs() < 1e-4);
    }

    #[test]
    fn path_is_translated_to_center() {
        let hex = HexGeometry::generate(30.0, 1.0 / 6.0);
        let local = hex_outline(&hex.vertices);
        let moved = build_hex_path(&hex.vertices, Point::new(200.0, 150.0));
        let (PathCommand::MoveTo(a), PathCommand::MoveTo(b)) = (local[0], moved[0]) else {
            panic!("expected move commands");
        };
        assert_eq!(b, Point::new(a.x + 200.0, a.y + 150.0));
    }

    #[test]
    fn empty_vertices_produce_no_path() {
        assert!(build_hex_path(&[], Point::default()).is_empty());
    }
}
