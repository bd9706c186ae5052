use crate::render::{PathCommand, Point, Rect};

/// One-dimensional cubic Bézier.
pub fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Horizontal extent of the curved middle section of every flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSpan {
    pub x_start: f64,
    pub x_end: f64,
    pub curvature: f64,
}

impl CurveSpan {
    /// S-curve from `from` to `to` with both control points kept at the
    /// endpoint heights, pulled inward by `curvature` of the horizontal span.
    pub fn curve_to(&self, from: Point, to: Point) -> PathCommand {
        let dx = to.x - from.x;
        PathCommand::CubicTo {
            c1: Point::new(from.x + dx * self.curvature, from.y),
            c2: Point::new(to.x - dx * self.curvature, to.y),
            to,
        }
    }
}

/// Closed outline of one flow band: straight out of the intake slice
/// `[top, bottom]` at `entry_x`, curved into the full height of `dest`,
/// and back along the mirrored lower edge.
pub fn flow_outline(entry_x: f64, top: f64, bottom: f64, dest: Rect, curve: CurveSpan) -> Vec<PathCommand> {
    let upper_curve_start = Point::new(curve.x_start, top);
    let upper_curve_end = Point::new(curve.x_end, dest.y);
    let lower_curve_start = Point::new(curve.x_end, dest.bottom());
    let lower_curve_end = Point::new(curve.x_start, bottom);

    vec![
        PathCommand::MoveTo(Point::new(entry_x, top)),
        PathCommand::LineTo(upper_curve_start),
        curve.curve_to(upper_curve_start, upper_curve_end),
        PathCommand::LineTo(Point::new(dest.x, dest.y)),
        PathCommand::LineTo(Point::new(dest.x, dest.bottom())),
        PathCommand::LineTo(lower_curve_start),
        curve.curve_to(lower_curve_start, lower_curve_end),
        PathCommand::LineTo(Point::new(entry_x, bottom)),
        PathCommand::Close,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bezier_endpoints() {
        assert_eq!(cubic_bezier(10.0, 10.0, 90.0, 90.0, 0.0), 10.0);
        assert_eq!(cubic_bezier(10.0, 10.0, 90.0, 90.0, 1.0), 90.0);
        assert!((cubic_bezier(10.0, 10.0, 90.0, 90.0, 0.5) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_flow_outline_shape() {
        let curve = CurveSpan {
            x_start: 132.0,
            x_end: 468.0,
            curvature: 0.5,
        };
        let dest = Rect {
            x: 557.6,
            y: 0.0,
            width: 22.4,
            height: 100.0,
        };
        let outline = flow_outline(42.4, 99.0, 150.0, dest, curve);

        assert_eq!(outline.len(), 9);
        assert_eq!(outline[0], PathCommand::MoveTo(Point::new(42.4, 99.0)));
        assert_eq!(outline[8], PathCommand::Close);
        match outline[2] {
            PathCommand::CubicTo { c1, c2, to } => {
                assert_eq!(c1, Point::new(300.0, 99.0));
                assert_eq!(c2, Point::new(300.0, 0.0));
                assert_eq!(to, Point::new(468.0, 0.0));
            }
            other => panic!("expected curve, got {other:?}"),
        }
        match outline[6] {
            PathCommand::CubicTo { c1, c2, to } => {
                assert_eq!(c1, Point::new(300.0, 100.0));
                assert_eq!(c2, Point::new(300.0, 150.0));
                assert_eq!(to, Point::new(132.0, 150.0));
            }
            other => panic!("expected curve, got {other:?}"),
        }
        assert_eq!(outline[7], PathCommand::LineTo(Point::new(42.4, 150.0)));
    }
}
