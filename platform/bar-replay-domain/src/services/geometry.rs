use crate::value_objects::point::ChartPoint;

/// Perpendicular distance from `point` to the infinite line through `a` and `b`.
///
/// Returns `None` when `a == b`, since no line is defined.
pub fn distance_to_line(point: ChartPoint, a: ChartPoint, b: ChartPoint) -> Option<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = dx.hypot(dy);
    if length == 0.0 || !length.is_finite() {
        return None;
    }
    let numerator = (dy * point.x - dx * point.y + b.x * a.y - b.y * a.x).abs();
    Some(numerator / length)
}

/// True when `point` lies strictly closer than `threshold` to the line through `a`, `b`.
///
/// This measures against the infinite line, so clicks beyond either endpoint
/// still match when they sit on the line's extension.
pub fn is_point_near_line(point: ChartPoint, a: ChartPoint, b: ChartPoint, threshold: f64) -> bool {
    distance_to_line(point, a, b).is_some_and(|distance| distance < threshold)
}

/// Endpoint of a trend line drawn through `p1` and `p2`: `p2 + factor * (p2 - p1)`.
pub fn extrapolate(p1: ChartPoint, p2: ChartPoint, factor: f64) -> ChartPoint {
    ChartPoint {
        x: p2.x + factor * (p2.x - p1.x),
        y: p2.y + factor * (p2.y - p1.y),
    }
}

#[cfg(test)]
mod tests {
    use super::{distance_to_line, extrapolate, is_point_near_line};
    use crate::value_objects::point::ChartPoint;

    fn p(x: f64, y: f64) -> ChartPoint {
        ChartPoint::new(x, y)
    }

    #[test]
    fn extrapolation_triples_the_drawn_span() {
        let end = extrapolate(p(0.0, 0.0), p(1.0, 1.0), 2.0);
        assert_eq!(end, p(3.0, 3.0));

        let end = extrapolate(p(10.0, 100.0), p(12.0, 96.0), 2.0);
        assert!((end.x - 16.0).abs() < 1e-12);
        assert!((end.y - 88.0).abs() < 1e-12);
    }

    #[test]
    fn near_line_uses_strict_threshold() {
        let a = p(0.0, 0.0);
        let b = p(10.0, 0.0);
        assert!(is_point_near_line(p(0.0, 0.4), a, b, 0.5));
        assert!(!is_point_near_line(p(0.0, 0.6), a, b, 0.5));
        assert!(!is_point_near_line(p(5.0, 0.5), a, b, 0.5));
    }

    #[test]
    fn distance_is_measured_to_the_infinite_line() {
        let a = p(0.0, 0.0);
        let b = p(1.0, 1.0);
        let far_beyond = p(100.0, 100.2);
        let distance = distance_to_line(far_beyond, a, b).expect("line");
        assert!(distance < 0.5);
        assert!(is_point_near_line(far_beyond, a, b, 0.5));
        assert!(is_point_near_line(p(-50.0, -50.0), a, b, 0.5));
    }

    #[test]
    fn degenerate_line_never_matches() {
        let a = p(2.0, 3.0);
        assert!(distance_to_line(a, a, a).is_none());
        assert!(!is_point_near_line(a, a, a, 1e9));
    }
}
