//! Polygon and coordinate helpers.
//!
//! Zone polygons are stored in relative [0,1]x[0,1] coordinates so they
//! survive resolution changes. Every geometric test runs on absolute pixel
//! coordinates resolved against the current frame dimensions.

/// Convert relative vertices to absolute pixel coordinates.
pub fn to_absolute(vertices: &[[f32; 2]], width: u32, height: u32) -> Vec<(f32, f32)> {
    vertices
        .iter()
        .map(|v| (v[0] * width as f32, v[1] * height as f32))
        .collect()
}

/// Convert an absolute pixel coordinate back to relative form.
pub fn to_relative(x: f32, y: f32, width: u32, height: u32) -> [f32; 2] {
    [x / width as f32, y / height as f32]
}

/// Clamp an absolute coordinate to the frame interior.
pub fn clamp_to_frame(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    (
        x.clamp(0.0, (width.saturating_sub(1)) as f32),
        y.clamp(0.0, (height.saturating_sub(1)) as f32),
    )
}

/// Ray-casting point-in-polygon test. Points on an edge count as inside.
pub fn point_in_polygon(point: (f32, f32), polygon: &[(f32, f32)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let (px, py) = point;

    // Boundary check first: the ray-cast below treats edges inconsistently.
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        if on_segment((px, py), polygon[j], polygon[i]) {
            return true;
        }
        j = i;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// True when `p` lies on the segment `a`-`b` (within a small tolerance).
fn on_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> bool {
    const EPS: f32 = 1e-4;
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > EPS * ((b.0 - a.0).abs() + (b.1 - a.1).abs()).max(1.0) {
        return false;
    }
    p.0 >= a.0.min(b.0) - EPS
        && p.0 <= a.0.max(b.0) + EPS
        && p.1 >= a.1.min(b.1) - EPS
        && p.1 <= a.1.max(b.1) + EPS
}

/// Euclidean distance between two points.
pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<(f32, f32)> {
        vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
    }

    #[test]
    fn interior_point_is_inside() {
        assert!(point_in_polygon((5.0, 5.0), &unit_square()));
    }

    #[test]
    fn exterior_point_is_outside() {
        assert!(!point_in_polygon((15.0, 5.0), &unit_square()));
        assert!(!point_in_polygon((-1.0, 5.0), &unit_square()));
    }

    #[test]
    fn boundary_counts_as_inside() {
        let poly = unit_square();
        assert!(point_in_polygon((10.0, 5.0), &poly));
        assert!(point_in_polygon((0.0, 0.0), &poly));
        assert!(point_in_polygon((5.0, 0.0), &poly));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = vec![(0.0, 0.0), (10.0, 10.0)];
        assert!(!point_in_polygon((5.0, 5.0), &line));
    }

    #[test]
    fn concave_polygon() {
        // Arrow shape with a notch at the right edge.
        let poly = vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (5.0, 5.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ];
        assert!(point_in_polygon((2.0, 5.0), &poly));
        assert!(!point_in_polygon((9.0, 5.0), &poly));
    }

    #[test]
    fn containment_is_resolution_independent() {
        let rel = [[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]];
        for &(w, h) in &[(640u32, 480u32), (1920, 1080)] {
            let poly = to_absolute(&rel, w, h);
            // The same real-world point, scaled proportionally.
            let inside = (0.5 * w as f32, 0.5 * h as f32);
            let outside = (0.1 * w as f32, 0.1 * h as f32);
            assert!(point_in_polygon(inside, &poly), "{}x{}", w, h);
            assert!(!point_in_polygon(outside, &poly), "{}x{}", w, h);
        }
    }

    #[test]
    fn relative_roundtrip() {
        let rel = to_relative(320.0, 240.0, 640, 480);
        assert!((rel[0] - 0.5).abs() < 1e-6);
        assert!((rel[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn clamping_stays_in_frame() {
        assert_eq!(clamp_to_frame(-5.0, 1000.0, 640, 480), (0.0, 479.0));
        assert_eq!(clamp_to_frame(100.0, 100.0, 640, 480), (100.0, 100.0));
    }
}
