// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classification of cubics by their effective degree.

use crate::common::{solve_quadratic, ULPS_ABS_EPSILON};
use crate::{CubicBez, Line, ParamCurve, ParamCurveDeriv, Point, QuadBez, Vec2};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Tolerance for collinearity and for the quadratic test, relative to the
/// larger side of the control box.
const REDUCE_EPSILON: f64 = 1e-9;

/// Whether [`reduce_order`] may report a quadratic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadraticMode {
    /// Cubics that are exactly quadratics are reduced to [`ReducedCurve::Quad`].
    Allow,
    /// Cubics that are exactly quadratics stay [`ReducedCurve::Cubic`], for
    /// callers that only handle points, lines and cubics.
    Forbid,
}

/// A cubic rewritten with the fewest control points that trace it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReducedCurve {
    /// All control points coincide (order 1).
    Point(Point),
    /// All control points are collinear (order 2).
    ///
    /// The line spans the extent the curve actually traces, which may
    /// reach past the end points when the control points overshoot.
    Line(Line),
    /// The cubic is a raised quadratic (order 3).
    Quad(QuadBez),
    /// A true cubic (order 4).
    Cubic(CubicBez),
}

impl ReducedCurve {
    /// The number of control points of the reduced curve: 1 for a point up
    /// to 4 for a cubic.
    pub fn order(&self) -> u8 {
        match self {
            ReducedCurve::Point(_) => 1,
            ReducedCurve::Line(_) => 2,
            ReducedCurve::Quad(_) => 3,
            ReducedCurve::Cubic(_) => 4,
        }
    }
}

/// Determine the effective degree of a cubic.
///
/// A cubic whose control points all lie within rounding noise of each other
/// is a point. One whose control points are collinear, within a tolerance
/// proportional to its size, is a line. One whose third derivative
/// vanishes is a quadratic, unless `mode` forbids quadratics. Anything else
/// is a cubic.
pub fn reduce_order(c: &CubicBez, mode: QuadraticMode) -> ReducedCurve {
    let extent = c.control_box().max_side();
    if extent <= c.coord_scale() * ULPS_ABS_EPSILON {
        return ReducedCurve::Point(c.p0);
    }
    let tol = extent * REDUCE_EPSILON;

    let pts = [c.p0, c.p1, c.p2, c.p3];
    let mut base = (0, 3);
    let mut best = -1.0;
    for i in 0..4 {
        for j in i + 1..4 {
            let d = pts[i].distance_squared(pts[j]);
            if d > best {
                best = d;
                base = (i, j);
            }
        }
    }
    let origin = pts[base.0];
    let dir = pts[base.1] - origin;
    let len = dir.hypot();
    if pts.iter().all(|&p| (p - origin).cross(dir).abs() <= tol * len) {
        return ReducedCurve::Line(traced_line(c, origin, dir));
    }

    if mode == QuadraticMode::Allow {
        // Both control points extended by half again meet at the quadratic's
        // control point exactly when the third difference vanishes.
        let side_a = c.p0 + 1.5 * (c.p1 - c.p0);
        let side_b = c.p3 + 1.5 * (c.p2 - c.p3);
        if side_a.distance(side_b) <= tol {
            return ReducedCurve::Quad(QuadBez::new(c.p0, side_a.midpoint(side_b), c.p3));
        }
    }
    ReducedCurve::Cubic(*c)
}

/// The segment a collinear cubic sweeps, oriented along its travel from
/// start to end.
fn traced_line(c: &CubicBez, origin: Point, dir: Vec2) -> Line {
    let proj = |t: f64| (c.eval(t) - origin).dot(dir);
    let d = c.deriv();
    let (d0, d1, d2) = (
        d.p0.to_vec2().dot(dir),
        d.p1.to_vec2().dot(dir),
        d.p2.to_vec2().dot(dir),
    );
    // Projected derivative in power basis.
    let roots = solve_quadratic(d0, 2.0 * (d1 - d0), d0 - 2.0 * d1 + d2);
    let mut lo = (0.0, proj(0.0));
    let mut hi = lo;
    for t in roots
        .into_iter()
        .filter(|t| *t > 0.0 && *t < 1.0)
        .chain(core::iter::once(1.0))
    {
        let v = proj(t);
        if v < lo.1 {
            lo = (t, v);
        }
        if v > hi.1 {
            hi = (t, v);
        }
    }
    let line = Line::new(c.eval(lo.0), c.eval(hi.0));
    if (c.p3 - c.p0).dot(dir) < 0.0 {
        line.reversed()
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use crate::{reduce_order, CubicBez, Line, Point, QuadBez, QuadraticMode, ReducedCurve};

    #[test]
    fn reduce_point() {
        let c = CubicBez::new((2.0, 3.0), (2.0, 3.0), (2.0, 3.0), (2.0, 3.0));
        let r = reduce_order(&c, QuadraticMode::Allow);
        assert_eq!(r, ReducedCurve::Point(Point::new(2.0, 3.0)));
        assert_eq!(r.order(), 1);
    }

    #[test]
    fn reduce_line() {
        let c = CubicBez::new((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0));
        let r = reduce_order(&c, QuadraticMode::Forbid);
        assert_eq!(r.order(), 2);
        assert_eq!(r, ReducedCurve::Line(Line::new((0.0, 0.0), (3.0, 3.0))));

        // Control points past the ends: the traced extent is wider than the chord.
        let c = CubicBez::new((0.0, 0.0), (-1.0, 0.0), (3.0, 0.0), (2.0, 0.0));
        match reduce_order(&c, QuadraticMode::Forbid) {
            ReducedCurve::Line(l) => {
                assert!(l.p0.x < 0.0, "line {l:?}");
                assert!(l.p1.x > 2.0, "line {l:?}");
                assert_eq!(l.p0.y, 0.0);
            }
            other => panic!("expected a line, got {other:?}"),
        }

        // Reversed travel gives a reversed line.
        let c = CubicBez::new((3.0, 3.0), (2.0, 2.0), (1.0, 1.0), (0.0, 0.0));
        assert_eq!(
            reduce_order(&c, QuadraticMode::Allow),
            ReducedCurve::Line(Line::new((3.0, 3.0), (0.0, 0.0)))
        );
    }

    #[test]
    fn reduce_quad() {
        let q = QuadBez::new((0.0, 0.0), (1.0, 2.0), (3.0, 0.0));
        let c = q.raise();
        match reduce_order(&c, QuadraticMode::Allow) {
            ReducedCurve::Quad(r) => {
                assert_eq!(r.p0, q.p0);
                assert_eq!(r.p2, q.p2);
                assert!(r.p1.distance(q.p1) < 1e-12, "control {:?}", r.p1);
            }
            other => panic!("expected a quadratic, got {other:?}"),
        }
        assert_eq!(reduce_order(&c, QuadraticMode::Forbid).order(), 4);
    }

    #[test]
    fn reduce_keeps_cubics() {
        let arch = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let bowl = CubicBez::new((1.0, 0.0), (0.0, 0.0), (0.0, 1.0), (1.0, 1.0));
        for c in [arch, bowl, arch.reverse(), bowl.reverse()] {
            assert_eq!(reduce_order(&c, QuadraticMode::Forbid).order(), 4);
            assert_eq!(reduce_order(&c, QuadraticMode::Allow).order(), 4);
        }
    }
}
