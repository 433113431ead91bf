// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadratic Bézier segments.

use core::ops::Range;

use arrayvec::ArrayVec;

use crate::coarse::{quad_quad_crossings, MAX_QUAD_CROSSINGS};
use crate::common::solve_cubic;
use crate::{
    CubicBez, Line, Nearest, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, ParamCurveNearest,
    Point, Rect, Vec2, MAX_EXTREMA,
};

/// A single quadratic Bézier segment.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadBez {
    /// The start point.
    pub p0: Point,
    /// The control point.
    pub p1: Point,
    /// The end point.
    pub p2: Point,
}

impl QuadBez {
    /// Create a new quadratic Bézier segment.
    #[inline]
    pub fn new<V: Into<Point>>(p0: V, p1: V, p2: V) -> QuadBez {
        QuadBez {
            p0: p0.into(),
            p1: p1.into(),
            p2: p2.into(),
        }
    }

    /// Raise the order by 1.
    ///
    /// Returns a cubic Bézier segment that exactly represents this quadratic.
    #[inline]
    pub fn raise(&self) -> CubicBez {
        CubicBez::new(
            self.p0,
            self.p0 + (2.0 / 3.0) * (self.p1 - self.p0),
            self.p2 + (2.0 / 3.0) * (self.p1 - self.p2),
            self.p2,
        )
    }

    /// Coefficients of the curve in power basis.
    ///
    /// Returns `(a, b, c)` so that the curve is `a t² + b t + c`.
    #[inline]
    pub fn parameters(&self) -> (Vec2, Vec2, Vec2) {
        let c = self.p0.to_vec2();
        let b = 2.0 * (self.p1 - self.p0);
        let a = self.p0.to_vec2() - 2.0 * self.p1.to_vec2() + self.p2.to_vec2();
        (a, b, c)
    }

    /// The bounding box of the control points.
    ///
    /// It encloses the curve, but is not in general tight.
    #[inline]
    pub fn control_box(&self) -> Rect {
        Rect::from_points(self.p0, self.p2).union_pt(self.p1)
    }

    /// Is this curve finite?
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.p0.is_finite() && self.p1.is_finite() && self.p2.is_finite()
    }

    /// Determine whether the control point lies within `accuracy` of the
    /// chord, in which case the curve is a straight segment for practical
    /// purposes.
    pub fn is_linear(&self, accuracy: f64) -> bool {
        let chord = Line::new(self.p0, self.p2);
        chord.nearest(self.p1, 0.0).distance_sq <= accuracy * accuracy
    }

    /// Find the crossings of two quadratic Béziers.
    ///
    /// Returns pairs of parameters `(t_self, t_other)`, sorted by `t_self`.
    /// Tangential contacts are reported once. Overlapping segments have no
    /// isolated crossings and yield an empty list.
    pub fn intersect_quad(&self, other: &QuadBez) -> ArrayVec<(f64, f64), MAX_QUAD_CROSSINGS> {
        let mut result = ArrayVec::new();
        if self.is_finite() && other.is_finite() {
            quad_quad_crossings(self, other, &mut result);
        }
        result
    }
}

impl ParamCurve for QuadBez {
    #[inline]
    fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        (self.p0.to_vec2() * (mt * mt)
            + (self.p1.to_vec2() * (mt * 2.0) + self.p2.to_vec2() * t) * t)
            .to_point()
    }

    #[inline]
    fn start(&self) -> Point {
        self.p0
    }

    #[inline]
    fn end(&self) -> Point {
        self.p2
    }

    /// Subdivide into halves, using de Casteljau.
    #[inline]
    fn subdivide(&self) -> (QuadBez, QuadBez) {
        let pm = self.eval(0.5);
        (
            QuadBez::new(self.p0, self.p0.midpoint(self.p1), pm),
            QuadBez::new(pm, self.p1.midpoint(self.p2), self.p2),
        )
    }

    fn subsegment(&self, range: Range<f64>) -> QuadBez {
        let (t0, t1) = (range.start, range.end);
        let p0 = self.eval(t0);
        let p2 = self.eval(t1);
        let p1 = p0 + (self.p1 - self.p0).lerp(self.p2 - self.p1, t0) * (t1 - t0);
        QuadBez { p0, p1, p2 }
    }
}

impl ParamCurveDeriv for QuadBez {
    type DerivResult = Line;

    #[inline]
    fn deriv(&self) -> Line {
        Line::new(
            (2.0 * (self.p1.to_vec2() - self.p0.to_vec2())).to_point(),
            (2.0 * (self.p2.to_vec2() - self.p1.to_vec2())).to_point(),
        )
    }
}

impl ParamCurveNearest for QuadBez {
    /// Find the nearest point, using an analytical algorithm based on cubic
    /// root finding.
    fn nearest(&self, p: Point, _accuracy: f64) -> Nearest {
        fn eval_t(p: Point, best: &mut Nearest, t: f64, p0: Point) {
            let r = (p0 - p).hypot2();
            if r < best.distance_sq {
                *best = Nearest { distance_sq: r, t };
            }
        }
        fn try_t(q: &QuadBez, p: Point, best: &mut Nearest, t: f64) -> bool {
            if !(0.0..=1.0).contains(&t) {
                return true;
            }
            eval_t(p, best, t, q.eval(t));
            false
        }
        let d0 = self.p1 - self.p0;
        let d1 = self.p0.to_vec2() + self.p2.to_vec2() - 2.0 * self.p1.to_vec2();
        let d = self.p0 - p;
        let c0 = d.dot(d0);
        let c1 = 2.0 * d0.hypot2() + d.dot(d1);
        let c2 = 3.0 * d1.dot(d0);
        let c3 = d1.hypot2();
        let roots = solve_cubic(c0, c1, c2, c3);
        let mut best = Nearest {
            distance_sq: f64::INFINITY,
            t: 0.0,
        };
        let mut need_ends = roots.is_empty();
        for &t in &roots {
            need_ends |= try_t(self, p, &mut best, t);
        }
        if need_ends {
            eval_t(p, &mut best, 0.0, self.p0);
            eval_t(p, &mut best, 1.0, self.p2);
        }
        best
    }
}

impl ParamCurveExtrema for QuadBez {
    fn extrema(&self) -> ArrayVec<f64, MAX_EXTREMA> {
        let mut result = ArrayVec::new();
        let d0 = self.p1 - self.p0;
        let d1 = self.p2 - self.p1;
        let dd = d1 - d0;
        if dd.x != 0.0 {
            let t = -d0.x / dd.x;
            if t > 0.0 && t < 1.0 {
                result.push(t);
            }
        }
        if dd.y != 0.0 {
            let t = -d0.y / dd.y;
            if t > 0.0 && t < 1.0 {
                result.push(t);
                if result.len() == 2 && result[0] > t {
                    result.swap(0, 1);
                }
            }
        }
        result
    }
}
