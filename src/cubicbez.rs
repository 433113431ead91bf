// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cubic Bézier segments.

use core::ops::Range;

use arrayvec::ArrayVec;
use smallvec::SmallVec;

use crate::common::solve_quadratic;
use crate::reduce::{reduce_order, QuadraticMode, ReducedCurve};
use crate::{
    Line, Nearest, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, ParamCurveNearest, Point,
    QuadBez, Rect, Vec2, MAX_EXTREMA,
};

/// The approximation precision used by default is the larger side of the
/// control box divided by this.
pub const PRECISION_DIVISOR: f64 = 256.0;

/// Maximum number of bisections when approximating by quadratics.
///
/// At most `2^MAX_APPROX_DEPTH` quadratics are produced for one cubic.
pub const MAX_APPROX_DEPTH: u32 = 10;

const NEAREST_NEWTON_STEPS: usize = 8;

/// A single cubic Bézier segment.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubicBez {
    /// The start point.
    pub p0: Point,
    /// The first control point.
    pub p1: Point,
    /// The second control point.
    pub p2: Point,
    /// The end point.
    pub p3: Point,
}

/// A quadratic approximating part of a cubic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadPiece {
    /// Start of the approximated parameter range on the cubic.
    pub t0: f64,
    /// End of the approximated parameter range on the cubic.
    pub t1: f64,
    /// The approximating quadratic.
    ///
    /// Its end points are exactly the cubic evaluated at `t0` and `t1`.
    pub quad: QuadBez,
}

/// An iterator which produces quadratic Bézier approximations of a cubic.
///
/// Created by [`CubicBez::approx_quads`]. Pieces are produced lazily in
/// increasing parameter order. The iterator is `Clone`, so a sequence can
/// be replayed from any point.
#[derive(Clone, Debug)]
pub struct ApproxQuads {
    c: CubicBez,
    max_hypot2: f64,
    // Pending ranges with their depth; the top of the stack is the leftmost.
    stack: SmallVec<[(f64, f64, u32); 16]>,
}

impl CubicBez {
    /// Create a new cubic Bézier segment.
    #[inline]
    pub fn new<P: Into<Point>>(p0: P, p1: P, p2: P, p3: P) -> CubicBez {
        CubicBez {
            p0: p0.into(),
            p1: p1.into(),
            p2: p2.into(),
            p3: p3.into(),
        }
    }

    /// Coefficients of the curve in power basis.
    ///
    /// Returns `(a, b, c, d)` so that the curve is `a t³ + b t² + c t + d`.
    #[inline]
    pub fn parameters(&self) -> (Vec2, Vec2, Vec2, Vec2) {
        let c = (self.p1 - self.p0) * 3.0;
        let b = (self.p2 - self.p1) * 3.0 - c;
        let d = self.p0.to_vec2();
        let a = self.p3.to_vec2() - d - c - b;
        (a, b, c, d)
    }

    /// The bounding box of the control points.
    ///
    /// It encloses the curve, but unlike [`bounding_box`] it is not tight.
    ///
    /// [`bounding_box`]: ParamCurveExtrema::bounding_box
    #[inline]
    pub fn control_box(&self) -> Rect {
        Rect::from_points(self.p0, self.p3)
            .union_pt(self.p1)
            .union_pt(self.p2)
    }

    /// The default approximation precision for this curve.
    ///
    /// This is proportional to the size of the curve, so that large curves
    /// get a coarser absolute tolerance than small ones.
    #[inline]
    pub fn precision(&self) -> f64 {
        self.control_box().max_side() / PRECISION_DIVISOR
    }

    /// The largest absolute coordinate of any control point.
    ///
    /// This is the magnitude against which rounding noise is measured.
    #[inline]
    pub fn coord_scale(&self) -> f64 {
        self.p0
            .max_abs()
            .max(self.p1.max_abs())
            .max(self.p2.max_abs())
            .max(self.p3.max_abs())
    }

    /// Is this curve finite?
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.p0.is_finite() && self.p1.is_finite() && self.p2.is_finite() && self.p3.is_finite()
    }

    /// Determine whether both control points lie within `accuracy` of the
    /// segment joining the end points.
    pub fn is_linear(&self, accuracy: f64) -> bool {
        let chord = Line::new(self.p0, self.p3);
        let acc2 = accuracy * accuracy;
        chord.nearest(self.p1, 0.0).distance_sq <= acc2
            && chord.nearest(self.p2, 0.0).distance_sq <= acc2
    }

    /// Returns a cubic Bézier tracing the same curve in the opposite direction.
    #[must_use]
    #[inline]
    pub fn reverse(&self) -> CubicBez {
        CubicBez::new(self.p3, self.p2, self.p1, self.p0)
    }

    /// Approximate the curve by quadratic Béziers.
    ///
    /// Each piece deviates from the cubic by at most `precision`, except
    /// where the recursion limit of [`MAX_APPROX_DEPTH`] bisections is hit.
    /// The pieces cover `[0, 1]` without gaps, and each piece's end points
    /// are exactly on the cubic.
    ///
    /// The quadratics are not in general G1 continuous; they are optimized
    /// for minimizing distance error.
    #[inline]
    pub fn approx_quads(&self, precision: f64) -> ApproxQuads {
        // This magic number is the square of 36 / sqrt(3).
        // See: http://caffeineowl.com/graphics/2d/vectorial/cubic2quad01.html
        let max_hypot2 = 432.0 * precision * precision;
        let mut stack = SmallVec::new();
        stack.push((0.0, 1.0, 0));
        ApproxQuads {
            c: *self,
            max_hypot2,
            stack,
        }
    }

    /// Classify the curve by its effective degree.
    ///
    /// See [`reduce_order`].
    #[inline]
    pub fn reduce_order(&self, mode: QuadraticMode) -> ReducedCurve {
        reduce_order(self, mode)
    }

    /// Find the loop of this curve, if it has one.
    ///
    /// See [`self_intersection`](crate::self_intersection).
    #[inline]
    pub fn self_intersection(&self) -> Option<(f64, f64)> {
        crate::self_intersection(self)
    }

    /// The quadratic through both end points whose control point is the
    /// midpoint of the two tangent extensions.
    pub(crate) fn midpoint_quad(&self) -> QuadBez {
        let p1x2 = 3.0 * self.p1.to_vec2() - self.p0.to_vec2();
        let p2x2 = 3.0 * self.p2.to_vec2() - self.p3.to_vec2();
        QuadBez::new(self.p0, ((p1x2 + p2x2) / 4.0).to_point(), self.p3)
    }

    // The distance of `midpoint_quad` from the cubic is proportional to the
    // square root of this.
    fn quad_error_hypot2(&self) -> f64 {
        let p1x2 = 3.0 * self.p1.to_vec2() - self.p0.to_vec2();
        let p2x2 = 3.0 * self.p2.to_vec2() - self.p3.to_vec2();
        (p2x2 - p1x2).hypot2()
    }

    /// Newton iterations on the squared distance to `p`, starting at `t`.
    ///
    /// Stops as soon as a step fails to improve the distance.
    pub(crate) fn polish_nearest(&self, p: Point, t: f64) -> Nearest {
        let d1 = self.deriv();
        let d2 = d1.deriv();
        let mut t = t;
        let mut best = Nearest {
            distance_sq: self.eval(t).distance_squared(p),
            t,
        };
        for _ in 0..NEAREST_NEWTON_STEPS {
            let v = self.eval(t) - p;
            let dv = d1.eval(t).to_vec2();
            let ddv = d2.eval(t).to_vec2();
            let denom = dv.hypot2() + v.dot(ddv);
            if !(denom > 0.0) {
                break;
            }
            t = (t - v.dot(dv) / denom).clamp(0.0, 1.0);
            let r = self.eval(t).distance_squared(p);
            if r < best.distance_sq {
                best = Nearest { distance_sq: r, t };
            } else {
                break;
            }
        }
        best
    }
}

impl Iterator for ApproxQuads {
    type Item = QuadPiece;

    fn next(&mut self) -> Option<QuadPiece> {
        while let Some((t0, t1, depth)) = self.stack.pop() {
            let seg = self.c.subsegment(t0..t1);
            let err = seg.quad_error_hypot2();
            if err <= self.max_hypot2 || depth >= MAX_APPROX_DEPTH || !err.is_finite() {
                let quad = seg.midpoint_quad();
                return Some(QuadPiece { t0, t1, quad });
            }
            let tm = 0.5 * (t0 + t1);
            self.stack.push((tm, t1, depth + 1));
            self.stack.push((t0, tm, depth + 1));
        }
        None
    }
}

impl ParamCurve for CubicBez {
    #[inline]
    fn eval(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let v = self.p0.to_vec2() * (mt * mt * mt)
            + (self.p1.to_vec2() * (mt * mt * 3.0)
                + (self.p2.to_vec2() * (mt * 3.0) + self.p3.to_vec2() * t) * t)
                * t;
        v.to_point()
    }

    #[inline]
    fn start(&self) -> Point {
        self.p0
    }

    #[inline]
    fn end(&self) -> Point {
        self.p3
    }

    fn subsegment(&self, range: Range<f64>) -> CubicBez {
        let (t0, t1) = (range.start, range.end);
        let p0 = self.eval(t0);
        let p3 = self.eval(t1);
        let d = self.deriv();
        let scale = (t1 - t0) * (1.0 / 3.0);
        let p1 = p0 + scale * d.eval(t0).to_vec2();
        let p2 = p3 - scale * d.eval(t1).to_vec2();
        CubicBez { p0, p1, p2, p3 }
    }

    /// Subdivide into halves, using de Casteljau.
    #[inline]
    fn subdivide(&self) -> (CubicBez, CubicBez) {
        let pm = self.eval(0.5);
        let (p0, p1, p2, p3) = (
            self.p0.to_vec2(),
            self.p1.to_vec2(),
            self.p2.to_vec2(),
            self.p3.to_vec2(),
        );
        (
            CubicBez::new(
                self.p0,
                ((p0 + p1) / 2.0).to_point(),
                ((p0 + p1 * 2.0 + p2) * 0.25).to_point(),
                pm,
            ),
            CubicBez::new(
                pm,
                ((p1 + p2 * 2.0 + p3) * 0.25).to_point(),
                ((p2 + p3) / 2.0).to_point(),
                self.p3,
            ),
        )
    }
}

impl ParamCurveDeriv for CubicBez {
    type DerivResult = QuadBez;

    #[inline]
    fn deriv(&self) -> QuadBez {
        QuadBez::new(
            (3.0 * (self.p1 - self.p0)).to_point(),
            (3.0 * (self.p2 - self.p1)).to_point(),
            (3.0 * (self.p3 - self.p2)).to_point(),
        )
    }
}

impl ParamCurveNearest for CubicBez {
    /// Find the nearest point.
    ///
    /// The best of the approximating quadratics gives a starting parameter,
    /// which is then polished with Newton iterations on the cubic itself.
    fn nearest(&self, p: Point, accuracy: f64) -> Nearest {
        let mut best = Nearest {
            distance_sq: f64::INFINITY,
            t: 0.0,
        };
        for piece in self.approx_quads(accuracy) {
            let near = piece.quad.nearest(p, accuracy);
            if near.distance_sq < best.distance_sq {
                best = Nearest {
                    distance_sq: near.distance_sq,
                    t: piece.t0 + near.t * (piece.t1 - piece.t0),
                };
            }
        }
        self.polish_nearest(p, best.t)
    }
}

impl ParamCurveExtrema for CubicBez {
    fn extrema(&self) -> ArrayVec<f64, MAX_EXTREMA> {
        fn one_coord(result: &mut ArrayVec<f64, MAX_EXTREMA>, d0: f64, d1: f64, d2: f64) {
            let a = d0 - 2.0 * d1 + d2;
            let b = 2.0 * (d1 - d0);
            let c = d0;
            let roots = solve_quadratic(c, b, a);
            for &t in &roots {
                if t > 0.0 && t < 1.0 {
                    result.push(t);
                }
            }
        }
        let mut result = ArrayVec::new();
        let d0 = self.p1 - self.p0;
        let d1 = self.p2 - self.p1;
        let d2 = self.p3 - self.p2;
        one_coord(&mut result, d0.x, d1.x, d2.x);
        one_coord(&mut result, d0.y, d1.y, d2.y);
        result.sort_by(f64::total_cmp);
        result
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::{
        CubicBez, ParamCurve, ParamCurveDeriv, ParamCurveExtrema, ParamCurveNearest, Point,
        QuadBez, MAX_APPROX_DEPTH,
    };

    #[test]
    fn cubicbez_deriv() {
        // y = x^2
        let c = CubicBez::new(
            (0.0, 0.0),
            (1.0 / 3.0, 0.0),
            (2.0 / 3.0, 1.0 / 3.0),
            (1.0, 1.0),
        );
        let deriv = c.deriv();

        let n = 10;
        for i in 0..=n {
            let t = (i as f64) * (n as f64).recip();
            let delta = 1e-6;
            let p = c.eval(t);
            let p1 = c.eval(t + delta);
            let d_approx = (p1 - p) * delta.recip();
            let d = deriv.eval(t).to_vec2();
            assert!((d - d_approx).hypot() < delta * 2.0, "bad derivative at {t}");
        }
    }

    #[test]
    fn cubicbez_subsegment() {
        let c = CubicBez::new((3.1, 4.1), (5.9, 2.6), (5.3, 5.8), (9.7, 9.3));
        let t0 = 0.1;
        let t1 = 0.8;
        let cs = c.subsegment(t0..t1);
        let epsilon = 1e-12;
        let n = 10;
        for i in 0..=n {
            let t = (i as f64) * (n as f64).recip();
            let ts = t0 + t * (t1 - t0);
            assert!(
                (c.eval(ts) - cs.eval(t)).hypot() < epsilon,
                "subsegment mismatch at {t}"
            );
        }
    }

    #[test]
    fn cubicbez_parameters() {
        let c = CubicBez::new((3.1, 4.1), (5.9, 2.6), (5.3, 5.8), (9.7, 9.3));
        let (a, b, cc, d) = c.parameters();
        for i in 0..=4 {
            let t = i as f64 * 0.25;
            let p = (((a * t + b) * t + cc) * t + d).to_point();
            assert!(c.eval(t).distance(p) < 1e-12, "mismatch at {t}");
        }
    }

    #[test]
    fn cubicbez_extrema() {
        // y = x^2
        let q = QuadBez::new((-1.0, 1.0), (0.0, -1.0), (1.0, 1.0));
        let extrema = q.raise().extrema();
        assert_eq!(extrema.len(), 1);
        assert!((extrema[0] - 0.5).abs() < 1e-6, "extremum {}", extrema[0]);

        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let bbox = c.bounding_box();
        assert!((bbox.y1 - 0.75).abs() < 1e-12, "bbox {bbox:?}");
        assert_eq!(bbox.x0, 0.0);
        assert_eq!(bbox.x1, 1.0);
    }

    #[test]
    fn cubicbez_approx_quads() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let precision = 1e-3;
        let pieces: Vec<_> = c.approx_quads(precision).collect();
        assert!(pieces.len() > 1, "expected several pieces");
        assert_eq!(pieces[0].t0, 0.0);
        assert_eq!(pieces[pieces.len() - 1].t1, 1.0);
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].t1, pair[1].t0, "gap between pieces");
            assert_eq!(pair[0].quad.p2, pair[1].quad.p0, "pieces do not join");
        }
        for piece in &pieces {
            assert_eq!(piece.quad.p0, c.eval(piece.t0));
            assert_eq!(piece.quad.p2, c.eval(piece.t1));
            for i in 0..=8 {
                let s = i as f64 / 8.0;
                let t = piece.t0 + s * (piece.t1 - piece.t0);
                let d = piece.quad.eval(s).distance(c.eval(t));
                assert!(d <= precision * 1.01, "deviation {d} at t = {t}");
            }
        }
        // Restartable: a clone replays the same sequence.
        let iter = c.approx_quads(precision);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn cubicbez_approx_depth_cap() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let n = c.approx_quads(0.0).count();
        assert_eq!(n, 1 << MAX_APPROX_DEPTH);
        // A raised quadratic is approximated exactly by one piece.
        let q = QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0));
        assert_eq!(q.raise().approx_quads(1e-9).count(), 1);
    }

    #[test]
    fn cubicbez_nearest() {
        fn verify(c: &CubicBez, t: f64) {
            let p = c.eval(t);
            let near = c.nearest(p, 1e-3);
            assert!(
                c.eval(near.t).distance(p) < 1e-9,
                "nearest of {p:?} at {} instead of {t}",
                near.t
            );
        }
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        verify(&c, 0.0);
        verify(&c, 0.1);
        verify(&c, 0.5);
        verify(&c, 0.9);
        verify(&c, 1.0);
        let near = c.nearest(Point::new(0.5, 2.0), 1e-3);
        assert!((near.t - 0.5).abs() < 1e-9, "nearest t {}", near.t);
    }

    #[test]
    fn cubicbez_is_linear() {
        let c = CubicBez::new((0.0, 0.0), (1.0, 1e-9), (2.0, -1e-9), (3.0, 0.0));
        assert!(c.is_linear(1e-6));
        let c = CubicBez::new((0.0, 0.0), (1.0, 1.0), (2.0, -1.0), (3.0, 0.0));
        assert!(!c.is_linear(1e-6));
    }
}
