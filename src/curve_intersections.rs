// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Intersections between two cubic Béziers.
//!
//! Both curves are first classified by [`reduce_order`]. Points and lines
//! are handled in closed form; everything else is approximated by
//! quadratics, the quadratics are intersected pairwise, and each resulting
//! candidate is refined until the two curves agree to rounding precision.

use alloc::vec::Vec;

use arrayvec::ArrayVec;
use tracing::{debug, trace, warn};

use crate::coarse::{find_candidates, Pairing};
use crate::common::ULPS_ABS_EPSILON;
use crate::merge::{merge_candidates, MERGE_EPSILON};
use crate::poly::Poly;
use crate::refine::{Refinement, Refiner, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH};
use crate::{
    reduce_order, CubicBez, IntersectionSet, Line, ParamCurve, ParamCurveExtrema,
    ParamCurveNearest, Point, QuadPiece, QuadraticMode, Rect, ReducedCurve, Signals,
    MAX_INTERSECTIONS,
};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Distance from a curve, relative to the size of both curves, within which
/// a point is on it for the purpose of coincidence detection.
const ON_CURVE_EPSILON: f64 = 1e-9;

/// Overlaps shorter than this in parameter space are a touching point, not
/// a shared interval.
const MIN_OVERLAP: f64 = 1e-6;

const ROOT_SLACK: f64 = 1e-6;
const ROOT_X_ERROR: f64 = 1e-15;

/// Options for [`cubic_intersections_with`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectOpts {
    precision: Option<f64>,
    refine_budget: usize,
    refine_depth: usize,
}

/// Invalid arguments to [`cubic_intersections_with`].
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum IntersectError {
    /// The approximation precision must be positive and finite.
    #[error("approximation precision must be positive and finite, got {0}")]
    InvalidPrecision(f64),
    /// The refiner needs at least one call per candidate.
    #[error("refine budget must be at least 1")]
    ZeroRefineBudget,
    /// A control point has a NaN or infinite coordinate.
    #[error("curve has a non-finite control point")]
    NonFiniteCurve,
}

impl Default for IntersectOpts {
    fn default() -> Self {
        IntersectOpts {
            precision: None,
            refine_budget: DEFAULT_REFINE_BUDGET,
            refine_depth: DEFAULT_REFINE_DEPTH,
        }
    }
}

impl IntersectOpts {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the precision, in coordinate units, of the quadratic
    /// approximation used to find candidate crossings.
    ///
    /// By default each curve uses [`CubicBez::precision`]. A finer precision
    /// separates crossings that are very close together, at the cost of more
    /// quadratics.
    pub fn precision(mut self, precision: f64) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Set the maximum number of subdivision steps spent refining one
    /// candidate crossing.
    pub fn refine_budget(mut self, budget: usize) -> Self {
        self.refine_budget = budget;
        self
    }

    /// Set the maximum subdivision depth when refining a candidate.
    pub fn refine_depth(mut self, depth: usize) -> Self {
        self.refine_depth = depth;
        self
    }

    fn validate(&self) -> Result<(), IntersectError> {
        if let Some(p) = self.precision {
            if !(p > 0.0 && p.is_finite()) {
                return Err(IntersectError::InvalidPrecision(p));
            }
        }
        if self.refine_budget == 0 {
            return Err(IntersectError::ZeroRefineBudget);
        }
        Ok(())
    }
}

/// Find the crossings of two cubic Béziers, with default options.
///
/// Curves with non-finite control points have no crossings; a warning is
/// logged for them. See [`cubic_intersections_with`] for details.
pub fn cubic_intersections(c1: &CubicBez, c2: &CubicBez) -> IntersectionSet {
    match cubic_intersections_with(c1, c2, &IntersectOpts::default()) {
        Ok(set) => set,
        Err(err) => {
            warn!(%err, "skipping intersection");
            IntersectionSet::new()
        }
    }
}

/// Find the crossings of two cubic Béziers.
///
/// The result holds up to [`MAX_INTERSECTIONS`] crossings ordered by the
/// parameter on `c1`; each crossing's points on the two curves agree to
/// within a few units in the last place. End points shared by the two
/// curves are reported with exact parameters.
///
/// Geometric conditions do not produce errors. They are reported through
/// [`IntersectionSet::signals`]: overlapping curves give an empty set marked
/// [`Signals::COINCIDENT`]. A candidate that fails to refine is dropped
/// silently when the curves are clearly apart there. Otherwise it is
/// dropped and the set is marked [`Signals::NON_CONVERGENT`].
///
/// Tangent contacts count as crossings and are reported once.
pub fn cubic_intersections_with(
    c1: &CubicBez,
    c2: &CubicBez,
    opts: &IntersectOpts,
) -> Result<IntersectionSet, IntersectError> {
    opts.validate()?;
    if !c1.is_finite() || !c2.is_finite() {
        return Err(IntersectError::NonFiniteCurve);
    }
    let mut set = IntersectionSet::new();
    let scale = c1.coord_scale().max(c2.coord_scale());
    let slop = scale * ULPS_ABS_EPSILON;
    if !c1
        .bounding_box()
        .inflate(slop, slop)
        .overlaps(c2.bounding_box())
    {
        return Ok(set);
    }
    let extent = c1.control_box().union(c2.control_box()).max_side();
    let ctx = Intersector {
        c1,
        c2,
        opts,
        scale,
        precision1: opts.precision.unwrap_or_else(|| c1.precision()).max(slop),
        precision2: opts.precision.unwrap_or_else(|| c2.precision()).max(slop),
        on_curve_tol: (extent * ON_CURVE_EPSILON).max(slop),
    };
    ctx.run(&mut set);
    set.normalize();
    if set.signals().contains(Signals::TRUNCATED) {
        warn!(
            max = MAX_INTERSECTIONS,
            "more crossings than a pair of cubics can have; result truncated"
        );
    }
    Ok(set)
}

/// Find the crossings of a line and a cubic Bézier.
///
/// The line is raised to a cubic with uniform parameterization, so `t1` of
/// each crossing is the parameter along the line itself.
pub fn line_cubic_intersections(line: &Line, c: &CubicBez) -> IntersectionSet {
    cubic_intersections(&line.to_cubic(), c)
}

struct Intersector<'a> {
    c1: &'a CubicBez,
    c2: &'a CubicBez,
    opts: &'a IntersectOpts,
    scale: f64,
    precision1: f64,
    precision2: f64,
    on_curve_tol: f64,
}

impl Intersector<'_> {
    fn run(&self, set: &mut IntersectionSet) {
        let r1 = reduce_order(self.c1, QuadraticMode::Forbid);
        let r2 = reduce_order(self.c2, QuadraticMode::Forbid);
        if r1.order() < 4 || r2.order() < 4 {
            trace!(
                order1 = r1.order(),
                order2 = r2.order(),
                "degenerate input, using reduced curves"
            );
            set.signal(Signals::DEGENERATE);
        }

        match (r1, r2) {
            (ReducedCurve::Point(p), ReducedCurve::Point(q)) => {
                if p.almost_equal(q, self.scale) {
                    trace!("both curves are the same point");
                    set.signal(Signals::COINCIDENT);
                }
                return;
            }
            (ReducedCurve::Point(p), _) => {
                for t in self.point_parameters(self.c2, p, self.precision2) {
                    set.insert(0.0, t, self.c1.p0);
                }
                return;
            }
            (_, ReducedCurve::Point(q)) => {
                for t in self.point_parameters(self.c1, q, self.precision1) {
                    set.insert(t, 0.0, self.c1.eval(t));
                }
                return;
            }
            _ => {}
        }

        if self.coincident() {
            trace!("curves overlap along an interval");
            set.signal(Signals::COINCIDENT);
            return;
        }

        self.shared_endpoints(set);

        match (r1, r2) {
            (ReducedCurve::Line(l), _) => self.line_crossings(set, l, true),
            (_, ReducedCurve::Line(l)) => self.line_crossings(set, l, false),
            _ => self.curve_crossings(set),
        }
    }

    fn refiner(&self) -> Refiner<'_> {
        Refiner::new(
            self.c1,
            self.c2,
            self.scale,
            self.opts.refine_budget,
            self.opts.refine_depth,
        )
    }

    /// Parameters at which `c` passes through `p`.
    fn point_parameters(
        &self,
        c: &CubicBez,
        p: Point,
        precision: f64,
    ) -> ArrayVec<f64, MAX_INTERSECTIONS> {
        let mut out = ArrayVec::new();
        let target = Rect::from_points(p, p);
        for piece in c.approx_quads(precision) {
            if !piece
                .quad
                .control_box()
                .inflate(precision, precision)
                .overlaps(target)
            {
                continue;
            }
            let near = piece.quad.nearest(p, precision);
            let t = piece.t0 + near.t * (piece.t1 - piece.t0);
            let t = c.polish_nearest(p, t).t;
            if c.eval(t).almost_equal(p, self.scale)
                && !out.iter().any(|&u: &f64| (u - t).abs() <= MERGE_EPSILON)
            {
                let _ = out.try_push(t);
            }
        }
        out
    }

    /// Parameter on `c` of the point nearest `p`, if `p` is on `c`.
    fn on_curve(&self, c: &CubicBez, p: Point, precision: f64) -> Option<f64> {
        let near = c.nearest(p, precision);
        (near.distance_sq <= self.on_curve_tol * self.on_curve_tol).then_some(near.t)
    }

    /// Do the curves share an interval?
    ///
    /// At least two end points must lie on the other curve. The part of
    /// `c1` they bound is then sampled, and every sample must lie on `c2`.
    fn coincident(&self) -> bool {
        let (c1, c2) = (self.c1, self.c2);
        let mut span: ArrayVec<f64, 4> = ArrayVec::new();
        for (t, p) in [(0.0, c1.p0), (1.0, c1.p3)] {
            if self.on_curve(c2, p, self.precision2).is_some() {
                span.push(t);
            }
        }
        for p in [c2.p0, c2.p3] {
            if let Some(t) = self.on_curve(c1, p, self.precision1) {
                span.push(t);
            }
        }
        if span.len() < 2 {
            return false;
        }
        let lo = span.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = span.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi - lo < MIN_OVERLAP {
            return false;
        }
        (1..4).all(|k| {
            let t = lo + (hi - lo) * (k as f64 / 4.0);
            self.on_curve(c2, c1.eval(t), self.precision2).is_some()
        })
    }

    /// Insert crossings at end points the curves have in common.
    fn shared_endpoints(&self, set: &mut IntersectionSet) {
        for (t1, p) in [(0.0, self.c1.p0), (1.0, self.c1.p3)] {
            for (t2, q) in [(0.0, self.c2.p0), (1.0, self.c2.p3)] {
                if p.almost_equal(q, self.scale) {
                    set.insert(t1, t2, p);
                }
            }
        }
    }

    /// Crossings when one curve is collinear.
    ///
    /// The other curve substituted into the line's implicit equation gives
    /// a cubic polynomial. At each root, the collinear curve's parameter is
    /// found by solving its projection onto the line direction.
    fn line_crossings(&self, set: &mut IntersectionSet, line: Line, line_first: bool) {
        let (lc, other) = if line_first {
            (self.c1, self.c2)
        } else {
            (self.c2, self.c1)
        };
        let origin = line.p0.to_vec2();
        let dir = line.p1 - line.p0;
        let n = dir.turn_90();
        let (a, b, c, d) = other.parameters();
        let implicit = Poly::new([n.dot(d - origin), n.dot(c), n.dot(b), n.dot(a)]);
        let (la, lb, lcc, ld) = lc.parameters();
        let refiner = self.refiner();
        for u in implicit.roots_in(-ROOT_SLACK, 1.0 + ROOT_SLACK, ROOT_X_ERROR) {
            let u = u.clamp(0.0, 1.0);
            let p = other.eval(u).to_vec2();
            let projection = Poly::new([dir.dot(ld - p), dir.dot(lcc), dir.dot(lb), dir.dot(la)]);
            for t in projection.roots_in(-ROOT_SLACK, 1.0 + ROOT_SLACK, ROOT_X_ERROR) {
                let t = t.clamp(0.0, 1.0);
                let (t1, t2) = if line_first { (t, u) } else { (u, t) };
                match refiner.polish(t1, t2, &(0.0..1.0), &(0.0..1.0)) {
                    Some((t1, t2)) => self.record(set, t1, t2),
                    None => {
                        debug!(t1, t2, "line crossing did not converge");
                        set.signal(Signals::NON_CONVERGENT);
                    }
                }
            }
        }
    }

    /// The general case: coarse candidates from quadratic approximations,
    /// merged and then refined one by one.
    ///
    /// Pieces that pass within the combined approximation error of each
    /// other are candidates too, so that tangent contacts are not lost when
    /// the approximations happen to miss each other.
    fn curve_crossings(&self, set: &mut IntersectionSet) {
        let pieces1: Vec<QuadPiece> = self.c1.approx_quads(self.precision1).collect();
        let pieces2: Vec<QuadPiece> = self.c2.approx_quads(self.precision2).collect();
        let slack = self.precision1 + self.precision2;
        let mut raw = Vec::new();
        find_candidates(&pieces1, &pieces2, Pairing::All, slack, &mut raw);
        let candidates = merge_candidates(raw);
        trace!(
            pieces1 = pieces1.len(),
            pieces2 = pieces2.len(),
            candidates = candidates.len(),
            "coarse pass done"
        );
        let mut refiner = self.refiner();
        for cand in &candidates {
            // Already reported as a shared end point.
            if set.has_near(cand.t1, cand.t2, MERGE_EPSILON) {
                continue;
            }
            match refiner.resolve(cand) {
                Refinement::Found(t1, t2) => self.record(set, t1, t2),
                Refinement::Separate => {
                    trace!(t1 = cand.t1, t2 = cand.t2, "candidate is a near miss");
                }
                Refinement::Unresolved => {
                    debug!(t1 = cand.t1, t2 = cand.t2, "candidate did not converge");
                    set.signal(Signals::NON_CONVERGENT);
                }
            }
        }
    }

    /// Add a refined crossing, or improve the one already reported for the
    /// same contact.
    ///
    /// Near a tangency several candidates converge to slightly different
    /// parameters. Two results are the same contact when both parameters
    /// are close and the curves still agree halfway between them. The pair
    /// whose points are closer is kept, except that exact end points stay.
    fn record(&self, set: &mut IntersectionSet, t1: f64, t2: f64) {
        let (c1, c2) = (self.c1, self.c2);
        let gap = |t1: f64, t2: f64| c1.eval(t1).distance(c2.eval(t2));
        let same = (0..set.len()).find(|&i| {
            let (u1, u2) = (set.t1(i), set.t2(i));
            (u1 - t1).abs() <= MERGE_EPSILON
                && (u2 - t2).abs() <= MERGE_EPSILON
                && c1
                    .eval(0.5 * (u1 + t1))
                    .almost_equal(c2.eval(0.5 * (u2 + t2)), self.scale)
        });
        match same {
            Some(i) => {
                let (u1, u2) = (set.t1(i), set.t2(i));
                let exact = (u1 == 0.0 || u1 == 1.0) && (u2 == 0.0 || u2 == 1.0);
                if !exact && gap(t1, t2) < gap(u1, u2) {
                    set.replace(i, t1, t2, c1.eval(t1));
                }
            }
            None => {
                set.insert(t1, t2, c1.eval(t1));
            }
        }
    }
}
