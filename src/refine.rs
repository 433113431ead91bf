// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Refinement of coarse candidates to rounding-level accuracy.
//!
//! A candidate carries the parameter ranges it was found on. The refiner
//! restricts both cubics to those ranges, runs the coarse finder on the
//! restricted curves and polishes whatever it finds with Newton steps. If
//! nothing converges, the ranges are halved and the search recurses. The
//! search is a depth-first "or": the first converged pair wins.
//!
//! Each candidate gets a fixed budget of recursive calls and a maximum
//! recursion depth, so adversarial input terminates with a dropped candidate
//! rather than an unbounded search.
//!
//! Newton steps stall where the curves are tangent. When the search finds
//! nothing, [`Refiner::resolve`] looks for the closest approach of the two
//! curves near the candidate instead: a touch is reported there, and a gap
//! that is clearly open means the candidate was never a crossing.

use alloc::vec::Vec;
use core::ops::Range;

use crate::coarse::{find_candidates, Candidate, Pairing};
use crate::common::{golden_section_min, ULPS_ABS_EPSILON};
use crate::{compute_deltas, CubicBez, ParamCurve, ParamCurveDeriv, QuadPiece};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Default number of recursive calls spent on one candidate.
pub const DEFAULT_REFINE_BUDGET: usize = 512;

/// Default maximum recursion depth of the refiner.
pub const DEFAULT_REFINE_DEPTH: usize = 64;

/// Newton steps tried on each local candidate before subdividing.
const POLISH_STEPS: usize = 6;

/// Two parameters of the same curve closer than this are the same point of
/// the curve, not a self-crossing.
const SELF_SEPARATION: f64 = 1e-7;

/// Branches of a self-crossing must meet at an angle whose sine exceeds
/// this. Near a cusp the two branches touch almost tangentially and agree
/// to rounding precision well away from `t1 == t2`.
const SELF_MIN_SINE: f64 = 1e-3;

/// Fraction of a range width by which the initial ranges are widened, and
/// by which local candidates may fall outside a child range and still
/// select it.
const RANGE_SLACK: f64 = 0.25;
const CHILD_SLACK: f64 = 0.125;

/// Gap between the curves, relative to their coordinate magnitude, above
/// which a candidate with no converged crossing is a near miss.
const CONTACT_EPSILON: f64 = 1e-9;

const APPROACH_ITERATIONS: usize = 80;

/// What became of one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Refinement {
    /// The curves meet at these parameters.
    Found(f64, f64),
    /// The curves stay apart near the candidate.
    Separate,
    /// Neither a crossing nor a clear gap was established.
    Unresolved,
}

/// Recursive subdivision search for one crossing of two cubics, or of a
/// cubic with itself.
pub(crate) struct Refiner<'a> {
    c1: &'a CubicBez,
    c2: &'a CubicBez,
    same_curve: bool,
    scale: f64,
    budget: usize,
    max_depth: usize,
    calls: usize,
}

impl<'a> Refiner<'a> {
    /// A refiner for crossings between two distinct curves.
    ///
    /// `scale` is the coordinate magnitude used for rounding-level equality.
    pub(crate) fn new(
        c1: &'a CubicBez,
        c2: &'a CubicBez,
        scale: f64,
        budget: usize,
        max_depth: usize,
    ) -> Self {
        Refiner {
            c1,
            c2,
            same_curve: false,
            scale,
            budget,
            max_depth,
            calls: 0,
        }
    }

    /// A refiner for crossings of a curve with itself.
    ///
    /// Candidates must have `range1` entirely before `range2`.
    pub(crate) fn new_self(c: &'a CubicBez, budget: usize, max_depth: usize) -> Self {
        Refiner {
            same_curve: true,
            ..Refiner::new(c, c, c.coord_scale(), budget, max_depth)
        }
    }

    /// Refine one candidate, returning parameters on both curves whose
    /// points agree to rounding precision.
    pub(crate) fn refine(&mut self, cand: &Candidate) -> Option<(f64, f64)> {
        self.calls = 0;
        let mut r1 = widen(&cand.range1);
        let mut r2 = widen(&cand.range2);
        if self.same_curve {
            let split = 0.5 * (cand.range1.end + cand.range2.start);
            r1.end = r1.end.min(split);
            r2.start = r2.start.max(split);
            if !(r1.start < r1.end && r2.start < r2.end) {
                return None;
            }
        }
        // The coarse parameters themselves may already be good enough.
        if let Some(found) = self.polish(cand.t1, cand.t2, &r1, &r2) {
            return Some(found);
        }
        self.chop(r1, r2, 0)
    }

    /// Refine one candidate, falling back to the closest approach of the
    /// curves when subdivision finds nothing.
    pub(crate) fn resolve(&mut self, cand: &Candidate) -> Refinement {
        if let Some((t1, t2)) = self.refine(cand) {
            return Refinement::Found(t1, t2);
        }
        let (t1, t2, gap) = self.closest_approach(cand);
        if self.converged(t1, t2) {
            Refinement::Found(t1, t2)
        } else if gap > self.scale * CONTACT_EPSILON {
            Refinement::Separate
        } else {
            Refinement::Unresolved
        }
    }

    /// Parameters of the closest points of the two curves near a candidate,
    /// and their distance.
    ///
    /// `t1` is searched over the widened `range1`; `t2` follows as the
    /// nearest point of `c2`, warm started from the previous evaluation.
    fn closest_approach(&self, cand: &Candidate) -> (f64, f64, f64) {
        let (c1, c2) = (self.c1, self.c2);
        let r1 = widen(&cand.range1);
        let mut t2 = cand.t2;
        let t1 = golden_section_min(r1.start, r1.end, APPROACH_ITERATIONS, |t1| {
            let nearest = c2.polish_nearest(c1.eval(t1), t2);
            t2 = nearest.t;
            nearest.distance_sq
        });
        let nearest = c2.polish_nearest(c1.eval(t1), t2);
        (t1, nearest.t, nearest.distance_sq.sqrt())
    }

    fn chop(&mut self, r1: Range<f64>, r2: Range<f64>, depth: usize) -> Option<(f64, f64)> {
        if self.calls >= self.budget || depth >= self.max_depth {
            return None;
        }
        self.calls += 1;

        let s1 = self.c1.subsegment(r1.clone());
        let s2 = self.c2.subsegment(r2.clone());
        let slop = self.scale * ULPS_ABS_EPSILON;
        if !s1
            .control_box()
            .inflate(slop, slop)
            .overlaps(s2.control_box())
        {
            return None;
        }
        let pieces1: Vec<QuadPiece> = s1.approx_quads(s1.precision().max(slop)).collect();
        let pieces2: Vec<QuadPiece> = s2.approx_quads(s2.precision().max(slop)).collect();
        let pairing = if self.same_curve && r1.end >= r2.start {
            Pairing::Abutting
        } else {
            Pairing::All
        };
        let mut local = Vec::new();
        find_candidates(&pieces1, &pieces2, pairing, 0.0, &mut local);
        if local.is_empty() {
            return None;
        }

        let global: Vec<(f64, f64)> = local
            .iter()
            .map(|c| (lerp(&r1, c.t1), lerp(&r2, c.t2)))
            .collect();
        for &(t1, t2) in &global {
            if let Some(found) = self.polish(t1, t2, &r1, &r2) {
                return Some(found);
            }
        }

        // Alternate which curve is split first so neither is favored.
        let (lo1, hi1) = halves(&r1);
        let (lo2, hi2) = halves(&r2);
        let split1 = [(lo1, r2.clone()), (hi1, r2.clone())];
        let split2 = [(r1.clone(), lo2), (r1, hi2)];
        let children = if depth % 2 == 0 {
            [split1, split2]
        } else {
            [split2, split1]
        };
        for (c1, c2) in children.into_iter().flatten() {
            let hit = global
                .iter()
                .any(|&(t1, t2)| near_range(&c1, t1) && near_range(&c2, t2));
            if !hit {
                continue;
            }
            if let Some(found) = self.chop(c1, c2, depth + 1) {
                return Some(found);
            }
        }
        None
    }

    /// Newton iteration from `(t1, t2)`, kept near the given ranges.
    pub(crate) fn polish(
        &self,
        mut t1: f64,
        mut t2: f64,
        r1: &Range<f64>,
        r2: &Range<f64>,
    ) -> Option<(f64, f64)> {
        let bounds1 = slack_bounds(r1);
        let bounds2 = slack_bounds(r2);
        for step in 0..=POLISH_STEPS {
            if self.converged(t1, t2) {
                return Some((t1, t2));
            }
            if step == POLISH_STEPS {
                break;
            }
            let (d1, d2) = compute_deltas(self.c1, t1, self.c2, t2, 1)?;
            t1 = (t1 + d1).clamp(bounds1.start, bounds1.end);
            t2 = (t2 + d2).clamp(bounds2.start, bounds2.end);
        }
        None
    }

    fn converged(&self, t1: f64, t2: f64) -> bool {
        if !self.c1.eval(t1).almost_equal(self.c2.eval(t2), self.scale) {
            return false;
        }
        if !self.same_curve {
            return true;
        }
        if (t2 - t1).abs() <= SELF_SEPARATION {
            return false;
        }
        let d = self.c1.deriv();
        let (v1, v2) = (d.eval(t1).to_vec2(), d.eval(t2).to_vec2());
        v1.cross(v2).abs() > SELF_MIN_SINE * v1.hypot() * v2.hypot()
    }
}

#[inline]
fn lerp(range: &Range<f64>, t: f64) -> f64 {
    range.start + t * (range.end - range.start)
}

fn halves(range: &Range<f64>) -> (Range<f64>, Range<f64>) {
    let mid = 0.5 * (range.start + range.end);
    (range.start..mid, mid..range.end)
}

fn widen(range: &Range<f64>) -> Range<f64> {
    let w = (range.end - range.start) * RANGE_SLACK;
    (range.start - w).max(0.0)..(range.end + w).min(1.0)
}

fn slack_bounds(range: &Range<f64>) -> Range<f64> {
    let w = range.end - range.start;
    (range.start - w).max(0.0)..(range.end + w).min(1.0)
}

fn near_range(range: &Range<f64>, t: f64) -> bool {
    let w = (range.end - range.start) * CHILD_SLACK;
    t >= range.start - w && t <= range.end + w
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{Refinement, Refiner, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH};
    use crate::coarse::{find_candidates, Candidate, Pairing};
    use crate::{CubicBez, ParamCurve};

    fn coarse(c1: &CubicBez, c2: &CubicBez) -> Vec<Candidate> {
        let p1: Vec<_> = c1.approx_quads(c1.precision()).collect();
        let p2: Vec<_> = c2.approx_quads(c2.precision()).collect();
        let mut out = Vec::new();
        find_candidates(&p1, &p2, Pairing::All, 0.0, &mut out);
        out
    }

    fn scale(c1: &CubicBez, c2: &CubicBez) -> f64 {
        c1.coord_scale().max(c2.coord_scale())
    }

    #[test]
    fn refine_transverse_crossing() {
        let c1 = CubicBez::new((0.0, 0.0), (0.0, 1.0), (0.0, 1.0), (1.0, 1.0));
        let c2 = CubicBez::new((0.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let candidates = coarse(&c1, &c2);
        assert!(!candidates.is_empty());
        let s = scale(&c1, &c2);
        let mut refiner = Refiner::new(&c1, &c2, s, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
        let (t1, t2) = refiner.refine(&candidates[0]).unwrap();
        assert!(c1.eval(t1).almost_equal(c2.eval(t2), s));
        // The crossing is at t1 = 2^(-1/3), t2 = 1 - t1.
        let expected = 0.5f64.powf(1.0 / 3.0);
        assert!((t1 - expected).abs() < 1e-9, "t1 = {t1}");
        assert!((t2 - (1.0 - expected)).abs() < 1e-9, "t2 = {t2}");
    }

    #[test]
    fn refine_from_whole_ranges() {
        // A poor initial guess still refines when the ranges bracket the
        // crossing.
        let c1 = CubicBez::new((0.0, 0.0), (0.5, 1.0), (0.5, 1.0), (1.0, 0.0));
        let c2 = CubicBez::new((0.0, 1.0), (0.5, 0.0), (0.5, 0.0), (1.0, 1.0));
        let cand = Candidate {
            t1: 0.05,
            t2: 0.05,
            range1: 0.0..0.5,
            range2: 0.0..0.5,
        };
        let s = scale(&c1, &c2);
        let mut refiner = Refiner::new(&c1, &c2, s, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
        let (t1, t2) = refiner.refine(&cand).unwrap();
        assert!(c1.eval(t1).almost_equal(c2.eval(t2), s));
        assert!(t1 < 0.5 && t2 < 0.5, "({t1}, {t2})");
    }

    #[test]
    fn refine_drops_missing_crossing() {
        let c1 = CubicBez::new((0.0, 0.0), (0.3, 1.0), (0.7, 1.0), (1.0, 0.0));
        let c2 = CubicBez::new((0.0, 2.0), (0.3, 1.0), (0.7, 1.0), (1.0, 2.0));
        let cand = Candidate {
            t1: 0.5,
            t2: 0.5,
            range1: 0.0..1.0,
            range2: 0.0..1.0,
        };
        let s = scale(&c1, &c2);
        let mut refiner = Refiner::new(&c1, &c2, s, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
        assert_eq!(refiner.refine(&cand), None);
        let mut refiner = Refiner::new(&c1, &c2, s, 1, DEFAULT_REFINE_DEPTH);
        assert_eq!(refiner.refine(&cand), None);
        // The arches are half a unit apart at their apexes.
        assert_eq!(refiner.resolve(&cand), Refinement::Separate);
    }

    #[test]
    fn resolve_tangent_contact() {
        // Mirror images across y = 0.75, touching at both apexes.
        let c1 = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let c2 = CubicBez::new((0.0, 1.5), (0.0, 0.5), (1.0, 0.5), (1.0, 1.5));
        let cand = Candidate {
            t1: 0.45,
            t2: 0.55,
            range1: 0.375..0.5,
            range2: 0.5..0.625,
        };
        let s = scale(&c1, &c2);
        let mut refiner = Refiner::new(&c1, &c2, s, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
        match refiner.resolve(&cand) {
            Refinement::Found(t1, t2) => {
                assert!((t1 - 0.5).abs() < 1e-6 && (t2 - 0.5).abs() < 1e-6, "({t1}, {t2})");
                assert!(c1.eval(t1).almost_equal(c2.eval(t2), s));
            }
            other => panic!("contact not found: {other:?}"),
        }
    }

    #[test]
    fn refine_self_crossing() {
        let c = CubicBez::new((0.0, 0.0), (200.0, 100.0), (-100.0, 100.0), (100.0, 0.0));
        let pieces: Vec<_> = c.approx_quads(c.precision()).collect();
        let mut candidates = Vec::new();
        find_candidates(&pieces, &pieces, Pairing::SelfUpper, 0.0, &mut candidates);
        assert!(!candidates.is_empty());
        let mut refiner = Refiner::new_self(&c, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
        let found: Vec<_> = candidates.iter().filter_map(|k| refiner.refine(k)).collect();
        assert!(!found.is_empty());
        for (ta, tb) in found {
            assert!((tb - ta).abs() > 0.5, "({ta}, {tb})");
            assert!(c.eval(ta).distance(c.eval(tb)) < 1e-9);
        }
    }
}
