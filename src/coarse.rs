// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coarse crossings between sequences of approximating quadratics.
//!
//! Each quadratic `B(u) = C + u Bv + u² Av` satisfies the implicit equation
//!
//! ```text
//! cross(X - C, Av)² + k cross(X - C, Bv) = 0,    k = cross(Bv, Av)
//! ```
//!
//! Substituting the other quadratic `A(s)` for `X` gives a quartic in `s`
//! whose roots in `[0, 1]` are the crossings. When `B` is flat its implicit
//! form degenerates, and the line through its chord is used instead, giving
//! a quadratic in `s`. The parameter on `B` is recovered by projecting
//! `A(s)` onto `B`, which also rejects roots on the part of the implicit
//! curve that lies outside the segment.
//!
//! Two cubics that touch, or a loop squeezed between two pieces, may have
//! approximations that come close without crossing. Such near misses are
//! also reported as candidates when a slack is given, and the refiner
//! decides whether the cubics actually meet there.

use alloc::vec::Vec;
use core::ops::Range;

use arrayvec::ArrayVec;

use crate::common::golden_section_min;
use crate::poly::Poly;
use crate::{ParamCurve, ParamCurveNearest, QuadBez, QuadPiece};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Maximum number of crossings reported for one pair of quadratics.
pub const MAX_QUAD_CROSSINGS: usize = 8;

/// How far past the ends of `[0, 1]` roots are searched, so that crossings
/// exactly at an end survive rounding.
const ROOT_SLACK: f64 = 1e-6;

const ROOT_X_ERROR: f64 = 1e-15;

/// Control point deviation from the chord, relative to the extent, below
/// which a quadratic is treated as its chord.
const FLAT_EPSILON: f64 = 1e-9;

/// Distance between the two evaluated points, relative to the extent,
/// within which a root is accepted as a crossing.
const CROSSING_EPSILON: f64 = 1e-7;

/// Roots within this distance of a shared joint between consecutive pieces
/// of one curve are the joint itself, not a crossing.
const JOINT_EPSILON: f64 = 1e-3;

/// Samples along the first quadratic when looking for near misses.
const NEAR_SAMPLES: usize = 16;

const NEAR_ITERATIONS: usize = 48;

/// A coarse crossing, together with the parameter ranges of the pieces it
/// was found on.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) t1: f64,
    pub(crate) t2: f64,
    pub(crate) range1: Range<f64>,
    pub(crate) range2: Range<f64>,
}

/// Which pairs of pieces are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pairing {
    /// Every piece of the first sequence against every piece of the second.
    All,
    /// One sequence against itself, each unordered pair of distinct pieces
    /// once. Neighbors share a joint, which is not reported.
    SelfUpper,
    /// Two sequences covering adjacent ranges of the same curve: the last
    /// piece of the first meets the first piece of the second at a joint.
    Abutting,
}

/// Crossings of two quadratics, as `(s, u)` parameter pairs sorted by `s`.
pub(crate) fn quad_quad_crossings(
    a: &QuadBez,
    b: &QuadBez,
    out: &mut ArrayVec<(f64, f64), MAX_QUAD_CROSSINGS>,
) {
    let extent = a.control_box().union(b.control_box()).max_side();
    if !(extent > 0.0) {
        return;
    }
    let tol = extent * CROSSING_EPSILON;
    let (aa, ab, ac) = a.parameters();
    let d0 = ac - b.p0.to_vec2();
    let chord = b.p2 - b.p0;
    let poly = if chord.hypot2() > 0.0 && b.is_linear(extent * FLAT_EPSILON) {
        let n = chord.turn_90();
        Poly::new([n.dot(d0), n.dot(ab), n.dot(aa), 0.0, 0.0])
    } else {
        let (ba, bb, _) = b.parameters();
        let k = bb.cross(ba);
        let (e0, e1, e2) = (d0.cross(ba), ab.cross(ba), aa.cross(ba));
        let (f0, f1, f2) = (d0.cross(bb), ab.cross(bb), aa.cross(bb));
        Poly::new([
            e0 * e0 + k * f0,
            2.0 * e0 * e1 + k * f1,
            e1 * e1 + 2.0 * e0 * e2 + k * f2,
            2.0 * e1 * e2,
            e2 * e2,
        ])
    };
    for s in poly.roots_in(-ROOT_SLACK, 1.0 + ROOT_SLACK, ROOT_X_ERROR) {
        let s = s.clamp(0.0, 1.0);
        let nearest = b.nearest(a.eval(s), 0.0);
        if nearest.distance_sq <= tol * tol {
            push_crossing(out, s, nearest.t);
        }
    }
}

fn push_crossing(out: &mut ArrayVec<(f64, f64), MAX_QUAD_CROSSINGS>, s: f64, u: f64) {
    const SAME: f64 = 1e-9;
    if out
        .iter()
        .any(|&(s0, u0)| (s - s0).abs() <= SAME && (u - u0).abs() <= SAME)
    {
        return;
    }
    let _ = out.try_push((s, u));
}

/// Points where two quadratics come within `slack` of each other, as
/// `(s, u)` parameter pairs at local minima of the distance.
///
/// The distance from `a(s)` to `b` is sampled along `a`, and each sampled
/// local minimum is narrowed by golden-section search.
pub(crate) fn quad_quad_near_misses(
    a: &QuadBez,
    b: &QuadBez,
    slack: f64,
    out: &mut ArrayVec<(f64, f64), MAX_QUAD_CROSSINGS>,
) {
    let gap = |s: f64| b.nearest(a.eval(s), 0.0);
    let step = 1.0 / NEAR_SAMPLES as f64;
    let d: [f64; NEAR_SAMPLES + 1] = core::array::from_fn(|i| gap(i as f64 * step).distance_sq);
    for i in 0..=NEAR_SAMPLES {
        let falling = i == 0 || d[i] <= d[i - 1];
        let rising = i == NEAR_SAMPLES || d[i] < d[i + 1];
        if !(falling && rising) {
            continue;
        }
        let lo = i.saturating_sub(1) as f64 * step;
        let hi = ((i + 1).min(NEAR_SAMPLES) as f64 * step).min(1.0);
        let s = golden_section_min(lo, hi, NEAR_ITERATIONS, |s| gap(s).distance_sq);
        let nearest = gap(s);
        if nearest.distance_sq <= slack * slack {
            push_crossing(out, s, nearest.t);
        }
    }
}

#[inline]
fn lerp_range(range: &Range<f64>, t: f64) -> f64 {
    range.start + t * (range.end - range.start)
}

/// Sweep all relevant pairs of pieces and collect raw candidates.
///
/// Pairs whose control boxes are farther apart than `slack` are skipped
/// without solving. With a positive `slack`, near misses within that
/// distance are candidates as well as crossings.
pub(crate) fn find_candidates(
    pieces1: &[QuadPiece],
    pieces2: &[QuadPiece],
    pairing: Pairing,
    slack: f64,
    out: &mut Vec<Candidate>,
) {
    for (i, a) in pieces1.iter().enumerate() {
        let box_a = a.quad.control_box().inflate(slack, slack);
        let first = match pairing {
            Pairing::SelfUpper => i + 1,
            Pairing::All | Pairing::Abutting => 0,
        };
        for (j, b) in pieces2.iter().enumerate().skip(first) {
            if !box_a.overlaps(b.quad.control_box()) {
                continue;
            }
            let joint = match pairing {
                Pairing::All => false,
                Pairing::SelfUpper => j == i + 1,
                Pairing::Abutting => i + 1 == pieces1.len() && j == 0,
            };
            let mut local = ArrayVec::new();
            quad_quad_crossings(&a.quad, &b.quad, &mut local);
            let crossings = local.len();
            if slack > 0.0 {
                quad_quad_near_misses(&a.quad, &b.quad, slack, &mut local);
            }
            let range1 = a.t0..a.t1;
            let range2 = b.t0..b.t1;
            for (k, (s, u)) in local.into_iter().enumerate() {
                let at_joint = if k < crossings {
                    s > 1.0 - JOINT_EPSILON && u < JOINT_EPSILON
                } else {
                    // The pieces approach each other all the way to the joint.
                    s > 1.0 - JOINT_EPSILON || u < JOINT_EPSILON
                };
                if joint && at_joint {
                    continue;
                }
                out.push(Candidate {
                    t1: lerp_range(&range1, s),
                    t2: lerp_range(&range2, u),
                    range1: range1.clone(),
                    range2: range2.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use arrayvec::ArrayVec;

    use super::{find_candidates, quad_quad_crossings, quad_quad_near_misses, Pairing};
    use crate::{CubicBez, ParamCurve, QuadBez};

    #[test]
    fn crossing_at_shared_end() {
        let a = QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0));
        let b = QuadBez::new((2.0, 0.0), (3.0, 2.0), (4.0, 0.0));
        let mut out = ArrayVec::new();
        quad_quad_crossings(&a, &b, &mut out);
        assert_eq!(out.len(), 1, "crossings {out:?}");
        let (s, u) = out[0];
        assert!((s - 1.0).abs() < 1e-9 && u.abs() < 1e-9, "crossing ({s}, {u})");
    }

    #[test]
    fn disjoint_quads() {
        let a = QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0));
        let b = QuadBez::new((0.0, 3.0), (1.0, 1.5), (2.0, 3.0));
        let mut out = ArrayVec::new();
        quad_quad_crossings(&a, &b, &mut out);
        assert!(out.is_empty(), "crossings {out:?}");
    }

    #[test]
    fn candidates_map_to_curve_parameters() {
        let c1 = CubicBez::new((0.0, 0.0), (0.0, 1.0), (0.0, 1.0), (1.0, 1.0));
        let c2 = CubicBez::new((0.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let pieces1: Vec<_> = c1.approx_quads(c1.precision()).collect();
        let pieces2: Vec<_> = c2.approx_quads(c2.precision()).collect();
        let mut candidates = Vec::new();
        find_candidates(&pieces1, &pieces2, Pairing::All, 0.0, &mut candidates);
        assert!(!candidates.is_empty(), "no candidates");
        for c in &candidates {
            assert!(c.range1.contains(&c.t1) || c.t1 == c.range1.end, "t1 outside range");
            assert!(c.range2.contains(&c.t2) || c.t2 == c.range2.end, "t2 outside range");
            let d = c1.eval(c.t1).distance(c2.eval(c.t2));
            assert!(d < 1e-2, "coarse candidate too far off: {d}");
        }
    }

    #[test]
    fn self_pairing_skips_joints() {
        // An arch has no self-crossing; only joints could be reported.
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let pieces: Vec<_> = c.approx_quads(c.precision()).collect();
        assert!(pieces.len() > 1, "expected several pieces");
        let mut candidates = Vec::new();
        find_candidates(&pieces, &pieces, Pairing::SelfUpper, 0.0, &mut candidates);
        assert!(candidates.is_empty(), "candidates {candidates:?}");
    }

    #[test]
    fn near_miss_of_touching_quads() {
        // Two arches one unit apart at their closest, apex to apex.
        let a = QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0));
        let b = QuadBez::new((0.0, 3.0), (1.0, 0.0), (2.0, 3.0));
        let mut out = ArrayVec::new();
        quad_quad_crossings(&a, &b, &mut out);
        assert!(out.is_empty(), "crossings {out:?}");
        quad_quad_near_misses(&a, &b, 0.5, &mut out);
        assert!(out.is_empty(), "near misses {out:?}");
        quad_quad_near_misses(&a, &b, 1.5, &mut out);
        assert_eq!(out.len(), 1, "near misses {out:?}");
        let (s, u) = out[0];
        assert!((s - 0.5).abs() < 1e-6 && (u - 0.5).abs() < 1e-6, "near miss ({s}, {u})");
    }

    #[test]
    fn self_pairing_near_misses_skip_joints() {
        let c = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        let pieces: Vec<_> = c.approx_quads(c.precision()).collect();
        let mut candidates = Vec::new();
        find_candidates(&pieces, &pieces, Pairing::SelfUpper, c.precision(), &mut candidates);
        assert!(candidates.is_empty(), "candidates {candidates:?}");
    }
}
