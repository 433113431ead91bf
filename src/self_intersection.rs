// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loops of a single cubic.

use alloc::vec::Vec;
use core::f64::consts::PI;

use tracing::trace;

use crate::coarse::{find_candidates, Pairing};
use crate::merge::merge_candidates;
use crate::param_curve::ParamCurve;
use crate::refine::{Refinement, Refiner, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH};
use crate::{CubicBez, QuadPiece, QuadraticMode, Vec2};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// A piece whose control polygon turns by this much may hold a whole loop.
const MAX_PIECE_TURN: f64 = 0.75 * PI;

/// Bisections of one approximating piece in search of loop-free parts.
const MAX_TURN_SPLITS: usize = 8;

/// Find the point where a cubic crosses itself.
///
/// Returns the two parameters `(ta, tb)` with `ta < tb` at which the loop
/// closes, or `None` if the curve has no loop. A cubic has at most one
/// self-crossing.
///
/// The curve is approximated by quadratics, each turning by less than
/// `3π/4` so that no loop hides inside one of them. Every pair of distinct
/// pieces that cross or pass close to each other is then refined. The
/// shared joint of neighboring pieces is not a crossing.
/// Curves that are not finite or that reduce to a lower degree have no loop.
/// Neither does a cusp, where the curve touches itself only at one
/// parameter.
pub fn self_intersection(c: &CubicBez) -> Option<(f64, f64)> {
    if !c.is_finite() {
        return None;
    }
    let order = c.reduce_order(QuadraticMode::Allow).order();
    if order < 4 {
        trace!(order, "reduced curve has no loop");
        return None;
    }
    let precision = c.precision();
    let mut pieces = Vec::new();
    for piece in c.approx_quads(precision) {
        split_turning(c, piece, 0, &mut pieces);
    }
    let mut raw = Vec::new();
    find_candidates(&pieces, &pieces, Pairing::SelfUpper, precision, &mut raw);
    let mut refiner = Refiner::new_self(c, DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH);
    merge_candidates(raw)
        .iter()
        .find_map(|cand| match refiner.resolve(cand) {
            Refinement::Found(t1, t2) => Some((t1, t2)),
            Refinement::Separate | Refinement::Unresolved => None,
        })
        .map(|(t1, t2)| if t1 < t2 { (t1, t2) } else { (t2, t1) })
}

/// Push `piece`, bisected until each part's control polygon turns by less
/// than [`MAX_PIECE_TURN`].
fn split_turning(c: &CubicBez, piece: QuadPiece, depth: usize, out: &mut Vec<QuadPiece>) {
    let seg = c.subsegment(piece.t0..piece.t1);
    if depth >= MAX_TURN_SPLITS || polygon_turn(&seg) < MAX_PIECE_TURN {
        out.push(piece);
        return;
    }
    let mid = 0.5 * (piece.t0 + piece.t1);
    for (t0, t1) in [(piece.t0, mid), (mid, piece.t1)] {
        let quad = c.subsegment(t0..t1).midpoint_quad();
        split_turning(c, QuadPiece { t0, t1, quad }, depth + 1, out);
    }
}

/// Total absolute turning of the control polygon, skipping empty legs.
fn polygon_turn(c: &CubicBez) -> f64 {
    let mut turn = 0.0;
    let mut prev: Option<Vec2> = None;
    for leg in [c.p1 - c.p0, c.p2 - c.p1, c.p3 - c.p2] {
        if leg.hypot2() == 0.0 {
            continue;
        }
        if let Some(p) = prev {
            turn += p.cross(leg).atan2(p.dot(leg)).abs();
        }
        prev = Some(leg);
    }
    turn
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::polygon_turn;
    use crate::{CubicBez, Line, ParamCurve, QuadBez};

    /// The loop parameters solve `t² - σt + π = 0`. Returns `(σ, σ² - 4π)`.
    fn loop_quadratic(curve: &CubicBez) -> (f64, f64) {
        let (a, b, c, _) = curve.parameters();
        let sigma = -a.cross(c) / a.cross(b);
        let (ak, bk, ck) = if a.x.abs() >= a.y.abs() {
            (a.x, b.x, c.x)
        } else {
            (a.y, b.y, c.y)
        };
        let pi = sigma * sigma + (bk * sigma + ck) / ak;
        (sigma, sigma * sigma - 4.0 * pi)
    }

    #[test]
    fn loop_found() {
        let c = CubicBez::new((0.0, 0.0), (200.0, 100.0), (-100.0, 100.0), (100.0, 0.0));
        let (ta, tb) = c.self_intersection().unwrap();
        let r = 15f64.sqrt() / 10.0;
        assert!((ta - (0.5 - r)).abs() < 1e-9, "ta = {ta}");
        assert!((tb - (0.5 + r)).abs() < 1e-9, "tb = {tb}");
        let p = c.eval(ta);
        assert!(p.distance(c.eval(tb)) < 1e-9);
        assert!((p.x - 50.0).abs() < 1e-7 && (p.y - 30.0).abs() < 1e-7, "point {p:?}");
    }

    #[test]
    fn loop_reversed() {
        let c = CubicBez::new((0.0, 0.0), (200.0, 100.0), (-100.0, 100.0), (100.0, 0.0)).reverse();
        let (ta, tb) = c.self_intersection().unwrap();
        assert!(ta < tb);
        assert!(c.eval(ta).distance(c.eval(tb)) < 1e-9);
    }

    #[test]
    fn loop_inside_one_piece() {
        // The whole loop fits inside a single approximating quadratic.
        let c = CubicBez::new(
            (-64.58, -55.68),
            (-76.41, -45.71),
            (-25.72, -85.45),
            (-98.41, -55.63),
        );
        let (ta, tb) = c.self_intersection().unwrap();
        assert!((ta - 0.009276616).abs() < 1e-6, "ta = {ta}");
        assert!((tb - 0.238692788).abs() < 1e-6, "tb = {tb}");
        assert!(c.eval(ta).almost_equal(c.eval(tb), c.coord_scale()));
    }

    #[test]
    fn random_loops_match_closed_form() {
        const MARGIN: f64 = 1e-3;
        let mut rng = StdRng::seed_from_u64(0x5e_1f_10_0b);
        let mut pt = || (rng.random_range(-100.0..100.0), rng.random_range(-100.0..100.0));
        let mut loops = 0;
        for _ in 0..1000 {
            let c = CubicBez::new(pt(), pt(), pt(), pt());
            let (sigma, disc) = loop_quadratic(&c);
            if !disc.is_finite() {
                continue;
            }
            if disc < -1e-6 {
                assert_eq!(c.self_intersection(), None, "{c:?}");
                continue;
            }
            if disc < 4e-4 {
                // Too close to a cusp to call.
                continue;
            }
            let (ta, tb) = (0.5 * (sigma - disc.sqrt()), 0.5 * (sigma + disc.sqrt()));
            if ta < -MARGIN || tb > 1.0 + MARGIN {
                assert_eq!(c.self_intersection(), None, "{c:?}");
            } else if ta > MARGIN && tb < 1.0 - MARGIN {
                let found = c.self_intersection();
                let (sa, sb) = found.unwrap_or_else(|| panic!("loop at ({ta}, {tb}) missed: {c:?}"));
                assert!((sa - ta).abs() < 1e-6, "ta {sa} vs {ta}: {c:?}");
                assert!((sb - tb).abs() < 1e-6, "tb {sb} vs {tb}: {c:?}");
                loops += 1;
            }
        }
        assert!(loops > 50, "only {loops} loops");
    }

    #[test]
    fn turning_of_control_polygon() {
        let arch = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert!((polygon_turn(&arch) - core::f64::consts::PI).abs() < 1e-12);
        let flat = CubicBez::new((0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (2.0, 0.0));
        assert_eq!(polygon_turn(&flat), 0.0);
    }

    #[test]
    fn no_loop() {
        let arch = CubicBez::new((0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert_eq!(arch.self_intersection(), None);
        let s_curve = CubicBez::new((0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 2.0));
        assert_eq!(s_curve.self_intersection(), None);
        let cusp = CubicBez::new((0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0));
        assert_eq!(cusp.self_intersection(), None);
    }

    #[test]
    fn degenerate_curves_have_no_loop() {
        let line = Line::new((0.0, 0.0), (2.0, 1.0)).to_cubic();
        assert_eq!(line.self_intersection(), None);
        // Collinear with overshoot: retraces itself but has no loop.
        let back = CubicBez::new((0.0, 0.0), (3.0, 0.0), (-1.0, 0.0), (2.0, 0.0));
        assert_eq!(back.self_intersection(), None);
        let quad = QuadBez::new((0.0, 0.0), (1.0, 2.0), (2.0, 0.0)).raise();
        assert_eq!(quad.self_intersection(), None);
        let nan = CubicBez::new((0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0), (1.0, 0.0));
        assert_eq!(nan.self_intersection(), None);
    }
}
