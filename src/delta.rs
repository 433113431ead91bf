// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Newton-style corrections for a pair of parameters near a crossing.

use crate::{CubicBez, ParamCurve, ParamCurveDeriv, Vec2};

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Determinants smaller than this, relative to the product of the two
/// speeds, mean the tangents are parallel and no correction exists.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Fixed-point iterations used to fold in the higher order terms.
const HIGHER_ORDER_ITERATIONS: usize = 8;

/// Compute corrections `(d1, d2)` so that `c1(t1 + d1)` and `c2(t2 + d2)`
/// are closer to a common point than `c1(t1)` and `c2(t2)`.
///
/// With `order` 1 each curve is replaced by its tangent line at the given
/// parameter and the two lines are intersected. Orders 2 and 3 add the
/// corresponding Taylor terms of each curve and solve the resulting system
/// by fixed-point iteration around the linear solution. Orders outside
/// `1..=3` are clamped into that range, since a cubic has no derivatives
/// beyond the third.
///
/// This is a single correction step, not a solver: apply it repeatedly to
/// converge. Returns `None` when the tangents are parallel, including when
/// either curve has zero speed at its parameter, or when the result is not
/// finite.
pub fn compute_deltas(
    c1: &CubicBez,
    t1: f64,
    c2: &CubicBez,
    t2: f64,
    order: u32,
) -> Option<(f64, f64)> {
    let order = order.clamp(1, 3);
    let j1 = Jet::new(c1, t1);
    let j2 = Jet::new(c2, t2);
    let det = j1.d[0].cross(j2.d[0]);
    let speeds = j1.d[0].hypot() * j2.d[0].hypot();
    if !(det.abs() > PARALLEL_EPSILON * speeds) {
        return None;
    }
    let r = j2.p - j1.p;
    // c1' d1 - c2' d2 = rhs, by Cramer's rule.
    let solve = |rhs: Vec2| (rhs.cross(j2.d[0]) / det, rhs.cross(j1.d[0]) / det);
    let (mut d1, mut d2) = solve(r);
    if order > 1 {
        for _ in 0..HIGHER_ORDER_ITERATIONS {
            let rhs = r + j2.higher_terms(d2, order) - j1.higher_terms(d1, order);
            (d1, d2) = solve(rhs);
        }
    }
    (d1.is_finite() && d2.is_finite()).then_some((d1, d2))
}

/// Position and derivatives of a cubic at one parameter.
struct Jet {
    p: Vec2,
    d: [Vec2; 3],
}

impl Jet {
    fn new(c: &CubicBez, t: f64) -> Jet {
        let q = c.deriv();
        let l = q.deriv();
        Jet {
            p: c.eval(t).to_vec2(),
            d: [
                q.eval(t).to_vec2(),
                l.eval(t).to_vec2(),
                l.deriv().eval(t).to_vec2(),
            ],
        }
    }

    /// Taylor terms of degree 2 through `order`, evaluated at offset `d`.
    fn higher_terms(&self, d: f64, order: u32) -> Vec2 {
        let mut sum = self.d[1] * (d * d / 2.0);
        if order > 2 {
            sum += self.d[2] * (d * d * d / 6.0);
        }
        sum
    }
}
