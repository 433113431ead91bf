// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Low-degree polynomials and robust root isolation on an interval.
//!
//! Roots are bracketed between consecutive critical points (found
//! recursively from the derivative) and polished with Yuksel's variant of
//! Newton's method, which falls back to bisection whenever a Newton step
//! leaves the bracket. Critical points where the polynomial is (nearly)
//! zero are reported as well, so tangential roots without a sign change
//! are not lost.

use arrayvec::ArrayVec;

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Upper bound on the number of roots reported by [`Poly::roots_in`].
///
/// A quartic has at most four real roots, but rounding near a tangency can
/// produce extra nearly-coincident reports; those are absorbed here rather
/// than overflowing.
pub(crate) const MAX_ROOTS: usize = 8;

/// Relative size, compared to the largest coefficient, below which the
/// value at a critical point counts as a tangential root.
const TANGENT_EPSILON: f64 = 1e-10;

/// Roots closer than this are reported once.
const ROOT_SEPARATION: f64 = 1e-12;

/// A polynomial with `N` coefficients, constant term first.
///
/// The degree is only known at runtime: leading zero coefficients are
/// ignored, so a `Poly<5>` can also hold a cubic or a quadratic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Poly<const N: usize> {
    coeffs: [f64; N],
}

fn different_signs(x: f64, y: f64) -> bool {
    (x < 0.0) != (y < 0.0)
}

impl<const N: usize> Poly<N> {
    pub(crate) const fn new(coeffs: [f64; N]) -> Self {
        Poly { coeffs }
    }

    pub(crate) fn eval(&self, x: f64) -> f64 {
        let mut acc = 0.0;
        for c in self.coeffs.iter().rev() {
            acc = acc * x + c;
        }
        acc
    }

    /// The largest absolute value of any coefficient.
    pub(crate) fn magnitude(&self) -> f64 {
        self.coeffs.iter().fold(0.0f64, |max, c| max.max(c.abs()))
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    /// Index of the highest nonzero coefficient.
    fn degree(&self) -> Option<usize> {
        self.coeffs.iter().rposition(|&c| c != 0.0)
    }

    /// The derivative, stored with the same number of coefficients.
    pub(crate) fn deriv(&self) -> Self {
        let mut coeffs = [0.0; N];
        for i in 1..N {
            coeffs[i - 1] = i as f64 * self.coeffs[i];
        }
        Poly { coeffs }
    }

    /// All roots in `[lower, upper]`, in increasing order.
    ///
    /// Simple roots are found to within `x_error`. A critical point whose
    /// value is negligible relative to the coefficient magnitude is reported
    /// as a (double) root even though the sign does not change there.
    ///
    /// A polynomial that is identically zero has no isolated roots, and an
    /// empty list is returned for it.
    pub(crate) fn roots_in(&self, lower: f64, upper: f64, x_error: f64) -> ArrayVec<f64, MAX_ROOTS> {
        let mut out = ArrayVec::new();
        if !self.is_finite() || !(lower <= upper) {
            return out;
        }
        let tangent_tol = self.magnitude() * TANGENT_EPSILON;
        self.roots_rec(lower, upper, x_error, tangent_tol, &mut out);
        out
    }

    fn roots_rec(
        &self,
        lower: f64,
        upper: f64,
        x_error: f64,
        tangent_tol: f64,
        out: &mut ArrayVec<f64, MAX_ROOTS>,
    ) {
        match self.degree() {
            None | Some(0) => {}
            Some(1) => {
                let root = -self.coeffs[0] / self.coeffs[1];
                if root >= lower && root <= upper {
                    push_root(out, root);
                }
            }
            Some(_) => {
                let deriv = self.deriv();
                let mut critical = ArrayVec::<f64, MAX_ROOTS>::new();
                // Critical points only need to be located, not tested for tangency.
                deriv.roots_rec(lower, upper, x_error, 0.0, &mut critical);

                let mut last = lower;
                let mut last_val = self.eval(last);
                if last_val.abs() <= tangent_tol {
                    push_root(out, last);
                }
                for x in critical.into_iter().chain(core::iter::once(upper)) {
                    let val = self.eval(x);
                    if different_signs(last_val, val) && last_val != 0.0 && val != 0.0 {
                        push_root(
                            out,
                            find_root(
                                |x| self.eval(x),
                                |x| deriv.eval(x),
                                last,
                                x,
                                last_val,
                                val,
                                x_error,
                            ),
                        );
                    }
                    if val.abs() <= tangent_tol {
                        push_root(out, x);
                    }
                    last = x;
                    last_val = val;
                }
            }
        }
    }
}

fn push_root(out: &mut ArrayVec<f64, MAX_ROOTS>, root: f64) {
    if !root.is_finite() {
        return;
    }
    if let Some(&last) = out.last() {
        if (root - last).abs() <= ROOT_SEPARATION {
            return;
        }
    }
    // Extra reports beyond the capacity are rounding artifacts.
    let _ = out.try_push(root);
}

/// Yuksel's robust version of Newton's algorithm.
///
/// Requires `val_lower` and `val_upper` to have different signs.
fn find_root<F: Fn(f64) -> f64, DF: Fn(f64) -> f64>(
    f: F,
    deriv: DF,
    mut lower: f64,
    mut upper: f64,
    val_lower: f64,
    val_upper: f64,
    x_error: f64,
) -> f64 {
    if !val_lower.is_finite() || !val_upper.is_finite() {
        return f64::NAN;
    }
    debug_assert!(
        different_signs(val_lower, val_upper),
        "root must be bracketed"
    );

    let mut x = lower + (upper - lower) / 2.0;
    let mut step = (upper - lower) / 2.0;

    while step.abs() > x_error && x.is_finite() {
        let deriv_x = deriv(x);
        let val_x = f(x);
        if val_x == 0.0 {
            return x;
        }

        if different_signs(val_lower, val_x) {
            upper = x;
        } else {
            lower = x;
        }

        step = -val_x / deriv_x;
        let mut new_x = x + step;

        if !(new_x > lower && new_x < upper) {
            new_x = lower + (upper - lower) / 2.0;
            if new_x == upper || new_x == lower {
                // The bracket has shrunk to adjacent floats.
                return new_x;
            }
        }
        step = new_x - x;
        x = new_x;
    }
    x
}
