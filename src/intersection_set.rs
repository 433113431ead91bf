// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The result of intersecting two cubics.

use arrayvec::ArrayVec;

use crate::Point;

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Maximum number of isolated crossings of two cubics (Bézout's bound).
pub const MAX_INTERSECTIONS: usize = 9;

/// Refined crossings closer than this in both parameters are one crossing.
const DEDUP_EPSILON: f64 = 1e-8;

bitflags::bitflags! {
    /// Conditions met while intersecting two curves.
    ///
    /// None of these is an error; they explain why a set may hold fewer
    /// crossings than expected.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Signals: u8 {
        /// At least one curve reduced to a point, line or quadratic, and a
        /// simpler algorithm was used.
        const DEGENERATE     = 0b0001;
        /// The curves overlap along an interval. There are no isolated
        /// crossings and the set is empty.
        const COINCIDENT     = 0b0010;
        /// At least one candidate crossing could not be refined to rounding
        /// precision and was dropped, although the curves come close there.
        /// Candidates where the curves are clearly apart are dropped without
        /// this signal.
        const NON_CONVERGENT = 0b0100;
        /// More than [`MAX_INTERSECTIONS`] distinct crossings were found and
        /// the rest were discarded.
        const TRUNCATED      = 0b1000;
    }
}

/// One crossing of two curves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crossing {
    /// Parameter on the first curve.
    pub t1: f64,
    /// Parameter on the second curve.
    pub t2: f64,
    /// The crossing point, evaluated on the first curve.
    pub point: Point,
}

/// The crossings of two curves, ordered by parameter on the first curve.
///
/// `t1(i)` and `t2(i)` always name the same physical crossing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntersectionSet {
    t1: ArrayVec<f64, MAX_INTERSECTIONS>,
    t2: ArrayVec<f64, MAX_INTERSECTIONS>,
    points: ArrayVec<Point, MAX_INTERSECTIONS>,
    signals: Signals,
}

impl IntersectionSet {
    /// An empty set with no signals.
    #[inline]
    pub fn new() -> IntersectionSet {
        IntersectionSet::default()
    }

    /// The number of crossings.
    #[inline]
    pub fn len(&self) -> usize {
        self.t1.len()
    }

    /// Returns `true` if there are no crossings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t1.is_empty()
    }

    /// Parameter of crossing `i` on the first curve.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn t1(&self, i: usize) -> f64 {
        self.t1[i]
    }

    /// Parameter of crossing `i` on the second curve.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn t2(&self, i: usize) -> f64 {
        self.t2[i]
    }

    /// Crossing `i`, evaluated on the first curve.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    pub fn point(&self, i: usize) -> Point {
        self.points[i]
    }

    /// Crossing `i`, or `None` if out of range.
    pub fn get(&self, i: usize) -> Option<Crossing> {
        (i < self.len()).then(|| Crossing {
            t1: self.t1[i],
            t2: self.t2[i],
            point: self.points[i],
        })
    }

    /// Iterate over the crossings in order.
    pub fn iter(&self) -> impl Iterator<Item = Crossing> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// The conditions met while computing this set.
    #[inline]
    pub fn signals(&self) -> Signals {
        self.signals
    }

    /// Returns `true` if the curves overlap along an interval.
    #[inline]
    pub fn is_coincident(&self) -> bool {
        self.signals.contains(Signals::COINCIDENT)
    }

    /// The same crossings with the roles of the two curves exchanged.
    ///
    /// This is the set that intersecting the curves in the opposite order
    /// describes, ordered by the new first parameter.
    #[must_use]
    pub fn swapped(&self) -> IntersectionSet {
        let mut out = IntersectionSet {
            t1: self.t2.clone(),
            t2: self.t1.clone(),
            points: self.points.clone(),
            signals: self.signals,
        };
        out.normalize();
        out
    }

    /// Add a crossing unless it duplicates one already present.
    ///
    /// Returns `false` if the crossing was a duplicate or did not fit; in
    /// the latter case the set is marked [`Signals::TRUNCATED`].
    pub(crate) fn insert(&mut self, t1: f64, t2: f64, point: Point) -> bool {
        if self.has_near(t1, t2, DEDUP_EPSILON) {
            return false;
        }
        if self.t1.is_full() {
            self.signals |= Signals::TRUNCATED;
            return false;
        }
        self.t1.push(t1);
        self.t2.push(t2);
        self.points.push(point);
        true
    }

    /// Move crossing `i` to better parameters for the same contact.
    pub(crate) fn replace(&mut self, i: usize, t1: f64, t2: f64, point: Point) {
        self.t1[i] = t1;
        self.t2[i] = t2;
        self.points[i] = point;
    }

    /// Is there a crossing within `eps` of `(t1, t2)` in both parameters?
    pub(crate) fn has_near(&self, t1: f64, t2: f64, eps: f64) -> bool {
        self.t1
            .iter()
            .zip(&self.t2)
            .any(|(&a, &b)| (a - t1).abs() <= eps && (b - t2).abs() <= eps)
    }

    pub(crate) fn signal(&mut self, signals: Signals) {
        self.signals |= signals;
    }

    /// Drop all crossings, keeping the signals.
    pub(crate) fn clear(&mut self) {
        self.t1.clear();
        self.t2.clear();
        self.points.clear();
    }

    /// Sort by `t1`, then `t2`, keeping each triple together.
    pub(crate) fn normalize(&mut self) {
        let mut all: ArrayVec<(f64, f64, Point), MAX_INTERSECTIONS> = self
            .t1
            .iter()
            .zip(&self.t2)
            .zip(&self.points)
            .map(|((&a, &b), &p)| (a, b, p))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        self.clear();
        for (a, b, p) in all {
            self.t1.push(a);
            self.t2.push(b);
            self.points.push(p);
        }
    }
}
