// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deduplication of coarse candidates.

use alloc::vec::Vec;
use core::ops::Range;

use crate::coarse::Candidate;

#[cfg(not(feature = "std"))]
use crate::common::FloatFuncs;

/// Candidates whose parameters on both curves differ by at most this much
/// are the same crossing.
pub(crate) const MERGE_EPSILON: f64 = 1.0 / 1024.0;

fn union(a: &Range<f64>, b: &Range<f64>) -> Range<f64> {
    a.start.min(b.start)..a.end.max(b.end)
}

/// Collapse clusters of near-identical candidates.
///
/// Neighboring pieces share their end points, so a crossing at or near a
/// joint is found once per piece. The first candidate seen in a cluster
/// keeps its parameters; its ranges grow to cover every merged candidate so
/// the refiner still brackets the crossing.
pub(crate) fn merge_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        let same = merged.iter_mut().find(|m| {
            (m.t1 - c.t1).abs() <= MERGE_EPSILON && (m.t2 - c.t2).abs() <= MERGE_EPSILON
        });
        match same {
            Some(m) => {
                m.range1 = union(&m.range1, &c.range1);
                m.range2 = union(&m.range2, &c.range2);
            }
            None => merged.push(c),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::merge_candidates;
    use crate::coarse::Candidate;

    #[test]
    fn joint_duplicates_collapse() {
        let raw = vec![
            Candidate {
                t1: 0.5,
                t2: 0.25,
                range1: 0.25..0.5,
                range2: 0.0..0.5,
            },
            Candidate {
                t1: 0.5 + 1e-9,
                t2: 0.25,
                range1: 0.5..0.75,
                range2: 0.0..0.5,
            },
            Candidate {
                t1: 0.9,
                t2: 0.25,
                range1: 0.75..1.0,
                range2: 0.0..0.5,
            },
        ];
        let merged = merge_candidates(raw);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].t1, 0.5);
        assert_eq!(merged[0].range1, 0.25..0.75);
        assert_eq!(merged[1].t1, 0.9);
    }

    #[test]
    fn distinct_on_one_curve_only() {
        // Same t1, different t2: two crossings on a curve that passes the
        // same point of the other curve twice.
        let raw = vec![
            Candidate {
                t1: 0.3,
                t2: 0.2,
                range1: 0.0..0.5,
                range2: 0.0..0.5,
            },
            Candidate {
                t1: 0.3,
                t2: 0.7,
                range1: 0.0..0.5,
                range2: 0.5..1.0,
            },
        ];
        assert_eq!(merge_candidates(raw).len(), 2);
    }
}
