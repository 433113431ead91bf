// Copyright 2025 the Kurbo Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Robust intersection of cubic Bézier curves.
//!
//! The bezcross library finds the points where two cubic Béziers cross, and
//! the point where a single cubic crosses itself. Results are refined until
//! the two curves agree to within a few units in the last place, and a
//! crossing at an end point shared by both curves is reported with exact
//! parameters.
//!
//! The pipeline is built from pieces that are useful on their own:
//! [`reduce_order`] detects cubics that are really points, lines or
//! quadratics; [`CubicBez::approx_quads`] approximates a cubic by
//! quadratics to a given precision; [`QuadBez::intersect_quad`] intersects
//! two quadratics in closed form; and [`compute_deltas`] gives the Newton
//! correction for a pair of parameters near a crossing.
//!
//! # Examples
//!
//! ```
//! use bezcross::{cubic_intersections, CubicBez, ParamCurve};
//!
//! let a = CubicBez::new((0.0, 0.0), (0.5, 1.0), (0.5, 1.0), (1.0, 0.0));
//! let b = CubicBez::new((0.0, 1.0), (0.5, 0.0), (0.5, 0.0), (1.0, 1.0));
//! let crossings = cubic_intersections(&a, &b);
//! assert_eq!(crossings.len(), 2);
//! for x in crossings.iter() {
//!     assert!(a.eval(x.t1).distance(b.eval(x.t2)) < 1e-12);
//! }
//! ```
//!
//! Finding a loop:
//!
//! ```
//! use bezcross::{CubicBez, ParamCurve};
//!
//! let c = CubicBez::new((0.0, 0.0), (200.0, 100.0), (-100.0, 100.0), (100.0, 0.0));
//! let (ta, tb) = c.self_intersection().unwrap();
//! assert!(ta < tb);
//! assert!(c.eval(ta).distance(c.eval(tb)) < 1e-9);
//! ```
//!
//! # Features
//!
//! This crate either uses the standard library or the [`libm`] crate for
//! math functionality. The `std` feature is enabled by default, but can be
//! disabled, as long as the `libm` feature is enabled. This is useful for
//! `no_std` environments. However, note that the `libm` crate is not as
//! efficient as the standard library, and that this crate still uses the
//! `alloc` crate regardless.
//!
//! Diagnostics are emitted through [`tracing`]; no subscriber is installed
//! by this crate.
//!
//! [`libm`]: https://docs.rs/libm
//! [`tracing`]: https://docs.rs/tracing

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::trivially_copy_pass_by_ref)]
#![warn(clippy::doc_markdown, rustdoc::broken_intra_doc_links)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(unused_qualifications)]
#![allow(
    clippy::unreadable_literal,
    clippy::many_single_char_names,
    clippy::excessive_precision
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("bezcross requires either the `std` or `libm` feature");

extern crate alloc;

mod coarse;
pub mod common;
mod cubicbez;
mod curve_intersections;
mod delta;
mod intersection_set;
mod line;
mod merge;
mod param_curve;
mod point;
mod poly;
mod quadbez;
mod rect;
mod reduce;
mod refine;
mod self_intersection;
mod vec2;

pub use crate::coarse::MAX_QUAD_CROSSINGS;
pub use crate::cubicbez::*;
pub use crate::curve_intersections::*;
pub use crate::delta::*;
pub use crate::intersection_set::*;
pub use crate::line::*;
pub use crate::param_curve::*;
pub use crate::point::*;
pub use crate::quadbez::*;
pub use crate::rect::*;
pub use crate::reduce::*;
pub use crate::refine::{DEFAULT_REFINE_BUDGET, DEFAULT_REFINE_DEPTH};
pub use crate::self_intersection::*;
pub use crate::vec2::*;
