// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Points on the canvas plane, alone and in batches of four.
//!
//! A [`PointBatch`] is laid out as a structure of arrays so that the
//! same arithmetic runs across all four lanes at once; the compiler is
//! left to turn the lane loops into vector instructions.

use std::ops::{Add, Mul};

/// The number of points carried through the pipeline together.
pub const LANES: usize = 4;

/// A position on the plane, plus the tag of the transform that put it
/// there.  Tag 0 is used for points no transform has touched yet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal coordinate, nominally in [-1, 1).
    pub x: f32,
    /// Vertical coordinate, nominally in [-1, 1).
    pub y: f32,
    /// Index of the transform that produced this point.
    pub tag: usize,
}

impl Point {
    /// A point with the given coordinates and tag.
    pub fn new(x: f32, y: f32, tag: usize) -> Point {
        Point { x, y, tag }
    }

    /// The untagged origin, where every orbit starts.
    pub fn origin() -> Point {
        Point::default()
    }

    /// False once an orbit has run off to infinity or NaN.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Four floats, one per lane.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct F32x4(pub [f32; LANES]);

impl F32x4 {
    /// Every lane set to `v`.
    pub fn splat(v: f32) -> F32x4 {
        F32x4([v; LANES])
    }
}

impl Add for F32x4 {
    type Output = F32x4;

    #[inline]
    fn add(self, rhs: F32x4) -> F32x4 {
        let mut out = [0.0; LANES];
        for i in 0..LANES {
            out[i] = self.0[i] + rhs.0[i];
        }
        F32x4(out)
    }
}

impl Mul for F32x4 {
    type Output = F32x4;

    #[inline]
    fn mul(self, rhs: F32x4) -> F32x4 {
        let mut out = [0.0; LANES];
        for i in 0..LANES {
            out[i] = self.0[i] * rhs.0[i];
        }
        F32x4(out)
    }
}

/// Four points, stored lane-wise.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointBatch {
    /// Horizontal coordinates.
    pub x: F32x4,
    /// Vertical coordinates.
    pub y: F32x4,
    /// Transform tags.
    pub tag: [usize; LANES],
}

impl PointBatch {
    /// Four copies of the same point.
    pub fn splat(p: Point) -> PointBatch {
        PointBatch {
            x: F32x4::splat(p.x),
            y: F32x4::splat(p.y),
            tag: [p.tag; LANES],
        }
    }

    /// The point in lane `lane`.
    pub fn get(&self, lane: usize) -> Point {
        Point::new(self.x.0[lane], self.y.0[lane], self.tag[lane])
    }

    /// Overwrite lane `lane` with `p`.
    pub fn set(&mut self, lane: usize, p: Point) {
        self.x.0[lane] = p.x;
        self.y.0[lane] = p.y;
        self.tag[lane] = p.tag;
    }
}

/// Gather four points into lanes.
pub fn pack(points: [Point; LANES]) -> PointBatch {
    let mut batch = PointBatch::default();
    for (lane, p) in points.iter().enumerate() {
        batch.set(lane, *p);
    }
    batch
}

/// Scatter the lanes back out into four points.
pub fn unpack(batch: &PointBatch) -> [Point; LANES] {
    let mut points = [Point::default(); LANES];
    for (lane, p) in points.iter_mut().enumerate() {
        *p = batch.get(lane);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack_keeps_lane_order() {
        let points = [
            Point::new(0.1, 0.2, 0),
            Point::new(-0.3, 0.4, 1),
            Point::new(0.5, -0.6, 2),
            Point::new(-0.7, -0.8, 3),
        ];
        let batch = pack(points);
        assert_eq!(batch.x, F32x4([0.1, -0.3, 0.5, -0.7]));
        assert_eq!(batch.tag, [0, 1, 2, 3]);
        assert_eq!(unpack(&batch), points);
    }

    #[test]
    fn lane_arithmetic_is_elementwise() {
        let a = F32x4([1.0, 2.0, 3.0, 4.0]);
        let b = F32x4([0.5, 0.5, 2.0, -1.0]);
        assert_eq!(a * b + F32x4::splat(1.0), F32x4([1.5, 2.0, 7.0, -3.0]));
    }

    #[test]
    fn splat_fills_every_lane() {
        let batch = PointBatch::splat(Point::new(0.25, -0.5, 7));
        for lane in 0..LANES {
            assert_eq!(batch.get(lane), Point::new(0.25, -0.5, 7));
        }
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(Point::origin().is_finite());
        assert!(!Point::new(::std::f32::INFINITY, 0.0, 0).is_finite());
        assert!(!Point::new(0.0, ::std::f32::NAN, 0).is_finite());
    }
}
