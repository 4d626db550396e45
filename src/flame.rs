// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos game itself: a transform set, a canvas with one layer per
//! transform, and the orbit being traced between them.

use canvas::Canvas;
use error::FlameError;
use planes::CanvasConfig;
use point::{self, Point, PointBatch, LANES};
use rand::RngCore;
use render::{self, Raster};
use transform::{DefaultRng, TransformSet};

/// A transform set bound to a canvas it can paint.
pub struct Flame<R: RngCore = DefaultRng> {
    transforms: TransformSet<R>,
    canvas: Canvas,
    point: Point,
    batch: PointBatch,
}

impl<R: RngCore> Flame<R> {
    /// A `size` x `size` canvas with one layer per transform.  Orbits
    /// start at the origin.
    pub fn new(transforms: TransformSet<R>, size: usize) -> Result<Self, FlameError> {
        let config = CanvasConfig::new(size, transforms.len())?;
        Flame::with_canvas(transforms, Canvas::new(config))
    }

    /// Pair a transform set with an existing canvas.  The canvas must
    /// have exactly one layer per transform.
    pub fn with_canvas(transforms: TransformSet<R>, canvas: Canvas) -> Result<Self, FlameError> {
        if canvas.layers() != transforms.len() {
            return Err(FlameError::config(format!(
                "canvas has {} layers but there are {} transforms",
                canvas.layers(),
                transforms.len()
            )));
        }
        Ok(Flame {
            transforms,
            canvas,
            point: Point::origin(),
            batch: PointBatch::splat(Point::origin()),
        })
    }

    /// The transforms.
    pub fn transforms(&self) -> &TransformSet<R> {
        &self.transforms
    }

    /// The canvas painted so far.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The canvas, for dumping, aging, or exporting.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Where the scalar orbit currently is.
    pub fn point(&self) -> Point {
        self.point
    }

    /// Move the orbit `steps` times, marking every point visited.
    pub fn iterate(&mut self, steps: u64) {
        for _ in 0..steps {
            let next = self.transforms.move_point(&self.point);
            self.canvas.mark(&next);
            self.point = if next.is_finite() {
                next
            } else {
                Point::origin()
            };
        }
    }

    /// Move four orbits at once for `steps` points in total, rounded up
    /// to a whole number of batches.
    pub fn iterate_batched(&mut self, steps: u64) {
        for _ in 0..batch_rounds(steps) {
            let next = self.transforms.move_batch(&self.batch);
            self.canvas.mark_batch(&next);
            let mut points = point::unpack(&next);
            for p in points.iter_mut().filter(|p| !p.is_finite()) {
                *p = Point::origin();
            }
            self.batch = point::pack(points);
        }
    }

    /// Nudge one transform.  Returns its tag.
    pub fn perturb(&mut self) -> usize {
        self.transforms.perturb()
    }

    /// Color the canvas.
    pub fn colorize(&self) -> Raster {
        render::colorize(&self.canvas)
    }
}

// Batches needed for `steps` points, rounding up without overflowing.
fn batch_rounds(steps: u64) -> u64 {
    let lanes = LANES as u64;
    steps / lanes + (steps % lanes != 0) as u64
}
