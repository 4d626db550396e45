// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes the relationship
//! between the square [-1, 1) x [-1, 1) on the real plane and a
//! square grid of pixels, one grid per transform layer, laid end to
//! end in a single flat buffer.

use error::FlameError;
use point::{Point, PointBatch, LANES};

/// The shape of a canvas: a `size` x `size` pixel grid, stacked
/// `layers` deep.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CanvasConfig {
    /// Width and height of the pixel grid.
    pub size: usize,
    /// Number of layers; one per transform.
    pub layers: usize,
}

impl CanvasConfig {
    /// Validates the shape.  Both dimensions must be positive, and the
    /// whole volume, plus its scratch cell, must be addressable.
    pub fn new(size: usize, layers: usize) -> Result<CanvasConfig, FlameError> {
        if size == 0 {
            return Err(FlameError::config("canvas size must be positive"));
        }
        if layers == 0 {
            return Err(FlameError::config("canvas must have at least one layer"));
        }
        size.checked_mul(size)
            .and_then(|plane| plane.checked_mul(layers))
            .and_then(|cells| cells.checked_add(1))
            .ok_or_else(|| {
                FlameError::config(format!(
                    "a {}x{} canvas with {} layers is too large to address",
                    size, size, layers
                ))
            })?;
        Ok(CanvasConfig { size, layers })
    }

    /// Pixels in one layer.
    pub fn plane_len(&self) -> usize {
        self.size * self.size
    }

    /// Cells in the whole volume.
    pub fn len(&self) -> usize {
        self.plane_len() * self.layers
    }

    /// Never true for a validated config.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps points on the real plane to offsets into the flat volume.
/// Every lookup that misses the grid is sent to a scratch cell that
/// sits one past the end of the volume.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    config: CanvasConfig,
    // Pixels per unit of real distance.
    grid_factor: f32,
}

impl PlaneMapper {
    /// A mapper for the given canvas shape.
    pub fn new(config: CanvasConfig) -> PlaneMapper {
        PlaneMapper {
            config,
            grid_factor: 0.5 * config.size as f32,
        }
    }

    /// The shape this mapper was built for.
    pub fn config(&self) -> CanvasConfig {
        self.config
    }

    /// The offset of the scratch cell.  Buffers indexed by this
    /// mapper need `config.len() + 1` cells.
    pub fn scratch(&self) -> usize {
        self.config.len()
    }

    /// The pixel column and row under a point, or None when the point
    /// falls outside the grid.  NaN coordinates fail every comparison
    /// and so land outside too.
    pub fn point_to_pixel(&self, point: &Point) -> Option<(usize, usize)> {
        let left = ((point.x + 1.0) * self.grid_factor).floor();
        let top = ((point.y + 1.0) * self.grid_factor).floor();
        let size = self.config.size as f32;
        if left >= 0.0 && left < size && top >= 0.0 && top < size {
            Some((left as usize, top as usize))
        } else {
            None
        }
    }

    /// The offset of the cell a point should be counted in.  Points
    /// outside the grid, or tagged with a layer the canvas doesn't
    /// have, are dropped.
    pub fn point_to_offset(&self, point: &Point) -> Option<usize> {
        if point.tag >= self.config.layers {
            return None;
        }
        self.point_to_pixel(point)
            .map(|(left, top)| self.pixel_to_offset(left, top, point.tag))
    }

    /// The offset of pixel (left, top) in layer `layer`.
    pub fn pixel_to_offset(&self, left: usize, top: usize, layer: usize) -> usize {
        left + self.config.size * top + self.config.plane_len() * layer
    }

    /// Offsets for every lane of a batch.  Lanes that miss the grid
    /// get the scratch offset, so the caller can increment all four
    /// without looking at which ones hit.
    ///
    /// Every lane takes the same path: the hit test becomes a mask and
    /// the offset is selected with it, so there is no branch per lane.
    /// Offsets of missing lanes are computed with wrapping arithmetic
    /// and then thrown away.
    pub fn batch_to_offsets(&self, batch: &PointBatch) -> [usize; LANES] {
        let scratch = self.scratch();
        let size = self.config.size as f32;
        let row = self.config.size;
        let plane = self.config.plane_len();
        let mut offsets = [scratch; LANES];
        for (lane, offset) in offsets.iter_mut().enumerate() {
            let left = ((batch.x.0[lane] + 1.0) * self.grid_factor).floor();
            let top = ((batch.y.0[lane] + 1.0) * self.grid_factor).floor();
            let tag = batch.tag[lane];
            let hit = (left >= 0.0)
                & (left < size)
                & (top >= 0.0)
                & (top < size)
                & (tag < self.config.layers);
            let mask = (hit as usize).wrapping_neg();
            let cell = (left as usize)
                .wrapping_add(row.wrapping_mul(top as usize))
                .wrapping_add(plane.wrapping_mul(tag));
            *offset = (cell & mask) | (scratch & !mask);
        }
        offsets
    }
}
