// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The histogram the chaos game paints into.
//!
//! Every cell has two counters.  The narrow one is a byte, small
//! enough that the whole hot working set stays in cache; the wide one
//! is a u64 that can hold any count a render will ever reach.  The
//! true count of a cell is always `wide + narrow`.  When a narrow
//! counter wraps, the 256 it just lost is carried into the wide
//! counter on the same increment, so no count is ever dropped no
//! matter how long the render runs and no sweep is needed to keep the
//! counters honest.  `dump` folds every narrow counter into its wide
//! counter anyway, before anything is read out.

use error::FlameError;
use itertools::{iproduct, Itertools};
use planes::{CanvasConfig, PlaneMapper};
use point::{Point, PointBatch};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// What one carry is worth: one more than the narrow counter can hold.
const CARRY: u64 = u8::max_value() as u64 + 1;

/// A square, layered histogram of visit counts.
pub struct Canvas {
    mapper: PlaneMapper,
    narrow: Vec<u8>,
    wide: Vec<u64>,
}

impl Canvas {
    /// An empty canvas of the given shape.  Both buffers carry one
    /// extra cell past the end of the volume, used as the scratch cell
    /// for batch lanes that miss the grid.
    pub fn new(config: CanvasConfig) -> Canvas {
        let cells = config.len() + 1;
        Canvas {
            mapper: PlaneMapper::new(config),
            narrow: vec![0 as u8; cells],
            wide: vec![0 as u64; cells],
        }
    }

    /// The shape of this canvas.
    pub fn config(&self) -> CanvasConfig {
        self.mapper.config()
    }

    /// Width and height in pixels.
    pub fn size(&self) -> usize {
        self.mapper.config().size
    }

    /// Number of layers.
    pub fn layers(&self) -> usize {
        self.mapper.config().layers
    }

    /// The mapper used to turn points into cells.
    pub fn mapper(&self) -> &PlaneMapper {
        &self.mapper
    }

    #[inline]
    fn increment(&mut self, offset: usize) {
        let (value, wrapped) = self.narrow[offset].overflowing_add(1);
        self.narrow[offset] = value;
        self.wide[offset] += (wrapped as u64) * CARRY;
    }

    /// Count one visit at `point`.  Points off the grid are ignored.
    #[inline]
    pub fn mark(&mut self, point: &Point) {
        if let Some(offset) = self.mapper.point_to_offset(point) {
            self.increment(offset);
        }
    }

    /// Count one visit for each lane.  Lanes off the grid are counted
    /// into the scratch cell, which is cleared again before returning.
    #[inline]
    pub fn mark_batch(&mut self, batch: &PointBatch) {
        for offset in self.mapper.batch_to_offsets(batch).iter() {
            self.increment(*offset);
        }
        let scratch = self.mapper.scratch();
        self.narrow[scratch] = 0;
        self.wide[scratch] = 0;
    }

    /// Fold every narrow counter into its wide counter.
    pub fn dump(&mut self) {
        for (wide, narrow) in self.wide.iter_mut().zip(self.narrow.iter_mut()) {
            *wide += u64::from(*narrow);
            *narrow = 0;
        }
    }

    /// Age the whole canvas: every count becomes `ceil(0.99 * count)`.
    /// Lets a long or animated render forget structure it has moved
    /// away from.
    pub fn reduce(&mut self) {
        self.dump();
        for wide in self.wide.iter_mut() {
            *wide -= *wide / 100;
        }
    }

    /// The true count at a cell offset.
    pub fn count(&self, offset: usize) -> u64 {
        self.wide[offset] + u64::from(self.narrow[offset])
    }

    /// The per-layer counts at pixel (left, top), in layer order.
    pub fn layer_counts<'a>(&'a self, left: usize, top: usize) -> impl Iterator<Item = u64> + 'a {
        (0..self.layers()).map(move |layer| self.count(self.mapper.pixel_to_offset(left, top, layer)))
    }

    /// The count at pixel (left, top) summed over every layer.
    pub fn column_total(&self, left: usize, top: usize) -> u64 {
        self.layer_counts(left, top).sum()
    }

    /// The largest count in any single cell.
    pub fn peak(&self) -> u64 {
        (0..self.config().len())
            .map(|offset| self.count(offset))
            .max()
            .unwrap_or(0)
    }

    /// Summary statistics over the pixel columns.
    pub fn stats(&self) -> CanvasStats {
        let size = self.size();
        let columns: Vec<u64> = iproduct!(0..size, 0..size)
            .map(|(top, left)| self.column_total(left, top))
            .collect();
        let n = columns.len() as f64;
        let total: u64 = columns.iter().sum();
        let mean = total as f64 / n;
        let variance = columns
            .iter()
            .map(|&c| (c as f64 - mean) * (c as f64 - mean))
            .sum::<f64>()
            / n;
        CanvasStats {
            total,
            mean,
            std_dev: variance.sqrt(),
            peak: self.peak(),
            min: columns.iter().cloned().min().unwrap_or(0),
            spread: columns.iter().filter(|&&c| c > 0).count() as f64 / n,
        }
    }

    /// Write the histogram as text: the size on the first line, then
    /// one line per row of comma separated column totals.  Dumps first.
    pub fn write_histogram<W: Write>(&mut self, out: &mut W) -> Result<(), FlameError> {
        self.dump();
        let size = self.size();
        writeln!(out, "{}", size)?;
        for top in 0..size {
            let row = (0..size).map(|left| self.column_total(left, top)).join(", ");
            writeln!(out, "{}", row)?;
        }
        Ok(())
    }

    /// Write the histogram text to a file.  A file that can't be
    /// created or written leaves the canvas as it was.
    pub fn save_histogram<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FlameError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_histogram(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

/// Diagnostics over the (x, y) columns of a canvas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CanvasStats {
    /// Every visit counted.
    pub total: u64,
    /// Average visits per column.
    pub mean: f64,
    /// Standard deviation of visits per column.
    pub std_dev: f64,
    /// The largest count in any single cell.
    pub peak: u64,
    /// The smallest column total.
    pub min: u64,
    /// Fraction of columns visited at least once.
    pub spread: f64,
}

impl fmt::Display for CanvasStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "total {} | mean {:.3} | std {:.3} | peak {} | min {} | spread {:.2}%",
            self.total,
            self.mean,
            self.std_dev,
            self.peak,
            self.min,
            self.spread * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(size: usize, layers: usize) -> Canvas {
        Canvas::new(CanvasConfig::new(size, layers).unwrap())
    }

    #[test]
    fn counts_survive_many_wraps() {
        let mut c = canvas(4, 1);
        let p = Point::new(0.0, 0.0, 0);
        let offset = c.mapper().point_to_offset(&p).unwrap();
        for i in 1..=100_000u64 {
            c.mark(&p);
            assert_eq!(c.count(offset), i);
        }
        assert_eq!(c.wide[offset], 100_000 / 256 * 256);
        assert_eq!(u64::from(c.narrow[offset]), 100_000 % 256);
    }

    #[test]
    fn dump_keeps_the_true_count() {
        let mut c = canvas(4, 2);
        let p = Point::new(-0.5, 0.5, 1);
        for _ in 0..1000 {
            c.mark(&p);
        }
        let offset = c.mapper().point_to_offset(&p).unwrap();
        c.dump();
        assert_eq!(c.narrow[offset], 0);
        assert_eq!(c.wide[offset], 1000);
        assert_eq!(c.count(offset), 1000);
    }

    #[test]
    fn off_grid_points_count_nowhere() {
        let mut c = canvas(4, 2);
        c.mark(&Point::new(1.0, 1.0, 0));
        c.mark(&Point::new(-1.5, 0.0, 0));
        c.mark(&Point::new(0.0, 0.0, 2));
        c.mark(&Point::new(::std::f32::NAN, 0.0, 0));
        assert_eq!(c.stats().total, 0);
        assert_eq!(c.peak(), 0);
    }

    #[test]
    fn batches_leave_the_first_cell_alone() {
        let mut c = canvas(4, 1);
        let corner = Point::new(-1.0, -1.0, 0);
        let mut batch = PointBatch::splat(Point::new(3.0, 3.0, 0));
        batch.set(2, corner);
        for _ in 0..600 {
            c.mark_batch(&batch);
        }
        assert_eq!(c.count(0), 600);
        assert_eq!(c.stats().total, 600);
        let scratch = c.mapper().scratch();
        assert_eq!(c.count(scratch), 0);
    }

    #[test]
    fn batches_count_every_lane() {
        let mut c = canvas(8, 2);
        let mut batch = PointBatch::splat(Point::new(0.1, 0.1, 0));
        batch.set(1, Point::new(0.1, 0.1, 1));
        batch.set(3, Point::new(-0.9, 0.7, 1));
        for _ in 0..300 {
            c.mark_batch(&batch);
        }
        let (left, top) = c.mapper().point_to_pixel(&Point::new(0.1, 0.1, 0)).unwrap();
        assert_eq!(c.layer_counts(left, top).collect::<Vec<_>>(), vec![600, 300]);
        assert_eq!(c.stats().total, 1200);
    }

    #[test]
    fn reduce_ages_and_rounds_up() {
        let mut c = canvas(2, 1);
        let p = Point::new(0.5, 0.5, 0);
        let q = Point::new(-0.5, -0.5, 0);
        for _ in 0..1000 {
            c.mark(&p);
        }
        c.mark(&q);
        c.reduce();
        assert_eq!(c.count(c.mapper().point_to_offset(&p).unwrap()), 990);
        assert_eq!(c.count(c.mapper().point_to_offset(&q).unwrap()), 1);
    }

    #[test]
    fn peak_is_the_busiest_cell() {
        let mut c = canvas(4, 2);
        for _ in 0..5 {
            c.mark(&Point::new(0.0, 0.0, 0));
        }
        for _ in 0..300 {
            c.mark(&Point::new(0.0, 0.0, 1));
        }
        assert_eq!(c.peak(), 300);
    }

    #[test]
    fn stats_cover_columns() {
        let mut c = canvas(2, 2);
        for _ in 0..3 {
            c.mark(&Point::new(-0.5, -0.5, 0));
        }
        c.mark(&Point::new(-0.5, -0.5, 1));
        for _ in 0..4 {
            c.mark(&Point::new(0.5, 0.5, 1));
        }
        let stats = c.stats();
        assert_eq!(stats.total, 8);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std_dev, 2.0);
        assert_eq!(stats.peak, 4);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.spread, 0.5);
    }

    #[test]
    fn histogram_text_sums_to_marks() {
        let mut c = canvas(3, 2);
        let points = [
            Point::new(-0.9, -0.9, 0),
            Point::new(0.0, 0.0, 1),
            Point::new(0.9, -0.2, 0),
            Point::new(2.0, 0.0, 1),
        ];
        for i in 0..1234 {
            c.mark(&points[i % points.len()]);
        }
        let mut out: Vec<u8> = vec![];
        c.write_histogram(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("3"));
        let rows: Vec<Vec<u64>> = lines
            .map(|line| line.split(", ").map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 3));
        let sum: u64 = rows.iter().flat_map(|row| row.iter()).sum();
        // Every fourth mark was off the grid.
        assert_eq!(sum, 1234 - 308);
    }

    #[test]
    fn failed_export_leaves_counts_alone() {
        let mut c = canvas(2, 1);
        let p = Point::new(0.5, 0.5, 0);
        for _ in 0..10 {
            c.mark(&p);
        }
        let dir = ::tempfile::tempdir().unwrap();
        let missing = dir.path().join("no").join("such").join("dir.txt");
        assert!(c.save_histogram(&missing).is_err());
        assert_eq!(c.stats().total, 10);
        let good = dir.path().join("histogram.txt");
        c.save_histogram(&good).unwrap();
        assert!(good.exists());
    }
}
