#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal flame renderer
//!
//! An iterated function system (IFS) is a small collection of affine
//! maps on the plane.  Start with any point, pick one of the maps at
//! random, apply it, and repeat.  The orbit that results settles onto
//! a self-similar attractor, and if every pixel the orbit passes
//! through is tallied, the tallies after a few billion steps
//! approximate the invariant measure of the system.
//!
//! Each tally is kept per map, as a separate layer of the canvas.
//! When the image is exported every map gets its own hue, evenly
//! spaced around the color wheel, and a pixel's color is the sum of
//! those hues weighted by how often each map landed there.  The
//! brightness is the log of the visit count relative to the busiest
//! pixel in the image.
//!
//! The pieces, leaf first: [`Point`] and [`PointBatch`], the
//! [`AffineTransform`] and the [`TransformSet`] that chooses among
//! them, the [`Canvas`] histogram, the [`Colorizer`], and the
//! [`Flame`] that ties a set and a canvas together.

extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate rand;
extern crate rand_distr;
extern crate rand_xoshiro;

#[cfg(test)]
extern crate tempfile;

pub mod canvas;
pub mod colorizer;
pub mod error;
pub mod flame;
pub mod planes;
pub mod point;
pub mod render;
pub mod transform;

pub use canvas::{Canvas, CanvasStats};
pub use colorizer::Colorizer;
pub use error::FlameError;
pub use flame::Flame;
pub use planes::{CanvasConfig, PlaneMapper};
pub use point::{Point, PointBatch, LANES};
pub use render::Raster;
pub use transform::{AffineTransform, TransformSet};
