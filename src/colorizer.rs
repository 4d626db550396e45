// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Blends the per-layer counts of a single pixel into one color.
//!
//! Each layer owns a direction on the complex plane, evenly spaced
//! around the unit circle.  A pixel's counts are summed as vectors
//! along those directions; the angle of the sum picks the hue and the
//! log of its length, relative to the image's peak count, picks how
//! far the color stands out from the white background.

use num::{clamp, Complex};
use std::f32::consts::PI;

/// Accumulates the layer vectors for one pixel.
#[derive(Copy, Clone, Debug)]
pub struct Colorizer {
    sum: Complex<f32>,
    layers: usize,
}

impl Colorizer {
    /// A fresh accumulator for a canvas with `layers` layers.
    pub fn new(layers: usize) -> Colorizer {
        Colorizer {
            sum: Complex::new(0.0, 0.0),
            layers,
        }
    }

    /// Add `magnitude` visits from layer `layer`.
    pub fn add_color(&mut self, layer: usize, magnitude: f32) {
        let phase = 2.0 * PI * layer as f32 / self.layers as f32;
        self.sum = self.sum + Complex::from_polar(&magnitude, &phase);
    }

    /// The final color, given the largest count anywhere in the image.
    /// A pixel that was never visited is white.
    pub fn rgb(&self, peak: f32) -> [u8; 3] {
        let magnitude = self.sum.norm();
        if magnitude == 0.0 {
            return [255, 255, 255];
        }

        let h = (self.sum.arg() + PI) * 6.0 / (2.0 * PI);
        let mut hh = h;
        while hh > 2.0 {
            hh -= 2.0;
        }

        // A peak of one or less leaves nothing to take the log
        // against; every visited pixel is then as strong as the peak.
        let c = if peak > 1.0 {
            magnitude.max(1.0).ln() / peak.ln()
        } else {
            1.0
        };
        let x = c * (1.0 - (hh - 1.0).abs());

        let (r, g, b) = if h < 1.0 {
            (c, x, 0.0)
        } else if h < 2.0 {
            (x, c, 0.0)
        } else if h < 3.0 {
            (0.0, c, x)
        } else if h < 4.0 {
            (0.0, x, c)
        } else if h < 5.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        let m = 1.0 - c;
        [channel(r + m), channel(g + m), channel(b + m)]
    }
}

/// Scale a [0, 1] component to a byte.  Components can stray outside
/// that range when a pixel's summed vector outgrows the peak, so the
/// value is clamped before narrowing.
fn channel(component: f32) -> u8 {
    clamp((255.0 * component).round(), 0.0, 255.0) as u8
}
