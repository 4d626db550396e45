// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning a finished canvas into pixels, and pixels into a file.

use canvas::Canvas;
use colorizer::Colorizer;
use error::FlameError;
use image::jpeg::JPEGEncoder;
use image::ColorType;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A row-major RGB image, three bytes per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    /// Pixels per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl Raster {
    /// The color of pixel (left, top).
    pub fn pixel(&self, left: usize, top: usize) -> [u8; 3] {
        let offset = 3 * (top * self.width + left);
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ]
    }
}

/// Color every pixel of the canvas.  Brightness is relative to the
/// canvas's busiest cell.
pub fn colorize(canvas: &Canvas) -> Raster {
    let size = canvas.size();
    let layers = canvas.layers();
    let peak = canvas.peak() as f32;
    let mut pixels = vec![0 as u8; size * size * 3];
    for (index, pixel) in pixels.chunks_mut(3).enumerate() {
        let (left, top) = (index % size, index / size);
        let mut colorizer = Colorizer::new(layers);
        for (layer, count) in canvas.layer_counts(left, top).enumerate() {
            colorizer.add_color(layer, count as f32);
        }
        pixel.copy_from_slice(&colorizer.rgb(peak));
    }
    Raster {
        width: size,
        height: size,
        pixels,
    }
}

/// Encode a raster as a JPEG file.
pub fn write_jpeg<P: AsRef<Path>>(path: P, raster: &Raster, quality: u8) -> Result<(), FlameError> {
    let mut output = BufWriter::new(File::create(path)?);
    JPEGEncoder::new_with_quality(&mut output, quality).encode(
        &raster.pixels,
        raster.width as u32,
        raster.height as u32,
        ColorType::RGB(8),
    )?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use planes::CanvasConfig;
    use point::Point;

    #[test]
    fn empty_canvas_is_white() {
        let canvas = Canvas::new(CanvasConfig::new(3, 2).unwrap());
        let raster = colorize(&canvas);
        assert_eq!(raster.pixels.len(), 27);
        assert!(raster.pixels.iter().all(|&b| b == 255));
    }

    #[test]
    fn busiest_pixel_is_saturated() {
        let mut canvas = Canvas::new(CanvasConfig::new(4, 2).unwrap());
        for _ in 0..1000 {
            canvas.mark(&Point::new(0.6, -0.6, 0));
        }
        for _ in 0..3 {
            canvas.mark(&Point::new(-0.6, 0.6, 0));
        }
        let raster = colorize(&canvas);
        assert_eq!(raster.pixel(3, 0), [0, 255, 255]);
        assert_eq!(raster.pixel(0, 0), [255, 255, 255]);
        let faint = raster.pixel(0, 3);
        assert!(faint[0] > 0 && faint[0] < 255);
    }

    #[test]
    fn jpeg_lands_on_disk() {
        let mut canvas = Canvas::new(CanvasConfig::new(16, 1).unwrap());
        for i in 0..256 {
            let t = i as f32 / 128.0 - 1.0;
            canvas.mark(&Point::new(t, t, 0));
        }
        let dir = ::tempfile::tempdir().unwrap();
        let path = dir.path().join("flame.jpg");
        write_jpeg(&path, &colorize(&canvas), 90).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn unwritable_jpeg_is_an_error() {
        let canvas = Canvas::new(CanvasConfig::new(4, 1).unwrap());
        let dir = ::tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("flame.jpg");
        assert!(write_jpeg(&path, &colorize(&canvas), 90).is_err());
    }
}
