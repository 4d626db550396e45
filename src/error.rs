// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type the crate reports.  Nothing inside the render
//! loop can fail; only construction (bad sizes) and export (bad
//! files) can.

use failure::Fail;
use std::io;

/// Failures reported at the edges of the renderer.
#[derive(Debug, Fail)]
pub enum FlameError {
    /// A canvas or transform set was asked for with a shape that
    /// cannot work.
    #[fail(display = "invalid configuration: {}", _0)]
    InvalidConfig(String),

    /// Writing a histogram or an image failed.  The canvas is left as
    /// it was and may be exported again.
    #[fail(display = "export failed: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for FlameError {
    fn from(err: io::Error) -> FlameError {
        FlameError::Io(err)
    }
}

impl FlameError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> FlameError {
        FlameError::InvalidConfig(msg.into())
    }
}
