// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate ifsflame;
#[macro_use]
extern crate log;

use clap::{App, Arg, ArgMatches};
use ifsflame::{render, Flame, FlameError, TransformSet};
use std::str::FromStr;

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const HISTOGRAM: &str = "histogram";
const SIZE: &str = "size";
const TRANSFORMS: &str = "transforms";
const ITERATIONS: &str = "iterations";
const SEED: &str = "seed";
const QUALITY: &str = "quality";
const DECAY: &str = "decay";
const SCALAR: &str = "scalar";

// Points per pass between progress reports and decay checks.
const CHUNK: u64 = 1 << 20;

fn args<'a>() -> ArgMatches<'a> {
    App::new("flame")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Fractal flame renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output JPEG file"),
        )
        .arg(
            Arg::with_name(HISTOGRAM)
                .required(false)
                .long(HISTOGRAM)
                .short("H")
                .takes_value(true)
                .help("Also write the raw histogram as text to this file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1024")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        16_384,
                        "Could not parse image size",
                        "Image size must be between 1 and 16384",
                    )
                })
                .help("Width and height of the output image"),
        )
        .arg(
            Arg::with_name(TRANSFORMS)
                .required(false)
                .long(TRANSFORMS)
                .short("t")
                .takes_value(true)
                .default_value("8")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        64,
                        "Could not parse transform count",
                        "Transform count must be between 1 and 64",
                    )
                })
                .help("Number of affine transforms in the system"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("100000000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u64,
                        u64::max_value(),
                        "Could not parse iteration count",
                        "Iteration count must be positive",
                    )
                })
                .help("Number of points to plot"),
        )
        .arg(
            Arg::with_name(SEED)
                .required(false)
                .long(SEED)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        0u64,
                        u64::max_value(),
                        "Could not parse seed",
                        "Seed out of range",
                    )
                })
                .help("Seed for the random source; omit for a fresh flame every run"),
        )
        .arg(
            Arg::with_name(QUALITY)
                .required(false)
                .long(QUALITY)
                .short("q")
                .takes_value(true)
                .default_value("90")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u8,
                        100,
                        "Could not parse JPEG quality",
                        "JPEG quality must be between 1 and 100",
                    )
                })
                .help("JPEG quality"),
        )
        .arg(
            Arg::with_name(DECAY)
                .required(false)
                .long(DECAY)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1u64,
                        u64::max_value(),
                        "Could not parse decay interval",
                        "Decay interval must be positive",
                    )
                })
                .help("Age the histogram by 1% after every this many passes"),
        )
        .arg(
            Arg::with_name(SCALAR)
                .long(SCALAR)
                .help("Plot one point at a time instead of four"),
        )
        .get_matches()
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

fn run(matches: &ArgMatches) -> Result<(), FlameError> {
    let size: usize = value(matches, SIZE).unwrap_or(1024);
    let count: usize = value(matches, TRANSFORMS).unwrap_or(8);
    let iterations: u64 = value(matches, ITERATIONS).unwrap_or(100_000_000);
    let quality: u8 = value(matches, QUALITY).unwrap_or(90);
    let decay: Option<u64> = value(matches, DECAY);
    let seed: Option<u64> = value(matches, SEED);
    let scalar = matches.is_present(SCALAR);

    let mut flame = Flame::new(TransformSet::seeded(count, seed)?, size)?;
    info!(
        "rendering {} points through {} transforms onto {}x{}",
        iterations, count, size, size
    );
    for (tag, t) in flame.transforms().transforms().iter().enumerate() {
        debug!(
            "transform {}: [{:.3} {:.3} {:.3}; {:.3} {:.3} {:.3}]",
            tag, t.a, t.b, t.c, t.d, t.e, t.f
        );
    }

    let mut remaining = iterations;
    let mut pass = 0u64;
    while remaining > 0 {
        let steps = remaining.min(CHUNK);
        if scalar {
            flame.iterate(steps);
        } else {
            flame.iterate_batched(steps);
        }
        remaining -= steps;
        pass += 1;
        if let Some(interval) = decay {
            if pass % interval == 0 {
                flame.canvas_mut().reduce();
            }
        }
        debug!("pass {}: {} points left", pass, remaining);
    }

    flame.canvas_mut().dump();
    info!("{}", flame.canvas().stats());

    if let Some(path) = matches.value_of(HISTOGRAM) {
        flame.canvas_mut().save_histogram(path)?;
        info!("histogram written to {}", path);
    }

    let output = matches.value_of(OUTPUT).unwrap_or("flame.jpg");
    render::write_jpeg(output, &flame.colorize(), quality)?;
    info!("image written to {}", output);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();
    if let Err(e) = run(&matches) {
        error!("Render failure: {}", e);
        std::process::exit(1);
    }
}
