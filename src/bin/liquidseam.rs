// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use liquidseam::{imageio, BuiltinEnergy, Carver, ResizeOrder, ResizeOutcome};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// A size is either absolute ("320") or relative to the input ("+40",
// "-25").
#[derive(Debug, Clone, Copy)]
enum Size {
    Absolute(usize),
    Relative(isize),
}

fn parse_size(s: &str) -> Result<Size, String> {
    let relative = s.starts_with('+') || s.starts_with('-');
    if relative {
        s.parse::<isize>()
            .map(Size::Relative)
            .map_err(|e| format!("bad relative size {}: {}", s, e))
    } else {
        s.parse::<usize>()
            .map(Size::Absolute)
            .map_err(|e| format!("bad size {}: {}", s, e))
    }
}

fn resolve(size: Option<&Size>, current: usize) -> Result<usize, String> {
    let target = match size {
        None => current as isize,
        Some(Size::Absolute(n)) => *n as isize,
        Some(Size::Relative(d)) => current as isize + d,
    };
    if target < 1 {
        Err(format!("target size {} is below the minimum of 1", target))
    } else {
        Ok(target as usize)
    }
}

fn cli() -> Command {
    Command::new("liquidseam")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Content-aware image resizing")
        .arg(Arg::new("input").help("The image to resize").required(true).index(1))
        .arg(Arg::new("output").help("Where to write the result").required(true).index(2))
        .arg(
            Arg::new("width")
                .short('W')
                .long("width")
                .help("New width; a leading + or - makes it relative")
                .allow_hyphen_values(true)
                .value_parser(parse_size),
        )
        .arg(
            Arg::new("height")
                .short('H')
                .long("height")
                .help("New height; a leading + or - makes it relative")
                .allow_hyphen_values(true)
                .value_parser(parse_size),
        )
        .arg(
            Arg::new("delta-x")
                .long("delta-x")
                .help("Largest sideways step of a seam between rows")
                .default_value("1")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("rigidity")
                .long("rigidity")
                .help("Penalty for bent seams")
                .default_value("0")
                .value_parser(value_parser!(f32)),
        )
        .arg(
            Arg::new("energy")
                .long("energy")
                .help("Energy function")
                .default_value("grad-xabs")
                .value_parser(BuiltinEnergy::NAMES),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .help("Which axis to resize first")
                .default_value("width")
                .value_parser(["width", "height", "interleaved"]),
        )
        .arg(
            Arg::new("enl-step")
                .long("enl-step")
                .help("Largest growth per enlargement pass, as a factor in (1, 2]")
                .default_value("2.0")
                .value_parser(value_parser!(f32)),
        )
        .arg(
            Arg::new("side-switch")
                .long("side-switch")
                .help("How often to flip the left/right tie-break per pass")
                .default_value("0")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More logging; repeat for more")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let input = matches.get_one::<String>("input").ok_or("no input")?;
    let output = matches.get_one::<String>("output").ok_or("no output")?;

    let pixels = imageio::open(input)?;
    let (width, height) = pixels.dimensions();
    info!(input = %input, width, height, "loaded");

    let target_w = resolve(matches.get_one::<Size>("width"), width)?;
    let target_h = resolve(matches.get_one::<Size>("height"), height)?;

    let mut carver = Carver::new(pixels)?;
    let delta_x = matches.get_one::<usize>("delta-x").copied().unwrap_or(1);
    let rigidity = matches.get_one::<f32>("rigidity").copied().unwrap_or(0.0);
    carver.init(delta_x, rigidity)?;
    if let Some(energy) = matches
        .get_one::<String>("energy")
        .and_then(|name| BuiltinEnergy::from_name(name))
    {
        carver.set_energy(energy);
    }
    carver.set_resize_order(match matches.get_one::<String>("order").map(String::as_str) {
        Some("height") => ResizeOrder::Vertical,
        Some("interleaved") => ResizeOrder::Interleaved,
        _ => ResizeOrder::Horizontal,
    });
    carver.set_enl_step(matches.get_one::<f32>("enl-step").copied().unwrap_or(2.0))?;
    carver.set_side_switch_frequency(matches.get_one::<usize>("side-switch").copied().unwrap_or(0));

    match carver.resize(target_w, target_h)? {
        ResizeOutcome::Completed => {}
        ResizeOutcome::Cancelled => return Err("resize was cancelled".into()),
    }

    imageio::save(&carver.image()?, output)?;
    println!("{}x{}", carver.width(), carver.height());
    Ok(())
}

fn main() {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));
    if let Err(e) = run(&matches) {
        error!("{}", e);
        eprintln!("liquidseam: {}", e);
        process::exit(1);
    }
}
