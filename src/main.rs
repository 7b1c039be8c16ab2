//! Projection calibration helper for depth-camera AR sandboxes.
//! Runs the depth viewer, extracts the calibrated base plane and the four box
//! corners from its output, and rewrites the renderer's BoxLayout file after
//! backing it up. The whole run is one blocking pass: resolve dependencies,
//! capture the viewer output, match five line shapes, validate, write.

mod boxlayout;
mod locate;
mod parse;
mod viewer;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::console::Term;
use rust_decimal::Decimal;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;

/// Environment override for the sand offset; `--sand-offset` wins over it.
const SAND_OFFSET_ENV: &str = "SANDCAL_SAND_OFFSET";
/// Any non-empty value enables dry-run, same as `--dry-run`.
const DRY_RUN_ENV: &str = "SANDCAL_DRY_RUN";
/// Depth of the sand above the calibrated base plane, in centimeters.
const DEFAULT_SAND_OFFSET: &str = "8.7";

fn cli() -> Command {
    Command::new("Sandcal")
        .version("0.1.0")
        .about("Projection calibration helper for depth-camera AR sandboxes")
        .arg(
            Arg::new("boxlayout")
                .long("boxlayout")
                .value_name("FILE")
                .help("BoxLayout file to update (default: newest SARndbox install, or $SANDCAL_BOXLAYOUT)"),
        )
        .arg(
            Arg::new("viewer")
                .long("viewer")
                .value_name("BIN")
                .help("Viewer binary to run (default: RawKinectViewer on PATH, or $SANDCAL_VIEWER)"),
        )
        .arg(
            Arg::new("sand-offset")
                .long("sand-offset")
                .value_name("CM")
                .help("Sand depth subtracted from the measured plane offset [default: 8.7]"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print the five calibration lines instead of writing the BoxLayout file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase diagnostic verbosity, can be used multiple times"),
        )
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let debug_level = match matches.get_count("verbose") {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(debug_level).init();

    let code = match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };

    // The helper is usually launched from a desktop shortcut; keep the report
    // on screen until the user has seen it.
    pause();
    code
}

fn run(matches: &ArgMatches) -> Result<()> {
    // Step 1: resolve the BoxLayout file and the viewer binary
    let boxlayout = locate::boxlayout(matches.get_one::<String>("boxlayout").map(String::as_str))?;
    let viewer_bin = locate::viewer(matches.get_one::<String>("viewer").map(String::as_str))?;

    // Step 2: run the viewer and capture its report
    println!("Starting the viewer. Extract the base plane and the four box corners, then quit it.");
    let output = viewer::capture(&viewer_bin)?;

    // Step 3: scan the report for the five calibration values
    let calibration = parse::Calibration::scan(&output, sand_offset(matches)?);

    // Step 4: all five must be present, or nothing is written
    let lines = match calibration.into_lines() {
        Ok(lines) => lines,
        Err(missing) => {
            for label in &missing {
                eprintln!("Calibration value missing: no {label} in the viewer output");
            }
            bail!("incomplete calibration: {} of 5 values missing", missing.len());
        }
    };

    // Step 5: write the BoxLayout file, or print in dry-run mode
    let dry_run = matches.get_flag("dry-run")
        || env::var_os(DRY_RUN_ENV).is_some_and(|value| !value.is_empty());
    boxlayout::apply(&boxlayout, &lines, dry_run)?;
    if !dry_run {
        println!(
            "Updated {} (previous contents in {}.bak)",
            boxlayout.display(),
            boxlayout.display()
        );
    }
    Ok(())
}

/// Sand depth to subtract from the measured plane offset, as an exact decimal.
fn sand_offset(matches: &ArgMatches) -> Result<Decimal> {
    let value = match matches.get_one::<String>("sand-offset") {
        Some(value) => value.clone(),
        None => env::var(SAND_OFFSET_ENV).unwrap_or_else(|_| DEFAULT_SAND_OFFSET.to_string()),
    };
    Decimal::from_str(&value).with_context(|| format!("invalid sand offset {value:?}"))
}

/// Blocks until a keypress so a terminal opened just for this run does not
/// vanish with the report; skipped when stderr is piped.
fn pause() {
    let term = Term::stderr();
    if !term.is_term() {
        return;
    }
    let _ = term.write_str("Press any key to exit...");
    let _ = term.read_key();
    let _ = term.write_line("");
}
