// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `Disko`, `Disko::run`, and
//! `DiskoError`.

#[macro_use]
mod common;
mod error;
mod image;

pub use error::DiskoError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser};
use log::info;

use crate::{constants::LOG_FILE_NAME, PROGRESS_BARS};

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Discrete Sky Operator (DiSkO) imaging of radio-interferometer visibilities
Source: https://github.com/tmolteno/disko"#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct Disko {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(flatten)]
    image_args: image::ImageArgs,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Don't draw progress bars.
    #[clap(long)]
    no_progress_bars: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    save_toml: Option<PathBuf>,
}

/// What [`setup_logging`] set up.
#[derive(Debug, Clone)]
pub(crate) struct LogContext {
    /// The file that every log message at debug level or above is appended to.
    pub(crate) log_file: PathBuf,

    pub(crate) verbosity: u8,
}

impl Disko {
    pub fn run(self) -> Result<(), DiskoError> {
        let GlobalArgs {
            verbosity,
            dry_run,
            no_progress_bars,
            save_toml,
        } = self.global_opts;
        let log_context = setup_logging(verbosity)
            .map_err(|e| DiskoError::Generic(format!("Failed to initialise logging: {e}")))?;
        // Enable progress bars if the user didn't say "no progress bars".
        if !no_progress_bars {
            PROGRESS_BARS.store(true);
        }

        // Print the version of disko and its build-time information.
        info!("disko {}", env!("CARGO_PKG_VERSION"));
        display_build_info();

        let args = self.image_args.merge()?;
        if let Some(toml) = save_toml {
            use std::{
                fs::File,
                io::{BufWriter, Write},
            };

            let mut f = BufWriter::new(File::create(toml)?);
            let toml_str = toml::to_string(&args)
                .map_err(|e| DiskoError::Generic(format!("Couldn't serialise arguments: {e}")))?;
            f.write_all(toml_str.as_bytes())?;
        }
        args.run(dry_run, &log_context)?;

        info!("disko complete.");
        Ok(())
    }
}

/// Activate a logger. Messages go to `stdout` and are appended to the log file
/// in the working directory; the file always gets at least debug-level
/// messages. Source code lines are displayed in log messages when verbosity >=
/// 3. Errors are left out of `stdout` because `main` prints them.
fn setup_logging(verbosity: u8) -> Result<LogContext, fern::InitError> {
    let log_file = PathBuf::from(LOG_FILE_NAME);

    let (stdout_level, file_level) = match verbosity {
        0 => (log::LevelFilter::Info, log::LevelFilter::Debug),
        1 => (log::LevelFilter::Debug, log::LevelFilter::Debug),
        _ => (log::LevelFilter::Trace, log::LevelFilter::Trace),
    };
    let stdout = fern::Dispatch::new()
        .level(stdout_level)
        .filter(|metadata| metadata.level() != log::Level::Error)
        .chain(std::io::stdout());
    let file = fern::Dispatch::new()
        .level(file_level)
        .chain(fern::log_file(&log_file)?);

    let logger = if verbosity >= 3 {
        fern::Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{} line {}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.line().unwrap_or(0),
                record.level(),
                message
            ))
        })
    } else {
        fern::Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ))
        })
    };
    logger.chain(stdout).chain(file).apply()?;

    Ok(LogContext {
        log_file,
        verbosity,
    })
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
