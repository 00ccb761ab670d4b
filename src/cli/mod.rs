//! The `swathio` command-line tool
use crate::driver::Format;
use crate::error::{Error, Result};
use crate::reader::ReadParams;
use clap::Parser;
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about = "Read, average and convert swath sonar and lidar data")]
pub struct Args {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// What to do
    #[command(subcommand)]
    pub cmd: Action,
}

/// Subcommands
#[derive(clap::Subcommand, Debug)]
pub enum Action {
    /// List the supported formats
    Formats {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Count records by kind
    Count {
        path: PathBuf,
        /// Format id, inferred from a .mbNN suffix when omitted
        #[arg(short, long)]
        format: Option<i32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// One line per (averaged) ping
    List {
        path: PathBuf,
        #[arg(short, long)]
        format: Option<i32>,
        #[command(flatten)]
        read: ReadOptions,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summary of a file
    Info {
        path: PathBuf,
        #[arg(short, long)]
        format: Option<i32>,
        #[command(flatten)]
        read: ReadOptions,
    },
    /// Decode a file and write it in another format
    Convert {
        path: PathBuf,
        output: PathBuf,
        /// Input format id
        #[arg(short, long)]
        format: Option<i32>,
        /// Output format id, the input format when omitted
        #[arg(short, long)]
        to: Option<i32>,
    },
    /// Check a platform file and compute lever arms
    Platform {
        path: PathBuf,
        /// Sensor to compute the lever arm for
        #[arg(short, long)]
        sensor: Option<usize>,
        /// Offset of that sensor
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        heading: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        roll: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pitch: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Reading options shared by the subcommands that average pings
#[derive(clap::Args, Debug, Default)]
pub struct ReadOptions {
    /// TOML file with reading parameters; flags override it
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Pings averaged into each output ping
    #[arg(short, long)]
    pub pings: Option<usize>,
    /// Longitude range: -1, 0 or 1
    #[arg(long, allow_hyphen_values = true)]
    pub lonflip: Option<i32>,
    /// west/east/south/north
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    pub bounds: Option<[f64; 4]>,
    /// Reject pings before this RFC 3339 time
    #[arg(long, value_parser = parse_time)]
    pub begin: Option<OffsetDateTime>,
    /// Reject pings after this RFC 3339 time
    #[arg(long, value_parser = parse_time)]
    pub end: Option<OffsetDateTime>,
    /// Minimum speed in km/h
    #[arg(long)]
    pub speedmin: Option<f64>,
    /// Largest gap between pings in seconds
    #[arg(long)]
    pub timegap: Option<f64>,
}

impl ReadOptions {
    /// Defaults, then the parameter file, then flags
    pub fn params(&self) -> Result<ReadParams> {
        let mut params = match &self.params {
            Some(path) => ReadParams::from_toml_file(path)?,
            None => ReadParams::default(),
        };
        if let Some(pings) = self.pings {
            params.pings = pings;
        }
        if let Some(lonflip) = self.lonflip {
            params.lonflip = lonflip;
        }
        if let Some(bounds) = self.bounds {
            params.bounds = bounds;
        }
        if self.begin.is_some() {
            params.begin = self.begin;
        }
        if self.end.is_some() {
            params.end = self.end;
        }
        if let Some(speedmin) = self.speedmin {
            params.speedmin = speedmin;
        }
        if let Some(timegap) = self.timegap {
            params.timegap = timegap;
        }
        params.validate()?;
        Ok(params)
    }
}

fn parse_bounds(s: &str) -> std::result::Result<[f64; 4], String> {
    let values = s
        .split('/')
        .map(|v| v.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect::<std::result::Result<Vec<f64>, String>>()?;
    <[f64; 4]>::try_from(values).map_err(|_| format!("expected west/east/south/north, got {}", s))
}

fn parse_time(s: &str) -> std::result::Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| e.to_string())
}

/// The explicit format, or the one named by the file suffix
fn resolve_format(format: Option<i32>, path: &Path) -> Result<i32> {
    match format {
        Some(id) => Ok(id),
        None => Format::from_path(path).map(|f| f.id()).ok_or_else(|| {
            Error::BadParameter(format!(
                "cannot infer the format of {}, pass --format",
                path.display()
            ))
        }),
    }
}

/// A file when a path is given, stdout otherwise
fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| Error::OpenFail {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(stdout().lock())),
    }
}

/// Run a parsed command line
pub fn run(args: Args) -> Result<()> {
    match args.cmd {
        Action::Formats { output } => {
            formats::formats(output.as_deref())?;
        }
        Action::Count {
            path,
            format,
            output,
        } => {
            let format = resolve_format(format, &path)?;
            count::count(&path, format, output.as_deref())?;
        }
        Action::List {
            path,
            format,
            read,
            output,
        } => {
            let format = resolve_format(format, &path)?;
            list::list(&path, format, read.params()?, output.as_deref())?;
        }
        Action::Info { path, format, read } => {
            let format = resolve_format(format, &path)?;
            info::info(&path, format, read.params()?)?;
        }
        Action::Convert {
            path,
            output,
            format,
            to,
        } => {
            let from = resolve_format(format, &path)?;
            let to = match to {
                Some(id) => id,
                None => resolve_format(None, &output).unwrap_or(from),
            };
            convert::convert(&path, from, &output, to)?;
        }
        Action::Platform {
            path,
            sensor,
            offset,
            heading,
            roll,
            pitch,
            output,
        } => {
            let lever = sensor.map(|s| platform::LeverRequest {
                sensor: s,
                offset,
                heading,
                roll,
                pitch,
            });
            platform::platform(&path, lever, output.as_deref())?;
        }
    };
    Ok(())
}

pub mod convert;
pub mod count;
pub mod formats;
pub mod info;
pub mod list;
pub mod platform;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        assert_eq!(parse_bounds("-10/10/-5/5"), Ok([-10.0, 10.0, -5.0, 5.0]));
        assert!(parse_bounds("1/2/3").is_err());
        assert!(parse_bounds("a/b/c/d").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let options = ReadOptions {
            pings: Some(4),
            timegap: Some(2.5),
            ..ReadOptions::default()
        };
        let params = options.params().unwrap();
        assert_eq!(params.pings, 4);
        assert_eq!(params.timegap, 2.5);
        assert_eq!(params.lonflip, 0);
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(None, Path::new("a.mb43")).unwrap(), 43);
        assert_eq!(resolve_format(Some(231), Path::new("a.mb43")).unwrap(), 231);
        assert!(resolve_format(None, Path::new("a.dat")).is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["swathio", "-vv", "list", "x.mb42", "--pings", "3"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.cmd, Action::List { .. }));
    }
}
