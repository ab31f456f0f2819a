use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use thiserror::Error;

use crate::utils::{format_vec3, parse_vec3, SamplingMode, Vec3};

pub const HELP_FLAG: &str = "--help";

// CLI Parameters
// -----------
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Renders the tensors of a DTI/DWI volume as superquadric glyphs on a cutting plane",
    long_about = None,
    disable_help_flag = true
)]
struct Args {
    /// Input volume (legacy VTK structured points with point tensors)
    #[arg(value_name = "FILE")]
    input_path: PathBuf,

    /// Phi resolution of the glyph template
    #[arg(long = "phires", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    phi_resolution: u32,

    /// Theta resolution of the glyph template
    #[arg(long = "thetares", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    theta_resolution: u32,

    /// Phi roundness of the glyph template
    #[arg(long = "phi", default_value_t = 1.0, allow_negative_numbers = true)]
    phi_roundness: f32,

    /// Theta roundness of the glyph template
    #[arg(long = "theta", default_value_t = 0.5, allow_negative_numbers = true)]
    theta_roundness: f32,

    /// Maximum number of sampled points (glyphs)
    #[arg(long = "p", default_value = "10000")]
    max_points: NonZeroUsize,

    /// Window width in pixels
    #[arg(long = "x", default_value_t = 640, value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Window height in pixels
    #[arg(long = "y", default_value_t = 480, value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,

    /// Cutting plane origin as x,y,z
    #[arg(long = "origin", default_value = "0,0,0", value_parser = parse_vec3, allow_hyphen_values = true)]
    plane_origin: Vec3,

    /// Cutting plane normal as x,y,z
    #[arg(long = "normal", default_value = "0,1,0", value_parser = parse_normal, allow_hyphen_values = true)]
    plane_normal: Vec3,

    /// Point sampling mode
    #[arg(long = "sampling", default_value = "stratified")]
    sampling: SamplingMode,

    /// Seed for the point sampler (random when omitted)
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Print this usage text
    #[arg(long = "help", action = ArgAction::Help)]
    help: Option<bool>,
}

fn parse_normal(input: &str) -> Result<Vec3, String> {
    let normal = parse_vec3(input)?;
    if normal.magnitude() == 0. {
        return Err(String::from("Plane normal must not be zero"));
    }
    Ok(normal)
}

/// Everything a run needs, fixed once the command line is parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub input_path: PathBuf,
    pub phi_resolution: u32,
    pub theta_resolution: u32,
    pub phi_roundness: f32,
    pub theta_roundness: f32,
    pub max_points: usize,
    pub width: u32,
    pub height: u32,
    pub plane_origin: Vec3,
    pub plane_normal: Vec3,
    pub sampling: SamplingMode,
    pub seed: Option<u64>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            input_path: args.input_path,
            phi_resolution: args.phi_resolution,
            theta_resolution: args.theta_resolution,
            phi_roundness: args.phi_roundness,
            theta_roundness: args.theta_roundness,
            max_points: args.max_points.get(),
            width: args.width,
            height: args.height,
            plane_origin: args.plane_origin,
            plane_normal: args.plane_normal,
            sampling: args.sampling,
            seed: args.seed,
        }
    }
}

impl Config {
    /// Serializes the configuration back into a command line (program name first).
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            env!("CARGO_PKG_NAME").into(),
            self.input_path.clone().into_os_string(),
        ];
        let mut flag = |name: &str, value: String| {
            args.push(name.into());
            args.push(value.into());
        };
        flag("--phires", self.phi_resolution.to_string());
        flag("--thetares", self.theta_resolution.to_string());
        flag("--phi", self.phi_roundness.to_string());
        flag("--theta", self.theta_roundness.to_string());
        flag("--p", self.max_points.to_string());
        flag("--x", self.width.to_string());
        flag("--y", self.height.to_string());
        flag("--origin", format_vec3(&self.plane_origin));
        flag("--normal", format_vec3(&self.plane_normal));
        flag("--sampling", self.sampling.name().to_string());
        if let Some(seed) = self.seed {
            flag("--seed", seed.to_string());
        }
        args
    }
}

#[derive(Debug)]
pub enum Command {
    /// Usage text was requested.
    Help,
    /// Version text was requested; carries the rendered text.
    Version(String),
    Render(Config),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("missing input volume path: {0}")]
    MissingInput(#[source] clap::Error),
    #[error("invalid value: {0}")]
    InvalidValue(#[source] clap::Error),
    #[error("unrecognized arguments: {0}")]
    Unexpected(#[source] clap::Error),
}

impl CliError {
    /// The parser's own classification of the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::MissingInput(err) | CliError::InvalidValue(err) | CliError::Unexpected(err) => {
                err.kind()
            }
        }
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> Self {
        match err.kind() {
            ErrorKind::MissingRequiredArgument => CliError::MissingInput(err),
            ErrorKind::InvalidValue | ErrorKind::ValueValidation | ErrorKind::NoEquals => {
                CliError::InvalidValue(err)
            }
            _ => CliError::Unexpected(err),
        }
    }
}

/// Parses a full argument list, program name included.
///
/// `--help` anywhere in the list wins over every other argument, even
/// malformed ones, so it is checked before clap sees the list.
pub fn parse_args<I, T>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.iter().any(|arg| arg == HELP_FLAG) {
        return Ok(Command::Help);
    }
    match Args::try_parse_from(args) {
        Ok(args) => Ok(Command::Render(Config::from(args))),
        Err(err) if err.kind() == ErrorKind::DisplayVersion => {
            Ok(Command::Version(err.render().to_string()))
        }
        Err(err) => Err(CliError::from(err)),
    }
}

pub fn usage() -> String {
    Args::command().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(args: &[&str]) -> Config {
        match parse_args(args.iter().copied()) {
            Ok(Command::Render(config)) => config,
            other => panic!("expected a render config, got {:?}", other),
        }
    }

    #[test]
    fn omitted_flags_use_defaults() {
        let config = render(&["tensor-glyphs", "volume.vtk"]);
        assert_eq!(config.input_path, PathBuf::from("volume.vtk"));
        assert_eq!(config.phi_resolution, 4);
        assert_eq!(config.theta_resolution, 4);
        assert_eq!(config.phi_roundness, 1.0);
        assert_eq!(config.theta_roundness, 0.5);
        assert_eq!(config.max_points, 10000);
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 480);
        assert_eq!(config.plane_origin, Vec3::new(0., 0., 0.));
        assert_eq!(config.plane_normal, Vec3::new(0., 1., 0.));
        assert_eq!(config.sampling, SamplingMode::Stratified);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn glyph_and_window_flags_override_defaults() {
        let config = render(&[
            "tensor-glyphs",
            "volume.vtk",
            "--phires",
            "6",
            "--thetares",
            "6",
            "--phi",
            "0.7",
            "--theta",
            "0.3",
            "--x",
            "800",
            "--y",
            "600",
        ]);
        assert_eq!(config.input_path, PathBuf::from("volume.vtk"));
        assert_eq!(config.phi_resolution, 6);
        assert_eq!(config.theta_resolution, 6);
        assert_eq!(config.phi_roundness, 0.7);
        assert_eq!(config.theta_roundness, 0.3);
        assert_eq!(config.max_points, 10000);
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 600);
    }

    #[test]
    fn help_wins_at_any_position() {
        let cases: &[&[&str]] = &[
            &["tensor-glyphs", "--help"],
            &["tensor-glyphs", "volume.vtk", "--x", "800", "--help"],
            &["tensor-glyphs", "--x", "not-a-number", "--help"],
            &["tensor-glyphs", "--help", "--unknown"],
        ];
        for args in cases {
            assert!(
                matches!(parse_args(args.iter().copied()), Ok(Command::Help)),
                "{:?} should request help",
                args
            );
        }
    }

    #[test]
    fn non_numeric_values_fail() {
        for flag in ["--phires", "--thetares", "--phi", "--theta", "--p", "--x", "--y"] {
            let err = parse_args(["tensor-glyphs", "volume.vtk", flag, "abc"])
                .expect_err("non numeric value must fail");
            assert!(matches!(err, CliError::InvalidValue(_)), "{}: {:?}", flag, err);
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn missing_input_fails() {
        let err = parse_args(["tensor-glyphs", "--x", "800"]).expect_err("input is required");
        assert!(matches!(err, CliError::MissingInput(_)));
    }

    #[test]
    fn unknown_flags_fail() {
        let err = parse_args(["tensor-glyphs", "volume.vtk", "--bogus", "1"])
            .expect_err("unknown flag must fail");
        assert!(matches!(err, CliError::Unexpected(_)));
    }

    #[test]
    fn flag_without_value_fails() {
        assert!(parse_args(["tensor-glyphs", "volume.vtk", "--x"]).is_err());
    }

    #[test]
    fn zero_counts_and_sizes_fail() {
        for flag in ["--phires", "--thetares", "--p", "--x", "--y"] {
            let err = parse_args(["tensor-glyphs", "volume.vtk", flag, "0"])
                .expect_err("zero must fail");
            assert!(matches!(err, CliError::InvalidValue(_)), "{}: {:?}", flag, err);
        }
        let config = render(&["tensor-glyphs", "volume.vtk", "--x", "1", "--p", "1"]);
        assert_eq!(config.width, 1);
        assert_eq!(config.max_points, 1);
    }

    #[test]
    fn zero_normal_is_rejected() {
        let err = parse_args(["tensor-glyphs", "volume.vtk", "--normal", "0,0,0"])
            .expect_err("zero normal must fail");
        assert!(matches!(err, CliError::InvalidValue(_)));
    }

    #[test]
    fn plane_and_sampling_flags_parse() {
        let config = render(&[
            "tensor-glyphs",
            "volume.vtk",
            "--origin",
            "-1,2.5,0",
            "--normal",
            "0,0,-1",
            "--sampling",
            "uniform",
            "--seed",
            "42",
            "--p",
            "250",
        ]);
        assert_eq!(config.plane_origin, Vec3::new(-1., 2.5, 0.));
        assert_eq!(config.plane_normal, Vec3::new(0., 0., -1.));
        assert_eq!(config.sampling, SamplingMode::Uniform);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_points, 250);
    }

    #[test]
    fn reparsing_serialized_config_is_identity() {
        let configs = [
            render(&["tensor-glyphs", "volume.vtk"]),
            render(&[
                "tensor-glyphs",
                "data/brain dti.vtk",
                "--phires",
                "12",
                "--theta",
                "-0.25",
                "--phi",
                "2.75",
                "--p",
                "1",
                "--origin",
                "0.1,-0.2,3e-5",
                "--sampling",
                "stride",
                "--seed",
                "7",
            ]),
        ];
        for config in configs {
            let reparsed = match parse_args(config.to_args()) {
                Ok(Command::Render(reparsed)) => reparsed,
                other => panic!("expected a render config, got {:?}", other),
            };
            assert_eq!(reparsed, config);
        }
    }

    #[test]
    fn usage_lists_every_flag() {
        let text = usage();
        for flag in [
            "--phires", "--thetares", "--phi", "--theta", "--p", "--x", "--y", "--help",
        ] {
            assert!(text.contains(flag), "usage is missing {}", flag);
        }
    }
}
