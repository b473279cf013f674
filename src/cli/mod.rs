//! Command-line parsing for the `rheofit` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code: everything here converts to plain library types
//! (`InitSpec`, `FixSpec`, `MinimizerOptions`, `SamplerConfig`) in `app`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{Method, ParamInit};
use crate::rheo::{LOSS_COLUMN, OMEGA_COLUMN, SHEAR_RATE_COLUMN, STORAGE_COLUMN, VISCOSITY_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rheofit", version, about = "Curve fitting for small experimental datasets")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a basic model (linear, power, quadratic, exponential) to two columns.
    Fit(FitArgs),
    /// Fit a single-mode Maxwell model to G'(ω) and G''(ω).
    Maxwell(MaxwellArgs),
    /// Fit the Cole-Cole semicircle G''(G').
    Colecole(ColeColeArgs),
    /// Zero-shear viscosity from the plateau of a flow curve.
    Flow(FlowArgs),
}

/// Options shared by every subcommand that reads a table.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Delimited text file with a header row.
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// Column delimiter.
    #[arg(long, default_value_t = ';')]
    pub delimiter: char,

    /// Print the result as JSON instead of a text report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Column holding x.
    #[arg(long)]
    pub x: String,

    /// Column holding y.
    #[arg(long)]
    pub y: String,

    /// Column holding the uncertainty of y (weights are 1/|dy|).
    #[arg(long)]
    pub dy: Option<String>,

    /// Model name.
    #[arg(short, long)]
    pub model: String,

    /// Starting value, optionally bounded: NAME=VAL[:MIN:MAX] (empty bound = none).
    #[arg(long, value_name = "NAME=VAL[:MIN:MAX]", value_parser = parse_init)]
    pub init: Vec<(String, ParamInit)>,

    /// Hold a parameter constant: NAME=VAL.
    #[arg(long, value_name = "NAME=VAL", value_parser = parse_fix)]
    pub fix: Vec<(String, f64)>,

    /// Least-squares minimizer.
    #[arg(long, value_enum, default_value_t = Method::LeastSquares)]
    pub method: Method,

    /// Residual evaluation budget (default 2000 * (free parameters + 1)).
    #[arg(long)]
    pub max_nfev: Option<usize>,

    /// Sample the posterior with an ensemble MCMC after the least-squares fit.
    #[arg(long)]
    pub bayes: bool,

    #[command(flatten)]
    pub sampler: SamplerArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SamplerArgs {
    /// Number of walkers (even).
    #[arg(long, default_value_t = 100)]
    pub walkers: usize,

    /// Leading iterations to discard.
    #[arg(long, default_value_t = 300)]
    pub burn: usize,

    /// Total iterations.
    #[arg(long, default_value_t = 1000)]
    pub steps: usize,

    /// Keep every N-th iteration.
    #[arg(long, default_value_t = 20)]
    pub thin: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Column names of an oscillatory sweep.
#[derive(Debug, Args, Clone)]
pub struct RheoColumns {
    #[arg(long, default_value = OMEGA_COLUMN)]
    pub omega_col: String,

    #[arg(long, default_value = STORAGE_COLUMN)]
    pub storage_col: String,

    #[arg(long, default_value = LOSS_COLUMN)]
    pub loss_col: String,
}

#[derive(Debug, Args, Clone)]
pub struct MaxwellArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub columns: RheoColumns,

    /// Only frequencies below this value (rad/s) are fitted.
    #[arg(long, default_value_t = 40.0)]
    pub omega_max: f64,
}

#[derive(Debug, Args, Clone)]
pub struct ColeColeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub columns: RheoColumns,

    /// Only samples with G'/G''max below this ratio enter the arc fit.
    #[arg(long, default_value_t = 30.0)]
    pub omega_max: f64,

    /// G''max is searched among frequencies below this value (rad/s).
    #[arg(long, default_value_t = f64::INFINITY)]
    pub gpmax: f64,

    /// Also extrapolate the high-frequency tail to its G''=0 intercept.
    #[arg(long)]
    pub fit_g0: bool,

    /// Lower frequency bound (exclusive) of the tail fit.
    #[arg(long, default_value_t = 0.0)]
    pub g0_min: f64,

    /// Upper frequency bound (exclusive) of the tail fit.
    #[arg(long, default_value_t = 200.0)]
    pub g0_max: f64,
}

#[derive(Debug, Args, Clone)]
pub struct FlowArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, default_value = SHEAR_RATE_COLUMN)]
    pub shear_rate_col: String,

    #[arg(long, default_value = VISCOSITY_COLUMN)]
    pub viscosity_col: String,

    /// Shear rate window (1/s), exclusive.
    #[arg(long, default_value_t = 0.02)]
    pub gp_min: f64,

    #[arg(long, default_value_t = 0.2)]
    pub gp_max: f64,

    /// Viscosity window (Pa s), exclusive.
    #[arg(long, default_value_t = 0.0)]
    pub eta_min: f64,

    #[arg(long, default_value_t = 100.0)]
    pub eta_max: f64,
}

/// Parse `NAME=VAL[:MIN:MAX]`.
pub fn parse_init(s: &str) -> Result<(String, ParamInit), String> {
    let (name, rest) = split_assignment(s)?;
    let mut parts = rest.split(':');
    let value = parse_number(parts.next().unwrap_or(""), "value")?;
    let min = parse_bound(parts.next())?;
    let max = parse_bound(parts.next())?;
    if parts.next().is_some() {
        return Err(format!("'{s}': expected NAME=VAL[:MIN:MAX]"));
    }
    Ok((name, ParamInit::bounded(value, min, max)))
}

/// Parse `NAME=VAL`.
pub fn parse_fix(s: &str) -> Result<(String, f64), String> {
    let (name, rest) = split_assignment(s)?;
    Ok((name, parse_number(rest, "value")?))
}

fn split_assignment(s: &str) -> Result<(String, &str), String> {
    let (name, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}': expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("'{s}': empty parameter name"));
    }
    Ok((name.to_string(), rest))
}

fn parse_bound(part: Option<&str>) -> Result<Option<f64>, String> {
    match part.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_number(v, "bound").map(Some),
    }
}

fn parse_number(v: &str, what: &str) -> Result<f64, String> {
    v.trim()
        .parse()
        .map_err(|_| format!("invalid {what} '{}'", v.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_accepts_optional_bounds() {
        assert_eq!(
            parse_init("n=1.5").unwrap(),
            ("n".to_string(), ParamInit::new(1.5))
        );
        assert_eq!(
            parse_init("n=1:0:6").unwrap().1,
            ParamInit::bounded(1.0, Some(0.0), Some(6.0))
        );
        assert_eq!(
            parse_init("t=2::10").unwrap().1,
            ParamInit::bounded(2.0, None, Some(10.0))
        );
        assert!(parse_init("n").is_err());
        assert!(parse_init("n=x").is_err());
        assert!(parse_init("n=1:0:6:9").is_err());
    }

    #[test]
    fn fix_requires_a_number() {
        assert_eq!(parse_fix("b=0.75").unwrap(), ("b".to_string(), 0.75));
        assert!(parse_fix("=1").is_err());
    }

    #[test]
    fn fit_subcommand_parses() {
        let cli = Cli::parse_from([
            "rheofit", "-vv", "fit", "-f", "data.csv", "--x", "t", "--y", "v", "-m", "power",
            "--init", "n=2:0:6", "--fix", "b=0", "--method", "nelder",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model, "power");
        assert_eq!(args.method, Method::NelderMead);
        assert_eq!(args.init.len(), 1);
        assert_eq!(args.fix, vec![("b".to_string(), 0.0)]);
        assert_eq!(args.input.delimiter, ';');
        assert_eq!(args.sampler.walkers, 100);
    }

    #[test]
    fn colecole_defaults() {
        let cli = Cli::parse_from(["rheofit", "colecole", "-f", "sweep.txt"]);
        let Command::Colecole(args) = cli.command else {
            panic!("expected colecole");
        };
        assert_eq!(args.omega_max, 30.0);
        assert!(args.gpmax.is_infinite());
        assert_eq!((args.g0_min, args.g0_max), (0.0, 200.0));
        assert_eq!(args.columns.loss_col, "G'' in Pa");
    }

    #[test]
    fn flow_window_defaults_and_overrides() {
        let cli = Cli::parse_from(["rheofit", "flow", "-f", "fc.txt", "--gp-max", "0.5"]);
        let Command::Flow(args) = cli.command else {
            panic!("expected flow");
        };
        assert_eq!((args.gp_min, args.gp_max), (0.02, 0.5));
        assert_eq!((args.eta_min, args.eta_max), (0.0, 100.0));
        assert_eq!(args.viscosity_col, "Eta in Pas");
    }
}
