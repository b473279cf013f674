//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the terminal logger
//! - reads the input table
//! - converts arguments into library configuration
//! - runs the fit and prints the report (or JSON)

use clap::Parser;
use log::{LevelFilter, debug};
use serde::Serialize;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

use crate::cli::{
    Cli, ColeColeArgs, Command, FitArgs, FlowArgs, InputArgs, MaxwellArgs, RheoColumns, SamplerArgs,
};
use crate::domain::{FitResult, FixSpec, InitSpec, Parameter};
use crate::error::AppError;
use crate::fit::{Chain, FitMode, MinimizerOptions, SamplerConfig, fit};
use crate::io::{Table, read_table};
use crate::report::gformat;
use crate::rheo::{ColeCole, Maxwell, MaxwellData, zero_shear_viscosity};

/// Entry point for the `rheofit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Maxwell(args) => handle_maxwell(&args),
        Command::Colecole(args) => handle_colecole(&args),
        Command::Flow(args) => handle_flow(&args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    // A logger may already be installed when embedded; that is not fatal.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let table = load(&args.input)?;
    let x = table.column(&args.x)?;
    let y = table.column(&args.y)?;
    let dy = args.dy.as_deref().map(|c| table.column(c)).transpose()?;

    let (init, fix) = fit_specs_from_args(args);
    let mode = fit_mode_from_args(args);
    let out = fit(x, y, dy, &args.model, &init, &fix, &mode)?;
    emit(&args.input, &out.result, out.chain.as_ref())
}

fn handle_maxwell(args: &MaxwellArgs) -> Result<(), AppError> {
    let data = rheo_data(&load(&args.input)?, &args.columns)?;
    let result = Maxwell::new(data, args.omega_max).fit(&MinimizerOptions::default())?;
    emit(&args.input, &result, None)
}

fn handle_colecole(args: &ColeColeArgs) -> Result<(), AppError> {
    let data = rheo_data(&load(&args.input)?, &args.columns)?;
    let result = ColeCole::new(data, args.omega_max, args.gpmax).fit(
        args.fit_g0,
        (args.g0_min, args.g0_max),
        &MinimizerOptions::default(),
    )?;
    emit(&args.input, &result, None)
}

fn handle_flow(args: &FlowArgs) -> Result<(), AppError> {
    let table = load(&args.input)?;
    let eta0 = zero_shear_viscosity(
        table.column(&args.shear_rate_col)?,
        table.column(&args.viscosity_col)?,
        (args.gp_min, args.gp_max),
        (args.eta_min, args.eta_max),
    )?;
    if args.input.json {
        let json = serde_json::to_string_pretty(&eta0)
            .map_err(|e| AppError::new(4, format!("Failed to serialize result: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", plateau_line(&eta0));
    }
    Ok(())
}

fn plateau_line(p: &Parameter) -> String {
    format!(
        "{} = {} +/- {} Pa s",
        p.name,
        gformat(p.value),
        p.stderr.map_or_else(|| "None".to_string(), gformat)
    )
}

fn load(input: &InputArgs) -> Result<Table, AppError> {
    if !input.delimiter.is_ascii() {
        return Err(AppError::new(
            2,
            format!("Delimiter '{}' must be a single ASCII character.", input.delimiter),
        ));
    }
    read_table(&input.file, input.delimiter as u8)
}

fn rheo_data(table: &Table, cols: &RheoColumns) -> Result<MaxwellData, AppError> {
    Ok(MaxwellData::new(
        table.column(&cols.omega_col)?.to_vec(),
        table.column(&cols.storage_col)?.to_vec(),
        table.column(&cols.loss_col)?.to_vec(),
    )?)
}

pub fn fit_specs_from_args(args: &FitArgs) -> (InitSpec, FixSpec) {
    let init = args.init.iter().cloned().collect();
    let fix = args.fix.iter().cloned().collect();
    (init, fix)
}

pub fn fit_mode_from_args(args: &FitArgs) -> FitMode {
    if args.bayes {
        FitMode::Bayesian(sampler_config_from_args(&args.sampler))
    } else {
        FitMode::LeastSquares(MinimizerOptions {
            max_nfev: args.max_nfev,
            ..MinimizerOptions::with_method(args.method)
        })
    }
}

fn sampler_config_from_args(args: &SamplerArgs) -> SamplerConfig {
    SamplerConfig {
        burn: args.burn,
        steps: args.steps,
        thin: args.thin,
        n_walkers: args.walkers,
        seed: args.seed,
        ..SamplerConfig::default()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    result: &'a FitResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<&'a Chain>,
}

fn emit(input: &InputArgs, result: &FitResult, chain: Option<&Chain>) -> Result<(), AppError> {
    if input.json {
        let json = serde_json::to_string_pretty(&JsonOutput { result, chain })
            .map_err(|e| AppError::new(4, format!("Failed to serialize result: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", result.report);
    }
    debug!("{} finished in {} evaluations", result.method.label(), result.nfev);
    Ok(())
}
