//! Text reports for finished fits.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized
//!
//! The least-squares layout follows the familiar `[[Fit Statistics]]` /
//! `[[Variables]]` / `[[Correlations]]` sections.

use crate::domain::{CredibleInterval, FitResult, Parameter};

/// Correlations below this magnitude are not listed.
const MIN_CORRELATION: f64 = 0.1;

/// Report for a least-squares fit.
pub fn fit_report(fit: &FitResult) -> String {
    let mut out = String::new();

    out.push_str("[[Fit Statistics]]\n");
    out.push_str(&format!("    # fitting method   = {}\n", fit.method.label()));
    out.push_str(&format!("    # function evals   = {}\n", fit.nfev));
    out.push_str(&format!("    # data points      = {}\n", fit.ndata));
    out.push_str(&format!("    # variables        = {}\n", fit.nvarys));
    if let Some(gof) = &fit.goodness_of_fit {
        out.push_str(&format!("    chi-square         = {}\n", gformat(gof.chisqr)));
        out.push_str(&format!("    reduced chi-square = {}\n", gformat(gof.redchi)));
        out.push_str(&format!("    Akaike info crit   = {}\n", gformat(gof.aic)));
        out.push_str(&format!("    Bayesian info crit = {}\n", gformat(gof.bic)));
    }
    if !fit.converged {
        out.push_str(&format!(
            "##  Warning: did not converge ({:?})\n",
            fit.termination
        ));
    }
    if fit.nvarys > 0 && fit.covariance.is_none() {
        out.push_str("##  Warning: uncertainties could not be estimated\n");
    }

    out.push_str("[[Variables]]\n");
    let width = name_width(fit);
    for p in &fit.parameters {
        out.push_str(&format!("    {:<width$} {}\n", format!("{}:", p.name), describe(p)));
    }

    let correlations = correlations(fit);
    if !correlations.is_empty() {
        out.push_str(&format!(
            "[[Correlations]] (unreported correlations are < {MIN_CORRELATION:.3})\n"
        ));
        for (a, b, c) in correlations {
            let label = format!("C({a}, {b})");
            out.push_str(&format!("    {label:<w$} = {c:+.4}\n", w = 2 * width + 4));
        }
    }

    out
}

/// Report for a posterior-sampling fit: maximum-likelihood estimates with
/// credible-interval half-widths, followed by the marginal percentiles.
pub fn ml_report(fit: &FitResult) -> String {
    let title = "Maximum likelihood Estimation";
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(title.len()));
    out.push('\n');

    for p in &fit.parameters {
        match p.stderr {
            Some(e) => out.push_str(&format!("{} = {} +/- {}\n", p.name, gformat(p.value), gformat(e))),
            None => out.push_str(&format!("{} = {} (fixed)\n", p.name, gformat(p.value))),
        }
    }

    let sampled: Vec<(&str, &CredibleInterval)> = fit
        .parameters
        .iter()
        .filter_map(|p| p.credible.as_ref().map(|c| (p.name.as_str(), c)))
        .collect();
    if !sampled.is_empty() {
        let q = CredibleInterval::PERCENTILES;
        out.push_str(&format!(
            "\n{:<8} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
            "", q[0], q[1], q[2], q[3], q[4]
        ));
        for (name, c) in sampled {
            out.push_str(&format!(
                "{:<8} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
                name,
                gformat(c.p02_28),
                gformat(c.p15_9),
                gformat(c.p50),
                gformat(c.p84_2),
                gformat(c.p97_7)
            ));
        }
    }

    out
}

fn describe(p: &Parameter) -> String {
    let value = gformat(p.value);
    if !p.vary {
        return format!("{value} (fixed)");
    }
    let init = format!("(init = {})", gformat(p.init_value));
    match p.stderr {
        Some(e) if p.value != 0.0 => {
            let pct = (e / p.value * 100.0).abs();
            format!("{value} +/- {} ({pct:.2}%) {init}", gformat(e))
        }
        Some(e) => format!("{value} +/- {} {init}", gformat(e)),
        None => format!("{value} {init}"),
    }
}

fn name_width(fit: &FitResult) -> usize {
    fit.parameters
        .iter()
        .map(|p| p.name.len() + 1)
        .max()
        .unwrap_or(0)
        .max(4)
}

/// Pairs of varying parameters with `|corr| >= MIN_CORRELATION`, strongest first.
fn correlations(fit: &FitResult) -> Vec<(String, String, f64)> {
    let Some(cov) = &fit.covariance else {
        return Vec::new();
    };
    let names = &fit.var_names;
    let mut out = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let denom = (cov[i][i] * cov[j][j]).sqrt();
            if denom > 0.0 {
                let c = cov[i][j] / denom;
                if c.abs() >= MIN_CORRELATION {
                    out.push((names[i].clone(), names[j].clone(), c));
                }
            }
        }
    }
    out.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
    out
}

/// Seven significant digits, switching to exponent form for very large or
/// very small magnitudes.
pub fn gformat(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    if v == 0.0 {
        return "0.0000000".to_string();
    }
    let mag = v.abs().log10().floor() as i32;
    if (-4..7).contains(&mag) {
        let decimals = (6 - mag).max(0) as usize;
        format!("{v:.decimals$}")
    } else {
        format!("{v:.6e}")
    }
}
