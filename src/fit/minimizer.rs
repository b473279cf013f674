//! Deterministic least-squares minimization.
//!
//! `least_squares` takes any residual closure over the full parameter vector
//! and returns a finished `FitResult`:
//!
//! 1. map the varying parameters into unbounded internal space
//! 2. minimize `Σ r_i²` with Levenberg-Marquardt or Nelder-Mead
//! 3. estimate the covariance from `(JᵀJ)⁻¹` at the optimum, mapped back
//!    through the bound transform and scaled by the reduced chi-square
//! 4. compute chi-square / AIC / BIC and the text report
//!
//! Non-finite residual entries are omitted from the cost. A trial point that
//! produces more non-finite entries than the current iterate is rejected, so a
//! model cannot lower its cost by evaluating to NaN.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::domain::{FitResult, GoodnessOfFit, Method, Parameters, Termination};
use crate::error::FitError;
use crate::math::{normal_inverse, solve_least_squares};
use crate::report::fit_report;

/// Initial trust region radius relative to the scaled starting point.
const STEP_BOUND: f64 = 100.0;

/// Minimizer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizerOptions {
    pub method: Method,
    /// Residual evaluation budget; `None` means `2000 * (nvarys + 1)`.
    pub max_nfev: Option<usize>,
    /// Relative cost reduction tolerance.
    pub ftol: f64,
    /// Relative step tolerance.
    pub xtol: f64,
    /// Gradient orthogonality tolerance (Levenberg-Marquardt only).
    pub gtol: f64,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            method: Method::LeastSquares,
            max_nfev: None,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
        }
    }
}

impl MinimizerOptions {
    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    fn budget(&self, nvarys: usize) -> usize {
        self.max_nfev.unwrap_or(2000 * (nvarys + 1)).max(1)
    }
}

/// Residual evaluation in internal coordinates.
struct Objective<'a, F> {
    residual: &'a F,
    params: &'a Parameters,
}

struct Evaluation {
    /// Residuals with non-finite entries replaced by zero.
    r: Vec<f64>,
    n_finite: usize,
    cost: f64,
}

impl<F> Objective<'_, F>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn raw(&self, u: &[f64]) -> Vec<f64> {
        (self.residual)(&self.params.values_from_internal(u))
    }

    fn eval(&self, u: &[f64]) -> Evaluation {
        let raw = self.raw(u);
        let n_finite = raw.iter().filter(|v| v.is_finite()).count();
        let r: Vec<f64> = raw
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        let cost = r.iter().map(|v| v * v).sum();
        Evaluation { r, n_finite, cost }
    }

    /// Forward-difference Jacobian `∂r/∂u`.
    fn jacobian(&self, u: &[f64], base: &Evaluation) -> DMatrix<f64> {
        let m = base.r.len();
        let n = u.len();
        let mut jac = DMatrix::<f64>::zeros(m, n);
        let mut up = u.to_vec();
        for j in 0..n {
            let h = f64::EPSILON.sqrt() * u[j].abs().max(1.0);
            up[j] = u[j] + h;
            let rp = self.raw(&up);
            for i in 0..m {
                let d = (rp[i] - base.r[i]) / h;
                jac[(i, j)] = if d.is_finite() { d } else { 0.0 };
            }
            up[j] = u[j];
        }
        jac
    }
}

struct Outcome {
    u: Vec<f64>,
    nfev: usize,
    termination: Termination,
}

/// Minimize `Σ residual(p)²` over the varying parameters of `params`.
///
/// `residual` receives the full value vector (fixed parameters included) in
/// the order of `params`.
pub fn least_squares<F>(
    residual: F,
    params: &Parameters,
    opts: &MinimizerOptions,
) -> Result<FitResult, FitError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let obj = Objective {
        residual: &residual,
        params,
    };
    let nvarys = params.nvarys();
    let u0 = params.internal_start();

    let start = obj.eval(&u0);
    if start.n_finite < nvarys || start.n_finite == 0 {
        return Err(FitError::InsufficientData {
            usable: start.n_finite,
            required: nvarys.max(1),
        });
    }

    let outcome = if nvarys == 0 {
        Outcome {
            u: u0,
            nfev: 1,
            termination: Termination::NoFreeParameters,
        }
    } else {
        match opts.method {
            Method::NelderMead => nelder_mead(&obj, u0, start, opts),
            Method::LeastSquares | Method::Emcee => levenberg_marquardt(&obj, u0, start, opts),
        }
    };
    if !outcome.termination.is_converged() {
        warn!(
            "{} stopped without converging ({:?}) after {} evaluations; returning best iterate",
            opts.method.label(),
            outcome.termination,
            outcome.nfev
        );
    }

    Ok(finish(&obj, outcome, opts.method))
}

fn finish<F>(obj: &Objective<'_, F>, outcome: Outcome, method: Method) -> FitResult
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let params = obj.params;
    let nvarys = params.nvarys();
    let best = obj.eval(&outcome.u);

    let ndata = best.n_finite;
    let chisqr = best.cost;
    let nfree = ndata.saturating_sub(nvarys).max(1);
    let redchi = chisqr / nfree as f64;
    let neg2_log_likel = ndata as f64 * (chisqr.max(1e-250) / ndata as f64).ln();
    let gof = GoodnessOfFit {
        chisqr,
        redchi,
        aic: neg2_log_likel + 2.0 * nvarys as f64,
        bic: neg2_log_likel + (ndata as f64).ln() * nvarys as f64,
    };

    let covariance = if nvarys > 0 {
        let jac = obj.jacobian(&outcome.u, &best);
        let scales = params.internal_scales(&outcome.u);
        let cov = normal_inverse(&jac).map(|inv| {
            DMatrix::from_fn(nvarys, nvarys, |i, j| {
                inv[(i, j)] * scales[i] * scales[j] * redchi
            })
        });
        if cov.is_none() {
            warn!("Singular normal matrix at optimum; standard errors are undefined");
        }
        cov
    } else {
        None
    };

    let values = params.values_from_internal(&outcome.u);
    let mut fitted = params.clone();
    let mut k = 0;
    for (p, v) in fitted.iter_mut().zip(values) {
        p.value = v;
        p.stderr = None;
        p.credible = None;
        if p.vary {
            p.stderr = covariance.as_ref().map(|c| c[(k, k)].max(0.0).sqrt());
            k += 1;
        }
    }

    let mut result = FitResult {
        parameters: fitted,
        goodness_of_fit: Some(gof),
        report: String::new(),
        method,
        converged: outcome.termination.is_converged(),
        termination: outcome.termination,
        nfev: outcome.nfev,
        ndata,
        nvarys,
        var_names: params.var_names(),
        covariance: covariance.map(|c| {
            (0..nvarys)
                .map(|i| (0..nvarys).map(|j| c[(i, j)]).collect())
                .collect()
        }),
    };
    result.report = fit_report(&result);
    debug!(
        "{} finished: {:?}, nfev={}, chisqr={:.6e}",
        method.label(),
        result.termination,
        result.nfev,
        chisqr
    );
    result
}

/// Levenberg-Marquardt with a trust region on the scaled step, following
/// MINPACK `lmder`: the damping parameter is chosen so that the step length
/// `||D p||` matches the current bound `delta`, and `delta` grows or shrinks
/// with the ratio of actual to predicted cost reduction.
fn levenberg_marquardt<F>(
    obj: &Objective<'_, F>,
    mut u: Vec<f64>,
    mut cur: Evaluation,
    opts: &MinimizerOptions,
) -> Outcome
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = u.len();
    let budget = opts.budget(n);
    let mut nfev = 1;

    let done = |u: Vec<f64>, nfev, termination| Outcome {
        u,
        nfev,
        termination,
    };

    if cur.cost == 0.0 {
        return done(u, nfev, Termination::ResidualsZero);
    }

    let mut fnorm = cur.cost.sqrt();
    let mut par = 0.0;
    let mut diag: Vec<f64> = Vec::new();
    let mut delta = 0.0;
    let mut xnorm = 0.0;
    let mut first_step = true;

    loop {
        if nfev >= budget {
            return done(u, nfev, Termination::MaxEvaluations);
        }
        let jac = obj.jacobian(&u, &cur);
        nfev += n;
        let col_norms: Vec<f64> = (0..n).map(|j| jac.column(j).norm()).collect();

        if diag.is_empty() {
            diag = col_norms
                .iter()
                .map(|&c| if c > 0.0 { c } else { 1.0 })
                .collect();
            xnorm = scaled_norm(&diag, &u);
            delta = if xnorm > 0.0 { STEP_BOUND * xnorm } else { STEP_BOUND };
        }

        // Scaled gradient test.
        let r = DVector::from_column_slice(&cur.r);
        let grad = jac.transpose() * &r;
        let gnorm = (0..n)
            .filter(|&j| col_norms[j] > 0.0)
            .map(|j| (grad[j] / (col_norms[j] * fnorm)).abs())
            .fold(0.0, f64::max);
        if gnorm <= opts.gtol {
            return done(u, nfev, Termination::Orthogonal);
        }

        for (d, &c) in diag.iter_mut().zip(&col_norms) {
            *d = d.max(c);
        }

        loop {
            let (next_par, step) = damping_for_radius(&jac, &r, &diag, delta, par);
            par = next_par;
            let pnorm = scaled_norm(&diag, step.as_slice());
            if first_step {
                delta = delta.min(pnorm);
            }

            let trial_u: Vec<f64> = u.iter().zip(step.iter()).map(|(a, b)| a + b).collect();
            let trial = obj.eval(&trial_u);
            nfev += 1;
            let fnorm1 = if trial.cost.is_finite() && trial.n_finite >= cur.n_finite {
                trial.cost.sqrt()
            } else {
                f64::INFINITY
            };

            let actred = if 0.1 * fnorm1 < fnorm {
                1.0 - (fnorm1 / fnorm).powi(2)
            } else {
                -1.0
            };
            let t1 = (&jac * &step).norm() / fnorm;
            let t2 = par.sqrt() * pnorm / fnorm;
            let prered = t1 * t1 + 2.0 * t2 * t2;
            let dirder = -(t1 * t1 + t2 * t2);
            let ratio = if prered != 0.0 { actred / prered } else { 0.0 };

            if ratio <= 0.25 {
                let mut shrink = if actred >= 0.0 {
                    0.5
                } else {
                    0.5 * dirder / (dirder + 0.5 * actred)
                };
                if 0.1 * fnorm1 >= fnorm || shrink < 0.1 {
                    shrink = 0.1;
                }
                delta = shrink * delta.min(pnorm / 0.1);
                par /= shrink;
            } else if par == 0.0 || ratio >= 0.75 {
                delta = pnorm / 0.5;
                par *= 0.5;
            }

            let accepted = ratio >= 1e-4;
            if accepted {
                u = trial_u;
                cur = trial;
                fnorm = fnorm1;
                xnorm = scaled_norm(&diag, &u);
                first_step = false;
                debug!("lm: nfev={nfev} cost={:.6e} delta={delta:.3e} par={par:.3e}", cur.cost);
            }

            if cur.cost == 0.0 {
                return done(u, nfev, Termination::ResidualsZero);
            }
            if actred.abs() <= opts.ftol && prered <= opts.ftol && 0.5 * ratio <= 1.0 {
                return done(u, nfev, Termination::CostConverged);
            }
            if delta <= opts.xtol * xnorm {
                return done(u, nfev, Termination::StepConverged);
            }
            if nfev >= budget {
                return done(u, nfev, Termination::MaxEvaluations);
            }
            if (actred.abs() <= f64::EPSILON && prered <= f64::EPSILON && 0.5 * ratio <= 1.0)
                || delta <= f64::EPSILON * xnorm
            {
                return done(u, nfev, Termination::NoImprovementPossible);
            }
            if accepted {
                break;
            }
        }
    }
}

fn scaled_norm(diag: &[f64], v: &[f64]) -> f64 {
    diag.iter()
        .zip(v)
        .map(|(d, x)| (d * x).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Step minimizing `||J p + r||² + par ||D p||²`, via the augmented system.
fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    diag: &[f64],
    par: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    for j in 0..n {
        a[(m + j, j)] = par.sqrt() * diag[j];
    }
    let mut rhs = DVector::<f64>::zeros(m + n);
    rhs.rows_mut(0, m).copy_from(&(-r));
    solve_least_squares(&a, &rhs)
}

/// Damping parameter whose step length `||D p||` is within 10% of `delta`
/// (MINPACK `lmpar`), together with that step. Returns `par = 0` when the
/// Gauss-Newton step already fits inside the trust region.
fn damping_for_radius(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    diag: &[f64],
    delta: f64,
    par: f64,
) -> (f64, DVector<f64>) {
    let n = diag.len();
    let gauss_newton = damped_step(jac, r, diag, 0.0);
    let gn_norm = gauss_newton.as_ref().map(|p| scaled_norm(diag, p.as_slice()));
    if let (Some(p), Some(dxnorm)) = (&gauss_newton, gn_norm) {
        if dxnorm - delta <= 0.1 * delta {
            return (0.0, p.clone());
        }
    }

    let grad = jac.transpose() * r;
    let gnorm = (0..n)
        .map(|j| (grad[j] / diag[j]).powi(2))
        .sum::<f64>()
        .sqrt();
    let mut parl = 0.0;
    let mut paru = if gnorm > 0.0 {
        gnorm / delta
    } else {
        f64::MIN_POSITIVE / delta.min(0.1)
    };
    let mut par = par.max(parl).min(paru);
    if par == 0.0 {
        par = match gn_norm {
            Some(d) if d > 0.0 => gnorm / d,
            _ => paru,
        };
    }

    let normal = jac.transpose() * jac;
    let mut step = DVector::<f64>::zeros(n);
    for iter in 0..10 {
        if par == 0.0 {
            par = f64::MIN_POSITIVE.max(0.001 * paru);
        }
        let Some(p) = damped_step(jac, r, diag, par) else {
            par *= 10.0;
            continue;
        };
        let dp: Vec<f64> = (0..n).map(|j| diag[j] * p[j]).collect();
        let dxnorm = dp.iter().map(|v| v * v).sum::<f64>().sqrt();
        step = p;
        let fp = dxnorm - delta;
        if fp.abs() <= 0.1 * delta || iter == 9 || dxnorm == 0.0 {
            break;
        }

        // Newton correction on ||D p(par)|| - delta.
        let q = DVector::from_fn(n, |j, _| diag[j] * dp[j] / dxnorm);
        let mut shifted = normal.clone();
        for j in 0..n {
            shifted[(j, j)] += par * diag[j] * diag[j];
        }
        let parc = shifted
            .cholesky()
            .map(|ch| (fp / delta) / q.dot(&ch.solve(&q)))
            .filter(|c| c.is_finite());

        if fp > 0.0 {
            parl = parl.max(par);
        } else if fp < 0.0 {
            paru = paru.min(par);
        }
        par = match parc {
            Some(c) => parl.max(par + c),
            None => 0.5 * (parl + paru),
        };
    }
    (par, step)
}

/// Downhill simplex (standard reflection/expansion/contraction/shrink
/// coefficients 1, 2, 1/2, 1/2).
fn nelder_mead<F>(
    obj: &Objective<'_, F>,
    u0: Vec<f64>,
    start: Evaluation,
    opts: &MinimizerOptions,
) -> Outcome
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = u0.len();
    let budget = opts.budget(n);
    let min_finite = start.n_finite;
    let mut nfev = 1;

    let cost = |u: &[f64], nfev: &mut usize| -> f64 {
        *nfev += 1;
        let e = obj.eval(u);
        if e.n_finite < min_finite || !e.cost.is_finite() {
            f64::INFINITY
        } else {
            e.cost
        }
    };

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((u0.clone(), start.cost));
    for j in 0..n {
        let mut v = u0.clone();
        v[j] = if v[j] != 0.0 { v[j] * 1.05 } else { 0.00025 };
        let f = cost(&v, &mut nfev);
        simplex.push((v, f));
    }

    let termination = loop {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let (best_u, best_f) = (&simplex[0].0, simplex[0].1);
        let f_spread = simplex.iter().map(|s| (s.1 - best_f).abs()).fold(0.0, f64::max);
        let x_spread = simplex
            .iter()
            .flat_map(|s| s.0.iter().zip(best_u).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let best_norm = best_u.iter().map(|v| v.abs()).fold(0.0, f64::max);
        if f_spread <= opts.ftol * (best_f.abs() + opts.ftol)
            && x_spread <= opts.xtol * (best_norm + 1.0)
        {
            break if best_f == 0.0 {
                Termination::ResidualsZero
            } else {
                Termination::CostConverged
            };
        }
        if nfev >= budget {
            break Termination::MaxEvaluations;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|s| s.0[j]).sum::<f64>() / n as f64)
            .collect();
        let worst = simplex[n].clone();
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst.0)
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let xr = along(1.0);
        let fr = cost(&xr, &mut nfev);
        if fr < simplex[0].1 {
            let xe = along(2.0);
            let fe = cost(&xe, &mut nfev);
            simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
            continue;
        }
        if fr < simplex[n - 1].1 {
            simplex[n] = (xr, fr);
            continue;
        }

        // Outside contraction when the reflection helped at all, inside otherwise.
        let xc = if fr < worst.1 { along(0.5) } else { along(-0.5) };
        let fc = cost(&xc, &mut nfev);
        if fc < worst.1.min(fr) {
            simplex[n] = (xc, fc);
            continue;
        }

        // Shrink towards the best vertex.
        let best = simplex[0].0.clone();
        for s in simplex.iter_mut().skip(1) {
            let v: Vec<f64> = best.iter().zip(&s.0).map(|(b, x)| b + 0.5 * (x - b)).collect();
            let f = cost(&v, &mut nfev);
            *s = (v, f);
        }
    };

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    Outcome {
        u: simplex.swap_remove(0).0,
        nfev,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Parameter;

    fn line_problem() -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 1.0).collect();
        (x, y)
    }

    fn line_params() -> Parameters {
        let mut p = Parameters::new();
        p.add(Parameter::new("m", 0.5, None, None).unwrap());
        p.add(Parameter::new("b", 0.0, None, None).unwrap());
        p
    }

    #[test]
    fn levenberg_marquardt_solves_a_line() {
        let (x, y) = line_problem();
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let fit = least_squares(resid, &line_params(), &MinimizerOptions::default()).unwrap();
        assert!(fit.converged);
        assert!((fit.value("m").unwrap() - 2.0).abs() < 1e-8);
        assert!((fit.value("b").unwrap() + 1.0).abs() < 1e-8);
        assert!(fit.goodness_of_fit.unwrap().chisqr < 1e-14);
    }

    #[test]
    fn nelder_mead_solves_a_line() {
        let (x, y) = line_problem();
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let opts = MinimizerOptions::with_method(Method::NelderMead);
        let fit = least_squares(resid, &line_params(), &opts).unwrap();
        assert!((fit.value("m").unwrap() - 2.0).abs() < 1e-4);
        assert!((fit.value("b").unwrap() + 1.0).abs() < 1e-3);
    }

    #[test]
    fn bounded_parameter_stays_inside_bounds() {
        // Unconstrained optimum of m would be 2; the bound holds it at 1.
        let (x, y) = line_problem();
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let mut pars = Parameters::new();
        pars.add(Parameter::new("m", 0.5, Some(0.0), Some(1.0)).unwrap());
        pars.add(Parameter::new("b", 0.0, None, None).unwrap());
        let fit = least_squares(resid, &pars, &MinimizerOptions::default()).unwrap();
        let m = fit.value("m").unwrap();
        assert!((0.0..=1.0).contains(&m));
        assert!(m > 0.99);
    }

    fn noisy_line() -> (Vec<f64>, Vec<f64>) {
        let noise = [0.1, -0.2, 0.05, 0.15, -0.1, 0.0, 0.2, -0.05, -0.15, 0.1];
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = x.iter().zip(noise).map(|(v, e)| 2.0 * v + 1.0 + e).collect();
        (x, y)
    }

    #[test]
    fn exhausted_budget_returns_best_iterate_unconverged() {
        let (x, y) = noisy_line();
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let opts = MinimizerOptions {
            max_nfev: Some(4),
            ..MinimizerOptions::default()
        };
        let fit = least_squares(resid, &line_params(), &opts).unwrap();
        assert!(!fit.converged);
        assert_eq!(fit.termination, Termination::MaxEvaluations);
        assert!(fit.value("m").unwrap().is_finite());
    }

    #[test]
    fn stalling_at_machine_precision_is_not_converged() {
        // With every tolerance at zero only the machine-precision stops remain.
        let (x, y) = noisy_line();
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let opts = MinimizerOptions {
            ftol: 0.0,
            xtol: 0.0,
            gtol: 0.0,
            ..MinimizerOptions::default()
        };
        let fit = least_squares(resid, &line_params(), &opts).unwrap();
        assert_eq!(fit.termination, Termination::NoImprovementPossible);
        assert!(!fit.converged);
        assert!(fit.report.contains("Warning: did not converge"));
        // The iterate is still the least-squares line.
        assert!((fit.value("m").unwrap() - 2.000606060606).abs() < 1e-9);
        assert!((fit.value("b").unwrap() - 1.007272727273).abs() < 1e-9);
    }

    #[test]
    fn trust_region_follows_curved_valley() {
        // Rosenbrock as residuals: the minimum at (1, 1) sits at the end of a
        // narrow curved valley.
        let resid = |p: &[f64]| -> Vec<f64> { vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]] };
        let mut pars = Parameters::new();
        pars.add(Parameter::new("x", -1.2, None, None).unwrap());
        pars.add(Parameter::new("y", 1.0, None, None).unwrap());
        let fit = least_squares(resid, &pars, &MinimizerOptions::default()).unwrap();
        assert!(fit.converged, "{:?}", fit.termination);
        assert!((fit.value("x").unwrap() - 1.0).abs() < 1e-6);
        assert!((fit.value("y").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nan_residuals_are_omitted_from_cost() {
        let (x, mut y) = line_problem();
        y[3] = f64::NAN;
        let resid = |p: &[f64]| -> Vec<f64> {
            x.iter().zip(&y).map(|(xi, yi)| yi - (p[0] * xi + p[1])).collect()
        };
        let fit = least_squares(resid, &line_params(), &MinimizerOptions::default()).unwrap();
        assert_eq!(fit.ndata, 9);
        assert!((fit.value("m").unwrap() - 2.0).abs() < 1e-8);
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let resid = |p: &[f64]| -> Vec<f64> { vec![1.0 - p[0] - p[1]] };
        let err = least_squares(resid, &line_params(), &MinimizerOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { usable: 1, required: 2 }));
    }

    #[test]
    fn collinear_parameters_give_undefined_stderr() {
        // Only the sum a + b is identifiable.
        let resid = |p: &[f64]| -> Vec<f64> { (0..5).map(|i| i as f64 - (p[0] + p[1])).collect() };
        let mut pars = Parameters::new();
        pars.add(Parameter::new("a", 1.0, None, None).unwrap());
        pars.add(Parameter::new("b", 1.0, None, None).unwrap());
        let fit = least_squares(resid, &pars, &MinimizerOptions::default()).unwrap();
        assert!(fit.covariance.is_none());
        assert!(fit.stderr("a").is_none());
    }
}
