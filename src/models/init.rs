//! Data-driven starting values for the basic models.

use crate::domain::{InitSpec, ModelKind, ParamInit, Parameter, Parameters};
use crate::error::FitError;
use crate::math::nanmean;

/// Build the parameter set for `model`.
///
/// Entries in `user_init` are applied verbatim; every other parameter gets a
/// heuristic starting value derived from `(x, y)`, clamped into its default
/// bounds:
///
/// - linear: slope from the mean of `Δy/Δx`, intercept `y[0]`
/// - power: `a = y[0]`, `n = 1` bounded to `[0, 6]`, `b = y[0]`
/// - quadratic: `a` from the mean of `Δy/Δx²`, `b` from `Δy/Δx`, `c = y[0]`
/// - exponential: `a = y[0]`, `t = x[len/2]` bounded below by 0, `b = 0`
pub fn init_pars(
    model: ModelKind,
    user_init: &InitSpec,
    x: &[f64],
    y: &[f64],
) -> Result<Parameters, FitError> {
    if let Some(name) = user_init
        .keys()
        .find(|k| !model.param_names().contains(&k.as_str()))
    {
        return Err(FitError::UnknownParameter {
            model: model.name().to_string(),
            name: name.clone(),
        });
    }

    let mut pars = Parameters::new();
    for &name in model.param_names() {
        let init = match user_init.get(name) {
            Some(p) => *p,
            None => guess(model, name, x, y).clamped(),
        };
        pars.add(Parameter::new(name, init.value, init.min, init.max)?);
    }
    Ok(pars)
}

fn guess(model: ModelKind, name: &str, x: &[f64], y: &[f64]) -> ParamInit {
    let y0 = y.first().copied().unwrap_or(0.0);
    match (model, name) {
        (ModelKind::Linear, "m") | (ModelKind::Quadratic, "b") => {
            ParamInit::new(mean_ratio(x, y, |dx| dx))
        }
        (ModelKind::Quadratic, "a") => ParamInit::new(mean_ratio(x, y, |dx| dx * dx)),
        (ModelKind::Power, "n") => ParamInit::bounded(1.0, Some(0.0), Some(6.0)),
        (ModelKind::Exponential, "t") => {
            let mid = x.get(x.len() / 2).copied().unwrap_or(1.0);
            ParamInit::bounded(mid, Some(0.0), None)
        }
        (ModelKind::Exponential, "b") => ParamInit::new(0.0),
        // Remaining amplitudes and offsets start at the first observation.
        _ => ParamInit::new(y0),
    }
}

/// Mean of `Δy / g(Δx)` over consecutive points, ignoring non-finite ratios.
fn mean_ratio(x: &[f64], y: &[f64], g: impl Fn(f64) -> f64) -> f64 {
    let ratios = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (yw[1] - yw[0]) / g(xw[1] - xw[0]));
    nanmean(ratios).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_guess_uses_mean_slope_and_first_value() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [1.0, 3.0, 5.0, 9.0];
        let p = init_pars(ModelKind::Linear, &InitSpec::new(), &x, &y).unwrap();
        assert!((p.get("m").unwrap().value - 2.0).abs() < 1e-12);
        assert_eq!(p.get("b").unwrap().value, 1.0);
    }

    #[test]
    fn power_exponent_is_bounded() {
        let p = init_pars(ModelKind::Power, &InitSpec::new(), &[1.0, 2.0], &[3.0, 4.0]).unwrap();
        let n = p.get("n").unwrap();
        assert_eq!((n.value, n.min, n.max), (1.0, Some(0.0), Some(6.0)));
        assert_eq!(p.get("a").unwrap().value, 3.0);
        assert_eq!(p.get("b").unwrap().value, 3.0);
    }

    #[test]
    fn quadratic_guess_uses_squared_steps() {
        let x = [0.0, 2.0, 4.0];
        let y = [0.0, 4.0, 8.0];
        let p = init_pars(ModelKind::Quadratic, &InitSpec::new(), &x, &y).unwrap();
        assert!((p.get("a").unwrap().value - 1.0).abs() < 1e-12);
        assert!((p.get("b").unwrap().value - 2.0).abs() < 1e-12);
        assert_eq!(p.get("c").unwrap().value, 0.0);
    }

    #[test]
    fn exponential_time_constant_from_midpoint() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [5.0, 4.0, 3.0, 2.5, 2.0];
        let p = init_pars(ModelKind::Exponential, &InitSpec::new(), &x, &y).unwrap();
        let t = p.get("t").unwrap();
        assert_eq!((t.value, t.min), (2.0, Some(0.0)));
        assert_eq!(p.get("b").unwrap().value, 0.0);
        assert_eq!(p.get("a").unwrap().value, 5.0);
    }

    #[test]
    fn heuristic_outside_default_bounds_is_clamped() {
        // Midpoint x is -1; the time constant starts on its lower bound.
        let x: Vec<f64> = (-5..=3).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 5.0 * (-v / 2.0).exp() + 1.0).collect();
        let p = init_pars(ModelKind::Exponential, &InitSpec::new(), &x, &y).unwrap();
        let t = p.get("t").unwrap();
        assert_eq!((t.value, t.min), (0.0, Some(0.0)));
    }

    #[test]
    fn user_init_takes_precedence() {
        let mut init = InitSpec::new();
        init.insert("n".into(), ParamInit::bounded(2.5, Some(1.0), Some(3.0)));
        let p = init_pars(ModelKind::Power, &init, &[1.0, 2.0], &[1.0, 2.0]).unwrap();
        let n = p.get("n").unwrap();
        assert_eq!((n.value, n.min, n.max), (2.5, Some(1.0), Some(3.0)));
    }

    #[test]
    fn user_init_outside_bounds_fails() {
        let mut init = InitSpec::new();
        init.insert("m".into(), ParamInit::bounded(1.0, None, Some(0.0)));
        let err = init_pars(ModelKind::Linear, &init, &[1.0, 2.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FitError::InvalidBounds { .. }));
    }

    #[test]
    fn unknown_init_name_is_rejected() {
        let mut init = InitSpec::new();
        init.insert("q".into(), ParamInit::new(1.0));
        let err = init_pars(ModelKind::Linear, &init, &[1.0, 2.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FitError::UnknownParameter { .. }));
    }
}
