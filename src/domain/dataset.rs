//! Measured data handed to a fit.

use crate::error::FitError;

/// Paired samples `(x, y)` with optional uncertainties `dy`.
///
/// Immutable once built. Weights follow the `1/|dy|` convention: a point with
/// `dy == 0` gets weight zero and takes no part in the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    x: Vec<f64>,
    y: Vec<f64>,
    dy: Option<Vec<f64>>,
}

/// The points of a `Dataset` that actually enter a fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Points {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Residual multiplier per point (`1/|dy|`, or `1` without `dy`).
    pub w: Vec<f64>,
}

impl Points {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

impl Dataset {
    pub fn new(x: Vec<f64>, y: Vec<f64>, dy: Option<Vec<f64>>) -> Result<Self, FitError> {
        let dy_len = dy.as_ref().map(Vec::len);
        if x.len() != y.len() || dy_len.is_some_and(|n| n != x.len()) {
            return Err(FitError::DimensionMismatch {
                x: x.len(),
                y: y.len(),
                dy: dy_len,
            });
        }
        let dy = dy.map(|v| v.into_iter().map(f64::abs).collect());
        Ok(Self { x, y, dy })
    }

    pub fn from_slices(x: &[f64], y: &[f64], dy: Option<&[f64]>) -> Result<Self, FitError> {
        Self::new(x.to_vec(), y.to_vec(), dy.map(<[f64]>::to_vec))
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn dy(&self) -> Option<&[f64]> {
        self.dy.as_deref()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Weight of point `i`.
    pub fn weight(&self, i: usize) -> f64 {
        match &self.dy {
            Some(dy) if dy[i] > 0.0 => 1.0 / dy[i],
            Some(_) => 0.0,
            None => 1.0,
        }
    }

    /// Points with finite `x`, `y` and a finite nonzero weight.
    ///
    /// NaN inputs and `dy == 0` entries are dropped here rather than rejected.
    pub fn usable(&self) -> Points {
        let mut out = Points {
            x: Vec::with_capacity(self.len()),
            y: Vec::with_capacity(self.len()),
            w: Vec::with_capacity(self.len()),
        };
        for i in 0..self.len() {
            let (xi, yi, wi) = (self.x[i], self.y[i], self.weight(i));
            if xi.is_finite() && yi.is_finite() && wi.is_finite() && wi > 0.0 {
                out.x.push(xi);
                out.y.push(yi);
                out.w.push(wi);
            }
        }
        out
    }

    /// A new dataset keeping only the indices for which `keep` is true.
    pub fn select(&self, keep: impl Fn(usize) -> bool) -> Dataset {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Dataset {
            x: idx.iter().map(|&i| self.x[i]).collect(),
            y: idx.iter().map(|&i| self.y[i]).collect(),
            dy: self
                .dy
                .as_ref()
                .map(|dy| idx.iter().map(|&i| dy[i]).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_is_rejected() {
        let err = Dataset::new(vec![1.0, 2.0], vec![1.0], None).unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { x: 2, y: 1, dy: None }));

        let err = Dataset::new(vec![1.0], vec![1.0], Some(vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, FitError::DimensionMismatch { dy: Some(2), .. }));
    }

    #[test]
    fn zero_dy_and_nan_points_are_not_usable() {
        let data = Dataset::new(
            vec![0.0, 1.0, 2.0, 3.0, f64::NAN],
            vec![1.0, f64::NAN, 3.0, 4.0, 5.0],
            Some(vec![0.5, 1.0, 0.0, -2.0, 1.0]),
        )
        .unwrap();

        let pts = data.usable();
        assert_eq!(pts.x, vec![0.0, 3.0]);
        assert_eq!(pts.w, vec![2.0, 0.5]);
        assert_eq!(data.weight(2), 0.0);
    }

    #[test]
    fn unweighted_points_have_unit_weight() {
        let data = Dataset::new(vec![0.0, 1.0], vec![1.0, 2.0], None).unwrap();
        assert_eq!(data.usable().w, vec![1.0, 1.0]);
    }
}
