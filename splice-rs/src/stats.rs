//! Statistics functions

use ndarray::prelude::*;
use ndarray::Zip;

/// Relative tolerance below which a standard deviation counts as zero
const ZERO_SD_TOL: f64 = 1e-12;

/// Per-column mean and population standard deviation of a matrix with observations in rows
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMoments {
    /// column means
    pub mean: Array1<f64>,
    /// column standard deviations, normalized by the number of rows
    pub sd: Array1<f64>,
}

impl ColumnMoments {
    /// Compute the moments of every column of `x`.
    pub fn of(x: &ArrayView2<f64>) -> ColumnMoments {
        let n = x.nrows().max(1) as f64;
        let mean = x.sum_axis(Axis(0)) / n;
        let mut var = Array1::<f64>::zeros(x.ncols());
        for row in x.axis_iter(Axis(0)) {
            Zip::from(&mut var).and(&row).and(&mean).for_each(|v, &xi, &m| {
                let d = xi - m;
                *v += d * d;
            });
        }
        let sd = var.mapv(|v| (v / n).sqrt());
        ColumnMoments { mean, sd }
    }

    /// Index of the first column with (numerically) zero variance, if any.
    pub fn first_constant(&self) -> Option<usize> {
        self.sd
            .iter()
            .zip(self.mean.iter())
            .position(|(&sd, &m)| sd <= ZERO_SD_TOL * (1.0 + m.abs()))
    }
}

/// Center each column of `x` to mean 0 and scale it to unit population variance.
/// Columns must not be constant; check with `ColumnMoments::first_constant` first.
pub fn standardize(x: &ArrayView2<f64>, moments: &ColumnMoments) -> Array2<f64> {
    let mut z = x.to_owned();
    for mut row in z.axis_iter_mut(Axis(0)) {
        Zip::from(&mut row)
            .and(&moments.mean)
            .and(&moments.sd)
            .for_each(|v, &m, &sd| *v = (*v - m) / sd);
    }
    z
}

/// Express `values` as percentages of `total`, along with their running sum.
pub fn percent_with_cumulative(values: &[f64], total: f64) -> Vec<(f64, f64)> {
    let mut cumulative = 0.0;
    values
        .iter()
        .map(|&v| {
            let pct = 100.0 * v / total;
            cumulative += pct;
            (pct, cumulative)
        })
        .collect()
}
