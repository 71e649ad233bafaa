use super::{Pca, PcaResult};
use anyhow::{bail, Error};
use ndarray::prelude::*;
use ndarray::s;
use ndarray_linalg::{Eigh, UPLO};

/// Which symmetric matrix to decompose
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EighStrategy {
    /// Correlation matrix when variables <= observations, Gram matrix otherwise
    Auto,
    /// Always decompose the variables × variables correlation matrix `ZᵀZ/n`
    Correlation,
    /// Always decompose the observations × observations Gram matrix `ZZᵀ/n`
    Gram,
}

/// PCA by symmetric eigendecomposition (LAPACK `syevd` through `ndarray-linalg`)
pub struct EighPca {
    /// matrix to decompose
    pub strategy: EighStrategy,
}

impl EighPca {
    /// New eigendecomposition PCA choosing the smaller of the two symmetric matrices
    pub fn new() -> EighPca {
        EighPca {
            strategy: EighStrategy::Auto,
        }
    }
}

impl Default for EighPca {
    fn default() -> Self {
        Self::new()
    }
}

/// Eigenpairs of the symmetric matrix `a`, largest eigenvalue first. Tiny negative eigenvalues
/// from rounding are clamped to zero.
fn eigh_descending(a: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>), Error> {
    let (vals, vecs) = a.eigh(UPLO::Lower)?;
    let order: Vec<usize> = (0..vals.len()).rev().collect();
    let vals = vals.select(Axis(0), &order).mapv_into(|v| v.max(0.0));
    let vecs = vecs.select(Axis(1), &order);
    Ok((vals, vecs))
}

/// Flip each component so that its largest-magnitude loading is positive.
fn fix_signs(coords: &mut Array2<f64>, loadings: &mut Array2<f64>) {
    for j in 0..loadings.ncols() {
        let mut col = loadings.column_mut(j);
        let pivot = col.iter().fold(0.0f64, |best, &v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            col.mapv_inplace(|v| -v);
            coords.column_mut(j).mapv_inplace(|v| -v);
        }
    }
}

impl Pca<Array2<f64>> for EighPca {
    fn run_pca(&self, z: &Array2<f64>, k: usize) -> Result<PcaResult, Error> {
        let (n, p) = z.dim();
        if k > n.min(p) {
            bail!("cannot retain {} components from a {} x {} matrix", k, n, p);
        }
        let nf = n as f64;
        let use_gram = match self.strategy {
            EighStrategy::Auto => p > n,
            EighStrategy::Correlation => false,
            EighStrategy::Gram => true,
        };

        let (eigenvalues, mut coords, mut loadings) = if use_gram {
            let gram = z.dot(&z.t()) / nf;
            let (vals, vecs) = eigh_descending(&gram)?;
            // Z = U S Vᵀ with S² = nλ, so coordinates are U·S and V = Zᵀ·U / S
            let mut coords = vecs.slice(s![.., 0..k]).to_owned();
            let mut loadings = Array2::<f64>::zeros((p, k));
            for j in 0..k {
                let sv = (nf * vals[j]).sqrt();
                coords.column_mut(j).mapv_inplace(|v| v * sv);
                if sv > 0.0 {
                    let v = z.t().dot(&coords.column(j)) / (sv * sv);
                    loadings.column_mut(j).assign(&v);
                }
            }
            (vals, coords, loadings)
        } else {
            let corr = z.t().dot(z) / nf;
            let (vals, vecs) = eigh_descending(&corr)?;
            let loadings = vecs.slice(s![.., 0..k]).to_owned();
            let coords = z.dot(&loadings);
            (vals, coords, loadings)
        };

        fix_signs(&mut coords, &mut loadings);
        Ok((coords, eigenvalues, loadings))
    }
}
