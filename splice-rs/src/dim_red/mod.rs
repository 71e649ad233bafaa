//! Principal component analysis of filtered expression data.
//!
//! The expression matrix is stored genes × cells; PCA treats genes as variables and cells as
//! observations, so the data are transposed to cells × genes, each gene is standardized to
//! mean 0 and unit population variance, and the standardized matrix `Z` is handed to a `Pca`
//! back-end. The back-end returns coordinates `Z·V`, the eigenvalues of the correlation matrix
//! `ZᵀZ/n`, and the loadings `V`.

use crate::error::PcaError;
use crate::filter::FilteredData;
use crate::stats::{percent_with_cumulative, standardize, ColumnMoments};
use anyhow::Error;
use log::{info, warn};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Eigendecomposition back-end
pub mod eigen;


/// Default number of principal components retained
pub const NCP_DEFAULT: usize = 20;

/// (coordinates, eigenvalues, loadings): coordinates are observations × k, eigenvalues cover
/// every component in decreasing order, loadings are variables × k.
pub type PcaResult = (Array2<f64>, Array1<f64>, Array2<f64>);

/// Perform a PCA of a standardized `matrix` (observations in rows), retaining `k` components.
pub trait Pca<T> {
    /// Compute a rank `k` PCA for `matrix`
    fn run_pca(&self, matrix: &T, k: usize) -> Result<PcaResult, Error>;
}

/// Variance captured by one principal component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentVariance {
    /// 1-based component number
    pub component: usize,
    /// eigenvalue of the correlation matrix
    pub eigenvalue: f64,
    /// percentage of the total variance
    pub percent: f64,
    /// running total of `percent` up to and including this component
    pub cumulative_percent: f64,
}

/// Reduced-dimension view of the filtered data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// cell ids, one per coordinate row
    pub cell_ids: Vec<String>,
    /// gene ids, one per loading row
    pub gene_ids: Vec<String>,
    /// cells × components
    pub coordinates: Array2<f64>,
    /// genes × components
    pub loadings: Array2<f64>,
    /// one entry per retained component
    pub variance: Vec<ComponentVariance>,
}

impl ProjectionResult {
    /// Number of retained components
    pub fn num_components(&self) -> usize {
        self.variance.len()
    }

    /// Coordinates of every cell on 1-based component `component`.
    pub fn component(&self, component: usize) -> Result<ArrayView1<'_, f64>, Error> {
        if component == 0 || component > self.num_components() {
            return Err(PcaError::InvalidComponent {
                component,
                retained: self.num_components(),
            }
            .into());
        }
        Ok(self.coordinates.column(component - 1))
    }

    /// Percentage of variance explained by 1-based component `component`.
    pub fn percent_explained(&self, component: usize) -> Result<f64, Error> {
        self.component(component)?;
        Ok(self.variance[component - 1].percent)
    }
}

/// Standardize the filtered data and run `pca`, retaining up to `ncp` components.
pub fn project_with<P: Pca<Array2<f64>>>(filtered: &FilteredData, ncp: usize, pca: &P) -> Result<ProjectionResult, Error> {
    let (genes, cells) = (filtered.num_genes(), filtered.num_cells());
    if genes == 0 || cells < 2 {
        return Err(PcaError::EmptyInput { genes, cells }.into());
    }

    let x = filtered.expression.matrix.t();
    let moments = ColumnMoments::of(&x);
    if let Some(g) = moments.first_constant() {
        return Err(PcaError::ConstantGene(filtered.expression.gene_ids[g].clone()).into());
    }
    let z = standardize(&x, &moments);

    let k = ncp.min(cells - 1).min(genes);
    if k < ncp {
        warn!("{} genes x {} cells supports {} components, not {}", genes, cells, k, ncp);
    }
    let (coordinates, eigenvalues, loadings) = pca.run_pca(&z, k)?;

    // trace of the correlation matrix
    let total = genes as f64;
    let retained: Vec<f64> = eigenvalues.iter().take(k).copied().collect();
    let variance = percent_with_cumulative(&retained, total)
        .into_iter()
        .zip(retained.iter())
        .enumerate()
        .map(|(i, ((percent, cumulative_percent), &eigenvalue))| ComponentVariance {
            component: i + 1,
            eigenvalue,
            percent,
            cumulative_percent,
        })
        .collect::<Vec<_>>();
    info!(
        "computed {} principal components over {} genes x {} cells, {:.1}% of variance retained",
        k,
        genes,
        cells,
        variance.last().map_or(0.0, |v| v.cumulative_percent)
    );

    Ok(ProjectionResult {
        cell_ids: filtered.expression.cell_ids.clone(),
        gene_ids: filtered.expression.gene_ids.clone(),
        coordinates,
        loadings,
        variance,
    })
}

/// Standardized PCA of the filtered data with the default eigendecomposition back-end.
pub fn project(filtered: &FilteredData, ncp: usize) -> Result<ProjectionResult, Error> {
    project_with(filtered, ncp, &eigen::EighPca::new())
}
