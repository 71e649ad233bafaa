use anyhow::{bail, Error};
use itertools::Itertools;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gene × cell expression values. Rows are keyed by gene id, columns by cell (sample) id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpressionMatrix {
    pub gene_ids: Vec<String>,
    pub cell_ids: Vec<String>,
    pub matrix: Array2<f64>,
}

impl ExpressionMatrix {
    pub fn new(gene_ids: Vec<String>, cell_ids: Vec<String>, matrix: Array2<f64>) -> Result<ExpressionMatrix, Error> {
        if matrix.nrows() != gene_ids.len() || matrix.ncols() != cell_ids.len() {
            bail!(
                "matrix shape {:?} does not match {} gene ids x {} cell ids",
                matrix.shape(),
                gene_ids.len(),
                cell_ids.len()
            );
        }
        if let Some(dup) = gene_ids.iter().duplicates().next() {
            bail!("duplicate gene id in expression matrix: {}", dup);
        }
        if let Some(dup) = cell_ids.iter().duplicates().next() {
            bail!("duplicate cell id in expression matrix: {}", dup);
        }
        if let Some(v) = matrix.iter().find(|v| !v.is_finite() || **v < 0.0) {
            bail!("expression values must be finite and non-negative, found {}", v);
        }
        Ok(ExpressionMatrix {
            gene_ids,
            cell_ids,
            matrix,
        })
    }

    pub fn num_genes(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cell_ids.len()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// Map from gene id to row index.
    pub fn gene_index(&self) -> HashMap<&str, usize> {
        self.gene_ids.iter().enumerate().map(|(i, g)| (g.as_str(), i)).collect()
    }

    /// Map from cell id to column index.
    pub fn cell_index(&self) -> HashMap<&str, usize> {
        self.cell_ids.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect()
    }

    /// New matrix holding the given rows and columns, in the order given.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> ExpressionMatrix {
        let matrix = self.matrix.select(Axis(0), rows).select(Axis(1), cols);
        ExpressionMatrix {
            gene_ids: rows.iter().map(|&r| self.gene_ids[r].clone()).collect(),
            cell_ids: cols.iter().map(|&c| self.cell_ids[c].clone()).collect(),
            matrix,
        }
    }

    /// Number of non-zero entries in each gene row.
    pub fn cells_expressing(&self) -> Vec<usize> {
        self.matrix
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&v| v != 0.0).count())
            .collect()
    }
}
