use crate::matrix::ExpressionMatrix;
use crate::metadata::{GeneFeatureTable, SampleMetadata};
use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};

/// The three input tables of an analysis. Analyses read it and return their own result values;
/// the dataset itself is never modified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleCellDataset {
    pub expression: ExpressionMatrix,
    pub metadata: SampleMetadata,
    pub genes: GeneFeatureTable,
}

impl SingleCellDataset {
    /// Bundle the tables. Ids need not match one-to-one (filtering intersects them), but the
    /// tables must overlap.
    pub fn new(
        expression: ExpressionMatrix,
        metadata: SampleMetadata,
        genes: GeneFeatureTable,
    ) -> Result<SingleCellDataset, Error> {
        let cells = expression.cell_index();
        if !metadata.sample_ids.is_empty() && !metadata.sample_ids.iter().any(|s| cells.contains_key(s.as_str())) {
            bail!("no metadata sample id matches an expression matrix column");
        }
        let rows = expression.gene_index();
        if !genes.gene_ids.is_empty() && !genes.gene_ids.iter().any(|g| rows.contains_key(g.as_str())) {
            bail!("no feature table gene id matches an expression matrix row");
        }
        Ok(SingleCellDataset {
            expression,
            metadata,
            genes,
        })
    }
}
