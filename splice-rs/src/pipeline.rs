//! Filter → project → plot, as a single call.

use crate::dim_red::{project, ProjectionResult, NCP_DEFAULT};
use crate::filter::{filter_dataset, FilterParams, FilteredData};
use crate::plot::{pca_scatter, PlotParams, ScatterPlot};
use anyhow::{Context, Error};
use log::debug;
use serde::{Deserialize, Serialize};
use splice_types::SingleCellDataset;

/// Parameters of a PCA analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaParams {
    /// cell and gene selection
    pub filter: FilterParams,
    /// maximum number of principal components to retain
    pub ncp: usize,
    /// plot settings
    pub plot: PlotParams,
}

impl PcaParams {
    /// Analysis grouped by `group_column` over `gene_ids`, with default settings otherwise
    pub fn new(group_column: impl Into<String>, gene_ids: Vec<String>) -> PcaParams {
        PcaParams {
            filter: FilterParams::new(group_column, gene_ids),
            ncp: NCP_DEFAULT,
            plot: PlotParams::new(),
        }
    }
}

/// Number of cells in a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    /// group level
    pub group: String,
    /// retained cells in the group
    pub cells: usize,
}

/// What survived filtering
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    /// retained cells
    pub num_cells: usize,
    /// retained genes
    pub num_genes: usize,
    /// display names of the retained genes, in loading-row order
    pub gene_names: Vec<String>,
    /// cell count per group, in level order
    pub groups: Vec<GroupCount>,
}

impl FilterSummary {
    /// Summarize a filtered dataset
    pub fn of(filtered: &FilteredData) -> FilterSummary {
        let groups = filtered
            .groups
            .levels
            .iter()
            .zip(filtered.groups.counts())
            .map(|(group, cells)| GroupCount {
                group: group.clone(),
                cells,
            })
            .collect();
        let names = filtered.genes.restrict_to(&filtered.expression.gene_ids);
        // genes missing from the feature table are named by their id
        let gene_names = if names.len() == filtered.num_genes() {
            names.gene_names
        } else {
            filtered.expression.gene_ids.clone()
        };
        FilterSummary {
            num_cells: filtered.num_cells(),
            num_genes: filtered.num_genes(),
            gene_names,
            groups,
        }
    }
}

/// Result of one PCA analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaAnalysis {
    /// filtering outcome
    pub summary: FilterSummary,
    /// coordinates, loadings and variance explained
    pub projection: ProjectionResult,
    /// scatter plot of the chosen components
    pub plot: ScatterPlot,
}

/// Filter `dataset`, project it and describe the scatter plot.
pub fn run_pca_analysis(dataset: &SingleCellDataset, params: &PcaParams) -> Result<PcaAnalysis, Error> {
    debug!("pca parameters: {:?}", params);
    let filtered = filter_dataset(dataset, &params.filter).context("filtering cells and genes")?;
    let projection = project(&filtered, params.ncp)?;
    let plot = pca_scatter(
        &projection,
        &filtered.groups,
        &params.filter.group_column,
        params.filter.group_order.as_deref(),
        &params.plot,
    )?;
    Ok(PcaAnalysis {
        summary: FilterSummary::of(&filtered),
        projection,
        plot,
    })
}

/// Results of the analyses run on a dataset. Each analysis returns its own value and the caller
/// merges it in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// PCA, if run
    pub pca: Option<PcaAnalysis>,
}

impl AnalysisResults {
    /// Record a PCA result, replacing any earlier one
    pub fn with_pca(mut self, pca: PcaAnalysis) -> AnalysisResults {
        self.pca = Some(pca);
        self
    }
}
