//! Cell and gene selection ahead of PCA.
//!
//! Cells are chosen from the sample metadata (optional sample-id restriction, then membership
//! in the group order), genes from the requested gene list and then by prevalence: a gene is
//! kept when it is non-zero in at least `min_cells` of the retained cells.

use crate::error::PcaError;
use anyhow::Error;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use splice_types::categorical::first_encountered_order;
use splice_types::{Categorical, ExpressionMatrix, GeneFeatureTable, SampleMetadata, SingleCellDataset};
use std::collections::{HashMap, HashSet};

/// Default minimum number of cells in which a gene must be expressed
pub const MIN_CELLS_DEFAULT: usize = 25;

/// Number of missing ids quoted in a `PcaError::MissingIds`
const MISSING_EXAMPLES: usize = 5;

/// How to treat requested ids that are not present in the tables
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdPolicy {
    /// Ignore them: the request is intersected with what exists
    #[default]
    Intersect,
    /// Fail with `PcaError::MissingIds`
    Strict,
}

/// Parameters of the filtering stage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Restrict to these sample ids first. `None` or empty means all samples.
    pub sample_ids: Option<Vec<String>>,
    /// Metadata column holding the group label of each cell
    pub group_column: String,
    /// Groups to keep, in display order. `None` or empty derives the order from the data.
    pub group_order: Option<Vec<String>>,
    /// Genes to consider
    pub gene_ids: Vec<String>,
    /// Minimum number of retained cells with a non-zero value for a gene to be kept
    pub min_cells: usize,
    /// Treatment of requested ids that don't exist
    pub id_policy: IdPolicy,
}

impl FilterParams {
    /// Filter on `group_column`, considering `gene_ids`, with default settings otherwise
    pub fn new(group_column: impl Into<String>, gene_ids: Vec<String>) -> FilterParams {
        FilterParams {
            sample_ids: None,
            group_column: group_column.into(),
            group_order: None,
            gene_ids,
            min_cells: MIN_CELLS_DEFAULT,
            id_policy: IdPolicy::default(),
        }
    }
}

/// Output of the filtering stage. Matrix columns, metadata rows and `groups` describe the same
/// cells in the same order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilteredData {
    /// retained genes × retained cells
    pub expression: ExpressionMatrix,
    /// metadata rows of the retained cells
    pub metadata: SampleMetadata,
    /// group label of each retained cell; levels are the requested groups actually present
    pub groups: Categorical,
    /// feature table pruned to the retained genes
    pub genes: GeneFeatureTable,
}

impl FilteredData {
    /// Number of genes that survived filtering
    pub fn num_genes(&self) -> usize {
        self.expression.num_genes()
    }

    /// Number of cells that survived filtering
    pub fn num_cells(&self) -> usize {
        self.expression.num_cells()
    }
}

/// Apply the policy to ids that were requested but not found.
fn check_missing(kind: &'static str, missing: Vec<&str>, policy: IdPolicy) -> Result<(), Error> {
    if missing.is_empty() {
        return Ok(());
    }
    match policy {
        IdPolicy::Intersect => {
            debug!("ignoring {} requested {} id(s) not present", missing.len(), kind);
            Ok(())
        }
        IdPolicy::Strict => Err(PcaError::MissingIds {
            kind,
            count: missing.len(),
            examples: missing.iter().take(MISSING_EXAMPLES).map(|s| s.to_string()).collect(),
        }
        .into()),
    }
}

/// Select the metadata rows to analyse: the sample restriction, then the group order.
/// Returns the rows and the effective group order.
fn select_rows(
    metadata: &SampleMetadata,
    labels: &[String],
    params: &FilterParams,
) -> Result<(Vec<usize>, Vec<String>), Error> {
    let rows: Vec<usize> = match params.sample_ids.as_deref() {
        Some(ids) if !ids.is_empty() => {
            let index = metadata.sample_index();
            let missing = ids.iter().map(String::as_str).filter(|s| !index.contains_key(s)).collect();
            check_missing("sample", missing, params.id_policy)?;

            let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
            (0..metadata.num_rows())
                .filter(|&i| wanted.contains(metadata.sample_ids[i].as_str()))
                .collect()
        }
        _ => (0..metadata.num_rows()).collect(),
    };

    let order: Vec<String> = match params.group_order.as_deref() {
        Some(order) if !order.is_empty() => order.iter().unique().cloned().collect(),
        _ => first_encountered_order(&rows.iter().map(|&i| &labels[i]).collect::<Vec<_>>()),
    };

    let in_order: HashSet<&str> = order.iter().map(String::as_str).collect();
    let rows = rows.into_iter().filter(|&i| in_order.contains(labels[i].as_str())).collect();
    Ok((rows, order))
}

/// Keep the genes of `params.gene_ids` that are present in `expression`, in matrix row order.
fn requested_gene_rows(expression: &ExpressionMatrix, params: &FilterParams) -> Result<Vec<usize>, Error> {
    let index: HashMap<&str, usize> = expression.gene_index();
    let missing = params
        .gene_ids
        .iter()
        .map(String::as_str)
        .filter(|g| !index.contains_key(g))
        .collect();
    check_missing("gene", missing, params.id_policy)?;

    let wanted: HashSet<&str> = params.gene_ids.iter().map(String::as_str).collect();
    Ok((0..expression.num_genes())
        .filter(|&g| wanted.contains(expression.gene_ids[g].as_str()))
        .collect())
}

/// Run the filtering stage over `dataset`. The dataset is not modified.
pub fn filter_dataset(dataset: &SingleCellDataset, params: &FilterParams) -> Result<FilteredData, Error> {
    let metadata = &dataset.metadata;
    if !metadata.has_column(&params.group_column) {
        return Err(PcaError::UnknownColumn(params.group_column.clone()).into());
    }
    let labels = metadata.column(&params.group_column)?;
    let (rows, order) = select_rows(metadata, labels, params)?;

    // line the metadata rows up with matrix columns
    let cell_index = dataset.expression.cell_index();
    let mut kept_rows = Vec::with_capacity(rows.len());
    let mut cols = Vec::with_capacity(rows.len());
    let mut missing = Vec::new();
    for i in rows {
        let sample = metadata.sample_ids[i].as_str();
        match cell_index.get(sample) {
            Some(&c) => {
                kept_rows.push(i);
                cols.push(c);
            }
            None => missing.push(sample),
        }
    }
    check_missing("sample", missing, params.id_policy)?;

    let kept_labels: Vec<&str> = kept_rows.iter().map(|&i| labels[i].as_str()).collect();
    let groups = Categorical::with_order(&kept_labels, &order)?.drop_unused_levels();
    info!(
        "retained {} of {} cells in {} groups ({})",
        kept_rows.len(),
        metadata.num_rows(),
        groups.num_levels(),
        groups.levels.join(", ")
    );

    let gene_rows = requested_gene_rows(&dataset.expression, params)?;
    let candidate = dataset.expression.select(&gene_rows, &cols);
    let surviving: Vec<usize> = candidate
        .cells_expressing()
        .into_iter()
        .enumerate()
        .filter(|&(_, n)| n >= params.min_cells)
        .map(|(g, _)| g)
        .collect();
    let all_cols: Vec<usize> = (0..candidate.num_cells()).collect();
    let expression = candidate.select(&surviving, &all_cols);
    info!(
        "{} of {} requested genes are expressed in at least {} cells",
        expression.num_genes(),
        gene_rows.len(),
        params.min_cells
    );

    let genes = dataset.genes.restrict_to(&expression.gene_ids);
    Ok(FilteredData {
        expression,
        metadata: metadata.select_rows(&kept_rows),
        groups,
        genes,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array2;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(std::string::ToString::to_string).collect()
    }

    /// 6 genes x 8 cells; gene g is non-zero in the first 8 - g cells, so the number of
    /// expressing cells runs 8, 7, ..., 3.
    fn toy_dataset() -> SingleCellDataset {
        let genes: Vec<String> = (0..6).map(|g| format!("g{g}")).collect();
        let cells: Vec<String> = (0..8).map(|c| format!("c{c}")).collect();
        let m = Array2::from_shape_fn((6, 8), |(g, c)| if c < 8 - g { (1 + g + c) as f64 } else { 0.0 });
        let expression = ExpressionMatrix::new(genes.clone(), cells.clone(), m).unwrap();
        let metadata = SampleMetadata::new(cells)
            .unwrap()
            .with_column("cell.type", strings(&["A", "B", "A", "C", "B", "A", "B", "C"]))
            .unwrap();
        let names = genes.iter().map(|g| g.to_uppercase()).collect();
        let feature_table = GeneFeatureTable::new(genes, names).unwrap();
        SingleCellDataset::new(expression, metadata, feature_table).unwrap()
    }

    fn all_genes() -> Vec<String> {
        (0..6).map(|g| format!("g{g}")).collect()
    }

    #[test]
    fn test_group_order_preserved() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 0;
        params.sample_ids = Some(strings(&["c0", "c1", "c2", "c4"]));
        params.group_order = Some(strings(&["B", "A", "C"]));
        let f = filter_dataset(&ds, &params).unwrap();

        // C is requested but absent after the sample restriction
        assert_eq!(f.groups.levels, strings(&["B", "A"]));
        assert_eq!(f.expression.cell_ids, strings(&["c0", "c1", "c2", "c4"]));
        assert_eq!(f.metadata.sample_ids, f.expression.cell_ids);
        assert_eq!(f.groups.labels().collect::<Vec<_>>(), vec!["A", "B", "A", "B"]);
    }

    #[test]
    fn test_group_order_drops_cells() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 0;
        params.group_order = Some(strings(&["C", "B"]));
        let f = filter_dataset(&ds, &params).unwrap();
        assert_eq!(f.groups.levels, strings(&["C", "B"]));
        assert_eq!(f.expression.cell_ids, strings(&["c1", "c3", "c4", "c6", "c7"]));
        assert_eq!(f.metadata.column("cell.type").unwrap(), strings(&["B", "C", "B", "B", "C"]).as_slice());
    }

    #[test]
    fn test_auto_order_and_empty_restriction() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 0;
        params.sample_ids = Some(vec![]);
        params.group_order = Some(vec![]);
        let f = filter_dataset(&ds, &params).unwrap();
        assert_eq!(f.num_cells(), 8);
        assert_eq!(f.groups.levels, strings(&["A", "B", "C"]));
    }

    #[test]
    fn test_unknown_column() {
        let ds = toy_dataset();
        let params = FilterParams::new("cluster", all_genes());
        let err = filter_dataset(&ds, &params).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PcaError>(),
            Some(&PcaError::UnknownColumn("cluster".to_string()))
        );
    }

    #[test]
    fn test_prevalence_threshold() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 6;
        let f = filter_dataset(&ds, &params).unwrap();
        assert_eq!(f.expression.gene_ids, strings(&["g0", "g1", "g2"]));
        assert_eq!(f.genes.gene_ids, f.expression.gene_ids);
        assert_eq!(f.genes.gene_names, strings(&["G0", "G1", "G2"]));

        // counts are taken over the retained cells only
        params.group_order = Some(strings(&["A"]));
        params.min_cells = 3;
        let f = filter_dataset(&ds, &params).unwrap();
        assert_eq!(f.expression.cell_ids, strings(&["c0", "c2", "c5"]));
        assert_eq!(f.expression.gene_ids, strings(&["g0", "g1", "g2"]));
    }

    #[test]
    fn test_gene_survival_monotone() {
        let ds = toy_dataset();
        let mut previous: Option<HashSet<String>> = None;
        for t in 0..10 {
            let mut params = FilterParams::new("cell.type", all_genes());
            params.min_cells = t;
            let f = filter_dataset(&ds, &params).unwrap();
            let current: HashSet<String> = f.expression.gene_ids.into_iter().collect();
            if let Some(prev) = &previous {
                assert!(current.is_subset(prev), "threshold {t}");
            }
            previous = Some(current);
        }
        assert!(previous.unwrap().is_empty());
    }

    #[test]
    fn test_filter_idempotent() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 4;
        params.group_order = Some(strings(&["B", "A"]));
        let a = filter_dataset(&ds, &params).unwrap();
        let b = filter_dataset(&ds, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_surviving_genes_is_not_an_error() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 100;
        let f = filter_dataset(&ds, &params).unwrap();
        assert_eq!(f.num_genes(), 0);
        assert_eq!(f.num_cells(), 8);
        assert!(f.genes.is_empty());
    }

    #[test]
    fn test_missing_ids_intersect() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", strings(&["g1", "nope", "g0"]));
        params.min_cells = 0;
        params.sample_ids = Some(strings(&["c3", "ghost", "c1"]));
        let f = filter_dataset(&ds, &params).unwrap();
        // matrix order, not request order
        assert_eq!(f.expression.gene_ids, strings(&["g0", "g1"]));
        assert_eq!(f.expression.cell_ids, strings(&["c1", "c3"]));
    }

    #[test]
    fn test_missing_ids_strict() {
        let ds = toy_dataset();
        let mut params = FilterParams::new("cell.type", strings(&["g1", "nope"]));
        params.id_policy = IdPolicy::Strict;
        let err = filter_dataset(&ds, &params).unwrap_err();
        match err.downcast_ref::<PcaError>() {
            Some(PcaError::MissingIds { kind, count, examples }) => {
                assert_eq!(*kind, "gene");
                assert_eq!(*count, 1);
                assert_eq!(examples, &strings(&["nope"]));
            }
            other => panic!("unexpected error {other:?}"),
        }

        params.gene_ids = all_genes();
        params.sample_ids = Some(strings(&["ghost"]));
        let err = filter_dataset(&ds, &params).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PcaError>(),
            Some(PcaError::MissingIds { kind: "sample", .. })
        ));
    }

    #[test]
    fn test_metadata_rows_missing_from_matrix() {
        let ds = toy_dataset();
        let mut ds2 = ds.clone();
        let mut ids = ds.metadata.sample_ids.clone();
        ids.push("extra".to_string());
        let mut labels = ds.metadata.column("cell.type").unwrap().to_vec();
        labels.push("D".to_string());
        ds2.metadata = SampleMetadata::new(ids).unwrap().with_column("cell.type", labels).unwrap();

        let mut params = FilterParams::new("cell.type", all_genes());
        params.min_cells = 0;
        let f = filter_dataset(&ds2, &params).unwrap();
        assert_eq!(f.num_cells(), 8);
        // D only labelled the dropped row
        assert_eq!(f.groups.levels, strings(&["A", "B", "C"]));

        params.id_policy = IdPolicy::Strict;
        assert!(filter_dataset(&ds2, &params).is_err());
    }
}
