use anyhow::{bail, format_err, Error};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-cell annotations: a sample id per row plus any number of named string columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SampleMetadata {
    pub sample_ids: Vec<String>,
    columns: BTreeMap<String, Vec<String>>,
}

impl SampleMetadata {
    pub fn new(sample_ids: Vec<String>) -> Result<SampleMetadata, Error> {
        if let Some(dup) = sample_ids.iter().duplicates().next() {
            bail!("duplicate sample id in metadata: {}", dup);
        }
        Ok(SampleMetadata {
            sample_ids,
            columns: BTreeMap::new(),
        })
    }

    /// Add a column. Its length must match the number of rows.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<String>) -> Result<SampleMetadata, Error> {
        let name = name.into();
        if values.len() != self.sample_ids.len() {
            bail!(
                "metadata column '{}' has {} values for {} samples",
                name,
                values.len(),
                self.sample_ids.len()
            );
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    pub fn num_rows(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Values of the column named `name`, one per row.
    pub fn column(&self, name: &str) -> Result<&[String], Error> {
        self.columns.get(name).map(Vec::as_slice).ok_or_else(|| {
            format_err!(
                "metadata has no column '{}' (available: {})",
                name,
                self.columns.keys().join(", ")
            )
        })
    }

    /// Map from sample id to row index.
    pub fn sample_index(&self) -> HashMap<&str, usize> {
        self.sample_ids.iter().enumerate().map(|(i, s)| (s.as_str(), i)).collect()
    }

    /// New table holding the given rows, in the order given.
    pub fn select_rows(&self, rows: &[usize]) -> SampleMetadata {
        let pick = |v: &Vec<String>| rows.iter().map(|&r| v[r].clone()).collect::<Vec<_>>();
        SampleMetadata {
            sample_ids: pick(&self.sample_ids),
            columns: self.columns.iter().map(|(k, v)| (k.clone(), pick(v))).collect(),
        }
    }
}

/// Per-gene annotations keyed by gene id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GeneFeatureTable {
    pub gene_ids: Vec<String>,
    pub gene_names: Vec<String>,
}

impl GeneFeatureTable {
    /// Build a table. An empty `gene_names` means "use the ids as names".
    pub fn new(gene_ids: Vec<String>, gene_names: Vec<String>) -> Result<GeneFeatureTable, Error> {
        let gene_names = if gene_names.is_empty() {
            gene_ids.clone()
        } else {
            gene_names
        };
        if gene_names.len() != gene_ids.len() {
            bail!("{} gene names for {} gene ids", gene_names.len(), gene_ids.len());
        }
        if let Some(dup) = gene_ids.iter().duplicates().next() {
            bail!("duplicate gene id in feature table: {}", dup);
        }
        Ok(GeneFeatureTable { gene_ids, gene_names })
    }

    pub fn len(&self) -> usize {
        self.gene_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gene_ids.is_empty()
    }

    /// Keep only the genes in `keep`, in the order of `keep`. Ids absent from the table are skipped.
    pub fn restrict_to<S: AsRef<str>>(&self, keep: &[S]) -> GeneFeatureTable {
        let index: HashMap<&str, usize> = self.gene_ids.iter().enumerate().map(|(i, g)| (g.as_str(), i)).collect();
        let (gene_ids, gene_names): (Vec<String>, Vec<String>) = keep
            .iter()
            .filter_map(|g| index.get(g.as_ref()))
            .map(|&i| (self.gene_ids[i].clone(), self.gene_names[i].clone()))
            .unzip();
        GeneFeatureTable { gene_ids, gene_names }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(std::string::ToString::to_string).collect()
    }

    #[test]
    fn test_column_accessor() {
        let meta = SampleMetadata::new(strings(&["s1", "s2", "s3"]))
            .unwrap()
            .with_column("cell.type", strings(&["T", "B", "T"]))
            .unwrap();
        assert_eq!(meta.column("cell.type").unwrap(), strings(&["T", "B", "T"]).as_slice());
        let err = meta.column("cluster").unwrap_err();
        assert!(err.to_string().contains("cluster"));
        assert!(meta.clone().with_column("bad", strings(&["x"])).is_err());

        let sub = meta.select_rows(&[2, 1]);
        assert_eq!(sub.sample_ids, strings(&["s3", "s2"]));
        assert_eq!(sub.column("cell.type").unwrap(), strings(&["T", "B"]).as_slice());
    }

    #[test]
    fn test_duplicate_samples_rejected() {
        assert!(SampleMetadata::new(strings(&["s1", "s1"])).is_err());
    }

    #[test]
    fn test_feature_table_restrict() {
        let genes = GeneFeatureTable::new(strings(&["g1", "g2", "g3"]), strings(&["A", "B", "C"])).unwrap();
        let sub = genes.restrict_to(&["g3", "gX", "g1"]);
        assert_eq!(sub.gene_ids, strings(&["g3", "g1"]));
        assert_eq!(sub.gene_names, strings(&["C", "A"]));

        let unnamed = GeneFeatureTable::new(strings(&["g1"]), vec![]).unwrap();
        assert_eq!(unnamed.gene_names, strings(&["g1"]));
        assert!(GeneFeatureTable::new(strings(&["g1"]), strings(&["a", "b"])).is_err());
    }
}
