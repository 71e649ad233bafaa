use anyhow::{bail, format_err, Error};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ordered categorical: one level code per observation, pointing into an ordered list of
/// level labels. The level order drives legend and color order downstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Categorical {
    pub levels: Vec<String>,
    pub codes: Vec<u32>,
}

impl Categorical {
    pub fn new(levels: Vec<String>, codes: Vec<u32>) -> Result<Categorical, Error> {
        if let Some(dup) = levels.iter().duplicates().next() {
            bail!("duplicate categorical level: {}", dup);
        }
        if let Some(&bad) = codes.iter().find(|&&c| c as usize >= levels.len()) {
            bail!("level code {} out of range for {} levels", bad, levels.len());
        }
        Ok(Categorical { levels, codes })
    }

    pub fn blank() -> Categorical {
        Categorical {
            levels: Vec::new(),
            codes: Vec::new(),
        }
    }

    /// Encode `values` against an explicit level `order`. Every value must be one of the levels.
    pub fn with_order<S: AsRef<str>>(values: &[S], order: &[String]) -> Result<Categorical, Error> {
        let lookup: HashMap<&str, u32> = order.iter().enumerate().map(|(i, l)| (l.as_str(), i as u32)).collect();
        let codes = values
            .iter()
            .map(|v| {
                lookup
                    .get(v.as_ref())
                    .copied()
                    .ok_or_else(|| format_err!("value '{}' is not a level of the categorical", v.as_ref()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Categorical::new(order.to_vec(), codes)
    }

    /// Encode `values` with levels in first-encountered order.
    pub fn first_encountered<S: AsRef<str>>(values: &[S]) -> Categorical {
        let order = first_encountered_order(values);
        // every value is a level by construction
        let lookup: HashMap<&str, u32> = order.iter().enumerate().map(|(i, l)| (l.as_str(), i as u32)).collect();
        let codes = values.iter().map(|v| lookup[v.as_ref()]).collect();
        Categorical { levels: order, codes }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Label of observation `i`.
    pub fn label(&self, i: usize) -> &str {
        &self.levels[self.codes[i] as usize]
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.codes.iter().map(move |&c| self.levels[c as usize].as_str())
    }

    /// Position of `level` in the level order, or None if it is not a level.
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|x| x == level)
    }

    /// Observation indices carrying `level`, or None if the level doesn't exist.
    pub fn indices(&self, level: &str) -> Option<Vec<usize>> {
        self.level_index(level).map(|idx| {
            self.codes
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c as usize == idx)
                .map(|(i, _)| i)
                .collect()
        })
    }

    /// Number of observations per level, in level order.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.levels.len()];
        for &c in &self.codes {
            counts[c as usize] += 1;
        }
        counts
    }

    /// Remove levels that no observation uses. Relative level order is kept.
    pub fn drop_unused_levels(&self) -> Categorical {
        let counts = self.counts();
        let mut remap = vec![u32::MAX; self.levels.len()];
        let mut levels = Vec::new();
        for (idx, level) in self.levels.iter().enumerate() {
            if counts[idx] > 0 {
                remap[idx] = levels.len() as u32;
                levels.push(level.clone());
            }
        }
        let codes = self.codes.iter().map(|&c| remap[c as usize]).collect();
        Categorical { levels, codes }
    }

    /// Subset observations by index, keeping every level.
    pub fn select(&self, indices: &[usize]) -> Categorical {
        Categorical {
            levels: self.levels.clone(),
            codes: indices.iter().map(|&i| self.codes[i]).collect(),
        }
    }
}

/// Distinct values of `values`, in the order they first appear.
pub fn first_encountered_order<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| v.as_ref()).unique().map(str::to_string).collect()
}
