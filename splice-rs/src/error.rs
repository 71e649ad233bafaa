//! Failure modes of the PCA pipeline.
//!
//! Functions return `anyhow::Error`; these variants are the typed payloads, so callers can
//! `downcast_ref::<PcaError>()` to tell them apart.

use std::fmt::Display;

/// Errors raised by filtering, projection and plot assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcaError {
    /// The named group column does not exist in the sample metadata
    UnknownColumn(String),
    /// Nothing left to project: `genes` genes over `cells` cells
    EmptyInput {
        /// surviving genes
        genes: usize,
        /// surviving cells
        cells: usize,
    },
    /// Requested ids not found, raised only under `IdPolicy::Strict`
    MissingIds {
        /// what kind of id ("sample", "gene")
        kind: &'static str,
        /// number of ids not found
        count: usize,
        /// a few of the missing ids
        examples: Vec<String>,
    },
    /// A gene has zero variance over the retained cells and cannot be scaled
    ConstantGene(String),
    /// The supplied colors do not line up with the group levels
    ColorCount {
        /// number of colors supplied
        supplied: usize,
        /// number of group levels to color
        levels: usize,
    },
    /// A requested component is not among the retained components (1-based)
    InvalidComponent {
        /// requested component
        component: usize,
        /// number of retained components
        retained: usize,
    },
    /// A point style parameter is out of range
    InvalidStyle(String),
}

impl std::error::Error for PcaError {}

impl Display for PcaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PcaError::UnknownColumn(name) => write!(f, "group column '{name}' not found in sample metadata"),
            PcaError::EmptyInput { genes, cells } => {
                write!(f, "cannot run PCA on {genes} genes x {cells} cells")
            }
            PcaError::MissingIds { kind, count, examples } => {
                write!(f, "{count} requested {kind} id(s) not found: {}", examples.join(", "))?;
                if *count > examples.len() {
                    write!(f, ", ...")?;
                }
                Ok(())
            }
            PcaError::ConstantGene(gene) => {
                write!(f, "gene '{gene}' has zero variance across the retained cells")
            }
            PcaError::ColorCount { supplied, levels } => {
                write!(f, "{supplied} group colors supplied for {levels} groups")
            }
            PcaError::InvalidComponent { component, retained } => {
                write!(f, "component {component} requested but only 1..={retained} were retained")
            }
            PcaError::InvalidStyle(msg) => write!(f, "invalid point style: {msg}"),
        }
    }
}
