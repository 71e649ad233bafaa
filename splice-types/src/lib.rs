//! Data model shared by the splice-rs pipeline and its command line tools.

pub mod categorical;
pub mod dataset;
pub mod matrix;
pub mod metadata;

pub use categorical::Categorical;
pub use dataset::SingleCellDataset;
pub use matrix::ExpressionMatrix;
pub use metadata::{GeneFeatureTable, SampleMetadata};
