//! # splice-rs: PCA of single-cell expression by cell group

#![deny(missing_docs)]

#[allow(unused_extern_crates)]
extern crate blas_src;

/// Dimensionality reduction
pub mod dim_red;

pub mod error;

pub mod filter;

pub mod palette;

pub mod pipeline;

pub mod plot;

pub mod stats;

/// Delimited-text loading routines
pub mod table_io;
