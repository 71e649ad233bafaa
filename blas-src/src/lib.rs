//! Links the platform BLAS/LAPACK implementation used by `ndarray-linalg`.
//! Depend on this crate and add `extern crate blas_src;` to the crate root.

#[cfg(target_os = "macos")]
extern crate accelerate_src;

#[cfg(not(target_os = "macos"))]
extern crate intel_mkl_src;
