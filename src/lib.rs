//! Determinantal thinning of planar point sets.
//!
//! A candidate point set (typically one realization of a Poisson process in a rectangular
//! window) is thinned by drawing a sample from the L-ensemble determinantal point process whose
//! kernel is built from the pairwise distances between the points. Nearby points have strongly
//! correlated kernel rows, so they rarely survive together and the retained configuration is
//! spatially repulsive.
//!
//! The pipeline is split into the same stages it runs in:
//!
//! 1. [`kernel::build_kernel`] builds the dense kernel matrix `L`
//! 2. [`spectral::decompose`] runs a symmetric eigensolver on `L`
//! 3. [`selection::select_subspace`] keeps each eigenvector with probability `λ / (1 + λ)`
//! 4. [`sampler::SequentialSampler`] turns the kept subspace into a set of point indices
//!
//! [`dpp::DppSampler`] ties the stages together and caches everything that only depends on the
//! points and the kernel, so repeated draws only pay for the last two stages.

pub mod config;
pub mod dpp;
pub mod errors;
pub mod kernel;
pub mod orthonormal;
pub mod points;
pub mod sampler;
pub mod selection;
pub mod spectral;

#[cfg(test)]
mod test_utils;

pub type Point2 = parry2d_f64::na::Point2<f64>;
pub type Aabb2 = parry2d_f64::bounding_volume::Aabb;

pub use config::{DppConfig, KernelKind, KernelSpec, Window};
pub use dpp::{DppSampler, Thinned, thin};
pub use errors::{ConfigurationError, DppError, NumericalError};
pub use kernel::KernelMatrix;
pub use points::PointSet;
pub use sampler::{SampledIndexSet, SequentialSampler};
pub use selection::SelectedSubspace;
pub use spectral::EigenDecomposition;

pub type Result<T> = std::result::Result<T, DppError>;
