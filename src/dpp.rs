//! Orchestration of the full determinantal thinning pipeline.

use crate::config::{DppConfig, KernelSpec};
use crate::kernel::{KernelMatrix, build_kernel};
use crate::points::{PointSet, sample_poisson};
use crate::sampler::{SampledIndexSet, SequentialSampler};
use crate::selection::{SelectedSubspace, select_subspace};
use crate::spectral::{EigenDecomposition, decompose};
use crate::{Point2, Result};
use faer::Mat;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// A determinantal point process over a fixed, finite set of points. The kernel and its
/// eigendecomposition are computed once when the sampler is created and never change, so any
/// number of samples can be drawn from it cheaply.
#[derive(Debug, Clone)]
pub struct DppSampler {
    kernel: KernelMatrix,
    eigen: EigenDecomposition,
}

impl DppSampler {
    /// Build the kernel for the points and decompose it.
    ///
    /// # Arguments
    ///
    /// * `points`: the candidate points; their positions in the set are the indices that
    ///   samples refer to
    /// * `spec`: the kernel kind and parameters, validated before any numerical work
    ///
    /// returns: Result<DppSampler, DppError>
    pub fn new(points: &PointSet, spec: &KernelSpec) -> Result<Self> {
        let kernel = build_kernel(points, spec)?;
        Self::from_kernel(kernel)
    }

    /// Create a sampler directly from a kernel matrix, which must be symmetric and should be
    /// positive semi-definite.
    pub fn from_kernel(kernel: KernelMatrix) -> Result<Self> {
        let eigen = decompose(&kernel)?;
        Ok(Self { kernel, eigen })
    }

    /// The number of candidate points.
    pub fn len(&self) -> usize {
        self.kernel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernel.is_empty()
    }

    pub fn kernel(&self) -> &KernelMatrix {
        &self.kernel
    }

    pub fn decomposition(&self) -> &EigenDecomposition {
        &self.eigen
    }

    /// The mean size of a sample.
    pub fn expected_count(&self) -> f64 {
        self.eigen.expected_count()
    }

    /// The marginal kernel `K = L (I + L)⁻¹`. See [`EigenDecomposition::marginal_kernel`].
    pub fn marginal_kernel(&self) -> Mat<f64> {
        self.eigen.marginal_kernel()
    }

    /// Run the Bernoulli trials over the eigenvalues, the first random stage of a sample.
    pub fn select_subspace<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SelectedSubspace> {
        select_subspace(&self.eigen, rng)
    }

    /// Draw one sample. The same random source is used for the eigenvector trials and then for
    /// every step of the sequential sampler, so a seeded source reproduces the sample exactly.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SampledIndexSet> {
        let subspace = self.select_subspace(rng)?;
        if subspace.is_empty() {
            return Ok(SampledIndexSet::default());
        }
        SequentialSampler::new(subspace).run(rng)
    }

    /// Draw `runs` independent samples. Run `r` uses its own generator seeded with
    /// `seed + r`, so the result is the same regardless of how the runs are scheduled across
    /// threads.
    pub fn sample_many(&self, runs: usize, seed: u64) -> Result<Vec<SampledIndexSet>> {
        (0..runs)
            .into_par_iter()
            .map(|r| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(r as u64));
                self.sample(&mut rng)
            })
            .collect()
    }

    /// The fraction of `runs` samples in which each point appears. These approach the diagonal
    /// of the marginal kernel as the number of runs grows.
    pub fn inclusion_frequencies(&self, runs: usize, seed: u64) -> Result<Vec<f64>> {
        let samples = self.sample_many(runs, seed)?;
        let mut counts = vec![0usize; self.len()];
        for s in samples.iter() {
            for &i in s.iter() {
                counts[i] += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|c| c as f64 / runs.max(1) as f64)
            .collect())
    }

    /// The fraction of `runs` samples in which each pair of points appears together, as an
    /// `n x n` matrix whose diagonal holds the single point frequencies.
    pub fn co_inclusion_frequencies(&self, runs: usize, seed: u64) -> Result<Mat<f64>> {
        let samples = self.sample_many(runs, seed)?;
        let n = self.len();
        let mut counts = Mat::<f64>::zeros(n, n);
        for s in samples.iter() {
            for &i in s.iter() {
                for &j in s.iter() {
                    counts[(i, j)] += 1.0;
                }
            }
        }
        let scale = 1.0 / runs.max(1) as f64;
        Ok(Mat::from_fn(n, n, |i, j| counts[(i, j)] * scale))
    }
}

/// The result of thinning a point set: the original points and the indices that survived.
#[derive(Debug, Clone)]
pub struct Thinned {
    pub points: PointSet,
    pub sample: SampledIndexSet,
}

impl Thinned {
    /// The retained points, in index order.
    pub fn retained(&self) -> Vec<Point2> {
        self.sample.select(&self.points)
    }

    /// The fraction of the original points which were retained.
    pub fn retention(&self) -> f64 {
        if self.points.is_empty() {
            0.0
        } else {
            self.sample.len() as f64 / self.points.len() as f64
        }
    }
}

/// Thin an existing point set with a single determinantal sample.
pub fn thin_points<R: Rng + ?Sized>(
    points: PointSet,
    spec: &KernelSpec,
    rng: &mut R,
) -> Result<Thinned> {
    let sampler = DppSampler::new(&points, spec)?;
    let sample = sampler.sample(rng)?;
    debug!(
        "thinned {} points to {} (expected {:.2})",
        points.len(),
        sample.len(),
        sampler.expected_count()
    );
    Ok(Thinned { points, sample })
}

/// Simulate a determinantally thinned Poisson process. A Poisson process with the kernel's
/// intensity is generated on the configured window and then thinned with the configured kernel.
///
/// # Arguments
///
/// * `config`: the kernel and window
/// * `rng`: the random source, used first for the Poisson points and then for the sample
///
/// returns: Result<Thinned, DppError>
pub fn thin<R: Rng + ?Sized>(config: &DppConfig, rng: &mut R) -> Result<Thinned> {
    config.validate()?;
    let points = sample_poisson(&config.window, config.kernel.intensity, rng)?;
    thin_points(points, &config.kernel, rng)
}
