//! The candidate point set and a homogeneous Poisson generator for producing one.

use crate::config::Window;
use crate::errors::ConfigurationError;
use crate::{Point2, Result};
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// An ordered, immutable set of points in the plane. The position of a point in the set is its
/// identifier everywhere else in the crate, so the order must never change once the set has
/// been handed to the sampler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point2>,
}

impl PointSet {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Build a point set from separate x and y coordinate slices. Extra values in the longer
    /// slice are ignored.
    pub fn from_coords(xs: &[f64], ys: &[f64]) -> Self {
        let points = xs
            .iter()
            .zip(ys.iter())
            .map(|(x, y)| Point2::new(*x, *y))
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point2> {
        self.points.iter()
    }

    /// The squared Euclidean distance between the points at indices `i` and `j`.
    pub fn dist_sq(&self, i: usize, j: usize) -> f64 {
        (self.points[i] - self.points[j]).norm_squared()
    }
}

impl Index<usize> for PointSet {
    type Output = Point2;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl From<Vec<Point2>> for PointSet {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

impl From<&[Point2]> for PointSet {
    fn from(points: &[Point2]) -> Self {
        Self::new(points.to_vec())
    }
}

/// Simulate a homogeneous Poisson point process with the given intensity (mean number of points
/// per unit area) on a rectangular window. The number of points is Poisson distributed with
/// mean `intensity * area`, and each point is placed uniformly and independently in the window.
///
/// # Arguments
///
/// * `window`: the rectangle to generate points in
/// * `intensity`: the mean density of points, must be positive and finite
/// * `rng`: the random source
///
/// returns: Result<PointSet, DppError>
pub fn sample_poisson<R: Rng + ?Sized>(
    window: &Window,
    intensity: f64,
    rng: &mut R,
) -> Result<PointSet> {
    window.validate()?;
    if !(intensity.is_finite() && intensity > 0.0) {
        return Err(ConfigurationError::InvalidIntensity(intensity).into());
    }

    let mean = intensity * window.area();
    let poisson =
        Poisson::new(mean).map_err(|_| ConfigurationError::InvalidIntensity(intensity))?;
    let count = poisson.sample(rng) as usize;

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let x = window.x_min + rng.random::<f64>() * window.width();
        let y = window.y_min + rng.random::<f64>() * window.height();
        points.push(Point2::new(x, y));
    }

    Ok(PointSet::new(points))
}
