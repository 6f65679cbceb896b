//! Error types for kernel configuration and the numerical stages of the sampler.

use thiserror::Error;

/// Problems with the kernel or window parameters. These are detected before any numerical work
/// is done.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown kernel kind '{0}', expected 'gaussian' (1) or 'cauchy' (2)")]
    UnknownKernel(String),

    #[error("kernel parameter '{name}' must be positive and finite, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("kernel parameter '{0}' is required for this kernel kind")]
    MissingParameter(&'static str),

    #[error("invalid window [{x_min}, {x_max}] x [{y_min}, {y_max}]")]
    InvalidWindow {
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    },

    #[error("intensity for point generation must be positive and finite, got {0}")]
    InvalidIntensity(f64),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the numerical stages. All of these are deterministic for a given input and
/// random sequence, so there is nothing to gain by retrying.
#[derive(Error, Debug)]
pub enum NumericalError {
    #[error("kernel matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("kernel matrix is not symmetric at ({row}, {col}), |L[i][j] - L[j][i]| = {delta:e}")]
    Asymmetric { row: usize, col: usize, delta: f64 },

    #[error("kernel matrix has a non-finite entry at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    #[error("column {column} requested from a basis with {available} columns")]
    ColumnOutOfRange { column: usize, available: usize },

    #[error("symmetric eigendecomposition failed: {0}")]
    EigenFailed(String),

    #[error("singular value decomposition failed: {0}")]
    SvdFailed(String),

    #[error("no usable pivot column for point {index} at iteration {iteration}")]
    NoPivot { iteration: usize, index: usize },

    #[error("basis lost rank at iteration {iteration}: expected {expected} columns, got {found}")]
    RankCollapse {
        iteration: usize,
        expected: usize,
        found: usize,
    },

    #[error("projection weights are degenerate at iteration {iteration} (total {total:e})")]
    DegenerateWeights { iteration: usize, total: f64 },
}

#[derive(Error, Debug)]
pub enum DppError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Numerical(#[from] NumericalError),
}

impl DppError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, DppError::Configuration(_))
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, DppError::Numerical(_))
    }
}

impl From<serde_json::Error> for DppError {
    fn from(value: serde_json::Error) -> Self {
        DppError::Configuration(ConfigurationError::Json(value))
    }
}
