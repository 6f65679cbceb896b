//! Immutable configuration values for the kernel and the simulation window. These are passed
//! explicitly into each stage rather than living in any global state.

use crate::errors::ConfigurationError;
use crate::{Aabb2, Point2, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The family of similarity function used to turn a squared distance into a kernel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "KindRepr")]
pub enum KernelKind {
    /// Squared exponential, `λ₀ exp(-d² / σ²)`
    Gaussian,

    /// Cauchy, `λ₀ / (1 + d² / σ²)^(α + 1/2)`
    Cauchy,
}

impl Display for KernelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelKind::Gaussian => write!(f, "gaussian"),
            KernelKind::Cauchy => write!(f, "cauchy"),
        }
    }
}

impl FromStr for KernelKind {
    type Err = ConfigurationError;

    /// Parses a kernel kind by name (case-insensitive) or by its numeric code, where `1` is
    /// Gaussian and `2` is Cauchy.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" | "1" => Ok(KernelKind::Gaussian),
            "cauchy" | "2" => Ok(KernelKind::Cauchy),
            _ => Err(ConfigurationError::UnknownKernel(s.to_string())),
        }
    }
}

impl TryFrom<i64> for KernelKind {
    type Error = ConfigurationError;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(KernelKind::Gaussian),
            2 => Ok(KernelKind::Cauchy),
            _ => Err(ConfigurationError::UnknownKernel(value.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KindRepr {
    Name(String),
    Code(i64),
}

impl TryFrom<KindRepr> for KernelKind {
    type Error = ConfigurationError;

    fn try_from(value: KindRepr) -> std::result::Result<Self, Self::Error> {
        match value {
            KindRepr::Name(name) => name.parse(),
            KindRepr::Code(code) => KernelKind::try_from(code),
        }
    }
}

/// The full description of a kernel: its family plus the intensity `λ₀`, the length scale `σ`,
/// and for the Cauchy kernel the shape `α`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub kind: KernelKind,

    /// The intensity `λ₀`, which scales every entry of the kernel matrix and therefore controls
    /// how many points survive the thinning on average.
    pub intensity: f64,

    /// The length scale `σ` over which similarity between two points decays.
    pub sigma: f64,

    /// The Cauchy shape parameter `α`. Ignored by the Gaussian kernel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl KernelSpec {
    pub fn gaussian(intensity: f64, sigma: f64) -> Self {
        Self {
            kind: KernelKind::Gaussian,
            intensity,
            sigma,
            alpha: None,
        }
    }

    pub fn cauchy(intensity: f64, sigma: f64, alpha: f64) -> Self {
        Self {
            kind: KernelKind::Cauchy,
            intensity,
            sigma,
            alpha: Some(alpha),
        }
    }

    /// Checks that every parameter the kernel kind uses is positive and finite.
    pub fn validate(&self) -> Result<()> {
        check_positive("intensity", self.intensity)?;
        check_positive("sigma", self.sigma)?;
        if self.kind == KernelKind::Cauchy {
            let alpha = self.alpha.ok_or(ConfigurationError::MissingParameter("alpha"))?;
            check_positive("alpha", alpha)?;
        }
        Ok(())
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NonPositiveParameter { name, value }.into())
    }
}

/// An axis-aligned rectangular simulation window. The window only matters to the point
/// generator; the sampler itself never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Window {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Result<Self> {
        let window = Self {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn unit() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite());
        if finite && self.x_max > self.x_min && self.y_max > self.y_min {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidWindow {
                x_min: self.x_min,
                x_max: self.x_max,
                y_min: self.y_min,
                y_max: self.y_max,
            }
            .into())
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn to_aabb(&self) -> Aabb2 {
        Aabb2::new(
            Point2::new(self.x_min, self.y_min),
            Point2::new(self.x_max, self.y_max),
        )
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::unit()
    }
}

impl From<&Aabb2> for Window {
    fn from(value: &Aabb2) -> Self {
        Self {
            x_min: value.mins.x,
            x_max: value.maxs.x,
            y_min: value.mins.y,
            y_max: value.maxs.y,
        }
    }
}

/// Everything needed to run a thinning simulation: the kernel and the window the underlying
/// Poisson points are generated in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DppConfig {
    pub kernel: KernelSpec,

    #[serde(default)]
    pub window: Window,
}

impl DppConfig {
    /// Parse and validate a configuration from a JSON document such as
    ///
    /// ```json
    /// { "kernel": { "kind": "cauchy", "intensity": 50.0, "sigma": 1.0, "alpha": 1.0 },
    ///   "window": { "x_min": 0.0, "x_max": 1.0, "y_min": 0.0, "y_max": 1.0 } }
    /// ```
    ///
    /// The kernel kind may also be given by its numeric code (`1` or `2`).
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        self.window.validate()
    }
}

impl Default for DppConfig {
    fn default() -> Self {
        Self {
            kernel: KernelSpec {
                kind: KernelKind::Gaussian,
                intensity: 50.0,
                sigma: 1.0,
                alpha: Some(1.0),
            },
            window: Window::unit(),
        }
    }
}
