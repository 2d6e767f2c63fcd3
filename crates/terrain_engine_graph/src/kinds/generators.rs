// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generator nodes: artifacts from parameters alone.

use crate::artifact::Heightfield;
use crate::evaluation::{ComputeError, NodeInputs};
use crate::kernel::{KernelError, PerlinParams, TerrainKernels};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default generator resolution
pub const DEFAULT_RESOLUTION: u32 = 512;

/// Default random seed
pub const DEFAULT_SEED: u32 = 12345;

fn default_resolution() -> u32 {
    DEFAULT_RESOLUTION
}

/// Largest accepted generator width or height
pub const MAX_RESOLUTION: u32 = 16384;

fn check_dimensions(width: u32, height: u32) -> Result<(), ComputeError> {
    if width == 0 || height == 0 {
        return Err(KernelError::InvalidParameters(format!(
            "resolution must be non-zero, got {width}x{height}"
        ))
        .into());
    }
    if width > MAX_RESOLUTION || height > MAX_RESOLUTION {
        return Err(KernelError::InvalidParameters(format!(
            "resolution {width}x{height} exceeds {MAX_RESOLUTION}x{MAX_RESOLUTION}"
        ))
        .into());
    }
    Ok(())
}

/// Perlin noise generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerlinNoiseParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Noise settings passed to the kernel
    #[serde(flatten)]
    pub noise: PerlinParams,
}

impl Default for PerlinNoiseParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            noise: PerlinParams::default(),
        }
    }
}

/// Voronoi cell generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Number of feature points
    pub cell_count: i32,
    /// Distance scale
    pub amplitude: f32,
    /// Random seed
    pub seed: u32,
    /// Raise cell centres instead of edges
    pub invert: bool,
}

impl Default for VoronoiParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            cell_count: 20,
            amplitude: 1.0,
            seed: DEFAULT_SEED,
            invert: false,
        }
    }
}

/// Ridged noise generator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgedNoiseParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Underlying Perlin settings
    #[serde(flatten)]
    pub noise: PerlinParams,
    /// Ridge crest height
    pub ridge_offset: f32,
}

impl Default for RidgedNoiseParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            noise: PerlinParams::default(),
            ridge_offset: 1.0,
        }
    }
}

/// Linear gradient parameters. Direction comes from the `Direction` pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Slope multiplier
    pub amplitude: f32,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            amplitude: 1.0,
        }
    }
}

/// Constant field parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Value of every sample
    pub value: f32,
}

impl Default for ConstantParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            value: 0.5,
        }
    }
}

/// Uniform random noise parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhiteNoiseParams {
    /// Output width
    pub width: u32,
    /// Output height
    pub height: u32,
    /// Upper bound of sample values
    pub amplitude: f32,
    /// Random seed
    pub seed: u32,
}

impl Default for WhiteNoiseParams {
    fn default() -> Self {
        Self {
            width: default_resolution(),
            height: default_resolution(),
            amplitude: 1.0,
            seed: DEFAULT_SEED,
        }
    }
}

pub(crate) fn perlin(params: &PerlinNoiseParams, kernels: &dyn TerrainKernels) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    Ok(kernels.perlin(params.width, params.height, &params.noise)?)
}

pub(crate) fn voronoi(params: &VoronoiParams) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    if params.cell_count < 1 {
        return Err(KernelError::InvalidParameters(format!(
            "cell count must be positive, got {}",
            params.cell_count
        ))
        .into());
    }

    let mut rng = StdRng::seed_from_u64(u64::from(params.seed));
    let cells: Vec<(f32, f32)> = (0..params.cell_count)
        .map(|_| (rng.gen::<f32>(), rng.gen::<f32>()))
        .collect();

    let (w, h) = (params.width as f32, params.height as f32);
    let mut field = Heightfield::from_fn(params.width, params.height, |x, y| {
        let (px, py) = (x as f32 / w, y as f32 / h);
        let nearest = cells
            .iter()
            .map(|(cx, cy)| ((px - cx).powi(2) + (py - cy).powi(2)).sqrt())
            .fold(f32::MAX, f32::min);
        let value = nearest * params.amplitude;
        if params.invert {
            params.amplitude - value
        } else {
            value
        }
    });
    field.normalize(0.0, 1.0);
    Ok(field)
}

pub(crate) fn ridged(params: &RidgedNoiseParams, kernels: &dyn TerrainKernels) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    let base = kernels.perlin(params.width, params.height, &params.noise)?;
    let mut field = base.map(|v| params.ridge_offset - (v - 0.5).abs() * 2.0);
    field.normalize(0.0, 1.0);
    Ok(field)
}

pub(crate) fn gradient(params: &GradientParams, inputs: &NodeInputs) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    let [dx, dy] = inputs.vec2("Direction", [0.0, 1.0]);
    let length = (dx * dx + dy * dy).sqrt();
    if length <= f32::EPSILON {
        return Err(KernelError::InvalidParameters("gradient direction is zero".to_string()).into());
    }
    let (dx, dy) = (dx / length, dy / length);

    let (w, h) = (params.width as f32, params.height as f32);
    let mut field = Heightfield::from_fn(params.width, params.height, |x, y| {
        (x as f32 / w * dx + y as f32 / h * dy) * params.amplitude
    });
    field.normalize(0.0, 1.0);
    Ok(field)
}

pub(crate) fn constant(params: &ConstantParams) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    Ok(Heightfield::filled(params.width, params.height, params.value))
}

pub(crate) fn white_noise(params: &WhiteNoiseParams) -> Result<Heightfield, ComputeError> {
    check_dimensions(params.width, params.height)?;
    let mut rng = StdRng::seed_from_u64(u64::from(params.seed));
    Ok(Heightfield::from_fn(params.width, params.height, |_, _| {
        rng.gen::<f32>() * params.amplitude
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinValue;

    #[test]
    fn test_voronoi_normalized_and_seeded() {
        let params = VoronoiParams { width: 32, height: 32, ..Default::default() };
        let a = voronoi(&params).unwrap();
        assert_eq!(a, voronoi(&params).unwrap());
        assert!((a.min() - 0.0).abs() < 1e-6);
        assert!((a.max() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_follows_direction() {
        let params = GradientParams { width: 8, height: 8, amplitude: 1.0 };
        let inputs = NodeInputs::new().with_scalar("Direction", Some(PinValue::Vec2([1.0, 0.0])));
        let field = gradient(&params, &inputs).unwrap();
        assert_eq!(field.sample(0, 3), 0.0);
        assert_eq!(field.sample(7, 3), 1.0);
        assert_eq!(field.sample(4, 0), field.sample(4, 7));
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let params = ConstantParams { width: 0, ..Default::default() };
        assert!(matches!(constant(&params), Err(ComputeError::Kernel(_))));
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let params = ConstantParams { width: u32::MAX, height: u32::MAX, value: 1.0 };
        assert!(matches!(constant(&params), Err(ComputeError::Kernel(KernelError::InvalidParameters(_)))));

        let wide = WhiteNoiseParams { width: MAX_RESOLUTION + 1, height: 1, ..Default::default() };
        assert!(white_noise(&wide).is_err());
        let edge = ConstantParams { width: MAX_RESOLUTION, height: 1, value: 0.0 };
        assert_eq!(constant(&edge).map(|f| f.width()), Ok(MAX_RESOLUTION));
    }

    #[test]
    fn test_white_noise_within_amplitude() {
        let params = WhiteNoiseParams { width: 16, height: 16, amplitude: 0.25, seed: 7 };
        let field = white_noise(&params).unwrap();
        assert!(field.data().iter().all(|&h| (0.0..0.25).contains(&h)));
    }
}
