// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boundary to the numerical terrain algorithms.
//!
//! Nodes never synthesize noise or run erosion themselves when a kernel
//! exists for it; they hand their inputs and parameters to a
//! [`TerrainKernels`] implementation and cache whatever comes back. A kernel
//! call is blocking: GPU-backed implementations must wait for device work to
//! finish before returning.

use crate::artifact::Heightfield;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Failure reported by a kernel
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// Parameters the kernel cannot work with
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The kernel is not available in this implementation
    #[error("Unsupported kernel: {0}")]
    Unsupported(&'static str),
}

/// Fractal Perlin noise parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerlinParams {
    /// Base frequency in cycles per sample
    pub frequency: f32,
    /// Output amplitude
    pub amplitude: f32,
    /// Number of octaves
    pub octaves: i32,
    /// Frequency multiplier between octaves
    pub lacunarity: f32,
    /// Amplitude multiplier between octaves
    pub persistence: f32,
    /// Random seed
    pub seed: u32,
}

impl Default for PerlinParams {
    fn default() -> Self {
        Self {
            frequency: 0.01,
            amplitude: 1.0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 12345,
        }
    }
}

/// Thermal erosion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalErosionParams {
    /// Number of passes
    pub iterations: i32,
    /// Maximum stable height difference between orthogonal neighbours
    pub talus_angle: f32,
    /// Fraction of excess material moved per pass
    pub strength: f32,
}

impl Default for ThermalErosionParams {
    fn default() -> Self {
        Self {
            iterations: 10,
            talus_angle: 0.7,
            strength: 0.5,
        }
    }
}

/// Droplet-based hydraulic erosion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicErosionParams {
    /// Number of simulated droplets
    pub iterations: i32,
    /// Random seed
    pub seed: u32,
    /// Droplet direction inertia
    pub inertia: f32,
    /// Sediment carried per unit of speed and water
    pub sediment_capacity: f32,
    /// Lower bound on slope used for capacity
    pub min_slope: f32,
    /// Erosion rate
    pub erode_speed: f32,
    /// Deposition rate
    pub deposit_speed: f32,
    /// Water evaporation rate
    pub evaporate_speed: f32,
    /// Gravity
    pub gravity: f32,
    /// Maximum droplet steps
    pub max_droplet_lifetime: f32,
}

impl Default for HydraulicErosionParams {
    fn default() -> Self {
        Self {
            iterations: 100_000,
            seed: 12345,
            inertia: 0.05,
            sediment_capacity: 4.0,
            min_slope: 0.01,
            erode_speed: 0.3,
            deposit_speed: 0.3,
            evaporate_speed: 0.01,
            gravity: 4.0,
            max_droplet_lifetime: 30.0,
        }
    }
}

/// External terrain algorithms consumed by nodes.
///
/// Inputs are borrowed for the duration of the call only and every result
/// is a freshly allocated artifact.
pub trait TerrainKernels: Send {
    /// Fractal Perlin noise, values roughly in `[0, amplitude]`
    fn perlin(&self, width: u32, height: u32, params: &PerlinParams) -> Result<Heightfield, KernelError>;

    /// Slope-driven material slumping
    fn thermal_erosion(
        &self,
        input: &Heightfield,
        params: &ThermalErosionParams,
    ) -> Result<Heightfield, KernelError>;

    /// Water droplet erosion
    fn hydraulic_erosion(
        &self,
        _input: &Heightfield,
        _params: &HydraulicErosionParams,
    ) -> Result<Heightfield, KernelError> {
        Err(KernelError::Unsupported("hydraulic erosion"))
    }
}

/// Reference CPU implementation of the kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuKernels;

impl TerrainKernels for CpuKernels {
    fn perlin(&self, width: u32, height: u32, params: &PerlinParams) -> Result<Heightfield, KernelError> {
        if params.octaves < 1 {
            return Err(KernelError::InvalidParameters(format!(
                "octaves must be positive, got {}",
                params.octaves
            )));
        }

        tracing::debug!(width, height, seed = params.seed, "Generating Perlin terrain");

        let fbm = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_frequency(f64::from(params.frequency))
            .set_lacunarity(f64::from(params.lacunarity))
            .set_persistence(f64::from(params.persistence));

        let amplitude = params.amplitude;
        Ok(Heightfield::from_fn(width, height, |x, y| {
            let v = fbm.get([f64::from(x), f64::from(y)]) as f32;
            (v * 0.5 + 0.5) * amplitude
        }))
    }

    fn thermal_erosion(
        &self,
        input: &Heightfield,
        params: &ThermalErosionParams,
    ) -> Result<Heightfield, KernelError> {
        if !(0.0..=1.0).contains(&params.strength) {
            return Err(KernelError::InvalidParameters(format!(
                "strength must be within [0, 1], got {}",
                params.strength
            )));
        }

        let mut terrain = input.clone();
        let (width, height) = (terrain.width(), terrain.height());
        if width < 3 || height < 3 {
            return Ok(terrain);
        }

        const NEIGHBOURS: [(i32, i32); 8] = [
            (-1, -1), (0, -1), (1, -1),
            (-1, 0), (1, 0),
            (-1, 1), (0, 1), (1, 1),
        ];

        for _ in 0..params.iterations.max(0) {
            let mut delta = Heightfield::new(width, height);

            for y in 1..height - 1 {
                for x in 1..width - 1 {
                    let center = terrain.sample(x, y);
                    let mut excess = [0.0f32; 8];
                    let mut total = 0.0;
                    let mut lower = 0;

                    for (i, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
                        let nx = (x as i32 + dx) as u32;
                        let ny = (y as i32 + dy) as u32;
                        let distance = if *dx == 0 || *dy == 0 { 1.0 } else { std::f32::consts::SQRT_2 };
                        let diff = center - terrain.sample(nx, ny);
                        let max_diff = params.talus_angle * distance;
                        if diff > max_diff {
                            excess[i] = diff - max_diff;
                            total += excess[i];
                            lower += 1;
                        }
                    }

                    if lower == 0 {
                        continue;
                    }

                    let moved = total * params.strength / lower as f32;
                    for (i, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
                        if excess[i] > 0.0 {
                            let nx = (x as i32 + dx) as u32;
                            let ny = (y as i32 + dy) as u32;
                            delta.set(nx, ny, delta.sample(nx, ny) + moved);
                            delta.set(x, y, delta.sample(x, y) - moved);
                        }
                    }
                }
            }

            for (h, d) in terrain.data_mut().iter_mut().zip(delta.data()) {
                *h += d;
            }
        }

        Ok(terrain)
    }
}
