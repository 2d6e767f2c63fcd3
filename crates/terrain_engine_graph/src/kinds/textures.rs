// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture nodes: ambient occlusion and material splatmaps.

use crate::artifact::{Heightfield, Image};
use crate::evaluation::ComputeError;
use crate::kernel::KernelError;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Number of material layers a splatmap can hold, one per RGBA channel
pub const SPLATMAP_CHANNELS: usize = 4;

/// Ambient occlusion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientOcclusionParams {
    /// Directions sampled around each texel
    pub samples: u32,
    /// Sampling distance in texels
    pub radius: f32,
    /// Darkening multiplier
    pub strength: f32,
    /// Horizon angle (radians) below which a sample does not occlude
    pub bias: f32,
    /// Height multiplier applied before measuring angles
    pub height_scale: f32,
}

impl Default for AmbientOcclusionParams {
    fn default() -> Self {
        Self {
            samples: 16,
            radius: 10.0,
            strength: 1.0,
            bias: 0.05,
            height_scale: 1.0,
        }
    }
}

/// Height and slope band covered by one splatmap channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialLayer {
    /// Material name, informational
    pub name: String,
    /// Lowest full-weight height
    pub height_min: f32,
    /// Highest full-weight height
    pub height_max: f32,
    /// Lowest full-weight slope in degrees
    pub slope_min: f32,
    /// Highest full-weight slope in degrees
    pub slope_max: f32,
    /// Fade width outside both bands
    pub blend_range: f32,
    /// How much per-texel noise breaks up the weight
    pub noise_scale: f32,
    /// Noise seed
    pub seed: u32,
}

impl Default for MaterialLayer {
    fn default() -> Self {
        Self {
            name: "Layer".to_string(),
            height_min: 0.0,
            height_max: 1.0,
            slope_min: 0.0,
            slope_max: 90.0,
            blend_range: 0.1,
            noise_scale: 0.0,
            seed: 12345,
        }
    }
}

impl MaterialLayer {
    fn preset(
        name: &str,
        height: (f32, f32),
        slope: (f32, f32),
        blend_range: f32,
        noise_scale: f32,
        seed: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            height_min: height.0,
            height_max: height.1,
            slope_min: slope.0,
            slope_max: slope.1,
            blend_range,
            noise_scale,
            seed,
        }
    }

    fn weight(&self, x: u32, y: u32, height: f32, slope: f32) -> f32 {
        let height_factor = band_factor(height, self.height_min, self.height_max, self.blend_range);
        let slope_factor = band_factor(slope, self.slope_min, self.slope_max, self.blend_range);
        let mut weight = height_factor * slope_factor;
        if self.noise_scale > 0.0 && weight > 0.0 {
            weight *= 1.0 - self.noise_scale + hash_noise(x, y, self.seed) * self.noise_scale;
        }
        weight.max(0.0)
    }
}

/// Splatmap parameters. Layer `i` is written to channel `i`; layers past
/// the fourth are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatmapParams {
    /// Material layers in channel order
    pub layers: Vec<MaterialLayer>,
}

impl Default for SplatmapParams {
    /// Grass, rock, snow and dirt tuned for mountain terrain in `[0, 1]`
    fn default() -> Self {
        Self {
            layers: vec![
                MaterialLayer::preset("Grass", (0.0, 0.4), (0.0, 30.0), 0.15, 0.2, 1001),
                MaterialLayer::preset("Rock", (0.2, 0.9), (25.0, 90.0), 0.1, 0.15, 1002),
                MaterialLayer::preset("Snow", (0.65, 1.0), (0.0, 90.0), 0.2, 0.1, 1003),
                MaterialLayer::preset("Dirt", (0.0, 0.5), (30.0, 90.0), 0.1, 0.25, 1004),
            ],
        }
    }
}

/// Horizon-based occlusion. White is fully open, darker texels sit below
/// higher neighbours.
pub(crate) fn ambient_occlusion(input: &Heightfield, params: &AmbientOcclusionParams) -> Result<Image, ComputeError> {
    if params.samples == 0 {
        return Err(KernelError::InvalidParameters("occlusion needs at least one sample".to_string()).into());
    }

    let (width, height) = (input.width(), input.height());
    tracing::debug!(width, height, samples = params.samples, "Generating ambient occlusion");

    let offsets: Vec<(f32, f32)> = (0..params.samples)
        .map(|i| {
            let angle = i as f32 / params.samples as f32 * TAU;
            (angle.cos() * params.radius, angle.sin() * params.radius)
        })
        .collect();

    let mut image = Image::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let center = input.sample(x, y);
            let mut total = 0.0;
            let mut count = 0u32;
            for &(ox, oy) in &offsets {
                // Truncation toward zero picks the sample texel.
                let (sx, sy) = ((x as f32 + ox) as i64, (y as f32 + oy) as i64);
                if sx < 0 || sy < 0 || sx >= i64::from(width) || sy >= i64::from(height) {
                    continue;
                }
                let rise = (input.sample(sx as u32, sy as u32) - center) * params.height_scale;
                let horizon = rise.atan2(params.radius);
                if horizon > params.bias {
                    total += horizon;
                    count += 1;
                }
            }
            let occlusion = if count > 0 { total / count as f32 } else { 0.0 };
            let value = (1.0 - occlusion * params.strength).clamp(0.0, 1.0);
            image.set_pixel(x, y, [value, value, value, 1.0]);
        }
    }
    Ok(image)
}

/// Per-texel material weights, normalized to sum to one.
pub(crate) fn splatmap(input: &Heightfield, params: &SplatmapParams) -> Image {
    let (width, height) = (input.width(), input.height());
    tracing::debug!(width, height, layers = params.layers.len(), "Generating splatmap");

    let mut image = Image::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let h = input.sample(x, y);
            let slope = slope_degrees(input, x, y);

            let mut weights = [0.0f32; SPLATMAP_CHANNELS];
            for (weight, layer) in weights.iter_mut().zip(&params.layers) {
                *weight = layer.weight(x, y, h, slope);
            }
            let total: f32 = weights.iter().sum();
            if total > 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            } else {
                weights[0] = 1.0;
            }
            image.set_pixel(x, y, weights);
        }
    }
    image
}

fn slope_degrees(input: &Heightfield, x: u32, y: u32) -> f32 {
    let (width, height) = (input.width(), input.height());
    let left = input.sample(x.saturating_sub(1), y);
    let right = input.sample((x + 1).min(width - 1), y);
    let down = input.sample(x, y.saturating_sub(1));
    let up = input.sample(x, (y + 1).min(height - 1));

    let dx = (right - left) / 2.0;
    let dy = (up - down) / 2.0;
    (dx * dx + dy * dy).sqrt().atan().to_degrees()
}

/// 1 inside `[min, max]`, fading to 0 over `blend` on either side
fn band_factor(value: f32, min: f32, max: f32, blend: f32) -> f32 {
    if value < min - blend || value > max + blend {
        0.0
    } else if value < min {
        smoothstep(min - blend, min, value)
    } else if value > max {
        1.0 - smoothstep(max, max + blend, value)
    } else {
        1.0
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Integer lattice hash in `[0, 1]`
fn hash_noise(x: u32, y: u32, seed: u32) -> f32 {
    let n = x.wrapping_add(y.wrapping_mul(57)).wrapping_add(seed.wrapping_mul(131));
    let n = (n << 13) ^ n;
    let hashed = n
        .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff;
    (1.0 - hashed as f32 / 1_073_741_824.0) * 0.5 + 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_terrain_is_unoccluded() {
        let flat = Heightfield::filled(8, 8, 0.4);
        let image = ambient_occlusion(&flat, &AmbientOcclusionParams::default()).unwrap();
        assert_eq!(image.pixel(3, 3), Some([1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_pit_is_darker_than_rim() {
        let mut field = Heightfield::filled(9, 9, 1.0);
        field.set(4, 4, 0.0);
        let params = AmbientOcclusionParams {
            samples: 8,
            radius: 1.0,
            ..Default::default()
        };
        let image = ambient_occlusion(&field, &params).unwrap();
        let pit = image.pixel(4, 4).unwrap()[0];
        let rim = image.pixel(1, 1).unwrap()[0];
        assert!(pit < rim, "pit {pit} should be darker than rim {rim}");
        assert_eq!(rim, 1.0);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let params = AmbientOcclusionParams { samples: 0, ..Default::default() };
        assert!(matches!(
            ambient_occlusion(&Heightfield::new(4, 4), &params),
            Err(ComputeError::Kernel(KernelError::InvalidParameters(_)))
        ));
    }

    #[test]
    fn test_splatmap_weights_sum_to_one() {
        let field = Heightfield::from_fn(16, 16, |x, y| (x * y) as f32 / 225.0);
        let image = splatmap(&field, &SplatmapParams::default());
        for (x, y) in [(0, 0), (5, 9), (15, 15)] {
            let sum: f32 = image.pixel(x, y).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "weights at ({x}, {y}) sum to {sum}");
        }
    }

    #[test]
    fn test_flat_summit_is_snow_only() {
        let summit = Heightfield::filled(4, 4, 1.0);
        let image = splatmap(&summit, &SplatmapParams::default());
        assert_eq!(image.pixel(2, 2), Some([0.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_no_matching_layer_falls_back_to_first_channel() {
        let params = SplatmapParams {
            layers: vec![MaterialLayer {
                height_min: 5.0,
                height_max: 6.0,
                ..Default::default()
            }],
        };
        let image = splatmap(&Heightfield::filled(2, 2, 0.0), &params);
        assert_eq!(image.pixel(0, 0), Some([1.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(band_factor(0.5, 0.0, 1.0, 0.1), 1.0);
        assert_eq!(band_factor(1.2, 0.0, 1.0, 0.1), 0.0);
        assert!((band_factor(1.05, 0.0, 1.0, 0.1) - 0.5).abs() < 1e-5);
        assert_eq!(smoothstep(1.0, 1.0, 1.0), 1.0);
        assert!((0.0..=1.0).contains(&hash_noise(3, 7, 1001)));
    }
}
