// SPDX-License-Identifier: MIT OR Apache-2.0
//! Neighbourhood filters and texture derivation.

use crate::artifact::{Heightfield, Image};
use serde::{Deserialize, Serialize};

/// Box blur parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothParams {
    /// Number of blur passes
    pub iterations: i32,
    /// Mix between original and blurred value
    pub strength: f32,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            iterations: 1,
            strength: 0.5,
        }
    }
}

/// Laplacian sharpen parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpenParams {
    /// Kernel weight
    pub strength: f32,
}

impl Default for SharpenParams {
    fn default() -> Self {
        Self { strength: 1.0 }
    }
}

/// Normal map parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalMapParams {
    /// Multiplier on the tangent components
    pub strength: f32,
    /// Height multiplier used for gradients
    pub height_scale: f32,
    /// Flip green channel (DirectX convention)
    pub invert_y: bool,
}

impl Default for NormalMapParams {
    fn default() -> Self {
        Self {
            strength: 1.0,
            height_scale: 1.0,
            invert_y: false,
        }
    }
}

pub(crate) fn smooth(input: &Heightfield, params: &SmoothParams) -> Heightfield {
    let (width, height) = (input.width(), input.height());
    let mut output = input.clone();
    if width < 3 || height < 3 {
        return output;
    }

    for _ in 0..params.iterations.max(0) {
        let previous = output.clone();
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let mut sum = 0.0;
                for ny in y - 1..=y + 1 {
                    for nx in x - 1..=x + 1 {
                        sum += previous.sample(nx, ny);
                    }
                }
                let original = previous.sample(x, y);
                output.set(x, y, original * (1.0 - params.strength) + sum / 9.0 * params.strength);
            }
        }
    }
    output
}

pub(crate) fn sharpen(input: &Heightfield, params: &SharpenParams) -> Heightfield {
    let (width, height) = (input.width(), input.height());
    let mut output = input.clone();
    if width < 3 || height < 3 {
        return output;
    }

    // Borders keep the input values.
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = input.sample(x, y);
            let neighbours = input.sample(x - 1, y)
                + input.sample(x + 1, y)
                + input.sample(x, y - 1)
                + input.sample(x, y + 1);
            output.set(x, y, center * (1.0 + 4.0 * params.strength) - neighbours * params.strength);
        }
    }
    output
}

pub(crate) fn normal_map(input: &Heightfield, params: &NormalMapParams) -> Image {
    let (width, height) = (input.width(), input.height());
    let mut image = Image::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let left = input.sample(x.saturating_sub(1), y);
            let right = input.sample((x + 1).min(width - 1), y);
            let down = input.sample(x, y.saturating_sub(1));
            let up = input.sample(x, (y + 1).min(height - 1));

            let dx = (right - left) * params.height_scale;
            let dy = (up - down) * params.height_scale;
            let (nx, ny, nz) = normalize3(-dx, -dy, 1.0);
            let (nx, ny, nz) = normalize3(nx * params.strength, ny * params.strength, nz);
            let ny = if params.invert_y { -ny } else { ny };

            image.set_pixel(x, y, [nx * 0.5 + 0.5, ny * 0.5 + 0.5, nz * 0.5 + 0.5, 1.0]);
        }
    }
    image
}

fn normalize3(x: f32, y: f32, z: f32) -> (f32, f32, f32) {
    let length = (x * x + y * y + z * z).sqrt();
    if length <= f32::EPSILON {
        return (0.0, 0.0, 1.0);
    }
    (x / length, y / length, z / length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_flattens_spike() {
        let mut spike = Heightfield::new(3, 3);
        spike.set(1, 1, 9.0);
        let out = smooth(&spike, &SmoothParams { iterations: 1, strength: 1.0 });
        assert_eq!(out.sample(1, 1), 1.0);
        assert_eq!(out.sample(0, 0), 0.0);
    }

    #[test]
    fn test_sharpen_keeps_flat_field() {
        let flat = Heightfield::filled(4, 4, 0.5);
        assert_eq!(sharpen(&flat, &SharpenParams::default()), flat);
    }

    #[test]
    fn test_flat_normal_map_points_up() {
        let flat = Heightfield::filled(4, 4, 0.3);
        let image = normal_map(&flat, &NormalMapParams::default());
        assert_eq!(image.pixel(2, 2), Some([0.5, 0.5, 1.0, 1.0]));
    }
}
