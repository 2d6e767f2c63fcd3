// SPDX-License-Identifier: MIT OR Apache-2.0
//! Single-input, per-sample modifier nodes.

use crate::artifact::Heightfield;
use serde::{Deserialize, Serialize};

/// Terrace parameters. Step count comes from the `Steps` pin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraceParams {
    /// Mix of the original value back into the stepped one
    pub blend: f32,
}

impl Default for TerraceParams {
    fn default() -> Self {
        Self { blend: 0.1 }
    }
}

/// Clamp parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClampParams {
    /// Lower bound
    pub min_value: f32,
    /// Upper bound
    pub max_value: f32,
}

impl Default for ClampParams {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 1.0,
        }
    }
}

/// Affine scale parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleParams {
    /// Multiplier
    pub scale: f32,
    /// Offset added after scaling
    pub bias: f32,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self { scale: 2.0, bias: 0.0 }
    }
}

/// Power curve parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// Exponent
    pub power: f32,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self { power: 2.0 }
    }
}

pub(crate) fn terrace(input: &Heightfield, steps: i32, params: &TerraceParams) -> Heightfield {
    let steps = steps.max(1) as f32;
    input.map(|v| {
        let stepped = (v * steps).floor() / steps;
        stepped * (1.0 - params.blend) + v * params.blend
    })
}

pub(crate) fn clamp(input: &Heightfield, params: &ClampParams) -> Heightfield {
    let (lo, hi) = if params.min_value <= params.max_value {
        (params.min_value, params.max_value)
    } else {
        (params.max_value, params.min_value)
    };
    input.map(|v| v.clamp(lo, hi))
}

pub(crate) fn invert(input: &Heightfield) -> Heightfield {
    let (min, max) = (input.min(), input.max());
    input.map(|v| max - v + min)
}

pub(crate) fn scale(input: &Heightfield, params: &ScaleParams) -> Heightfield {
    input.map(|v| v * params.scale + params.bias)
}

pub(crate) fn curve(input: &Heightfield, params: &CurveParams) -> Heightfield {
    let mut output = input.map(|v| v.max(0.0).powf(params.power));
    output.normalize(0.0, 1.0);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Heightfield {
        Heightfield::from_fn(5, 1, |x, _| x as f32 * 0.25)
    }

    #[test]
    fn test_terrace_without_blend_quantizes() {
        let out = terrace(&ramp(), 2, &TerraceParams { blend: 0.0 });
        assert_eq!(out.data(), &[0.0, 0.0, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_invert_preserves_range() {
        let out = invert(&ramp());
        assert_eq!(out.data(), &[1.0, 0.75, 0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_scale_and_bias() {
        let out = scale(&ramp(), &ScaleParams { scale: 2.0, bias: 1.0 });
        assert_eq!(out.data(), &[1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_clamp_accepts_swapped_bounds() {
        let out = clamp(&ramp(), &ClampParams { min_value: 0.75, max_value: 0.25 });
        assert_eq!(out.data(), &[0.25, 0.25, 0.5, 0.75, 0.75]);
    }
}
