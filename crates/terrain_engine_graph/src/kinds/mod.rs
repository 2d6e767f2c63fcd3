// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.
//!
//! Every node in a graph is one variant of [`NodeKind`]. A variant carries
//! its own parameter struct, declares its pin layout, and computes one
//! artifact from resolved inputs.

pub mod combiners;
pub mod filters;
pub mod generators;
pub mod modifiers;
pub mod textures;

use crate::artifact::{Artifact, Heightfield};
use crate::evaluation::{ComputeError, NodeInputs};
use crate::kernel::{HydraulicErosionParams, TerrainKernels, ThermalErosionParams};
use crate::node::NodeCategory;
use crate::pin::{PinType, PinValue};
use combiners::CombineOp;
use filters::{NormalMapParams, SharpenParams, SmoothParams};
use generators::{
    ConstantParams, GradientParams, PerlinNoiseParams, RidgedNoiseParams, VoronoiParams, WhiteNoiseParams,
};
use modifiers::{ClampParams, CurveParams, ScaleParams, TerraceParams};
use textures::{AmbientOcclusionParams, SplatmapParams};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Name of the single artifact input on modifier, filter and output nodes
pub const INPUT_PIN: &str = "Input";

/// Name of the artifact output on most nodes
pub const OUTPUT_PIN: &str = "Output";

/// Declaration of one pin in a node kind's layout
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    /// Pin name
    pub name: &'static str,
    /// Pin type
    pub pin_type: PinType,
    /// Initial stored value for scalar inputs
    pub value: Option<PinValue>,
}

impl PinSpec {
    fn artifact(name: &'static str, pin_type: PinType) -> Self {
        Self { name, pin_type, value: None }
    }

    fn scalar(name: &'static str, value: PinValue) -> Self {
        Self {
            name,
            pin_type: value.pin_type(),
            value: Some(value),
        }
    }
}

/// Input and output pins of a node kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinLayout {
    /// Input pins in order
    pub inputs: Vec<PinSpec>,
    /// Output pins in order
    pub outputs: Vec<PinSpec>,
}

/// Closed set of node kinds with their parameters
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Fractal Perlin noise via the kernel
    PerlinNoise(PerlinNoiseParams),
    /// Distance to nearest random feature point
    Voronoi(VoronoiParams),
    /// Ridged transform of Perlin noise
    RidgedNoise(RidgedNoiseParams),
    /// Linear ramp
    Gradient(GradientParams),
    /// Uniform value
    Constant(ConstantParams),
    /// Uniform random samples
    WhiteNoise(WhiteNoiseParams),
    /// Step quantization
    Terrace(TerraceParams),
    /// Clamp into a range
    Clamp(ClampParams),
    /// Flip within the input's own range
    Invert,
    /// Affine scale
    Scale(ScaleParams),
    /// Power curve
    Curve(CurveParams),
    /// Box blur
    Smooth(SmoothParams),
    /// Laplacian sharpen
    Sharpen(SharpenParams),
    /// Thermal erosion via the kernel
    ThermalErosion(ThermalErosionParams),
    /// Hydraulic erosion via the kernel
    HydraulicErosion(HydraulicErosionParams),
    /// Derive a tangent-space normal map image
    NormalMap(NormalMapParams),
    /// Horizon-based ambient occlusion image
    AmbientOcclusion(AmbientOcclusionParams),
    /// Four-layer material weight image
    Splatmap(SplatmapParams),
    /// Sum of two inputs
    Add,
    /// Product of two inputs
    Multiply,
    /// Mix of two inputs
    Blend,
    /// Elementwise maximum
    Max,
    /// Elementwise minimum
    Min,
    /// Graph result pass-through
    Output,
}

impl NodeKind {
    /// Registry type name (display name without spaces)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PerlinNoise(_) => "PerlinNoise",
            Self::Voronoi(_) => "Voronoi",
            Self::RidgedNoise(_) => "RidgedNoise",
            Self::Gradient(_) => "Gradient",
            Self::Constant(_) => "Constant",
            Self::WhiteNoise(_) => "WhiteNoise",
            Self::Terrace(_) => "Terrace",
            Self::Clamp(_) => "Clamp",
            Self::Invert => "Invert",
            Self::Scale(_) => "Scale",
            Self::Curve(_) => "Curve",
            Self::Smooth(_) => "Smooth",
            Self::Sharpen(_) => "Sharpen",
            Self::ThermalErosion(_) => "ThermalErosion",
            Self::HydraulicErosion(_) => "HydraulicErosion",
            Self::NormalMap(_) => "NormalMap",
            Self::AmbientOcclusion(_) => "AmbientOcclusion",
            Self::Splatmap(_) => "Splatmap",
            Self::Add => "Add",
            Self::Multiply => "Multiply",
            Self::Blend => "Blend",
            Self::Max => "Max",
            Self::Min => "Min",
            Self::Output => "Output",
        }
    }

    /// Default display name for new nodes
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PerlinNoise(_) => "Perlin Noise",
            Self::RidgedNoise(_) => "Ridged Noise",
            Self::WhiteNoise(_) => "White Noise",
            Self::ThermalErosion(_) => "Thermal Erosion",
            Self::HydraulicErosion(_) => "Hydraulic Erosion",
            Self::NormalMap(_) => "Normal Map",
            Self::AmbientOcclusion(_) => "Ambient Occlusion",
            other => other.type_name(),
        }
    }

    /// Classification
    pub fn category(&self) -> NodeCategory {
        match self {
            Self::PerlinNoise(_)
            | Self::Voronoi(_)
            | Self::RidgedNoise(_)
            | Self::Gradient(_)
            | Self::Constant(_)
            | Self::WhiteNoise(_) => NodeCategory::Generator,
            Self::Terrace(_) | Self::Clamp(_) | Self::Invert | Self::Scale(_) | Self::Curve(_) => {
                NodeCategory::Modifier
            }
            Self::Smooth(_)
            | Self::Sharpen(_)
            | Self::ThermalErosion(_)
            | Self::HydraulicErosion(_)
            | Self::NormalMap(_)
            | Self::AmbientOcclusion(_)
            | Self::Splatmap(_) => NodeCategory::Filter,
            Self::Add | Self::Multiply | Self::Blend | Self::Max | Self::Min => NodeCategory::Combiner,
            Self::Output => NodeCategory::Output,
        }
    }

    /// Pins created for nodes of this kind
    pub fn pin_layout(&self) -> PinLayout {
        let heightfield_out = || vec![PinSpec::artifact(OUTPUT_PIN, PinType::Heightfield)];
        let heightfield_in = || PinSpec::artifact(INPUT_PIN, PinType::Heightfield);

        match self.category() {
            NodeCategory::Generator => PinLayout {
                inputs: match self {
                    Self::Gradient(_) => vec![PinSpec::scalar("Direction", PinValue::Vec2([0.0, 1.0]))],
                    _ => Vec::new(),
                },
                outputs: heightfield_out(),
            },
            NodeCategory::Combiner => {
                let mut inputs = vec![
                    PinSpec::artifact("A", PinType::Heightfield),
                    PinSpec::artifact("B", PinType::Heightfield),
                ];
                if matches!(self, Self::Blend) {
                    inputs.push(PinSpec::scalar("Factor", PinValue::Float(0.5)));
                }
                PinLayout { inputs, outputs: heightfield_out() }
            }
            NodeCategory::Output => PinLayout {
                inputs: vec![heightfield_in()],
                outputs: Vec::new(),
            },
            NodeCategory::Modifier | NodeCategory::Filter => {
                let mut inputs = vec![heightfield_in()];
                if matches!(self, Self::Terrace(_)) {
                    inputs.push(PinSpec::scalar("Steps", PinValue::Int(5)));
                }
                let outputs = match self {
                    Self::NormalMap(_) => vec![PinSpec::artifact("Normal", PinType::Image)],
                    Self::AmbientOcclusion(_) => vec![PinSpec::artifact("Occlusion", PinType::Image)],
                    Self::Splatmap(_) => vec![PinSpec::artifact("Splatmap", PinType::Image)],
                    _ => heightfield_out(),
                };
                PinLayout { inputs, outputs }
            }
        }
    }

    /// Parameters as a JSON object (empty for parameterless kinds)
    pub fn params_json(&self) -> Value {
        match self {
            Self::PerlinNoise(p) => to_params(p),
            Self::Voronoi(p) => to_params(p),
            Self::RidgedNoise(p) => to_params(p),
            Self::Gradient(p) => to_params(p),
            Self::Constant(p) => to_params(p),
            Self::WhiteNoise(p) => to_params(p),
            Self::Terrace(p) => to_params(p),
            Self::Clamp(p) => to_params(p),
            Self::Scale(p) => to_params(p),
            Self::Curve(p) => to_params(p),
            Self::Smooth(p) => to_params(p),
            Self::Sharpen(p) => to_params(p),
            Self::ThermalErosion(p) => to_params(p),
            Self::HydraulicErosion(p) => to_params(p),
            Self::NormalMap(p) => to_params(p),
            Self::AmbientOcclusion(p) => to_params(p),
            Self::Splatmap(p) => to_params(p),
            Self::Invert | Self::Add | Self::Multiply | Self::Blend | Self::Max | Self::Min | Self::Output => {
                Value::Object(serde_json::Map::new())
            }
        }
    }

    /// Replace parameters from a JSON object. Missing keys take defaults,
    /// unknown keys are ignored.
    pub fn apply_params(&mut self, params: &Value) -> Result<(), serde_json::Error> {
        match self {
            Self::PerlinNoise(p) => *p = from_params(params)?,
            Self::Voronoi(p) => *p = from_params(params)?,
            Self::RidgedNoise(p) => *p = from_params(params)?,
            Self::Gradient(p) => *p = from_params(params)?,
            Self::Constant(p) => *p = from_params(params)?,
            Self::WhiteNoise(p) => *p = from_params(params)?,
            Self::Terrace(p) => *p = from_params(params)?,
            Self::Clamp(p) => *p = from_params(params)?,
            Self::Scale(p) => *p = from_params(params)?,
            Self::Curve(p) => *p = from_params(params)?,
            Self::Smooth(p) => *p = from_params(params)?,
            Self::Sharpen(p) => *p = from_params(params)?,
            Self::ThermalErosion(p) => *p = from_params(params)?,
            Self::HydraulicErosion(p) => *p = from_params(params)?,
            Self::NormalMap(p) => *p = from_params(params)?,
            Self::AmbientOcclusion(p) => *p = from_params(params)?,
            Self::Splatmap(p) => *p = from_params(params)?,
            Self::Invert | Self::Add | Self::Multiply | Self::Blend | Self::Max | Self::Min | Self::Output => {}
        }
        Ok(())
    }

    /// Run this kind's computation over resolved inputs
    pub fn compute(&self, inputs: &NodeInputs, kernels: &dyn TerrainKernels) -> Result<Artifact, ComputeError> {
        let heightfield = match self {
            Self::PerlinNoise(p) => generators::perlin(p, kernels)?,
            Self::Voronoi(p) => generators::voronoi(p)?,
            Self::RidgedNoise(p) => generators::ridged(p, kernels)?,
            Self::Gradient(p) => generators::gradient(p, inputs)?,
            Self::Constant(p) => generators::constant(p)?,
            Self::WhiteNoise(p) => generators::white_noise(p)?,
            Self::Terrace(p) => modifiers::terrace(inputs.heightfield(INPUT_PIN)?, inputs.int("Steps", 5), p),
            Self::Clamp(p) => modifiers::clamp(inputs.heightfield(INPUT_PIN)?, p),
            Self::Invert => modifiers::invert(inputs.heightfield(INPUT_PIN)?),
            Self::Scale(p) => modifiers::scale(inputs.heightfield(INPUT_PIN)?, p),
            Self::Curve(p) => modifiers::curve(inputs.heightfield(INPUT_PIN)?, p),
            Self::Smooth(p) => filters::smooth(inputs.heightfield(INPUT_PIN)?, p),
            Self::Sharpen(p) => filters::sharpen(inputs.heightfield(INPUT_PIN)?, p),
            Self::ThermalErosion(p) => kernels.thermal_erosion(inputs.heightfield(INPUT_PIN)?, p)?,
            Self::HydraulicErosion(p) => kernels.hydraulic_erosion(inputs.heightfield(INPUT_PIN)?, p)?,
            Self::NormalMap(p) => {
                return Ok(Artifact::Image(filters::normal_map(inputs.heightfield(INPUT_PIN)?, p)));
            }
            Self::AmbientOcclusion(p) => {
                return Ok(Artifact::Image(textures::ambient_occlusion(inputs.heightfield(INPUT_PIN)?, p)?));
            }
            Self::Splatmap(p) => {
                return Ok(Artifact::Image(textures::splatmap(inputs.heightfield(INPUT_PIN)?, p)));
            }
            Self::Output => inputs.heightfield(INPUT_PIN)?.clone(),
            Self::Add => combine_inputs(CombineOp::Add, inputs)?,
            Self::Multiply => combine_inputs(CombineOp::Multiply, inputs)?,
            Self::Blend => combine_inputs(CombineOp::Blend, inputs)?,
            Self::Max => combine_inputs(CombineOp::Max, inputs)?,
            Self::Min => combine_inputs(CombineOp::Min, inputs)?,
        };
        Ok(Artifact::Heightfield(heightfield))
    }
}

fn combine_inputs(op: CombineOp, inputs: &NodeInputs) -> Result<Heightfield, ComputeError> {
    let (a, b) = inputs.heightfield_pair("A", "B")?;
    combiners::combine(op, a, b, inputs.float("Factor", 0.5)).ok_or(ComputeError::DimensionMismatch {
        a: (a.width(), a.height()),
        b: (b.width(), b.height()),
    })
}

fn to_params<T: Serialize>(params: &T) -> Value {
    serde_json::to_value(params).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

fn from_params<T: DeserializeOwned + Default>(params: &Value) -> Result<T, serde_json::Error> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CpuKernels;
    use serde_json::json;

    #[test]
    fn test_params_json_round_trip() {
        let mut kind = NodeKind::PerlinNoise(PerlinNoiseParams::default());
        let mut params = kind.params_json();
        assert_eq!(params["octaves"], json!(6));
        assert_eq!(params["width"], json!(512));

        params["seed"] = json!(1);
        kind.apply_params(&params).unwrap();
        match &kind {
            NodeKind::PerlinNoise(p) => {
                assert_eq!(p.noise.seed, 1);
                assert_eq!(p.noise.octaves, 6);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_partial_params_take_defaults() {
        let mut kind = NodeKind::Scale(ScaleParams { scale: 5.0, bias: 1.0 });
        kind.apply_params(&json!({ "scale": 3.0 })).unwrap();
        assert_eq!(kind, NodeKind::Scale(ScaleParams { scale: 3.0, bias: 0.0 }));
    }

    #[test]
    fn test_layouts() {
        let blend = NodeKind::Blend.pin_layout();
        let names: Vec<_> = blend.inputs.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["A", "B", "Factor"]);
        assert_eq!(blend.inputs[2].value, Some(PinValue::Float(0.5)));

        let output = NodeKind::Output.pin_layout();
        assert_eq!(output.inputs.len(), 1);
        assert!(output.outputs.is_empty());

        let normal = NodeKind::NormalMap(NormalMapParams::default()).pin_layout();
        assert_eq!(normal.outputs[0].pin_type, PinType::Image);

        let splat = NodeKind::Splatmap(SplatmapParams::default()).pin_layout();
        assert_eq!(splat.inputs[0].name, INPUT_PIN);
        assert_eq!((splat.outputs[0].name, splat.outputs[0].pin_type), ("Splatmap", PinType::Image));
    }

    #[test]
    fn test_combiner_mismatch() {
        let inputs = NodeInputs::new()
            .with_artifact("A", Artifact::Heightfield(Heightfield::new(64, 64)))
            .with_artifact("B", Artifact::Heightfield(Heightfield::new(32, 32)));
        assert!(matches!(
            NodeKind::Add.compute(&inputs, &CpuKernels),
            Err(ComputeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_modifier_without_input() {
        assert_eq!(
            NodeKind::Invert.compute(&NodeInputs::new(), &CpuKernels),
            Err(ComputeError::MissingInput(INPUT_PIN.to_string()))
        );
    }

    #[test]
    fn test_texture_kinds_compute_images() {
        let inputs = NodeInputs::new().with_artifact(INPUT_PIN, Artifact::Heightfield(Heightfield::filled(6, 4, 0.5)));
        let occlusion = NodeKind::AmbientOcclusion(AmbientOcclusionParams::default())
            .compute(&inputs, &CpuKernels)
            .unwrap();
        assert_eq!(occlusion.pin_type(), PinType::Image);
        assert_eq!(occlusion.dimensions(), (6, 4));

        let mut splat = NodeKind::Splatmap(SplatmapParams::default());
        assert_eq!(splat.params_json()["layers"][2]["name"], json!("Snow"));
        splat.apply_params(&json!({ "layers": [{ "name": "Mud" }] })).unwrap();
        let image = splat.compute(&inputs, &CpuKernels).unwrap();
        assert_eq!(image.as_image().and_then(|i| i.pixel(0, 0)), Some([1.0, 0.0, 0.0, 0.0]));
    }
}
