// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of constructible node types, keyed by type name.

use crate::kernel::{HydraulicErosionParams, ThermalErosionParams};
use crate::kinds::filters::{NormalMapParams, SharpenParams, SmoothParams};
use crate::kinds::generators::{
    ConstantParams, GradientParams, PerlinNoiseParams, RidgedNoiseParams, VoronoiParams, WhiteNoiseParams,
};
use crate::kinds::modifiers::{ClampParams, CurveParams, ScaleParams, TerraceParams};
use crate::kinds::textures::{AmbientOcclusionParams, SplatmapParams};
use crate::kinds::NodeKind;
use crate::node::NodeCategory;
use indexmap::IndexMap;

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: &'static str,
    construct: fn() -> NodeKind,
}

impl NodeType {
    /// Build a kind with default parameters
    pub fn instantiate(&self) -> NodeKind {
        (self.construct)()
    }
}

/// Registry of available node types
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    types: IndexMap<&'static str, NodeType>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { types: IndexMap::new() }
    }

    /// Registry holding every built-in node kind
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        // Generators
        registry.register("Generate fractal Perlin noise", || NodeKind::PerlinNoise(PerlinNoiseParams::default()));
        registry.register("Distance to nearest Voronoi cell", || NodeKind::Voronoi(VoronoiParams::default()));
        registry.register("Sharp ridges from folded noise", || NodeKind::RidgedNoise(RidgedNoiseParams::default()));
        registry.register("Linear ramp along a direction", || NodeKind::Gradient(GradientParams::default()));
        registry.register("Uniform height", || NodeKind::Constant(ConstantParams::default()));
        registry.register("Uniform random samples", || NodeKind::WhiteNoise(WhiteNoiseParams::default()));

        // Modifiers
        registry.register("Quantize into steps", || NodeKind::Terrace(TerraceParams::default()));
        registry.register("Clamp heights into a range", || NodeKind::Clamp(ClampParams::default()));
        registry.register("Flip heights within their range", || NodeKind::Invert);
        registry.register("Multiply and offset heights", || NodeKind::Scale(ScaleParams::default()));
        registry.register("Apply a power curve", || NodeKind::Curve(CurveParams::default()));

        // Filters
        registry.register("Box blur", || NodeKind::Smooth(SmoothParams::default()));
        registry.register("Laplacian sharpen", || NodeKind::Sharpen(SharpenParams::default()));
        registry.register("Slope-driven material slumping", || {
            NodeKind::ThermalErosion(ThermalErosionParams::default())
        });
        registry.register("Droplet-based water erosion", || {
            NodeKind::HydraulicErosion(HydraulicErosionParams::default())
        });
        registry.register("Tangent-space normal map", || NodeKind::NormalMap(NormalMapParams::default()));
        registry.register("Horizon-based ambient occlusion", || {
            NodeKind::AmbientOcclusion(AmbientOcclusionParams::default())
        });
        registry.register("Material weights by height and slope", || NodeKind::Splatmap(SplatmapParams::default()));

        // Combiners
        registry.register("Sum of two inputs", || NodeKind::Add);
        registry.register("Product of two inputs", || NodeKind::Multiply);
        registry.register("Linear mix of two inputs", || NodeKind::Blend);
        registry.register("Elementwise maximum", || NodeKind::Max);
        registry.register("Elementwise minimum", || NodeKind::Min);

        // Output
        registry.register("Final terrain result", || NodeKind::Output);

        registry
    }

    /// Register a node type. The id and metadata come from the constructed kind.
    pub fn register(&mut self, description: &'static str, construct: fn() -> NodeKind) {
        let sample = construct();
        let node_type = NodeType {
            id: sample.type_name(),
            name: sample.display_name(),
            category: sample.category(),
            description,
            construct,
        };
        self.types.insert(node_type.id, node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node kind with default parameters from a type ID
    pub fn create(&self, id: &str) -> Option<NodeKind> {
        self.get(id).map(NodeType::instantiate)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_closed_and_consistent() {
        let registry = NodeRegistry::builtin();
        assert_eq!(registry.types().count(), 24);
        for node_type in registry.types() {
            assert_eq!(node_type.instantiate().type_name(), node_type.id);
            assert!(!node_type.id.contains(' '));
        }
        assert!(registry.create("Teapot").is_none());
    }

    #[test]
    fn test_types_in_category() {
        let registry = NodeRegistry::builtin();
        let combiners: Vec<_> = registry.types_in_category(NodeCategory::Combiner).map(|t| t.id).collect();
        assert_eq!(combiners, vec!["Add", "Multiply", "Blend", "Max", "Min"]);
        assert_eq!(registry.get("PerlinNoise").map(|t| t.name), Some("Perlin Noise"));

        let filters: Vec<_> = registry.types_in_category(NodeCategory::Filter).map(|t| t.id).collect();
        assert_eq!(
            filters,
            vec![
                "Smooth",
                "Sharpen",
                "ThermalErosion",
                "HydraulicErosion",
                "NormalMap",
                "AmbientOcclusion",
                "Splatmap"
            ]
        );
        assert_eq!(registry.get("AmbientOcclusion").map(|t| t.name), Some("Ambient Occlusion"));
    }
}
