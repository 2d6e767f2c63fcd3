// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ready-made mountain range graphs.
//!
//! Each preset adds a generator chain ending in an `Output` node to the
//! session's graph. Every node, parameter edit and edge goes through the
//! session, so a preset can be undone step by step like hand-made edits.

use crate::commands::GraphCommand;
use crate::history::HistoryError;
use crate::session::EditorSession;
use std::fmt;
use terrain_engine_graph::{NodeId, INPUT_PIN, OUTPUT_PIN};

/// Named mountain range setups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountainPreset {
    /// Sharp peaks and glacial valleys
    Alps,
    /// Old, weathered ridges
    Appalachians,
    /// Extreme jagged peaks
    Himalayas,
    /// Peaks mixed with rolling hills
    RockyMountains,
    /// Volcanic ridges and plateaus
    Andes,
}

impl MountainPreset {
    /// Every preset in menu order
    pub const ALL: [Self; 5] = [
        Self::Alps,
        Self::Appalachians,
        Self::Himalayas,
        Self::RockyMountains,
        Self::Andes,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Alps => "Alps",
            Self::Appalachians => "Appalachians",
            Self::Himalayas => "Himalayas",
            Self::RockyMountains => "Rocky Mountains",
            Self::Andes => "Andes",
        }
    }

    /// One-line description of the terrain
    pub fn description(self) -> &'static str {
        match self {
            Self::Alps => "Sharp peaks, deep U-shaped valleys, glacial features. Height: 4,000-4,800m",
            Self::Appalachians => "Rolling ridges, weathered peaks, gentle slopes. Height: 1,200-2,000m",
            Self::Himalayas => "Extreme jagged peaks, dramatic elevation. Height: 6,000-8,800m",
            Self::RockyMountains => "Mixed terrain with sharp peaks and rolling hills. Height: 3,000-4,400m",
            Self::Andes => "Long volcanic ridges, high plateaus. Height: 4,000-6,900m",
        }
    }

    /// Parse a preset name. Case, spaces, dashes and underscores are ignored.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().replace(' ', "").to_lowercase() == wanted)
    }

    /// Add this preset's nodes to the session, returning the `Output` node
    pub fn build(self, session: &mut EditorSession, resolution: u32) -> Result<NodeId> {
        tracing::info!("Creating {} preset...", self.name());
        let mut builder = PresetBuilder {
            session,
            resolution: i64::from(resolution),
        };
        let output = match self {
            Self::Alps => builder.alps(),
            Self::Appalachians => builder.appalachians(),
            Self::Himalayas => builder.himalayas(),
            Self::RockyMountains => builder.rocky_mountains(),
            Self::Andes => builder.andes(),
        }?;
        tracing::info!("{} preset created", self.name());
        Ok(output)
    }
}

impl fmt::Display for MountainPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fractal noise settings shared by the Perlin and ridged generators
struct Fractal {
    frequency: f32,
    amplitude: f32,
    octaves: i64,
    lacunarity: f32,
    persistence: f32,
    seed: i64,
}

type Result<T> = std::result::Result<T, HistoryError>;

struct PresetBuilder<'a> {
    session: &'a mut EditorSession,
    resolution: i64,
}

impl PresetBuilder<'_> {
    fn node(
        &mut self,
        type_name: &str,
        position: [f32; 2],
        ints: &[(&str, i64)],
        floats: &[(&str, f32)],
    ) -> Result<NodeId> {
        let id = self.session.create_node(type_name, position)?;
        for &(key, value) in ints {
            self.session.apply(GraphCommand::set_int(id, key, value))?;
        }
        for &(key, value) in floats {
            self.session.apply(GraphCommand::set_float(id, key, value))?;
        }
        Ok(id)
    }

    fn fractal(&mut self, type_name: &str, position: [f32; 2], noise: &Fractal) -> Result<NodeId> {
        let size = self.resolution;
        self.node(
            type_name,
            position,
            &[("width", size), ("height", size), ("octaves", noise.octaves), ("seed", noise.seed)],
            &[
                ("frequency", noise.frequency),
                ("amplitude", noise.amplitude),
                ("lacunarity", noise.lacunarity),
                ("persistence", noise.persistence),
            ],
        )
    }

    fn perlin(&mut self, position: [f32; 2], noise: Fractal) -> Result<NodeId> {
        self.fractal("PerlinNoise", position, &noise)
    }

    fn ridged(&mut self, position: [f32; 2], noise: Fractal, ridge_offset: f32) -> Result<NodeId> {
        let id = self.fractal("RidgedNoise", position, &noise)?;
        self.session.apply(GraphCommand::set_float(id, "ridge_offset", ridge_offset))?;
        Ok(id)
    }

    /// Inverted Voronoi cells (peaks at cell centres) weighted by `weight`
    fn voronoi_peaks(&mut self, position: [f32; 2], cell_count: i64, weight: f32, seed: i64) -> Result<NodeId> {
        let size = self.resolution;
        let [x, y] = position;
        let cells = self.node(
            "Voronoi",
            position,
            &[("width", size), ("height", size), ("cell_count", cell_count), ("seed", seed)],
            &[],
        )?;
        let invert = self.node("Invert", [x + 100.0, y], &[], &[])?;
        let scale = self.node("Scale", [x + 200.0, y], &[], &[("scale", weight)])?;
        self.chain(&[cells, invert, scale])?;
        Ok(scale)
    }

    fn combine(&mut self, type_name: &str, position: [f32; 2], a: NodeId, b: NodeId) -> Result<NodeId> {
        let id = self.node(type_name, position, &[], &[])?;
        self.session.connect(a, OUTPUT_PIN, id, "A")?;
        self.session.connect(b, OUTPUT_PIN, id, "B")?;
        Ok(id)
    }

    fn scale(&mut self, position: [f32; 2], scale: f32) -> Result<NodeId> {
        self.node("Scale", position, &[], &[("scale", scale)])
    }

    fn terrace(&mut self, position: [f32; 2], steps: i64, blend: f32) -> Result<NodeId> {
        self.node("Terrace", position, &[("Steps", steps)], &[("blend", blend)])
    }

    fn smooth(&mut self, position: [f32; 2], iterations: i64, strength: f32) -> Result<NodeId> {
        self.node("Smooth", position, &[("iterations", iterations)], &[("strength", strength)])
    }

    fn thermal(&mut self, position: [f32; 2], iterations: i64, talus_angle: f32, strength: f32) -> Result<NodeId> {
        self.node(
            "ThermalErosion",
            position,
            &[("iterations", iterations)],
            &[("talus_angle", talus_angle), ("strength", strength)],
        )
    }

    /// Wire each node's output into the next node's input
    fn chain(&mut self, nodes: &[NodeId]) -> Result<()> {
        for pair in nodes.windows(2) {
            self.session.connect(pair[0], OUTPUT_PIN, pair[1], INPUT_PIN)?;
        }
        Ok(())
    }

    fn alps(&mut self) -> Result<NodeId> {
        let base = self.perlin(
            [50.0, 100.0],
            Fractal {
                frequency: 0.003,
                amplitude: 1.5,
                octaves: 6,
                lacunarity: 2.2,
                persistence: 0.55,
                seed: 4807,
            },
        )?;
        let ridges = self.ridged(
            [50.0, 250.0],
            Fractal {
                frequency: 0.005,
                amplitude: 1.2,
                octaves: 7,
                lacunarity: 2.3,
                persistence: 0.6,
                seed: 4808,
            },
            1.2,
        )?;
        let combined = self.combine("Add", [300.0, 175.0], base, ridges)?;
        let scale = self.scale([500.0, 175.0], 0.8)?;
        let terrace = self.terrace([700.0, 175.0], 15, 0.85)?;
        let smooth = self.smooth([900.0, 175.0], 1, 0.2)?;
        let thermal = self.thermal([1100.0, 175.0], 8, 0.6, 0.4)?;
        let output = self.node("Output", [1300.0, 175.0], &[], &[])?;
        self.chain(&[combined, scale, terrace, smooth, thermal, output])?;
        Ok(output)
    }

    fn appalachians(&mut self) -> Result<NodeId> {
        let base = self.perlin(
            [50.0, 150.0],
            Fractal {
                frequency: 0.006,
                amplitude: 1.0,
                octaves: 5,
                lacunarity: 2.0,
                persistence: 0.45,
                seed: 1800,
            },
        )?;
        let detail = self.perlin(
            [50.0, 300.0],
            Fractal {
                frequency: 0.015,
                amplitude: 0.3,
                octaves: 3,
                lacunarity: 2.0,
                persistence: 0.4,
                seed: 1801,
            },
        )?;
        let combined = self.combine("Add", [300.0, 225.0], base, detail)?;
        let scale = self.scale([500.0, 225.0], 0.35)?;
        let smooth = self.smooth([700.0, 225.0], 3, 0.6)?;
        let thermal = self.thermal([900.0, 225.0], 15, 0.9, 0.6)?;
        let output = self.node("Output", [1100.0, 225.0], &[], &[])?;
        self.chain(&[combined, scale, smooth, thermal, output])?;
        Ok(output)
    }

    fn himalayas(&mut self) -> Result<NodeId> {
        let base = self.ridged(
            [50.0, 100.0],
            Fractal {
                frequency: 0.002,
                amplitude: 2.0,
                octaves: 9,
                lacunarity: 2.5,
                persistence: 0.65,
                seed: 8848,
            },
            1.5,
        )?;
        let peaks = self.ridged(
            [50.0, 250.0],
            Fractal {
                frequency: 0.004,
                amplitude: 1.5,
                octaves: 7,
                lacunarity: 2.4,
                persistence: 0.7,
                seed: 8849,
            },
            1.3,
        )?;
        let detail = self.voronoi_peaks([50.0, 400.0], 40, 0.4, 8850)?;
        let highest = self.combine("Max", [300.0, 150.0], base, peaks)?;
        let combined = self.combine("Add", [500.0, 200.0], highest, detail)?;
        let scale = self.scale([700.0, 200.0], 1.5)?;
        let thermal = self.thermal([900.0, 200.0], 3, 0.5, 0.3)?;
        let output = self.node("Output", [1100.0, 200.0], &[], &[])?;
        self.chain(&[combined, scale, thermal, output])?;
        Ok(output)
    }

    fn rocky_mountains(&mut self) -> Result<NodeId> {
        let mountains = self.ridged(
            [50.0, 100.0],
            Fractal {
                frequency: 0.004,
                amplitude: 1.3,
                octaves: 7,
                lacunarity: 2.2,
                persistence: 0.58,
                seed: 4400,
            },
            1.1,
        )?;
        let hills = self.perlin(
            [50.0, 250.0],
            Fractal {
                frequency: 0.008,
                amplitude: 0.8,
                octaves: 5,
                lacunarity: 2.1,
                persistence: 0.5,
                seed: 4401,
            },
        )?;
        let blend = self.combine("Blend", [300.0, 175.0], mountains, hills)?;
        self.session.apply(GraphCommand::set_float(blend, "Factor", 0.6))?;
        let scale = self.scale([500.0, 175.0], 0.7)?;
        let thermal = self.thermal([700.0, 175.0], 10, 0.7, 0.5)?;
        let output = self.node("Output", [900.0, 175.0], &[], &[])?;
        self.chain(&[blend, scale, thermal, output])?;
        Ok(output)
    }

    fn andes(&mut self) -> Result<NodeId> {
        let ridge = self.ridged(
            [50.0, 100.0],
            Fractal {
                frequency: 0.003,
                amplitude: 1.4,
                octaves: 8,
                lacunarity: 2.3,
                persistence: 0.6,
                seed: 6900,
            },
            1.2,
        )?;
        let volcanoes = self.voronoi_peaks([50.0, 250.0], 25, 0.6, 6901)?;
        let combined = self.combine("Max", [300.0, 175.0], ridge, volcanoes)?;
        let plateaus = self.terrace([500.0, 175.0], 8, 0.7)?;
        let scale = self.scale([700.0, 175.0], 1.1)?;
        let thermal = self.thermal([900.0, 175.0], 8, 0.65, 0.45)?;
        let output = self.node("Output", [1100.0, 175.0], &[], &[])?;
        self.chain(&[combined, plateaus, scale, thermal, output])?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use terrain_engine_graph::{Artifact, NodeKind};

    fn session() -> EditorSession {
        EditorSession::new(&EditorConfig::default())
    }

    #[test]
    fn test_every_preset_executes() {
        for preset in MountainPreset::ALL {
            let mut session = session();
            let output = preset.build(&mut session, 32).unwrap();
            assert_eq!(session.graph().terminal(), Some(output), "{preset}");

            session.execute().unwrap();
            match session.result() {
                Some(Artifact::Heightfield(field)) => {
                    assert_eq!((field.width(), field.height()), (32, 32), "{preset}");
                    assert!(field.data().iter().all(|h| h.is_finite()), "{preset}");
                }
                other => panic!("{preset} produced {other:?}"),
            }
        }
    }

    #[test]
    fn test_preset_parameters_are_applied() {
        let mut session = session();
        MountainPreset::Alps.build(&mut session, 64).unwrap();
        let graph = session.graph();

        let terrace = graph.nodes().find(|n| n.type_name() == "Terrace").map(|n| n.id).unwrap();
        assert_eq!(graph.int_param(terrace, "Steps"), Ok(15));
        let ridged = graph.nodes().find(|n| n.type_name() == "RidgedNoise").unwrap();
        match ridged.kind() {
            NodeKind::RidgedNoise(p) => {
                assert_eq!((p.width, p.height, p.noise.seed), (64, 64, 4808));
                assert_eq!(p.ridge_offset, 1.2);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.connections().len(), 7);
    }

    #[test]
    fn test_preset_is_undoable() {
        let mut session = session();
        MountainPreset::RockyMountains.build(&mut session, 16).unwrap();
        while session.history().can_undo() {
            session.undo().unwrap();
        }
        assert_eq!(session.graph().node_count(), 0);
    }

    #[test]
    fn test_names_round_trip() {
        for preset in MountainPreset::ALL {
            assert_eq!(MountainPreset::from_name(preset.name()), Some(preset));
            assert!(!preset.description().is_empty());
        }
        assert_eq!(MountainPreset::from_name("rocky-mountains"), Some(MountainPreset::RockyMountains));
        assert_eq!(MountainPreset::from_name("ALPS"), Some(MountainPreset::Alps));
        assert_eq!(MountainPreset::from_name("Pyrenees"), None);
    }
}
