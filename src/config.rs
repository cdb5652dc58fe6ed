// Scene configuration for slope-twin

use glam::{Vec2, Vec3};

use crate::overlay::{Severity, ZoneSpec};

/// Every tunable in the visualization, collected in one place.
///
/// The defaults reproduce the reference scene: a 20x15 world-unit slope at
/// 20x15 subdivisions, three fixed risk zones, five equipment proxies and a
/// camera orbiting at radius 15.
#[derive(Debug, Clone)]
pub struct TwinConfig {
    pub terrain: TerrainParams,
    pub zones: Vec<ZoneSpec>,
    pub equipment_count: usize,
    /// Horizontal extent the equipment samples are drawn over (x, z).
    pub equipment_extent: Vec2,
    pub equipment_seed: u64,
    /// Pan gain per pointer pixel while dragging.
    pub pan_speed: f32,
    /// Orbit angular rate in radians per millisecond.
    pub orbit_rate: f32,
    pub orbit_radius: f32,
    pub default_eye: Vec3,
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
}

/// Grid resolution and world extent of the terrain mesh.
#[derive(Debug, Clone, Copy)]
pub struct TerrainParams {
    pub width_segments: u32,
    pub height_segments: u32,
    pub width: f32,
    pub depth: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            width_segments: 20,
            height_segments: 15,
            width: 20.0,
            depth: 15.0,
        }
    }
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainParams::default(),
            zones: vec![
                ZoneSpec::new(Severity::Safe, Vec2::new(-5.0, -3.0), Vec2::new(3.0, 3.0)),
                ZoneSpec::new(Severity::Caution, Vec2::new(0.0, 0.0), Vec2::new(3.0, 3.0)),
                ZoneSpec::new(Severity::Danger, Vec2::new(5.0, 3.0), Vec2::new(3.0, 3.0)),
            ],
            equipment_count: 5,
            equipment_extent: Vec2::new(15.0, 10.0),
            equipment_seed: 0x51_0b_e7,
            pan_speed: 0.01,
            orbit_rate: 0.0005,
            orbit_radius: 15.0,
            default_eye: Vec3::new(10.0, 10.0, 10.0),
            window_size: (800, 600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_zone_table_matches_reference_scene() {
        let config = TwinConfig::default();
        assert_eq!(config.zones.len(), 3);
        assert_eq!(config.zones[0].severity, Severity::Safe);
        assert_eq!(config.zones[1].severity, Severity::Caution);
        assert_eq!(config.zones[2].severity, Severity::Danger);
        assert_eq!(config.zones[2].center, Vec2::new(5.0, 3.0));
    }

    #[test]
    fn default_grid_is_20_by_15() {
        let terrain = TerrainParams::default();
        assert_eq!(terrain.width_segments, 20);
        assert_eq!(terrain.height_segments, 15);
        assert_eq!(terrain.width, 20.0);
        assert_eq!(terrain.depth, 15.0);
    }
}
