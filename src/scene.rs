// Scene assembly: terrain, zones and equipment baked into static draw batches.

use glam::Vec3;
use rand::Rng;

use crate::config::TwinConfig;
use crate::overlay::{self, EquipmentMarker, RiskZone, EQUIPMENT_SIZE};
use crate::terrain::{self, TerrainMesh};

/// Scene clear color (0xf8fafc), as display sRGB.
const BACKGROUND_SRGB: [f32; 4] = [0.9725, 0.9804, 0.9882, 1.0];

/// Terrain surface color (0x8b7355), as display sRGB.
const TERRAIN_COLOR: [f32; 4] = [0.5451, 0.4510, 0.3333, 1.0];

/// Equipment proxy color (0x4f46e5), as display sRGB.
const EQUIPMENT_COLOR: [f32; 4] = [0.3098, 0.2745, 0.8980, 1.0];

/// The palette is authored as display hex values, but the render surface is
/// sRGB and encodes on write, so every color is fed to the GPU in linear.
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_rgba(c: [f32; 4]) -> [f32; 4] {
    [
        srgb_to_linear(c[0]),
        srgb_to_linear(c[1]),
        srgb_to_linear(c[2]),
        c[3],
    ]
}

/// Clear color for the sRGB surface, decoded to linear.
pub fn background() -> [f64; 4] {
    let [r, g, b, a] = linear_rgba(BACKGROUND_SRGB);
    [r as f64, g as f64, b as f64, a as f64]
}

// Vertex layout shared by every batch.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// One draw batch: a vertex/index pair rendered with a single pipeline.
#[derive(Debug, Default)]
pub struct Batch {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Batch {
    fn push(&mut self, vertices: &[Vertex], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| base + i));
    }
}

/// The full static scene, built once at mount. Opaque content (terrain and
/// equipment) and the translucent zone overlay draw with separate pipelines.
pub struct SceneGeometry {
    pub opaque: Batch,
    pub overlay: Batch,
}

/// Builds the whole scene from the configuration: displaced terrain bent into
/// the ground plane, the declared risk zones, and seeded equipment proxies.
pub fn build_scene<R: Rng>(config: &TwinConfig, rng: &mut R) -> SceneGeometry {
    let mesh = terrain::build(
        config.terrain.width_segments,
        config.terrain.height_segments,
        config.terrain.width,
        config.terrain.depth,
    );
    let zones = overlay::build_zones(&config.zones);
    let markers = overlay::place_equipment(rng, config.equipment_count, config.equipment_extent);

    let mut opaque = Batch::default();
    bake_terrain(&mesh, &mut opaque);
    for marker in &markers {
        bake_box(marker, &mut opaque);
    }

    let mut overlay = Batch::default();
    for zone in &zones {
        bake_zone(zone, &mut overlay);
    }

    log::info!(
        "scene built: {} opaque vertices, {} overlay vertices, {} zones, {} markers",
        opaque.vertices.len(),
        overlay.vertices.len(),
        zones.len(),
        markers.len()
    );

    SceneGeometry { opaque, overlay }
}

/// The terrain is authored flat in the XY plane; bend it into the ground by
/// rotating -PI/2 about X, which maps (x, y, z) to (x, z, -y).
fn bend_into_ground(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

fn bake_terrain(mesh: &TerrainMesh, batch: &mut Batch) {
    let vertices: Vec<Vertex> = mesh
        .positions
        .iter()
        .zip(&mesh.normals)
        .map(|(&p, &n)| {
            let world = bend_into_ground(p);
            let normal = bend_into_ground(n);
            Vertex {
                position: world.to_array(),
                normal: normal.to_array(),
                color: linear_rgba(TERRAIN_COLOR),
            }
        })
        .collect();
    batch.push(&vertices, &mesh.indices);
}

fn bake_zone(zone: &RiskZone, batch: &mut Batch) {
    let color = linear_rgba(zone.spec.severity.color());
    let vertices: Vec<Vertex> = zone
        .corners
        .iter()
        .map(|corner| Vertex {
            position: corner.to_array(),
            normal: [0.0, 1.0, 0.0],
            color,
        })
        .collect();
    batch.push(&vertices, &[0, 1, 2, 2, 3, 0]);
}

/// Axis-aligned box with per-face normals, four vertices per face.
fn bake_box(marker: &EquipmentMarker, batch: &mut Batch) {
    let c = marker.position;
    let h = EQUIPMENT_SIZE / 2.0;

    // (outward normal, four corners wound CCW seen from outside)
    let faces: [(Vec3, [Vec3; 4]); 6] = [
        (
            Vec3::Z,
            [
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
            ],
        ),
        (
            Vec3::NEG_Z,
            [
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(-h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
            ],
        ),
        (
            Vec3::Y,
            [
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(h.x, h.y, h.z),
                Vec3::new(h.x, h.y, -h.z),
                Vec3::new(-h.x, h.y, -h.z),
            ],
        ),
        (
            Vec3::NEG_Y,
            [
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(-h.x, -h.y, h.z),
            ],
        ),
        (
            Vec3::X,
            [
                Vec3::new(h.x, -h.y, h.z),
                Vec3::new(h.x, -h.y, -h.z),
                Vec3::new(h.x, h.y, -h.z),
                Vec3::new(h.x, h.y, h.z),
            ],
        ),
        (
            Vec3::NEG_X,
            [
                Vec3::new(-h.x, -h.y, -h.z),
                Vec3::new(-h.x, -h.y, h.z),
                Vec3::new(-h.x, h.y, h.z),
                Vec3::new(-h.x, h.y, -h.z),
            ],
        ),
    ];

    for (normal, corners) in &faces {
        let vertices: Vec<Vertex> = corners
            .iter()
            .map(|&corner| Vertex {
                position: (c + corner).to_array(),
                normal: normal.to_array(),
                color: linear_rgba(EQUIPMENT_COLOR),
            })
            .collect();
        batch.push(&vertices, &[0, 1, 2, 2, 3, 0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn scene() -> SceneGeometry {
        let config = TwinConfig::default();
        build_scene(&config, &mut StdRng::seed_from_u64(config.equipment_seed))
    }

    #[test]
    fn batch_sizes_match_the_scene_inventory() {
        let s = scene();
        // 21x16 terrain grid plus 5 boxes at 24 vertices each.
        assert_eq!(s.opaque.vertices.len(), 21 * 16 + 5 * 24);
        assert_eq!(s.opaque.indices.len(), 20 * 15 * 6 + 5 * 36);
        // Three zone quads.
        assert_eq!(s.overlay.vertices.len(), 3 * 4);
        assert_eq!(s.overlay.indices.len(), 3 * 6);
    }

    #[test]
    fn terrain_is_bent_into_the_ground_plane() {
        let s = scene();
        // First terrain vertex was authored at (-10, 7.5, slope) in the XY
        // plane; in world space the height moves to y and the plane y to -z.
        let v = s.opaque.vertices[0];
        let slope = crate::terrain::slope_height(-10.0, 7.5);
        assert_abs_diff_eq!(v.position[0], -10.0);
        assert_abs_diff_eq!(v.position[1], slope, epsilon = 1e-6);
        assert_abs_diff_eq!(v.position[2], -7.5);
    }

    #[test]
    fn overlay_is_translucent_and_opaque_is_not() {
        let s = scene();
        assert!(s.overlay.vertices.iter().all(|v| v.color[3] < 1.0));
        assert!(s.opaque.vertices.iter().all(|v| v.color[3] == 1.0));
    }

    #[test]
    fn colors_are_decoded_to_linear_for_the_srgb_surface() {
        let s = scene();
        // Terrain red channel: decoded value, strictly darker than the
        // display encoding it came from.
        let terrain = s.opaque.vertices[0].color;
        assert_abs_diff_eq!(terrain[0], srgb_to_linear(0.5451), epsilon = 1e-6);
        assert!(terrain[0] < 0.5451);

        // Zone colors decode too, with alpha untouched.
        let safe = crate::overlay::Severity::Safe.color();
        let zone = s.overlay.vertices[0].color;
        assert_abs_diff_eq!(zone[0], srgb_to_linear(safe[0]), epsilon = 1e-6);
        assert_abs_diff_eq!(zone[3], safe[3]);

        // The clear color goes through the same decode.
        assert!(background()[0] < 0.9725);
    }

    #[test]
    fn batched_indices_stay_in_bounds() {
        let s = scene();
        for batch in [&s.opaque, &s.overlay] {
            let count = batch.vertices.len() as u32;
            assert!(batch.indices.iter().all(|&i| i < count));
        }
    }

    #[test]
    fn same_seed_builds_the_same_scene() {
        let config = TwinConfig::default();
        let a = build_scene(&config, &mut StdRng::seed_from_u64(1));
        let b = build_scene(&config, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.opaque.vertices.len(), b.opaque.vertices.len());
        let pos = |batch: &Batch| batch.vertices.iter().map(|v| v.position).collect::<Vec<_>>();
        assert_eq!(pos(&a.opaque), pos(&b.opaque));
    }
}
