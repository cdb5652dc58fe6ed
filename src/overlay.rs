// Risk zone and equipment overlays placed on top of the terrain.

use glam::{Vec2, Vec3};
use rand::Rng;

/// Vertical offset of zone quads above the ground plane. Small and constant
/// so the overlay never z-fights the terrain.
pub const ZONE_HEIGHT: f32 = 0.1;

/// Equipment proxies sit on the ground with their center at this height.
pub const EQUIPMENT_HEIGHT: f32 = 1.0;

/// Box proxy dimensions for a piece of equipment (w, h, d).
pub const EQUIPMENT_SIZE: Vec3 = Vec3::new(1.0, 2.0, 1.0);

/// Risk severity band of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Safe,
    Caution,
    Danger,
}

impl Severity {
    /// Translucent overlay color, straight from the reference palette
    /// (0x22c55e / 0xf59e0b / 0xef4444 at 70% opacity).
    pub fn color(self) -> [f32; 4] {
        match self {
            Severity::Safe => [0.133, 0.773, 0.369, 0.7],
            Severity::Caution => [0.961, 0.620, 0.043, 0.7],
            Severity::Danger => [0.937, 0.267, 0.267, 0.7],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Safe => "Safe Zone",
            Severity::Caution => "Caution Zone",
            Severity::Danger => "High Risk Zone",
        }
    }
}

/// Declarative description of a zone: severity plus a footprint in the
/// ground plane (center and size are world-space x/z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSpec {
    pub severity: Severity,
    pub center: Vec2,
    pub size: Vec2,
}

impl ZoneSpec {
    pub fn new(severity: Severity, center: Vec2, size: Vec2) -> Self {
        Self {
            severity,
            center,
            size,
        }
    }
}

/// A zone mapped to geometry: a flat quad at [`ZONE_HEIGHT`], corners wound
/// counter-clockwise seen from above.
#[derive(Debug, Clone, Copy)]
pub struct RiskZone {
    pub spec: ZoneSpec,
    pub corners: [Vec3; 4],
}

/// Fixed-size box proxy for a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquipmentMarker {
    pub position: Vec3,
}

/// Maps zone specs to quads verbatim. No computation beyond corner layout.
pub fn build_zones(specs: &[ZoneSpec]) -> Vec<RiskZone> {
    specs
        .iter()
        .map(|&spec| {
            let (cx, cz) = (spec.center.x, spec.center.y);
            let (hw, hd) = (spec.size.x / 2.0, spec.size.y / 2.0);
            RiskZone {
                spec,
                corners: [
                    Vec3::new(cx - hw, ZONE_HEIGHT, cz - hd),
                    Vec3::new(cx - hw, ZONE_HEIGHT, cz + hd),
                    Vec3::new(cx + hw, ZONE_HEIGHT, cz + hd),
                    Vec3::new(cx + hw, ZONE_HEIGHT, cz - hd),
                ],
            }
        })
        .collect()
}

/// Draws `count` uniform samples over the horizontal `extent` (x, z),
/// centered at the origin, at fixed height.
///
/// The randomness source is injected so a seeded generator reproduces marker
/// positions exactly.
pub fn place_equipment<R: Rng>(rng: &mut R, count: usize, extent: Vec2) -> Vec<EquipmentMarker> {
    (0..count)
        .map(|_| {
            let x = (rng.gen::<f32>() - 0.5) * extent.x;
            let z = (rng.gen::<f32>() - 0.5) * extent.y;
            EquipmentMarker {
                position: Vec3::new(x, EQUIPMENT_HEIGHT, z),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn zone_quads_sit_at_the_overlay_height() {
        let zones = build_zones(&crate::config::TwinConfig::default().zones);
        assert_eq!(zones.len(), 3);
        for zone in &zones {
            for corner in &zone.corners {
                assert_abs_diff_eq!(corner.y, ZONE_HEIGHT);
            }
        }
    }

    #[test]
    fn zone_corners_span_the_declared_footprint() {
        let spec = ZoneSpec::new(Severity::Danger, Vec2::new(5.0, 3.0), Vec2::new(3.0, 3.0));
        let zone = &build_zones(&[spec])[0];
        assert_abs_diff_eq!(zone.corners[0].x, 3.5);
        assert_abs_diff_eq!(zone.corners[0].z, 1.5);
        assert_abs_diff_eq!(zone.corners[2].x, 6.5);
        assert_abs_diff_eq!(zone.corners[2].z, 4.5);
    }

    #[test]
    fn severity_colors_are_translucent() {
        for severity in [Severity::Safe, Severity::Caution, Severity::Danger] {
            assert_abs_diff_eq!(severity.color()[3], 0.7);
        }
    }

    #[test]
    fn seeded_placement_is_reproducible() {
        let extent = Vec2::new(15.0, 10.0);
        let a = place_equipment(&mut StdRng::seed_from_u64(7), 5, extent);
        let b = place_equipment(&mut StdRng::seed_from_u64(7), 5, extent);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn markers_stay_inside_the_extent_at_fixed_height() {
        let extent = Vec2::new(15.0, 10.0);
        let markers = place_equipment(&mut StdRng::seed_from_u64(42), 64, extent);
        for m in &markers {
            assert!(m.position.x.abs() <= 7.5);
            assert!(m.position.z.abs() <= 5.0);
            assert_abs_diff_eq!(m.position.y, EQUIPMENT_HEIGHT);
        }
    }
}
