// Camera pose and the autonomous/manual interaction state machine.

use glam::{Mat4, Vec3};

use crate::config::TwinConfig;

/// Radial zoom factors per wheel notch (positive delta zooms out).
const ZOOM_OUT: f32 = 1.1;
const ZOOM_IN: f32 = 0.9;

/// Distance band the zoom is clamped to. Keeps extreme wheel deltas from
/// pushing the eye through the origin or past the far plane.
const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 400.0;

/// Perspective camera pose. The look-at target is fixed at the world origin
/// in this scope.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_rad, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Which driver owns the pose. Exactly one drives it in any given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    /// Time-based orbit around the origin.
    Autonomous,
    /// Pose follows the most recent pointer/wheel input.
    Manual,
}

/// Owns the camera pose. Runs the orbit while autonomous and consumes typed
/// pointer/wheel input to override it.
///
/// A pointer-down switches to manual for good; only [`reset`] (or the play
/// toggle) hands control back to the orbit.
///
/// [`reset`]: CameraController::reset
pub struct CameraController {
    camera: Camera,
    mode: CameraMode,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
    pan_speed: f32,
    orbit_rate: f32,
    orbit_radius: f32,
    default_eye: Vec3,
}

impl CameraController {
    pub fn new(config: &TwinConfig, aspect: f32) -> Self {
        Self {
            camera: Camera {
                position: config.default_eye,
                target: Vec3::ZERO,
                up: Vec3::Y,
                fov_y_rad: 75.0_f32.to_radians(),
                aspect,
                near: 0.1,
                far: 1000.0,
            },
            mode: CameraMode::Autonomous,
            dragging: false,
            last_pointer: None,
            pan_speed: config.pan_speed,
            orbit_rate: config.orbit_rate,
            orbit_radius: config.orbit_radius,
            default_eye: config.default_eye,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.aspect = aspect;
    }

    /// Begins a drag gesture and suspends the orbit. A pointer-down while a
    /// drag is already active re-anchors the gesture at the new coordinates.
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.mode = CameraMode::Manual;
        self.dragging = true;
        self.last_pointer = Some((x, y));
    }

    /// Pans the eye by the pointer delta while a button is held; ignored
    /// otherwise.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if !self.dragging {
            return;
        }
        if let Some((lx, ly)) = self.last_pointer {
            let dx = (x - lx) as f32;
            let dy = (y - ly) as f32;
            self.camera.position.x += dx * self.pan_speed;
            self.camera.position.y -= dy * self.pan_speed;
            self.camera.target = Vec3::ZERO;
        }
        self.last_pointer = Some((x, y));
    }

    /// Ends the drag gesture. The controller stays in manual mode.
    pub fn pointer_up(&mut self) {
        self.dragging = false;
        self.last_pointer = None;
    }

    /// Radial zoom: scales the position vector from the origin by a fixed
    /// factor per event, in either mode. Zero deltas are ignored and the
    /// resulting distance is clamped to a sane band.
    pub fn wheel(&mut self, delta: f32) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        let scale = if delta > 0.0 { ZOOM_OUT } else { ZOOM_IN };
        let mut position = self.camera.position * scale;

        let distance = position.length();
        if distance < MIN_DISTANCE {
            position = position.normalize_or_zero() * MIN_DISTANCE;
        } else if distance > MAX_DISTANCE {
            position = position.normalize_or_zero() * MAX_DISTANCE;
        }

        self.camera.position = position;
        self.camera.target = Vec3::ZERO;
    }

    /// Play/pause toggle. Pausing enters manual mode without touching the
    /// pose; resuming rejoins the orbit from wherever the clock is and ends
    /// any drag in progress, so the orbit is the frame's only pose driver.
    pub fn set_autonomous(&mut self, autonomous: bool) {
        if autonomous {
            self.dragging = false;
            self.last_pointer = None;
            self.mode = CameraMode::Autonomous;
        } else {
            self.mode = CameraMode::Manual;
        }
    }

    /// Restores the default pose and returns control to the orbit.
    pub fn reset(&mut self) {
        self.camera.position = self.default_eye;
        self.camera.target = Vec3::ZERO;
        self.mode = CameraMode::Autonomous;
        self.dragging = false;
        self.last_pointer = None;
    }

    /// Per-frame orbit update. A no-op in manual mode, which is what makes
    /// the single-driver rule hold: input handlers and the frame tick never
    /// both move the pose in one frame.
    pub fn tick(&mut self, elapsed_ms: f64) {
        if self.mode != CameraMode::Autonomous {
            return;
        }
        let angle = (elapsed_ms * self.orbit_rate as f64) as f32;
        self.camera.position.x = self.orbit_radius * angle.cos();
        self.camera.position.z = self.orbit_radius * angle.sin();
        self.camera.target = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn controller() -> CameraController {
        CameraController::new(&TwinConfig::default(), 800.0 / 600.0)
    }

    #[test]
    fn starts_autonomous_at_the_default_pose() {
        let c = controller();
        assert_eq!(c.mode(), CameraMode::Autonomous);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(c.camera().target, Vec3::ZERO);
    }

    #[test]
    fn pointer_down_locks_manual_until_reset() {
        let mut c = controller();
        c.pointer_down(100.0, 100.0);
        assert_eq!(c.mode(), CameraMode::Manual);

        c.pointer_move(120.0, 90.0);
        c.pointer_up();
        c.pointer_move(300.0, 300.0);
        assert_eq!(c.mode(), CameraMode::Manual);

        c.reset();
        assert_eq!(c.mode(), CameraMode::Autonomous);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(c.camera().target, Vec3::ZERO);
    }

    #[test]
    fn drag_pans_by_the_pointer_delta() {
        let mut c = controller();
        c.pointer_down(100.0, 100.0);
        c.pointer_move(150.0, 80.0);

        // dx = 50, dy = -20 at 0.01 gain.
        assert_abs_diff_eq!(c.camera().position.x, 10.5, epsilon = 1e-6);
        assert_abs_diff_eq!(c.camera().position.y, 10.2, epsilon = 1e-6);
        assert_eq!(c.camera().target, Vec3::ZERO);
    }

    #[test]
    fn move_without_a_held_button_is_ignored() {
        let mut c = controller();
        c.pointer_move(500.0, 500.0);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn pointer_down_mid_drag_reanchors_the_gesture() {
        let mut c = controller();
        c.pointer_down(100.0, 100.0);
        c.pointer_down(200.0, 200.0);
        c.pointer_move(210.0, 200.0);
        // Delta counts from the second down, not the first.
        assert_abs_diff_eq!(c.camera().position.x, 10.1, epsilon = 1e-6);
    }

    #[test]
    fn wheel_scales_the_position_magnitude_exactly() {
        let mut c = controller();
        let before = c.camera().position.length();

        c.wheel(1.0);
        assert_abs_diff_eq!(c.camera().position.length(), before * 1.1, epsilon = 1e-4);

        c.wheel(-1.0);
        assert_abs_diff_eq!(c.camera().position.length(), before * 1.1 * 0.9, epsilon = 1e-4);
        assert_eq!(c.camera().target, Vec3::ZERO);
    }

    #[test]
    fn wheel_works_in_both_modes_and_ignores_zero() {
        let mut c = controller();
        c.wheel(0.0);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));

        c.pointer_down(0.0, 0.0);
        let before = c.camera().position.length();
        c.wheel(2.5);
        assert_abs_diff_eq!(c.camera().position.length(), before * 1.1, epsilon = 1e-4);
    }

    #[test]
    fn zoom_distance_is_clamped_at_the_extremes() {
        let mut c = controller();
        for _ in 0..200 {
            c.wheel(-1.0);
        }
        assert!(c.camera().position.length() >= MIN_DISTANCE - 1e-4);

        for _ in 0..400 {
            c.wheel(1.0);
        }
        assert!(c.camera().position.length() <= MAX_DISTANCE + 1e-2);
    }

    #[test]
    fn tick_is_a_no_op_while_manual() {
        let mut c = controller();
        c.pointer_down(100.0, 100.0);
        c.pointer_move(110.0, 100.0);
        let after_drag = c.camera().position;

        // Both drivers queued in one frame: only the manual edit sticks.
        c.tick(5000.0);
        assert_eq!(c.camera().position, after_drag);
    }

    #[test]
    fn resume_mid_drag_hands_the_pose_back_to_the_orbit() {
        let mut c = controller();
        c.pointer_down(100.0, 100.0);
        c.set_autonomous(true);

        // The toggle ended the gesture: the still-held button no longer pans.
        c.pointer_move(200.0, 100.0);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));

        // Only the orbit drives the pose in this frame.
        c.tick(1000.0);
        let p = c.camera().position;
        assert_abs_diff_eq!(p.x, 15.0 * 0.5_f32.cos(), epsilon = 1e-4);
        assert_abs_diff_eq!(p.z, 15.0 * 0.5_f32.sin(), epsilon = 1e-4);
    }

    #[test]
    fn pause_suspends_the_orbit_and_resume_rejoins_it() {
        let mut c = controller();
        c.set_autonomous(false);
        assert_eq!(c.mode(), CameraMode::Manual);
        c.tick(1000.0);
        assert_eq!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));

        c.set_autonomous(true);
        c.tick(1000.0);
        assert_ne!(c.camera().position, Vec3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn orbit_traces_the_expected_circle() {
        let mut c = controller();
        c.tick(1000.0);

        // 1000 ms at 0.0005 rad/ms is half a radian around radius 15.
        let p = c.camera().position;
        assert_abs_diff_eq!(p.x, 15.0 * 0.5_f32.cos(), epsilon = 1e-4);
        assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.z, 15.0 * 0.5_f32.sin(), epsilon = 1e-4);
        assert_eq!(c.camera().target, Vec3::ZERO);
    }

    #[test]
    fn aspect_update_is_idempotent() {
        let mut c = controller();
        c.set_aspect(1024.0 / 768.0);
        let once = c.camera().aspect;
        c.set_aspect(1024.0 / 768.0);
        assert_eq!(c.camera().aspect, once);
    }

    #[test]
    fn view_projection_is_finite() {
        let c = controller();
        let vp = c.camera().view_projection();
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
