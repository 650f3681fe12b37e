//! Free-fly camera with a perspective/orthographic toggle.
//!
//! [`CameraController`] owns the whole camera state: position, the yaw/pitch
//! pair the look direction is derived from, the movement speed, and the
//! projection mode. Input is applied through a handful of operations:
//!
//! - [`apply_look`](CameraController::apply_look) turns mouse deltas into yaw/pitch
//! - [`apply_zoom_adjust`](CameraController::apply_zoom_adjust) turns the wheel into a speed throttle
//! - [`apply_movement`](CameraController::apply_movement) moves along the view or world axes
//! - [`set_projection_mode`](CameraController::set_projection_mode) switches projections
//!
//! # Example
//!
//! ```
//! use boltview::{CameraController, ProjectionMode};
//!
//! let mut camera = CameraController::new();
//! camera.apply_look(100.0, 0.0);
//! assert_eq!(camera.yaw(), -80.0);
//!
//! camera.set_projection_mode(ProjectionMode::Orthographic);
//! let proj = camera.projection_matrix(800.0 / 600.0);
//! # let _ = proj;
//! ```
//!
//! # Asymmetric projection switch
//!
//! Switching to [`ProjectionMode::Orthographic`] snaps the pose back to the
//! default (position, front, and up). Switching back to
//! [`ProjectionMode::Perspective`] only changes the mode. Yaw and pitch are
//! never touched by either switch, so the next mouse look after returning to
//! perspective recomputes `front` from the angles held before.

use glam::{Mat4, Vec3};

/// Camera position after startup, `R`, or an orthographic switch.
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 12.0);
/// Look direction of the default pose.
pub const DEFAULT_FRONT: Vec3 = Vec3::NEG_Z;
/// Fixed world up vector.
pub const WORLD_UP: Vec3 = Vec3::Y;

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
/// Pitch is clamped to `[-PITCH_LIMIT, PITCH_LIMIT]` degrees.
pub const PITCH_LIMIT: f32 = 89.0;
/// Degrees of rotation per unit of mouse delta.
pub const LOOK_SENSITIVITY: f32 = 0.1;

pub const DEFAULT_MOVEMENT_SPEED: f32 = 0.05;
pub const MIN_MOVEMENT_SPEED: f32 = 0.01;
/// Speed change per scroll unit.
pub const SPEED_STEP: f32 = 0.01;

/// Vertical field of view of the perspective projection, in degrees.
pub const FIELD_OF_VIEW: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;
/// Half-size of the orthographic view volume on both axes.
pub const ORTHO_HALF_EXTENT: f32 = 5.0;

/// Which projection the camera renders with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

/// A single movement step, applied once per frame per held key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Camera state and the operations that mutate it.
///
/// Angles are stored in degrees. `front` is always derived from `(yaw, pitch)`
/// except for the fixed reset value written by an orthographic switch.
#[derive(Clone, Debug)]
pub struct CameraController {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    movement_speed: f32,
    projection: ProjectionMode,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            front: DEFAULT_FRONT,
            up: WORLD_UP,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_MOVEMENT_SPEED,
            projection: ProjectionMode::Perspective,
        }
    }
}

impl CameraController {
    /// Create a camera in the default pose, looking down -Z.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Yaw in degrees.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, always within `[-89, 89]`.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.projection
    }

    pub fn is_orthographic(&self) -> bool {
        self.projection == ProjectionMode::Orthographic
    }

    /// View-relative right axis used for strafing.
    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    /// Rotate the view by raw mouse deltas.
    ///
    /// `delta_y` is positive when the cursor moves up the screen. Ignored while
    /// the camera is orthographic.
    pub fn apply_look(&mut self, delta_x: f32, delta_y: f32) {
        if self.is_orthographic() {
            return;
        }

        self.yaw += delta_x * LOOK_SENSITIVITY;
        self.pitch = (self.pitch + delta_y * LOOK_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.front = front_from_angles(self.yaw, self.pitch);
    }

    /// Throttle the movement speed with the scroll wheel.
    ///
    /// The field of view is a projection constant and is never changed here.
    pub fn apply_zoom_adjust(&mut self, scroll_delta: f32) {
        self.movement_speed = (self.movement_speed + SPEED_STEP * scroll_delta).max(MIN_MOVEMENT_SPEED);
    }

    pub fn set_projection_mode(&mut self, mode: ProjectionMode) {
        if mode == ProjectionMode::Orthographic {
            self.position = DEFAULT_POSITION;
            self.front = DEFAULT_FRONT;
            self.up = WORLD_UP;
        }
        self.projection = mode;
    }

    /// Move one step of `movement_speed` in the given direction.
    ///
    /// This is not gated on the projection mode; the input dispatcher decides
    /// when movement is allowed.
    pub fn apply_movement(&mut self, movement: Movement) {
        let step = self.movement_speed;
        match movement {
            Movement::Forward => self.position += step * self.front,
            Movement::Backward => self.position -= step * self.front,
            Movement::Left => self.position -= self.right() * step,
            Movement::Right => self.position += self.right() * step,
            Movement::Up => self.position += step * self.up,
            Movement::Down => self.position -= step * self.up,
        }
    }

    /// Put the camera back at [`DEFAULT_POSITION`], keeping its orientation.
    pub fn reset_position(&mut self) {
        self.position = DEFAULT_POSITION;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Projection for the current mode. Depth maps to `[0, 1]`.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        match self.projection {
            ProjectionMode::Orthographic => Mat4::orthographic_rh(
                -ORTHO_HALF_EXTENT,
                ORTHO_HALF_EXTENT,
                -ORTHO_HALF_EXTENT,
                ORTHO_HALF_EXTENT,
                NEAR_PLANE,
                FAR_PLANE,
            ),
            ProjectionMode::Perspective => Mat4::perspective_rh(
                FIELD_OF_VIEW.to_radians(),
                aspect_ratio,
                NEAR_PLANE,
                FAR_PLANE,
            ),
        }
    }
}

/// Spherical-to-Cartesian conversion of a yaw/pitch pair given in degrees.
pub fn front_from_angles(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn default_angles_look_down_negative_z() {
        let front = front_from_angles(DEFAULT_YAW, DEFAULT_PITCH);
        assert!(front.abs_diff_eq(Vec3::NEG_Z, EPS), "{front:?}");
    }

    #[test]
    fn look_scales_by_sensitivity() {
        let mut camera = CameraController::new();
        camera.apply_look(100.0, 0.0);

        assert!((camera.yaw() - -80.0).abs() < EPS);
        assert_eq!(camera.pitch(), 0.0);

        let yaw = (-80.0f32).to_radians();
        let expected = Vec3::new(yaw.cos(), 0.0, yaw.sin());
        assert!(camera.front().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut camera = CameraController::new();
        for _ in 0..50 {
            camera.apply_look(13.0, 400.0);
            assert!(camera.pitch() <= PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), PITCH_LIMIT);

        for _ in 0..100 {
            camera.apply_look(-7.0, -250.0);
            assert!(camera.pitch() >= -PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn front_is_unit_length_for_reachable_angles() {
        let mut camera = CameraController::new();
        let deltas = [(37.0, 12.0), (-400.0, 900.0), (1234.5, -77.0), (3.0, -3000.0), (0.5, 0.25)];
        for (dx, dy) in deltas.iter().cycle().take(40) {
            camera.apply_look(*dx, *dy);
            assert!((camera.front().length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn look_is_ignored_when_orthographic() {
        let mut camera = CameraController::new();
        camera.set_projection_mode(ProjectionMode::Orthographic);
        camera.apply_look(250.0, 80.0);

        assert_eq!(camera.yaw(), DEFAULT_YAW);
        assert_eq!(camera.pitch(), DEFAULT_PITCH);
        assert_eq!(camera.front(), DEFAULT_FRONT);
    }

    #[test]
    fn speed_never_drops_below_floor() {
        let mut camera = CameraController::new();
        for _ in 0..1000 {
            camera.apply_zoom_adjust(-3.0);
            assert!(camera.movement_speed() >= MIN_MOVEMENT_SPEED);
        }
        assert_eq!(camera.movement_speed(), MIN_MOVEMENT_SPEED);

        camera.apply_zoom_adjust(2.0);
        assert!((camera.movement_speed() - 0.03).abs() < EPS);
    }

    #[test]
    fn orthographic_round_trip_restores_default_pose() {
        let mut camera = CameraController::new();
        camera.apply_look(320.0, -140.0);
        camera.apply_movement(Movement::Forward);
        camera.apply_movement(Movement::Up);
        camera.apply_movement(Movement::Right);

        camera.set_projection_mode(ProjectionMode::Orthographic);
        camera.set_projection_mode(ProjectionMode::Perspective);

        assert_eq!(camera.position(), DEFAULT_POSITION);
        assert_eq!(camera.front(), DEFAULT_FRONT);
        assert_eq!(camera.up(), WORLD_UP);
        assert_eq!(camera.projection_mode(), ProjectionMode::Perspective);
    }

    #[test]
    fn perspective_switch_keeps_position() {
        let mut camera = CameraController::new();
        camera.apply_movement(Movement::Forward);
        let moved = camera.position();

        camera.set_projection_mode(ProjectionMode::Perspective);
        assert_eq!(camera.position(), moved);
    }

    #[test]
    fn orthographic_switch_keeps_angles() {
        let mut camera = CameraController::new();
        camera.apply_look(50.0, 20.0);
        let (yaw, pitch) = (camera.yaw(), camera.pitch());

        camera.set_projection_mode(ProjectionMode::Orthographic);
        assert_eq!(camera.yaw(), yaw);
        assert_eq!(camera.pitch(), pitch);
    }

    #[test]
    fn movement_follows_view_axes() {
        let mut camera = CameraController::new();
        camera.apply_movement(Movement::Forward);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 11.95), EPS));

        camera.apply_movement(Movement::Right);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.05, 0.0, 11.95), EPS));

        camera.apply_movement(Movement::Down);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.05, -0.05, 11.95), EPS));
    }

    #[test]
    fn reset_only_touches_position() {
        let mut camera = CameraController::new();
        camera.apply_look(200.0, 45.0);
        camera.apply_movement(Movement::Backward);
        camera.apply_movement(Movement::Left);
        let (front, up) = (camera.front(), camera.up());

        camera.reset_position();

        assert_eq!(camera.position(), DEFAULT_POSITION);
        assert_eq!(camera.front(), front);
        assert_eq!(camera.up(), up);
    }

    #[test]
    fn view_matrix_moves_eye_to_origin() {
        let camera = CameraController::new();
        let eye = camera.view_matrix().transform_point3(DEFAULT_POSITION);
        assert!(eye.abs_diff_eq(Vec3::ZERO, EPS));

        let ahead = camera.view_matrix().transform_point3(Vec3::ZERO);
        assert!(ahead.abs_diff_eq(Vec3::new(0.0, 0.0, -12.0), EPS));
    }

    #[test]
    fn projection_depends_on_mode() {
        let mut camera = CameraController::new();
        let aspect = 800.0 / 600.0;
        let perspective = camera.projection_matrix(aspect);
        assert_eq!(
            perspective,
            Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0)
        );

        camera.set_projection_mode(ProjectionMode::Orthographic);
        let ortho = camera.projection_matrix(aspect);
        assert_eq!(ortho, Mat4::orthographic_rh(-5.0, 5.0, -5.0, 5.0, 0.1, 100.0));
        // Aspect has no influence on the orthographic volume.
        assert_eq!(ortho, camera.projection_matrix(2.5));
    }
}
