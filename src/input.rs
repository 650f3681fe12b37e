//! Keyboard/mouse state and the per-frame input dispatcher.
//!
//! [`Input`] records which keys are held, fed from winit window events.
//! [`InputDispatcher`] polls that state once per frame and routes it to the
//! [`CameraController`], and receives the continuous cursor and wheel events.

use std::collections::HashSet;

use glam::Mat4;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::{CameraController, Movement, ProjectionMode};

/// Pixel scroll deltas are converted to "lines" with this divisor.
const PIXELS_PER_LINE: f32 = 120.0;

/// Tracks which keys are currently held down.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event and update key state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if let PhysicalKey::Code(key) = event.physical_key {
                self.set_key(key, event.state == ElementState::Pressed);
            }
        }
    }

    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_down.insert(key);
        } else {
            self.keys_down.remove(&key);
        }
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Forget every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_down.clear();
    }
}

/// Vertical wheel movement of a winit scroll event, in lines.
pub fn scroll_lines(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => *y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
    }
}

/// Converts absolute cursor positions into frame-to-frame deltas.
///
/// The first position seen is captured rather than differenced, so the
/// camera does not jump when tracking starts. While the camera is
/// orthographic the last position is left alone.
#[derive(Clone, Debug)]
pub struct MouseTracker {
    last_x: f32,
    last_y: f32,
    first_mouse: bool,
}

impl Default for MouseTracker {
    fn default() -> Self {
        Self {
            last_x: 400.0,
            last_y: 300.0,
            first_mouse: true,
        }
    }
}

impl MouseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_position(&self) -> (f32, f32) {
        (self.last_x, self.last_y)
    }

    /// Feed a cursor position to the camera as a look delta.
    pub fn on_cursor_moved(&mut self, x: f32, y: f32, camera: &mut CameraController) {
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }

        if camera.is_orthographic() {
            return;
        }

        // Screen y grows downwards; pitch grows upwards.
        let delta_x = x - self.last_x;
        let delta_y = self.last_y - y;
        camera.apply_look(delta_x, delta_y);

        self.last_x = x;
        self.last_y = y;
    }
}

/// What the rest of the frame needs from input processing.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// View matrix re-derived after all keys were applied.
    pub view: Mat4,
    /// Set when Escape is held; the loop exits after this frame.
    pub close_requested: bool,
}

const MOVEMENT_KEYS: [(KeyCode, Movement); 12] = [
    (KeyCode::KeyW, Movement::Forward),
    (KeyCode::KeyS, Movement::Backward),
    (KeyCode::KeyA, Movement::Left),
    (KeyCode::KeyD, Movement::Right),
    (KeyCode::ArrowUp, Movement::Forward),
    (KeyCode::ArrowDown, Movement::Backward),
    (KeyCode::ArrowLeft, Movement::Left),
    (KeyCode::ArrowRight, Movement::Right),
    (KeyCode::KeyQ, Movement::Up),
    (KeyCode::KeyE, Movement::Down),
    (KeyCode::PageUp, Movement::Up),
    (KeyCode::PageDown, Movement::Down),
];

/// Routes polled key state and pointer events to the camera.
#[derive(Debug, Default)]
pub struct InputDispatcher {
    mouse: MouseTracker,
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every held key to the camera, in a fixed order.
    ///
    /// Movement and `R` only work in perspective mode. `P` is evaluated before
    /// `O`, so holding both ends the frame orthographic.
    pub fn process_keys(&mut self, input: &Input, camera: &mut CameraController) -> FrameInput {
        let close_requested = input.key_down(KeyCode::Escape);

        if !camera.is_orthographic() {
            for (key, movement) in MOVEMENT_KEYS {
                if input.key_down(key) {
                    camera.apply_movement(movement);
                    log::debug!("{key:?} held - camera position {}", camera.position());
                }
            }

            if input.key_down(KeyCode::KeyR) {
                camera.reset_position();
                log::debug!("camera reset to {}", camera.position());
            }
        }

        if input.key_down(KeyCode::KeyP) {
            switch_projection(camera, ProjectionMode::Perspective);
        }
        if input.key_down(KeyCode::KeyO) {
            switch_projection(camera, ProjectionMode::Orthographic);
        }

        FrameInput {
            view: camera.view_matrix(),
            close_requested,
        }
    }

    pub fn on_cursor_moved(&mut self, x: f32, y: f32, camera: &mut CameraController) {
        self.mouse.on_cursor_moved(x, y, camera);
    }

    pub fn on_scroll(&mut self, lines: f32, camera: &mut CameraController) {
        camera.apply_zoom_adjust(lines);
        log::debug!("movement speed {:.2}", camera.movement_speed());
    }
}

fn switch_projection(camera: &mut CameraController, mode: ProjectionMode) {
    if camera.projection_mode() != mode {
        log::info!("switched to {mode:?} view");
    }
    camera.set_projection_mode(mode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DEFAULT_FRONT, DEFAULT_POSITION, DEFAULT_YAW, WORLD_UP};
    use glam::Vec3;

    const EPS: f32 = 1e-5;

    fn held(keys: &[KeyCode]) -> Input {
        let mut input = Input::new();
        for key in keys {
            input.set_key(*key, true);
        }
        input
    }

    #[test]
    fn key_state_follows_press_and_release() {
        let mut input = Input::new();
        input.set_key(KeyCode::KeyW, true);
        assert!(input.key_down(KeyCode::KeyW));

        input.set_key(KeyCode::KeyW, false);
        assert!(!input.key_down(KeyCode::KeyW));

        input.set_key(KeyCode::KeyA, true);
        input.release_all();
        assert!(!input.key_down(KeyCode::KeyA));
    }

    #[test]
    fn forward_keys_move_along_front() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();

        dispatcher.process_keys(&held(&[KeyCode::KeyW]), &mut camera);
        dispatcher.process_keys(&held(&[KeyCode::ArrowUp]), &mut camera);

        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, 11.9), EPS));
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();
        let input = held(&[KeyCode::KeyA, KeyCode::KeyD, KeyCode::KeyQ, KeyCode::KeyE]);

        dispatcher.process_keys(&input, &mut camera);

        assert!(camera.position().abs_diff_eq(DEFAULT_POSITION, EPS));
    }

    #[test]
    fn vertical_keys_use_world_up() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();
        dispatcher.on_cursor_moved(0.0, 0.0, &mut camera);
        dispatcher.on_cursor_moved(0.0, -300.0, &mut camera);
        assert!(camera.pitch() > 0.0);

        dispatcher.process_keys(&held(&[KeyCode::PageUp]), &mut camera);

        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.05, 12.0), EPS));
    }

    #[test]
    fn orthographic_blocks_all_movement_keys() {
        let mut camera = CameraController::new();
        camera.set_projection_mode(ProjectionMode::Orthographic);
        let mut dispatcher = InputDispatcher::new();

        for (key, _) in MOVEMENT_KEYS {
            dispatcher.process_keys(&held(&[key]), &mut camera);
            assert_eq!(camera.position(), DEFAULT_POSITION, "{key:?} moved the camera");
        }
    }

    #[test]
    fn reset_restores_position_only() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();
        dispatcher.on_cursor_moved(0.0, 0.0, &mut camera);
        dispatcher.on_cursor_moved(150.0, 40.0, &mut camera);
        for _ in 0..10 {
            dispatcher.process_keys(&held(&[KeyCode::KeyW, KeyCode::KeyD]), &mut camera);
        }
        let (front, up) = (camera.front(), camera.up());

        dispatcher.process_keys(&held(&[KeyCode::KeyR]), &mut camera);

        assert_eq!(camera.position(), DEFAULT_POSITION);
        assert_eq!(camera.front(), front);
        assert_eq!(camera.up(), up);
    }

    #[test]
    fn orthographic_key_resets_pose_and_perspective_key_keeps_it() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();
        dispatcher.on_cursor_moved(0.0, 0.0, &mut camera);
        dispatcher.on_cursor_moved(90.0, 10.0, &mut camera);
        dispatcher.process_keys(&held(&[KeyCode::KeyS]), &mut camera);

        dispatcher.process_keys(&held(&[KeyCode::KeyO]), &mut camera);
        assert!(camera.is_orthographic());
        assert_eq!(camera.position(), DEFAULT_POSITION);
        assert_eq!(camera.front(), DEFAULT_FRONT);
        assert_eq!(camera.up(), WORLD_UP);

        dispatcher.process_keys(&held(&[KeyCode::KeyP]), &mut camera);
        assert!(!camera.is_orthographic());
        assert_eq!(camera.position(), DEFAULT_POSITION);
    }

    #[test]
    fn holding_p_and_o_ends_orthographic() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();

        dispatcher.process_keys(&held(&[KeyCode::KeyP, KeyCode::KeyO]), &mut camera);

        assert!(camera.is_orthographic());
    }

    #[test]
    fn escape_requests_close() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();

        let frame = dispatcher.process_keys(&Input::new(), &mut camera);
        assert!(!frame.close_requested);

        let frame = dispatcher.process_keys(&held(&[KeyCode::Escape]), &mut camera);
        assert!(frame.close_requested);
    }

    #[test]
    fn view_is_derived_every_frame() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();

        let frame = dispatcher.process_keys(&Input::new(), &mut camera);

        assert_eq!(frame.view, camera.view_matrix());
    }

    #[test]
    fn first_cursor_event_is_captured_not_differenced() {
        let mut camera = CameraController::new();
        let mut tracker = MouseTracker::new();

        tracker.on_cursor_moved(1000.0, -500.0, &mut camera);

        assert_eq!(camera.yaw(), DEFAULT_YAW);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(tracker.last_position(), (1000.0, -500.0));
    }

    #[test]
    fn cursor_deltas_drive_look() {
        let mut camera = CameraController::new();
        let mut tracker = MouseTracker::new();

        tracker.on_cursor_moved(400.0, 300.0, &mut camera);
        tracker.on_cursor_moved(500.0, 250.0, &mut camera);

        assert!((camera.yaw() - -80.0).abs() < EPS);
        assert!((camera.pitch() - 5.0).abs() < EPS);
    }

    #[test]
    fn tracker_freezes_while_orthographic() {
        let mut camera = CameraController::new();
        let mut tracker = MouseTracker::new();
        tracker.on_cursor_moved(10.0, 10.0, &mut camera);

        camera.set_projection_mode(ProjectionMode::Orthographic);
        tracker.on_cursor_moved(200.0, 90.0, &mut camera);

        assert_eq!(tracker.last_position(), (10.0, 10.0));
        assert_eq!(camera.yaw(), DEFAULT_YAW);
    }

    #[test]
    fn scroll_adjusts_speed() {
        let mut camera = CameraController::new();
        let mut dispatcher = InputDispatcher::new();

        dispatcher.on_scroll(3.0, &mut camera);
        assert!((camera.movement_speed() - 0.08).abs() < EPS);

        for _ in 0..20 {
            dispatcher.on_scroll(-1.0, &mut camera);
        }
        assert_eq!(camera.movement_speed(), 0.01);
    }

    #[test]
    fn wheel_deltas_are_in_lines() {
        assert_eq!(scroll_lines(&MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        let pixels = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 240.0));
        assert_eq!(scroll_lines(&pixels), 2.0);
    }
}
