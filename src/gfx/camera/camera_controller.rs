use std::collections::HashSet;

use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

/// Direction requested by a held movement key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKey {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl MovementKey {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::KeyW => Some(MovementKey::Forward),
            KeyCode::KeyS => Some(MovementKey::Backward),
            KeyCode::KeyA => Some(MovementKey::Left),
            KeyCode::KeyD => Some(MovementKey::Right),
            KeyCode::KeyE => Some(MovementKey::Up),
            KeyCode::KeyQ => Some(MovementKey::Down),
            _ => None,
        }
    }
}

/// Pixel-scroll distance treated as one wheel tick
const PIXELS_PER_TICK: f32 = 120.0;

/// Collects window input between frames
///
/// Keys are tracked as a held set. Mouse motion only counts while the right
/// button is down and is accumulated until the frame loop drains it with
/// [`CameraController::take_look_delta`]; wheel ticks are drained the same way.
#[derive(Debug, Default)]
pub struct CameraController {
    pressed: HashSet<MovementKey>,
    is_look_active: bool,
    look_delta: (f32, f32),
    zoom_ticks: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the key is a movement key
    pub fn process_keyed_events(&mut self, event: &KeyEvent) -> bool {
        let PhysicalKey::Code(code) = event.physical_key else {
            return false;
        };
        match MovementKey::from_key_code(code) {
            Some(key) => {
                self.set_key(key, event.state == ElementState::Pressed);
                true
            }
            None => false,
        }
    }

    pub fn process_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Right {
            self.is_look_active = state == ElementState::Pressed;
        }
    }

    pub fn process_events(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::MouseMotion { delta } => {
                if self.is_look_active {
                    // Screen y grows downwards; pitch grows upwards.
                    self.add_look_delta(delta.0 as f32, -(delta.1 as f32));
                }
            }
            DeviceEvent::MouseWheel { delta } => {
                let ticks = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => *lines,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        *y as f32 / PIXELS_PER_TICK
                    }
                };
                self.add_zoom_ticks(ticks);
            }
            _ => (),
        }
    }

    pub fn set_key(&mut self, key: MovementKey, pressed: bool) {
        if pressed {
            self.pressed.insert(key);
        } else {
            self.pressed.remove(&key);
        }
    }

    /// Drops every held key, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.pressed.clear();
        self.is_look_active = false;
    }

    pub fn pressed_keys(&self) -> &HashSet<MovementKey> {
        &self.pressed
    }

    pub fn is_looking(&self) -> bool {
        self.is_look_active
    }

    pub fn add_look_delta(&mut self, dx: f32, dy: f32) {
        self.look_delta.0 += dx;
        self.look_delta.1 += dy;
    }

    pub fn add_zoom_ticks(&mut self, ticks: f32) {
        self.zoom_ticks += ticks;
    }

    /// Returns and clears the accumulated mouse-look delta
    pub fn take_look_delta(&mut self) -> Option<(f32, f32)> {
        let delta = std::mem::take(&mut self.look_delta);
        (delta != (0.0, 0.0)).then_some(delta)
    }

    /// Returns and clears the accumulated wheel ticks
    pub fn take_zoom_ticks(&mut self) -> Option<f32> {
        let ticks = std::mem::take(&mut self.zoom_ticks);
        (ticks != 0.0).then_some(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_wasdqe() {
        assert_eq!(MovementKey::from_key_code(KeyCode::KeyW), Some(MovementKey::Forward));
        assert_eq!(MovementKey::from_key_code(KeyCode::KeyQ), Some(MovementKey::Down));
        assert_eq!(MovementKey::from_key_code(KeyCode::KeyE), Some(MovementKey::Up));
        assert_eq!(MovementKey::from_key_code(KeyCode::Space), None);
    }

    #[test]
    fn held_keys_follow_press_and_release() {
        let mut controller = CameraController::new();
        controller.set_key(MovementKey::Forward, true);
        controller.set_key(MovementKey::Left, true);
        controller.set_key(MovementKey::Forward, false);
        assert_eq!(controller.pressed_keys().len(), 1);
        assert!(controller.pressed_keys().contains(&MovementKey::Left));

        controller.release_all();
        assert!(controller.pressed_keys().is_empty());
    }

    #[test]
    fn mouse_motion_only_counts_while_looking() {
        let mut controller = CameraController::new();
        controller.process_events(&DeviceEvent::MouseMotion { delta: (4.0, 2.0) });
        assert_eq!(controller.take_look_delta(), None);

        controller.process_mouse_input(MouseButton::Right, ElementState::Pressed);
        controller.process_events(&DeviceEvent::MouseMotion { delta: (4.0, 2.0) });
        controller.process_events(&DeviceEvent::MouseMotion { delta: (1.0, 1.0) });
        assert_eq!(controller.take_look_delta(), Some((5.0, -3.0)));
        assert_eq!(controller.take_look_delta(), None);
    }

    #[test]
    fn wheel_ticks_accumulate_until_taken() {
        let mut controller = CameraController::new();
        controller.process_events(&DeviceEvent::MouseWheel {
            delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        });
        controller.process_events(&DeviceEvent::MouseWheel {
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 240.0)),
        });
        assert_eq!(controller.take_zoom_ticks(), Some(3.0));
        assert_eq!(controller.take_zoom_ticks(), None);
    }
}
