// Pointer and viewport tracking.
//
// Abstracts winit events into the two cached values the simulation reads:
// the latest pointer position (viewport pixels, last-write-wins) and the
// window size. The boid step wants the pointer in world space — centered on
// the viewport with +Y up — so the translation lives here too.

use glam::Vec3;
use winit::event::WindowEvent;

pub struct PointerTracker {
    /// Latest pointer position in viewport pixels (top-left origin).
    pub position: (f32, f32),
    pub window_size: (u32, u32),
}

impl PointerTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: (0.0, 0.0),
            window_size: (width, height),
        }
    }

    /// Feed a winit WindowEvent; events arrive between ticks and only
    /// overwrite cached values, so interleaving with the frame loop is safe.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.position = (position.x as f32, position.y as f32);
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    /// Feed an event unless the overlay already consumed it; a pointer move
    /// captured by the overlay must not steer the flock.
    pub fn process_unconsumed(&mut self, event: &WindowEvent, consumed: bool) {
        if !consumed {
            self.process_event(event);
        }
    }

    /// Pointer translated into the agents' coordinate space: origin at the
    /// viewport center, +Y up, z = 0 (the pointer has no depth).
    pub fn pointer_world(&self) -> Vec3 {
        let (w, h) = (self.window_size.0 as f32, self.window_size.1 as f32);
        Vec3::new(
            self.position.0 - w / 2.0,
            -(self.position.1 - h / 2.0),
            0.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::{PhysicalPosition, PhysicalSize};

    fn cursor(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(x, y),
        }
    }

    #[test]
    fn viewport_center_maps_to_world_origin() {
        let mut tracker = PointerTracker::new(1280, 720);
        tracker.process_event(&cursor(640.0, 360.0));
        assert_eq!(tracker.pointer_world(), Vec3::ZERO);
    }

    #[test]
    fn screen_down_is_world_negative_y() {
        let mut tracker = PointerTracker::new(1000, 500);
        tracker.process_event(&cursor(750.0, 400.0));
        let world = tracker.pointer_world();
        assert_eq!(world, Vec3::new(250.0, -150.0, 0.0));
    }

    #[test]
    fn latest_pointer_event_wins() {
        let mut tracker = PointerTracker::new(800, 600);
        tracker.process_event(&cursor(10.0, 10.0));
        tracker.process_event(&cursor(20.0, 30.0));
        assert_eq!(tracker.position, (20.0, 30.0));
    }

    #[test]
    fn overlay_consumed_moves_do_not_steer_the_pointer() {
        let mut tracker = PointerTracker::new(800, 600);
        tracker.process_unconsumed(&cursor(100.0, 100.0), false);
        tracker.process_unconsumed(&cursor(700.0, 500.0), true);
        assert_eq!(tracker.position, (100.0, 100.0));
    }

    #[test]
    fn resize_updates_the_translation_basis() {
        let mut tracker = PointerTracker::new(800, 600);
        tracker.process_event(&cursor(400.0, 300.0));
        assert_eq!(tracker.pointer_world(), Vec3::ZERO);

        tracker.process_event(&WindowEvent::Resized(PhysicalSize::new(1600, 1200)));
        assert_eq!(tracker.pointer_world(), Vec3::new(-400.0, 300.0, 0.0));
    }
}
