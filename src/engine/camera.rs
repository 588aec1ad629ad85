// Centered orthographic camera.
//
// Camera model:
//   - World origin sits at the middle of the viewport; one world unit = one pixel
//   - Bounds are rebuilt from the window size on every resize:
//     left = -w/2, right = w/2, top = h/2, bottom = -h/2
//   - The eye looks down -Z from z = 100; the near/far planes [-200, 1000]
//     bracket the fish depth range (±100) with generous margin

use glam::{Mat4, Vec3};

pub struct OrthoCamera {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Eye distance along +Z.
    pub eye_z: f32,
}

impl OrthoCamera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut cam = Self {
            left: 0.0,
            right: 0.0,
            top: 0.0,
            bottom: 0.0,
            near: -200.0,
            far: 1000.0,
            eye_z: 100.0,
        };
        cam.resize(width, height);
        cam
    }

    /// Recompute the projection bounds from new viewport dimensions.
    /// Called synchronously from the resize event path, never from the tick.
    pub fn resize(&mut self, width: u32, height: u32) {
        let hw = width as f32 / 2.0;
        let hh = height as f32 / 2.0;
        self.left = -hw;
        self.right = hw;
        self.top = hh;
        self.bottom = -hh;
    }

    pub fn half_extents(&self) -> (f32, f32) {
        (self.right, self.top)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            Vec3::new(0.0, 0.0, self.eye_z),
            Vec3::ZERO,
            Vec3::Y,
        )
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn resize_recomputes_centered_bounds() {
        let mut cam = OrthoCamera::new(800, 600);
        cam.resize(1920, 1080);
        assert_eq!(cam.left, -960.0);
        assert_eq!(cam.right, 960.0);
        assert_eq!(cam.top, 540.0);
        assert_eq!(cam.bottom, -540.0);
        // The boid bounds are derived from these.
        assert_eq!(cam.half_extents(), (960.0, 540.0));
    }

    #[test]
    fn world_origin_projects_to_ndc_center() {
        let cam = OrthoCamera::new(1280, 720);
        let clip = cam.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(clip.x.abs() < 1e-5);
        assert!(clip.y.abs() < 1e-5);
    }

    #[test]
    fn viewport_corner_projects_to_ndc_corner() {
        let cam = OrthoCamera::new(1000, 500);
        let clip = cam.view_projection() * Vec4::new(500.0, 250.0, 0.0, 1.0);
        assert!((clip.x - 1.0).abs() < 1e-4);
        assert!((clip.y - 1.0).abs() < 1e-4);
    }
}
