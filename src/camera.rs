//! Camera and model transforms for the spectrum scene.

use glam::{Mat4, Vec3};

use crate::params::{CameraParams, VisualStyle};
use crate::rendering::{Extent, Uniforms};
use crate::spectrum::HistoryLayout;

/// Fixed look-at camera over a gently swaying spectrum surface
#[derive(Debug, Clone)]
pub struct CameraSystem {
    params: CameraParams,
}

impl CameraSystem {
    pub fn new(params: CameraParams) -> Self {
        Self { params }
    }

    /// Model rotation around Z, oscillating with time
    ///
    /// # Arguments
    /// * `time_s` - Seconds since the renderer started
    pub fn model_matrix(&self, time_s: f32) -> Mat4 {
        let sway = (time_s * self.params.sway_speed).sin();
        Mat4::from_rotation_z(self.params.sway_amplitude_degrees.to_radians() * sway)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            Vec3::from_array(self.params.eye),
            Vec3::from_array(self.params.target),
            Vec3::from_array(self.params.up),
        )
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.params.fov_degrees.to_radians(),
            aspect_ratio,
            self.params.near_plane,
            self.params.far_plane,
        )
    }

    /// Per-frame uniform block for the current surface and history shape
    pub fn uniforms(
        &self,
        time_s: f32,
        extent: Extent,
        layout: HistoryLayout,
        row_count: usize,
        style: VisualStyle,
    ) -> Uniforms {
        Uniforms {
            model: self.model_matrix(time_s).to_cols_array_2d(),
            view: self.view_matrix().to_cols_array_2d(),
            projection: self.projection_matrix(extent.aspect_ratio()).to_cols_array_2d(),
            vertex_count: layout.points() as u32,
            row_len: layout.row_len as u32,
            row_count: row_count as u32,
            time: time_s,
            style: style.shader_code(),
            _padding: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matrix_oscillates_around_identity() {
        let camera = CameraSystem::new(CameraParams::default());

        assert_eq!(camera.model_matrix(0.0), Mat4::IDENTITY);

        // sin(π/2) = 1 → full sway amplitude
        let peak = camera.model_matrix(std::f32::consts::FRAC_PI_2);
        let expected = Mat4::from_rotation_z(45f32.to_radians());
        assert!(peak.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_view_projection_are_valid() {
        let camera = CameraSystem::new(CameraParams::default());
        let view_proj = camera.projection_matrix(1000.0 / 600.0) * camera.view_matrix();

        // Matrix should not be identity or zero
        assert_ne!(view_proj, Mat4::IDENTITY);
        assert_ne!(view_proj, Mat4::ZERO);
        assert!(view_proj.is_finite());

        // Target lands in the middle of the screen
        let clip = view_proj * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }

    #[test]
    fn test_uniforms_carry_history_shape() {
        let camera = CameraSystem::new(CameraParams::default());
        let layout = HistoryLayout {
            rows: 64,
            row_len: 1025,
        };

        let uniforms = camera.uniforms(
            1.5,
            Extent::new(800, 600),
            layout,
            10,
            VisualStyle::Circle,
        );

        assert_eq!(uniforms.vertex_count, 64 * 1025);
        assert_eq!(uniforms.row_len, 1025);
        assert_eq!(uniforms.row_count, 10);
        assert_eq!(uniforms.time, 1.5);
        assert_eq!(uniforms.style, 3);
    }
}
