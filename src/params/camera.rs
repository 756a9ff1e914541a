//! Camera configuration for the spectrum scene.

/// Orbiting camera parameters (world units are the unit cube the spectrum is drawn in)
#[derive(Debug, Clone)]
pub struct CameraParams {
    /// Camera position
    pub eye: [f32; 3],

    /// Look-at target
    pub target: [f32; 3],

    /// Up vector. Heights are drawn along -Z, so "up" is -Z.
    pub up: [f32; 3],

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane
    pub near_plane: f32,

    /// Far clipping plane
    pub far_plane: f32,

    /// Peak model rotation around Z (degrees)
    pub sway_amplitude_degrees: f32,

    /// Model rotation speed (radians of phase per second)
    pub sway_speed: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            eye: [2.0, 2.0, 2.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 0.0, -1.0],
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 10.0,
            sway_amplitude_degrees: 45.0, // Half a quarter turn either way
            sway_speed: 1.0,
        }
    }
}
