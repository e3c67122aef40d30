use glam::Vec3;

use crate::assets::Bounds;

/// Distance from the framed center, in multiples of the bounding radius.
const FRAMING_DISTANCE: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub position: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraController {
    pub fn new(position: [f32; 3], yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    pub fn from_bounds(bounds: &Bounds) -> Self {
        let center = Vec3::from_array(bounds.center);
        let distance = framing_distance(bounds.radius);
        let position = center + Vec3::new(distance, distance * 0.4, distance);
        let (yaw, pitch) = forward_to_yaw_pitch(center - position);
        Self::new(position.to_array(), yaw, pitch)
    }

    /// Unit view direction.
    pub fn forward(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        Vec3::new(
            self.yaw.cos() * cos_pitch,
            self.pitch.sin(),
            self.yaw.sin() * cos_pitch,
        )
    }
}

fn framing_distance(radius: f32) -> f32 {
    if radius > 0.0 {
        radius * FRAMING_DISTANCE
    } else {
        FRAMING_DISTANCE
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let n = forward / forward.length().max(1e-6);
    (n.z.atan2(n.x), n.y.clamp(-1.0, 1.0).asin())
}
