//! What a surface is asked to draw each frame, plus the fixed scene extras
//! (lights, grid, axes) every viewport shares.

use glam::{Mat4, Vec3};

use super::surface::Surface;

/// `0xRRGGBB` to linear-ish `[r, g, b]` in `0..=1`.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Position the light shines from, towards the origin.
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingRig {
    pub ambient: [f32; 3],
    pub ambient_intensity: f32,
    pub key: DirectionalLight,
    pub fill: DirectionalLight,
}

impl Default for LightingRig {
    fn default() -> Self {
        Self {
            ambient: [1.0; 3],
            ambient_intensity: 0.5,
            key: DirectionalLight {
                position: Vec3::new(10.0, 10.0, 5.0),
                color: [1.0; 3],
                intensity: 0.8,
            },
            fill: DirectionalLight {
                position: Vec3::new(-10.0, -10.0, -5.0),
                color: [1.0; 3],
                intensity: 0.4,
            },
        }
    }
}

/// Per-mesh part of a frame. Handles borrow the viewport's slot, so a frame
/// can never outlive the geometry it names.
pub struct MeshDraw<'a, S: Surface + ?Sized> {
    pub geometry: &'a S::Mesh,
    /// Present only while wireframe mode shows the overlay.
    pub overlay: Option<&'a S::Edges>,
    pub model: Mat4,
    pub color: [f32; 3],
    pub wireframe: bool,
}

pub struct RenderFrame<'a, S: Surface + ?Sized> {
    pub view_projection: Mat4,
    pub eye: Vec3,
    pub background: [f32; 3],
    pub lights: &'a LightingRig,
    pub mesh: Option<MeshDraw<'a, S>>,
}

// ── Scene guides ─────────────────────────────────────────────

const GRID_SIZE: f32 = 100.0;
const GRID_DIVISIONS: u32 = 20;
const GRID_CENTER_COLOR: u32 = 0x444444;
const GRID_COLOR: u32 = 0x222222;
const AXES_LENGTH: f32 = 30.0;

/// Grid on the XZ plane and RGB axes, as interleaved `[x, y, z, r, g, b]` line
/// vertices.
pub fn guide_lines() -> Vec<f32> {
    let mut out = Vec::new();
    let half = GRID_SIZE * 0.5;
    let step = GRID_SIZE / GRID_DIVISIONS as f32;
    for i in 0..=GRID_DIVISIONS {
        let k = -half + i as f32 * step;
        let color = if i == GRID_DIVISIONS / 2 { rgb(GRID_CENTER_COLOR) } else { rgb(GRID_COLOR) };
        push_line(&mut out, [-half, 0.0, k], [half, 0.0, k], color);
        push_line(&mut out, [k, 0.0, -half], [k, 0.0, half], color);
    }
    push_line(&mut out, [0.0; 3], [AXES_LENGTH, 0.0, 0.0], [1.0, 0.0, 0.0]);
    push_line(&mut out, [0.0; 3], [0.0, AXES_LENGTH, 0.0], [0.0, 1.0, 0.0]);
    push_line(&mut out, [0.0; 3], [0.0, 0.0, AXES_LENGTH], [0.0, 0.0, 1.0]);
    out
}

pub fn push_line(out: &mut Vec<f32>, a: [f32; 3], b: [f32; 3], color: [f32; 3]) {
    out.extend_from_slice(&a);
    out.extend_from_slice(&color);
    out.extend_from_slice(&b);
    out.extend_from_slice(&color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_unpacks_channels() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(rgb(0x000000), [0.0; 3]);
        assert_eq!(rgb(0x3b82f6)[2], 246.0 / 255.0);
    }

    #[test]
    fn guides_are_whole_line_segments() {
        let lines = guide_lines();
        // 21 lines each way plus three axes, two vertices of six floats each.
        assert_eq!(lines.len(), (21 * 2 + 3) * 2 * 6);
    }
}
