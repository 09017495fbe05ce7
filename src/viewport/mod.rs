//! A named viewport: one render surface, one camera, at most one mesh.
//!
//! ```text
//! Empty --load--> Loaded --load--> Loaded
//!   |               |  \--toggle_wireframe--/
//!   +----dispose----+--> Disposed (terminal)
//! ```
//!
//! Every mesh replacement goes through [`Viewport::install`], which hands the
//! previous mesh and its edge overlay back to the surface before returning.

pub mod camera;
pub mod frame;
pub mod input;
pub mod render_loop;
pub mod surface;

use std::rc::Rc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::ViewerConfig;
use crate::error::ViewportError;
use crate::mesh::{self, edges, Aabb, Mesh};
use camera::Camera;
use frame::{rgb, LightingRig, MeshDraw, RenderFrame};
use input::{InputController, PointerEvent, WheelOutcome};
use render_loop::RenderLoop;
use surface::{Container, Surface, SurfaceSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportState {
    Empty,
    Loaded,
    Disposed,
}

/// Identifies one asynchronous mesh fetch. Only the most recent ticket may
/// load its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Placement of the loaded mesh: centred on the origin, uniformly scaled to
/// the target span, then rotated by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTransform {
    pub center: Vec3,
    pub scale: f32,
    /// Rotation about X (radians)
    pub pitch: f32,
    /// Rotation about Y (radians)
    pub yaw: f32,
}

impl MeshTransform {
    pub fn fit(bounds: Option<Aabb>, target_span: f32) -> Self {
        let (center, max_extent) = bounds.map_or((Vec3::ZERO, 0.0), |bb| (bb.center(), bb.max_extent()));
        let scale = if max_extent > 0.0 && max_extent.is_finite() { target_span / max_extent } else { 1.0 };
        Self { center, scale, pitch: 0.0, yaw: 0.0 }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_quat(Quat::from_euler(EulerRot::XYZ, self.pitch, self.yaw, 0.0))
            * Mat4::from_scale(Vec3::splat(self.scale))
            * Mat4::from_translation(-self.center)
    }
}

struct LoadedMesh<S: Surface> {
    mesh: Mesh,
    geometry: S::Mesh,
    overlay: Option<S::Edges>,
    transform: MeshTransform,
    color: [f32; 3],
}

pub struct Viewport<S: Surface> {
    name: String,
    config: ViewerConfig,
    container: Rc<dyn Container>,
    surface: S,
    size: SurfaceSize,
    camera: Camera,
    lights: LightingRig,
    input: InputController,
    render_loop: RenderLoop,
    slot: Option<LoadedMesh<S>>,
    wireframe: bool,
    generation: u64,
    disposed: bool,
    container_lost: bool,
}

impl<S: Surface> Viewport<S> {
    /// Binds `surface` to `container`. Fails only when the container cannot be
    /// resolved or the surface refuses to attach; a zero-sized container is
    /// clamped to the configured minimum.
    pub fn create(
        name: &str,
        container: Rc<dyn Container>,
        mut surface: S,
        config: ViewerConfig,
    ) -> Result<Self, ViewportError> {
        let reported = container
            .client_size()
            .ok_or_else(|| ViewportError::Container(format!("container for '{name}' not found")))?;
        let min = SurfaceSize::new(config.min_surface_size[0], config.min_surface_size[1]);
        if reported.is_empty() {
            log::warn!(
                "viewport '{name}': container is {}x{}, using {}x{}",
                reported.width,
                reported.height,
                min.width,
                min.height
            );
        }
        let size = reported.or_min(min);
        surface.attach(size)?;

        log::info!("viewport '{name}' created ({}x{})", size.width, size.height);
        Ok(Self {
            name: name.to_string(),
            camera: Camera::new(&config, size.aspect()),
            input: InputController::new(config.rotate_sensitivity, config.zoom_sensitivity),
            lights: LightingRig::default(),
            config,
            container,
            surface,
            size,
            render_loop: RenderLoop::start(),
            slot: None,
            wireframe: false,
            generation: 0,
            disposed: false,
            container_lost: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ViewportState {
        if self.disposed {
            ViewportState::Disposed
        } else if self.slot.is_some() {
            ViewportState::Loaded
        } else {
            ViewportState::Empty
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.slot.as_ref().map(|s| &s.mesh)
    }

    pub fn mesh_transform(&self) -> Option<MeshTransform> {
        self.slot.as_ref().map(|s| s.transform)
    }

    pub fn mesh_color(&self) -> Option<[f32; 3]> {
        self.slot.as_ref().map(|s| s.color)
    }

    pub fn is_wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn has_overlay(&self) -> bool {
        self.slot.as_ref().is_some_and(|s| s.overlay.is_some())
    }

    pub fn is_dragging(&self) -> bool {
        self.input.is_dragging()
    }

    pub fn is_render_loop_running(&self) -> bool {
        self.render_loop.is_running()
    }

    fn ensure_live(&self) -> Result<(), ViewportError> {
        if self.disposed { Err(ViewportError::Disposed) } else { Ok(()) }
    }

    /// Installs `mesh`, releasing the previous mesh and its overlay. Any fetch
    /// started before this call becomes stale.
    pub fn load(&mut self, mesh: Mesh) -> Result<(), ViewportError> {
        self.ensure_live()?;
        let geometry = self.surface.upload_mesh(&mesh)?;
        self.generation += 1;
        let transform = MeshTransform::fit(mesh.bounds(), self.config.target_span);
        log::debug!(
            "viewport '{}': installing {} triangles, scale {:.4}",
            self.name,
            mesh.triangle_count(),
            transform.scale
        );
        self.install(Some(LoadedMesh {
            mesh,
            geometry,
            overlay: None,
            transform,
            color: rgb(self.config.mesh_color),
        }));
        self.wireframe = false;
        Ok(())
    }

    /// Starts a fetch generation; any earlier ticket becomes stale.
    pub fn begin_fetch(&mut self) -> Result<FetchTicket, ViewportError> {
        self.ensure_live()?;
        self.generation += 1;
        Ok(FetchTicket(self.generation))
    }

    /// Checks that `ticket` is still the latest fetch. Failed fetches go
    /// through here before anything is shown for them.
    pub fn check_ticket(&self, ticket: FetchTicket) -> Result<(), ViewportError> {
        self.ensure_live()?;
        if ticket.0 != self.generation {
            return Err(ViewportError::Stale { ticket: ticket.0, current: self.generation });
        }
        Ok(())
    }

    /// Decodes and loads the bytes of a fetch, unless something newer has been
    /// requested or loaded since `ticket` was issued.
    pub fn load_fetched(&mut self, ticket: FetchTicket, bytes: &[u8]) -> Result<(), ViewportError> {
        self.check_ticket(ticket)?;
        let mesh = mesh::decode(bytes)?;
        self.load(mesh)
    }

    /// Flips wireframe mode and returns the new state. The overlay is built on
    /// the first switch to wireframe and reused until the mesh changes.
    /// Without a mesh this does nothing.
    pub fn toggle_wireframe(&mut self) -> Result<bool, ViewportError> {
        self.ensure_live()?;
        let Some(loaded) = self.slot.as_mut() else {
            return Ok(self.wireframe);
        };
        let on = !self.wireframe;
        if on && loaded.overlay.is_none() {
            let edges = edges::feature_edges(&loaded.mesh, self.config.edge_angle_degrees);
            log::debug!("viewport '{}': edge overlay with {} segments", self.name, edges.len());
            loaded.overlay = Some(self.surface.upload_edges(&edges)?);
        }
        self.wireframe = on;
        Ok(on)
    }

    pub fn reset_camera(&mut self) -> Result<(), ViewportError> {
        self.ensure_live()?;
        self.camera.reset();
        if let Some(loaded) = self.slot.as_mut() {
            loaded.transform.pitch = 0.0;
            loaded.transform.yaw = 0.0;
        }
        Ok(())
    }

    /// Recolours the current mesh (`0xRRGGBB`); no-op without a mesh.
    pub fn set_mesh_color(&mut self, color: u32) -> Result<(), ViewportError> {
        self.ensure_live()?;
        if let Some(loaded) = self.slot.as_mut() {
            loaded.color = rgb(color);
        }
        Ok(())
    }

    /// Re-reads the container size. A container that has gone away keeps the
    /// last size and is reported once until it comes back.
    pub fn resize(&mut self) -> Result<(), ViewportError> {
        self.ensure_live()?;
        let Some(reported) = self.container.client_size() else {
            if !self.container_lost {
                log::warn!("viewport '{}': container lost, keeping {}x{}", self.name, self.size.width, self.size.height);
                self.container_lost = true;
            }
            return Ok(());
        };
        self.container_lost = false;
        let min = SurfaceSize::new(self.config.min_surface_size[0], self.config.min_surface_size[1]);
        self.size = reported.or_min(min);
        self.camera.set_aspect(self.size.aspect());
        self.surface.resize(self.size);
        Ok(())
    }

    pub fn pointer(&mut self, event: PointerEvent) -> Result<(), ViewportError> {
        self.ensure_live()?;
        if let Some(delta) = self.input.pointer(event) {
            if let Some(loaded) = self.slot.as_mut() {
                loaded.transform.yaw += delta.yaw;
                loaded.transform.pitch += delta.pitch;
            }
        }
        Ok(())
    }

    pub fn wheel(&mut self, delta_y: f32) -> Result<WheelOutcome, ViewportError> {
        self.ensure_live()?;
        let outcome = self.input.wheel(delta_y);
        self.camera.zoom(outcome.zoom_factor);
        Ok(outcome)
    }

    /// One render-loop step. Returns `true` while the host should keep
    /// scheduling frames.
    pub fn tick(&mut self) -> bool {
        if self.disposed || !self.render_loop.begin_frame() {
            return false;
        }
        let frame = RenderFrame {
            view_projection: self.camera.view_projection(),
            eye: self.camera.position,
            background: rgb(self.config.background),
            lights: &self.lights,
            mesh: self.slot.as_ref().map(|loaded| MeshDraw {
                geometry: &loaded.geometry,
                overlay: loaded.overlay.as_ref().filter(|_| self.wireframe),
                model: loaded.transform.matrix(),
                color: loaded.color,
                wireframe: self.wireframe,
            }),
        };
        self.surface.draw(&frame);
        true
    }

    /// Stops the render loop, then releases the mesh, the overlay and the
    /// surface. The instance must not be used afterwards; every later call
    /// returns [`ViewportError::Disposed`].
    pub fn dispose(&mut self) -> Result<(), ViewportError> {
        self.ensure_live()?;
        self.render_loop.stop();
        self.install(None);
        self.surface.detach();
        self.disposed = true;
        log::info!("viewport '{}' disposed after {} frames", self.name, self.render_loop.frames());
        Ok(())
    }

    fn install(&mut self, next: Option<LoadedMesh<S>>) {
        if let Some(old) = std::mem::replace(&mut self.slot, next) {
            if let Some(overlay) = old.overlay {
                self.surface.release_edges(overlay);
            }
            self.surface.release_mesh(old.geometry);
        }
    }
}

impl<S: Surface> Drop for Viewport<S> {
    fn drop(&mut self) {
        if !self.disposed {
            let _ = self.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fit_scales_largest_side_to_span() {
        let bb = Aabb { min: Vec3::new(0.0, 0.0, 0.0), max: Vec3::new(4.0, 2.0, 1.0) };
        let t = MeshTransform::fit(Some(bb), 40.0);
        assert_eq!(t.center, Vec3::new(2.0, 1.0, 0.5));
        assert_relative_eq!(t.scale, 10.0);
        let corner = t.matrix().transform_point3(Vec3::new(4.0, 2.0, 1.0));
        assert_relative_eq!(corner.x, 20.0, epsilon = 1e-5);
        assert_relative_eq!(corner.y, 10.0, epsilon = 1e-5);
        assert_relative_eq!(corner.z, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn fit_of_point_cloud_is_identity_scale() {
        let p = Vec3::new(3.0, 3.0, 3.0);
        let t = MeshTransform::fit(Some(Aabb { min: p, max: p }), 40.0);
        assert_eq!(t.scale, 1.0);
        assert_eq!(MeshTransform::fit(None, 40.0).scale, 1.0);
    }
}
