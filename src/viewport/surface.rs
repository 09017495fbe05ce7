//! The seam between a [`super::Viewport`] and whatever draws its pixels.
//!
//! A viewport owns exactly one surface. Geometry handles returned by
//! `upload_*` are owned by the viewport and handed back through `release_*`
//! exactly once; the viewport never drops a handle any other way.

use std::cell::Cell;
use std::collections::BTreeSet;

use glam::Mat4;

use super::frame::RenderFrame;
use crate::error::ViewportError;
use crate::mesh::edges::EdgeSet;
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Falls back to `min` when either side is zero; layout may not be final yet.
    pub fn or_min(self, min: SurfaceSize) -> Self {
        if self.is_empty() { min } else { self }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Something that owns the screen region a surface is bound to.
pub trait Container {
    /// Current client size, or `None` once the container can no longer be
    /// resolved.
    fn client_size(&self) -> Option<SurfaceSize>;
}

/// Container whose size the layout pushes in every frame.
#[derive(Debug, Default)]
pub struct ContainerSlot {
    size: Cell<Option<SurfaceSize>>,
}

impl ContainerSlot {
    pub fn new(size: SurfaceSize) -> Self {
        Self { size: Cell::new(Some(size)) }
    }

    /// A slot that has not been laid out yet.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn set_size(&self, size: SurfaceSize) {
        self.size.set(Some(size));
    }

    pub fn detach(&self) {
        self.size.set(None);
    }
}

impl Container for ContainerSlot {
    fn client_size(&self) -> Option<SurfaceSize> {
        self.size.get()
    }
}

pub trait Surface {
    /// GPU-side triangle geometry for one mesh.
    type Mesh;
    /// GPU-side line geometry for one edge overlay.
    type Edges;

    fn attach(&mut self, size: SurfaceSize) -> Result<(), ViewportError>;
    fn resize(&mut self, size: SurfaceSize);
    fn upload_mesh(&mut self, mesh: &Mesh) -> Result<Self::Mesh, ViewportError>;
    fn release_mesh(&mut self, mesh: Self::Mesh);
    fn upload_edges(&mut self, edges: &EdgeSet) -> Result<Self::Edges, ViewportError>;
    fn release_edges(&mut self, edges: Self::Edges);
    fn draw(&mut self, frame: &RenderFrame<'_, Self>);
    /// Frees everything the surface still holds and unbinds it from its
    /// container.
    fn detach(&mut self);
}

// ── Headless surface ─────────────────────────────────────────

/// What a [`RecordingSurface`] saw in one `draw` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub mesh: Option<u32>,
    pub overlay: Option<u32>,
    pub model: Option<Mat4>,
    pub view_projection: Mat4,
    pub color: Option<[f32; 3]>,
    pub wireframe: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RecordedMesh(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct RecordedEdges(pub u32);

/// Surface without a GPU. Tracks every live handle so lifecycle and leak
/// properties can be checked, and records each frame it is asked to draw.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: u32,
    live_meshes: BTreeSet<u32>,
    live_edges: BTreeSet<u32>,
    pub mesh_uploads: usize,
    pub edge_uploads: usize,
    pub size: Option<SurfaceSize>,
    pub attached: bool,
    pub detach_calls: usize,
    pub frames: Vec<FrameRecord>,
    pub draws_while_detached: usize,
    /// Handles handed back that were not live.
    pub double_releases: usize,
    fail_attach: Option<String>,
    fail_upload: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose `attach` fails, to exercise setup errors.
    pub fn failing(reason: &str) -> Self {
        Self { fail_attach: Some(reason.to_string()), ..Self::default() }
    }

    /// Makes the next `upload_mesh` fail once.
    pub fn fail_next_upload(&mut self) {
        self.fail_upload = true;
    }

    pub fn live_meshes(&self) -> usize {
        self.live_meshes.len()
    }

    pub fn live_edges(&self) -> usize {
        self.live_edges.len()
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl Surface for RecordingSurface {
    type Mesh = RecordedMesh;
    type Edges = RecordedEdges;

    fn attach(&mut self, size: SurfaceSize) -> Result<(), ViewportError> {
        if let Some(reason) = &self.fail_attach {
            return Err(ViewportError::Container(reason.clone()));
        }
        self.attached = true;
        self.size = Some(size);
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = Some(size);
    }

    fn upload_mesh(&mut self, _mesh: &Mesh) -> Result<RecordedMesh, ViewportError> {
        if std::mem::take(&mut self.fail_upload) {
            return Err(ViewportError::Container("mesh upload failed".to_string()));
        }
        let id = self.next_id();
        self.live_meshes.insert(id);
        self.mesh_uploads += 1;
        Ok(RecordedMesh(id))
    }

    fn release_mesh(&mut self, mesh: RecordedMesh) {
        if !self.live_meshes.remove(&mesh.0) {
            self.double_releases += 1;
        }
    }

    fn upload_edges(&mut self, _edges: &EdgeSet) -> Result<RecordedEdges, ViewportError> {
        let id = self.next_id();
        self.live_edges.insert(id);
        self.edge_uploads += 1;
        Ok(RecordedEdges(id))
    }

    fn release_edges(&mut self, edges: RecordedEdges) {
        if !self.live_edges.remove(&edges.0) {
            self.double_releases += 1;
        }
    }

    fn draw(&mut self, frame: &RenderFrame<'_, Self>) {
        if !self.attached {
            self.draws_while_detached += 1;
        }
        let mesh = frame.mesh.as_ref();
        self.frames.push(FrameRecord {
            mesh: mesh.map(|m| m.geometry.0),
            overlay: mesh.and_then(|m| m.overlay).map(|e| e.0),
            model: mesh.map(|m| m.model),
            view_projection: frame.view_projection,
            color: mesh.map(|m| m.color),
            wireframe: mesh.is_some_and(|m| m.wireframe),
        });
    }

    fn detach(&mut self) {
        self.attached = false;
        self.detach_calls += 1;
    }
}
