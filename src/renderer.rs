//! `glow` implementation of [`Surface`], drawn through egui paint callbacks.
//!
//! GPU objects are created and deleted through the surface's own context
//! handle, so releasing a mesh frees its buffers immediately. `draw` only
//! snapshots what to paint; the paint callback issues the GL calls when egui
//! reaches the viewport's rectangle.

use std::sync::{Arc, Mutex, PoisonError};

use glam::{Mat4, Vec3};
use glow::{Context, HasContext as _};

use crate::error::ViewportError;
use crate::mesh::edges::EdgeSet;
use crate::mesh::Mesh;
use crate::viewport::frame::{guide_lines, push_line, RenderFrame};
use crate::viewport::surface::{Surface, SurfaceSize};

const OVERLAY_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Triangles plus a line index buffer over the same vertices for wireframe mode.
pub struct GpuMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    line_ibo: glow::Buffer,
    vertex_count: i32,
    line_index_count: i32,
}

pub struct GpuLines {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: i32,
}

struct Programs {
    mesh: glow::Program,
    lines: glow::Program,
}

#[derive(Clone, Copy)]
struct MeshSnapshot {
    vao: glow::VertexArray,
    vertex_count: i32,
    line_index_count: i32,
    overlay: Option<(glow::VertexArray, i32)>,
    model: Mat4,
    color: [f32; 3],
    wireframe: bool,
}

#[derive(Clone, Copy)]
struct DrawSnapshot {
    view_projection: Mat4,
    eye: Vec3,
    background: [f32; 3],
    ambient: [f32; 3],
    key_dir: Vec3,
    key_color: [f32; 3],
    fill_dir: Vec3,
    fill_color: [f32; 3],
    mesh: Option<MeshSnapshot>,
}

/// State shared with the paint callback.
#[derive(Default)]
struct Scene {
    programs: Option<Programs>,
    guides: Option<(glow::VertexArray, i32)>,
    pending: Option<DrawSnapshot>,
}

pub struct GlowSurface {
    gl: Arc<Context>,
    scene: Arc<Mutex<Scene>>,
    programs: Option<Programs>,
    guides: Option<GpuLines>,
    size: SurfaceSize,
}

impl GlowSurface {
    pub fn new(gl: Arc<Context>) -> Self {
        Self {
            gl,
            scene: Arc::new(Mutex::new(Scene::default())),
            programs: None,
            guides: None,
            size: SurfaceSize::new(0, 0),
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Callback that paints the latest snapshot into `rect`.
    pub fn paint_callback(&self, rect: egui::Rect) -> egui::PaintCallback {
        let scene = Arc::clone(&self.scene);
        let callback = egui_glow::CallbackFn::new(move |_info, painter| {
            let scene = scene.lock().unwrap_or_else(PoisonError::into_inner);
            paint(painter.gl(), &scene);
        });
        egui::PaintCallback { rect, callback: Arc::new(callback) }
    }

    fn scene(&self) -> std::sync::MutexGuard<'_, Scene> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Surface for GlowSurface {
    type Mesh = GpuMesh;
    type Edges = GpuLines;

    fn attach(&mut self, size: SurfaceSize) -> Result<(), ViewportError> {
        let shader_version = egui_glow::ShaderVersion::get(&self.gl);
        let header = shader_version.version_declaration();
        let mesh = compile_program(&self.gl, header, MESH_VERT, MESH_FRAG, MESH_ATTRIBUTES)?;
        let lines = match compile_program(&self.gl, header, LINE_VERT, LINE_FRAG, LINE_ATTRIBUTES) {
            Ok(p) => p,
            Err(e) => {
                unsafe { self.gl.delete_program(mesh) };
                return Err(e);
            }
        };
        let guides = upload_lines(&self.gl, &guide_lines())?;

        let mut scene = self.scene();
        scene.programs = Some(Programs { mesh, lines });
        scene.guides = Some((guides.vao, guides.vertex_count));
        drop(scene);

        self.programs = Some(Programs { mesh, lines });
        self.guides = Some(guides);
        self.size = size;
        Ok(())
    }

    fn resize(&mut self, size: SurfaceSize) {
        // The drawing buffer belongs to egui; only the rect changes.
        self.size = size;
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> Result<GpuMesh, ViewportError> {
        let mut interleaved = Vec::with_capacity(mesh.vertex_count() * 6);
        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            interleaved.extend_from_slice(p);
            interleaved.extend_from_slice(n);
        }
        let mut line_indices = Vec::with_capacity(mesh.triangle_count() * 6);
        for t in 0..mesh.triangle_count() as u32 {
            let b = t * 3;
            line_indices.extend_from_slice(&[b, b + 1, b + 1, b + 2, b + 2, b]);
        }

        let gl = &self.gl;
        unsafe {
            let vao = gl.create_vertex_array().map_err(ViewportError::Container)?;
            let vbo = gl.create_buffer().map_err(ViewportError::Container)?;
            let line_ibo = gl.create_buffer().map_err(ViewportError::Container)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&interleaved),
                glow::STATIC_DRAW,
            );
            // 6 floats per vertex: xyz + normal
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 24, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 24, 12);

            // Recorded in the VAO; wireframe draws index into it.
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(line_ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&line_indices),
                glow::STATIC_DRAW,
            );
            gl.bind_vertex_array(None);

            Ok(GpuMesh {
                vao,
                vbo,
                line_ibo,
                vertex_count: mesh.vertex_count() as i32,
                line_index_count: line_indices.len() as i32,
            })
        }
    }

    fn release_mesh(&mut self, mesh: GpuMesh) {
        let mut scene = self.scene();
        if scene.pending.is_some_and(|p| p.mesh.is_some_and(|m| m.vao == mesh.vao)) {
            scene.pending = None;
        }
        drop(scene);
        unsafe {
            self.gl.delete_vertex_array(mesh.vao);
            self.gl.delete_buffer(mesh.vbo);
            self.gl.delete_buffer(mesh.line_ibo);
        }
    }

    fn upload_edges(&mut self, edges: &EdgeSet) -> Result<GpuLines, ViewportError> {
        let mut verts = Vec::with_capacity(edges.len() * 12);
        for [a, b] in &edges.segments {
            push_line(&mut verts, *a, *b, OVERLAY_COLOR);
        }
        upload_lines(&self.gl, &verts)
    }

    fn release_edges(&mut self, edges: GpuLines) {
        let mut scene = self.scene();
        if scene
            .pending
            .is_some_and(|p| p.mesh.is_some_and(|m| m.overlay.is_some_and(|(vao, _)| vao == edges.vao)))
        {
            scene.pending = None;
        }
        drop(scene);
        delete_lines(&self.gl, edges);
    }

    fn draw(&mut self, frame: &RenderFrame<'_, Self>) {
        let snapshot = DrawSnapshot {
            view_projection: frame.view_projection,
            eye: frame.eye,
            background: frame.background,
            ambient: scaled(frame.lights.ambient, frame.lights.ambient_intensity),
            key_dir: frame.lights.key.position.normalize_or_zero(),
            key_color: scaled(frame.lights.key.color, frame.lights.key.intensity),
            fill_dir: frame.lights.fill.position.normalize_or_zero(),
            fill_color: scaled(frame.lights.fill.color, frame.lights.fill.intensity),
            mesh: frame.mesh.as_ref().map(|m| MeshSnapshot {
                vao: m.geometry.vao,
                vertex_count: m.geometry.vertex_count,
                line_index_count: m.geometry.line_index_count,
                overlay: m.overlay.map(|o| (o.vao, o.vertex_count)),
                model: m.model,
                color: m.color,
                wireframe: m.wireframe,
            }),
        };
        self.scene().pending = Some(snapshot);
    }

    fn detach(&mut self) {
        *self.scene() = Scene::default();
        if let Some(guides) = self.guides.take() {
            delete_lines(&self.gl, guides);
        }
        if let Some(programs) = self.programs.take() {
            unsafe {
                self.gl.delete_program(programs.mesh);
                self.gl.delete_program(programs.lines);
            }
        }
    }
}

fn scaled(color: [f32; 3], intensity: f32) -> [f32; 3] {
    color.map(|c| c * intensity)
}

// ── GPU upload ───────────────────────────────────────────────

/// `verts` is interleaved `[x, y, z, r, g, b]`.
fn upload_lines(gl: &Context, verts: &[f32]) -> Result<GpuLines, ViewportError> {
    unsafe {
        let vao = gl.create_vertex_array().map_err(ViewportError::Container)?;
        let vbo = gl.create_buffer().map_err(ViewportError::Container)?;

        gl.bind_vertex_array(Some(vao));
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(verts), glow::STATIC_DRAW);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 24, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 24, 12);
        gl.bind_vertex_array(None);

        Ok(GpuLines { vao, vbo, vertex_count: (verts.len() / 6) as i32 })
    }
}

fn delete_lines(gl: &Context, lines: GpuLines) {
    unsafe {
        gl.delete_vertex_array(lines.vao);
        gl.delete_buffer(lines.vbo);
    }
}

// ── Painting ─────────────────────────────────────────────────

fn paint(gl: &Context, scene: &Scene) {
    let (Some(programs), Some(frame)) = (&scene.programs, &scene.pending) else {
        return;
    };
    unsafe {
        let [r, g, b] = frame.background;
        gl.clear_color(r, g, b, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        gl.enable(glow::DEPTH_TEST);
        gl.depth_func(glow::LEQUAL);

        gl.use_program(Some(programs.lines));
        set_mat4(gl, programs.lines, "u_mvp", &frame.view_projection);
        if let Some((vao, count)) = scene.guides {
            gl.bind_vertex_array(Some(vao));
            gl.draw_arrays(glow::LINES, 0, count);
        }

        if let Some(mesh) = &frame.mesh {
            let mvp = frame.view_projection * mesh.model;
            if mesh.vertex_count > 0 {
                gl.use_program(Some(programs.mesh));
                set_mat4(gl, programs.mesh, "u_mvp", &mvp);
                set_mat4(gl, programs.mesh, "u_model", &mesh.model);
                set_vec3(gl, programs.mesh, "u_eye", frame.eye.to_array());
                set_vec3(gl, programs.mesh, "u_color", mesh.color);
                set_vec3(gl, programs.mesh, "u_ambient", frame.ambient);
                set_vec3(gl, programs.mesh, "u_key_dir", frame.key_dir.to_array());
                set_vec3(gl, programs.mesh, "u_key_color", frame.key_color);
                set_vec3(gl, programs.mesh, "u_fill_dir", frame.fill_dir.to_array());
                set_vec3(gl, programs.mesh, "u_fill_color", frame.fill_color);
                gl.bind_vertex_array(Some(mesh.vao));
                if mesh.wireframe {
                    gl.draw_elements(glow::LINES, mesh.line_index_count, glow::UNSIGNED_INT, 0);
                } else {
                    gl.draw_arrays(glow::TRIANGLES, 0, mesh.vertex_count);
                }
            }
            if let Some((vao, count)) = mesh.overlay {
                gl.use_program(Some(programs.lines));
                set_mat4(gl, programs.lines, "u_mvp", &mvp);
                gl.bind_vertex_array(Some(vao));
                gl.draw_arrays(glow::LINES, 0, count);
            }
        }

        gl.bind_vertex_array(None);
        gl.use_program(None);
        gl.disable(glow::DEPTH_TEST);
    }
}

fn set_mat4(gl: &Context, program: glow::Program, name: &str, mat: &Mat4) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_matrix_4_f32_slice(loc.as_ref(), false, &mat.to_cols_array());
    }
}

fn set_vec3(gl: &Context, program: glow::Program, name: &str, v: [f32; 3]) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_3_f32(loc.as_ref(), v[0], v[1], v[2]);
    }
}

// ── Shader compilation ───────────────────────────────────────

fn compile_program(
    gl: &Context,
    header: &str,
    vert_src: &str,
    frag_src: &str,
    attributes: [&str; 2],
) -> Result<glow::Program, ViewportError> {
    unsafe {
        let program = gl.create_program().map_err(ViewportError::Container)?;
        let mut shaders = Vec::with_capacity(2);
        for (kind, src) in [(glow::VERTEX_SHADER, vert_src), (glow::FRAGMENT_SHADER, frag_src)] {
            let shader = gl.create_shader(kind).map_err(ViewportError::Container)?;
            gl.shader_source(shader, &format!("{header}\n{src}"));
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                for s in shaders {
                    gl.delete_shader(s);
                }
                gl.delete_program(program);
                return Err(ViewportError::Container(format!("shader compile failed: {log}")));
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }
        // GLSL 1.40 has no explicit attribute locations; pin them before linking.
        for (location, name) in attributes.into_iter().enumerate() {
            gl.bind_attrib_location(program, location as u32, name);
        }
        gl.link_program(program);
        let linked = gl.get_program_link_status(program);
        for s in shaders {
            gl.detach_shader(program, s);
            gl.delete_shader(s);
        }
        if !linked {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(ViewportError::Container(format!("program link failed: {log}")));
        }
        Ok(program)
    }
}

// ── Shaders ──────────────────────────────────────────────────

/// Attribute names in vertex-buffer location order.
const MESH_ATTRIBUTES: [&str; 2] = ["a_pos", "a_normal"];
const LINE_ATTRIBUTES: [&str; 2] = ["a_pos", "a_col"];

const MESH_VERT: &str = r#"
#ifdef GL_ES
precision highp float;
#endif
uniform mat4 u_mvp;
uniform mat4 u_model;
in vec3 a_pos;
in vec3 a_normal;
out vec3 v_normal;
out vec3 v_world;
void main() {
    v_normal = mat3(u_model) * a_normal;
    v_world = (u_model * vec4(a_pos, 1.0)).xyz;
    gl_Position = u_mvp * vec4(a_pos, 1.0);
}"#;

// Phong: specular 0x111111, shininess 100, lit from both sides.
const MESH_FRAG: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif
uniform vec3 u_eye;
uniform vec3 u_color;
uniform vec3 u_ambient;
uniform vec3 u_key_dir;
uniform vec3 u_key_color;
uniform vec3 u_fill_dir;
uniform vec3 u_fill_color;
in vec3 v_normal;
in vec3 v_world;
out vec4 o_col;
vec3 light(vec3 n, vec3 v, vec3 dir, vec3 color) {
    float diffuse = max(dot(n, dir), 0.0);
    vec3 h = normalize(dir + v);
    float spec = pow(max(dot(n, h), 0.0), 100.0);
    return color * (diffuse * u_color + spec * vec3(0.0667));
}
void main() {
    vec3 n = normalize(v_normal);
    vec3 v = normalize(u_eye - v_world);
    if (dot(n, v) < 0.0) { n = -n; }
    vec3 c = u_ambient * u_color
        + light(n, v, u_key_dir, u_key_color)
        + light(n, v, u_fill_dir, u_fill_color);
    o_col = vec4(c, 1.0);
}"#;

const LINE_VERT: &str = r#"
#ifdef GL_ES
precision highp float;
#endif
uniform mat4 u_mvp;
in vec3 a_pos;
in vec3 a_col;
out vec3 v_col;
void main() {
    v_col = a_col;
    gl_Position = u_mvp * vec4(a_pos, 1.0);
}"#;

const LINE_FRAG: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif
in vec3 v_col;
out vec4 o_col;
void main() { o_col = vec4(v_col, 1.0); }"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaders_compile_under_glsl_140() {
        for src in [MESH_VERT, MESH_FRAG, LINE_VERT, LINE_FRAG] {
            assert!(!src.contains("layout("), "explicit locations need GLSL 3.30");
        }
    }

    #[test]
    fn bound_attributes_exist_in_vertex_shaders() {
        for (src, names) in [(MESH_VERT, MESH_ATTRIBUTES), (LINE_VERT, LINE_ATTRIBUTES)] {
            for name in names {
                assert!(src.contains(&format!("in vec3 {name};")), "{name} missing");
            }
        }
    }
}
