use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use eframe::egui;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use rfd::AsyncFileDialog;

use crate::config::AppConfig;
use crate::error::{ServiceError, ViewportError};
use crate::execute;
use crate::mesh::{self, encode, sample};
use crate::registry::{ViewportHandle, ViewportRegistry};
use crate::renderer::GlowSurface;
use crate::service::{
    self, Analysis, Artifact, Classification, ConvertResponse, Region, ServiceClient, UploadResponse,
};
use crate::viewport::input::PointerSample;
use crate::viewport::surface::{ContainerSlot, SurfaceSize};
use crate::viewport::{FetchTicket, Viewport};

const MAIN_VIEW: &str = "main";
const STL_VIEW: &str = "stl";
const STEP_VIEW: &str = "step";

const STL_COLOR: u32 = 0x3b82f6;
const STEP_COLOR: u32 = 0x10b981;
const FALLBACK_COLOR: u32 = 0xff0000;

const STATUS_SECONDS: f64 = 5.0;
const UNITS: [&str; 3] = ["mm", "cm", "in"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Upload,
    Analysis,
    Detection,
    Classification,
    Results,
}

impl Section {
    const ALL: [Section; 5] =
        [Section::Upload, Section::Analysis, Section::Detection, Section::Classification, Section::Results];

    fn title(self) -> &'static str {
        match self {
            Section::Upload => "Upload",
            Section::Analysis => "Analysis",
            Section::Detection => "Detection",
            Section::Classification => "Classification",
            Section::Results => "Results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Success,
    Error,
}

struct StatusLine {
    kind: StatusKind,
    text: String,
    shown_at: f64,
}

/// Completions of background work, delivered to the UI thread.
enum Event {
    PickedForUpload { name: String, bytes: Vec<u8> },
    PickedLocal { name: String, bytes: Vec<u8> },
    Uploaded(Result<UploadResponse, ServiceError>),
    Analysed(Result<Analysis, ServiceError>),
    Detected(Result<Vec<Region>, ServiceError>),
    Classified(Result<Classification, ServiceError>),
    Converted(Result<ConvertResponse, ServiceError>),
    MeshBytes { view: &'static str, ticket: FetchTicket, result: Result<Vec<u8>, ServiceError> },
    Saved { what: &'static str, result: anyhow::Result<bool> },
}

pub struct CadBridgeApp {
    config: AppConfig,
    gl: Option<Arc<glow::Context>>,
    registry: ViewportRegistry<GlowSurface>,
    slots: BTreeMap<&'static str, Rc<ContainerSlot>>,
    /// Views waiting for their first layout before the job's mesh is fetched.
    wanted: BTreeMap<&'static str, String>,
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,

    section: Section,
    reached: Section,
    job: Option<UploadResponse>,
    analysis: Option<Analysis>,
    regions: Option<Vec<Region>>,
    classification: Option<Classification>,
    converted: Option<ConvertResponse>,
    loading: Option<&'static str>,
    status: Option<StatusLine>,
}

impl CadBridgeApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load();
        let (tx, rx) = mpsc::unbounded();
        if cc.gl.is_none() {
            log::error!("no OpenGL context; viewports are disabled");
        }
        Self {
            registry: ViewportRegistry::new(config.viewer.clone()),
            config,
            gl: cc.gl.clone(),
            slots: BTreeMap::new(),
            wanted: BTreeMap::new(),
            tx,
            rx,
            section: Section::Upload,
            reached: Section::Upload,
            job: None,
            analysis: None,
            regions: None,
            classification: None,
            converted: None,
            loading: None,
            status: None,
        }
    }

    fn client(&self) -> ServiceClient {
        ServiceClient::new(&self.config.service)
    }

    fn navigate(&mut self, section: Section) {
        self.section = section;
        self.reached = self.reached.max(section);
    }

    fn show_status(&mut self, ctx: &egui::Context, kind: StatusKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            StatusKind::Success => log::info!("{text}"),
            StatusKind::Error => log::error!("{text}"),
        }
        self.status = Some(StatusLine { kind, text, shown_at: ctx.input(|i| i.time) });
        ctx.request_repaint_after(std::time::Duration::from_secs_f64(STATUS_SECONDS));
    }

    /// Runs `job` in the background and posts its result back as an event.
    fn spawn<F>(&mut self, label: &'static str, job: F)
    where
        F: std::future::Future<Output = Event> + SendIfNative + 'static,
    {
        self.loading = Some(label);
        let tx = self.tx.clone();
        execute(async move {
            // The receiver only goes away with the app.
            let _ = tx.unbounded_send(job.await);
        });
    }

    // ── Event handling ───────────────────────────────────────

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(Some(event)) = self.rx.try_next() {
            self.handle(ctx, event);
            ctx.request_repaint();
        }
    }

    fn handle(&mut self, ctx: &egui::Context, event: Event) {
        match event {
            Event::PickedForUpload { name, bytes } => self.upload(ctx, name, bytes),
            Event::PickedLocal { name, bytes } => match mesh::decode(&bytes) {
                Ok(m) => {
                    let triangles = m.triangle_count();
                    match self.load_into(MAIN_VIEW, |vp| vp.load(m)) {
                        Ok(()) => {
                            self.wanted.remove(MAIN_VIEW);
                            self.show_status(ctx, StatusKind::Success, format!("{name}: {triangles} triangles"));
                        }
                        Err(e) => self.show_status(ctx, StatusKind::Error, format!("{name}: {e}")),
                    }
                }
                Err(e) => self.show_status(ctx, StatusKind::Error, format!("{name}: {e}")),
            },
            Event::Uploaded(result) => match result {
                Ok(upload) => {
                    self.show_status(ctx, StatusKind::Success, format!("File uploaded: {}", upload.filename));
                    let client = self.client();
                    let job_id = upload.job_id.clone();
                    self.job = Some(upload);
                    self.analysis = None;
                    self.regions = None;
                    self.classification = None;
                    self.converted = None;
                    self.spawn("Analyzing STL mesh...", async move {
                        Event::Analysed(client.fetch_analysis(&job_id).await)
                    });
                }
                Err(e) => self.fail(ctx, "Upload failed", e),
            },
            Event::Analysed(result) => match result {
                Ok(analysis) => {
                    self.loading = None;
                    self.analysis = Some(analysis);
                    if let Some(job) = &self.job {
                        self.wanted.insert(MAIN_VIEW, job.job_id.clone());
                    }
                    self.navigate(Section::Analysis);
                }
                Err(e) => self.fail(ctx, "Analysis failed", e),
            },
            Event::Detected(result) => match result {
                Ok(regions) => {
                    self.loading = None;
                    self.regions = Some(regions);
                    self.navigate(Section::Detection);
                }
                Err(e) => self.fail(ctx, "Detection failed", e),
            },
            Event::Classified(result) => match result {
                Ok(classification) => {
                    self.loading = None;
                    self.classification = Some(classification);
                    self.navigate(Section::Classification);
                }
                Err(e) => self.fail(ctx, "Classification failed", e),
            },
            Event::Converted(result) => match result {
                Ok(converted) => {
                    self.loading = None;
                    self.converted = Some(converted);
                    if let Some(job) = &self.job {
                        self.wanted.insert(STL_VIEW, job.job_id.clone());
                        self.wanted.insert(STEP_VIEW, job.job_id.clone());
                    }
                    self.navigate(Section::Results);
                }
                Err(e) => self.fail(ctx, "Conversion failed", e),
            },
            Event::MeshBytes { view, ticket, result } => self.mesh_arrived(ctx, view, ticket, result),
            Event::Saved { what, result } => match result {
                Ok(true) => self.show_status(ctx, StatusKind::Success, format!("{what} saved successfully")),
                Ok(false) => log::debug!("saving {what} cancelled"),
                Err(e) => self.show_status(ctx, StatusKind::Error, format!("saving {what}: {e:#}")),
            },
        }
    }

    fn fail(&mut self, ctx: &egui::Context, what: &str, e: ServiceError) {
        self.loading = None;
        self.show_status(ctx, StatusKind::Error, format!("{what}: {e}"));
    }

    fn upload(&mut self, ctx: &egui::Context, name: String, bytes: Vec<u8>) {
        if !name.to_ascii_lowercase().ends_with(".stl") {
            self.show_status(ctx, StatusKind::Error, "Please select a valid STL file");
            return;
        }
        let client = self.client();
        self.spawn("Uploading file...", async move { Event::Uploaded(client.upload(&name, bytes).await) });
    }

    fn mesh_arrived(
        &mut self,
        ctx: &egui::Context,
        view: &'static str,
        ticket: FetchTicket,
        result: Result<Vec<u8>, ServiceError>,
    ) {
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                match self.load_into(view, |vp| vp.check_ticket(ticket)) {
                    Err(stale) if stale.is_stale() => {
                        log::debug!("viewport '{view}': dropping failed fetch ({e}): {stale}");
                        return;
                    }
                    _ => {}
                }
                self.show_status(ctx, StatusKind::Error, format!("Failed to load 3D model: {e}"));
                if view == MAIN_VIEW {
                    // Keep the viewer visibly alive with a stand-in cube.
                    let shown = self.load_into(view, |vp| {
                        vp.load(sample::cube(10.0))?;
                        vp.set_mesh_color(FALLBACK_COLOR)
                    });
                    if let Err(e) = shown {
                        log::warn!("fallback cube: {e}");
                    }
                }
                return;
            }
        };
        let loaded = self.load_into(view, |vp| {
            vp.load_fetched(ticket, &bytes)?;
            match view {
                STL_VIEW => {
                    vp.set_mesh_color(STL_COLOR)?;
                    vp.toggle_wireframe()?;
                }
                STEP_VIEW => vp.set_mesh_color(STEP_COLOR)?,
                _ => {}
            }
            Ok(())
        });
        match loaded {
            Ok(()) => log::info!("viewport '{view}': loaded {} bytes", bytes.len()),
            Err(e) if e.is_stale() => log::debug!("viewport '{view}': dropping late mesh ({e})"),
            Err(e) => self.show_status(ctx, StatusKind::Error, format!("Failed to load 3D model: {e}")),
        }
    }

    fn load_into(
        &mut self,
        view: &'static str,
        f: impl FnOnce(&mut Viewport<GlowSurface>) -> Result<(), ViewportError>,
    ) -> Result<(), ViewportError> {
        let handle = self
            .registry
            .get(view)
            .ok_or_else(|| ViewportError::Container(format!("viewport '{view}' is not on screen")))?;
        handle.try_with(f)
    }

    // ── Viewports ────────────────────────────────────────────

    fn viewport_handle(&mut self, name: &'static str) -> Result<ViewportHandle<GlowSurface>, ViewportError> {
        let slot = Rc::clone(self.slots.entry(name).or_insert_with(|| Rc::new(ContainerSlot::unresolved())));
        let gl = self.gl.clone();
        self.registry.get_or_create(name, slot, move || {
            gl.map(GlowSurface::new).ok_or_else(|| ViewportError::Container("no OpenGL context".to_string()))
        })
    }

    fn viewport_panel(&mut self, ui: &mut egui::Ui, name: &'static str, height: f32) {
        ui.horizontal(|ui| {
            if ui.button("Reset view").clicked() {
                if let Some(h) = self.registry.get(name) {
                    if let Err(e) = h.try_with(|vp| vp.reset_camera()) {
                        log::debug!("viewport '{name}': reset: {e}");
                    }
                }
            }
            if ui.button("Wireframe").clicked() {
                if let Some(h) = self.registry.get(name) {
                    if let Err(e) = h.try_with(|vp| vp.toggle_wireframe()) {
                        log::debug!("viewport '{name}': wireframe: {e}");
                    }
                }
            }
        });

        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), height), egui::Sense::click_and_drag());
        let size = SurfaceSize::new(rect.width().max(0.0) as u32, rect.height().max(0.0) as u32);
        self.slots.entry(name).or_insert_with(|| Rc::new(ContainerSlot::unresolved())).set_size(size);

        let handle = match self.viewport_handle(name) {
            Ok(h) => h,
            Err(e) => {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    e.to_string(),
                    egui::FontId::proportional(14.0),
                    egui::Color32::LIGHT_RED,
                );
                return;
            }
        };

        if let Some(job_id) = self.wanted.remove(name) {
            match handle.try_with(|vp| vp.begin_fetch()) {
                Ok(ticket) => {
                    let client = self.client();
                    let tx = self.tx.clone();
                    execute(async move {
                        let result = client.fetch_raw_mesh_bytes(&job_id).await;
                        let _ = tx.unbounded_send(Event::MeshBytes { view: name, ticket, result });
                    });
                }
                Err(e) => log::warn!("viewport '{name}': {e}"),
            }
        }

        let pointer = PointerSample {
            pos: response.interact_pointer_pos().map(|p| glam::Vec2::new(p.x - rect.min.x, p.y - rect.min.y)),
            inside: ui.input(|i| i.pointer.latest_pos()).is_some_and(|p| rect.contains(p)),
            drag_started: response.drag_started(),
            dragged: response.dragged(),
            drag_stopped: response.drag_stopped(),
        };
        let hovered = response.hovered();
        let scroll = if hovered { ui.input(|i| i.raw_scroll_delta.y) } else { 0.0 };

        let drew = handle.with(|vp| {
            if let Err(e) = vp.resize() {
                log::debug!("viewport '{name}': {e}");
            }
            if let Some(event) = pointer.to_event(vp.is_dragging()) {
                if let Err(e) = vp.pointer(event) {
                    log::debug!("viewport '{name}': {event:?}: {e}");
                }
            }
            // egui reports scroll-up as positive; the viewport expects DOM wheel deltas.
            let mut swallow = false;
            if scroll != 0.0 {
                if let Ok(outcome) = vp.wheel(-scroll) {
                    swallow = outcome.prevent_default;
                }
            }
            let running = vp.tick();
            (running, swallow, vp.surface().paint_callback(rect))
        });

        match drew {
            Ok((running, swallow, callback)) => {
                if swallow {
                    ui.input_mut(|i| i.smooth_scroll_delta = egui::Vec2::ZERO);
                }
                ui.painter().add(callback);
                if running {
                    ui.ctx().request_repaint();
                }
            }
            Err(e) => log::warn!("viewport '{name}': {e}"),
        }
    }

    // ── Sections ─────────────────────────────────────────────

    fn upload_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Upload STL");
        ui.label("Drop an .stl file onto the window or choose one.");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Units:");
            egui::ComboBox::from_id_salt("units")
                .selected_text(self.config.service.units.clone())
                .show_ui(ui, |ui| {
                    for unit in UNITS {
                        ui.selectable_value(&mut self.config.service.units, unit.to_string(), unit);
                    }
                });
        });
        ui.horizontal(|ui| {
            ui.label("Tolerance:");
            ui.add(egui::DragValue::new(&mut self.config.service.tolerance).speed(0.001).range(0.0001..=10.0));
        });

        ui.add_space(8.0);
        if ui.add_enabled(self.loading.is_none(), egui::Button::new("Choose STL file…")).clicked() {
            let tx = self.tx.clone();
            execute(async move {
                if let Some((name, bytes)) = pick_stl().await {
                    let _ = tx.unbounded_send(Event::PickedForUpload { name, bytes });
                }
            });
        }
    }

    fn analysis_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Analysis");
        if let Some(a) = &self.analysis {
            egui::Grid::new("analysis_grid").num_columns(2).striped(true).show(ui, |ui| {
                ui.label("Triangles");
                ui.label(a.num_triangles.to_string());
                ui.end_row();
                ui.label("Vertices");
                ui.label(a.num_vertices.to_string());
                ui.end_row();
                ui.label("Volume");
                ui.label(format!("{:.2} mm³", a.volume));
                ui.end_row();
                ui.label("Surface area");
                ui.label(format!("{:.2} mm²", a.surface_area));
                ui.end_row();
                let [w, h, d] = a.bounding_box.dimensions;
                ui.label("Bounding box");
                ui.label(format!("{w:.2} × {h:.2} × {d:.2} mm"));
                ui.end_row();
            });
        }
        ui.separator();
        let height = (ui.available_height() - 60.0).max(240.0);
        self.viewport_panel(ui, MAIN_VIEW, height);
        if ui.add_enabled(self.job.is_some() && self.loading.is_none(), egui::Button::new("Detect regions")).clicked()
        {
            self.start_detection();
        }
    }

    fn detection_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Detected regions");
        match self.regions.as_deref() {
            Some([]) | None => {
                ui.weak("No regions detected yet.");
            }
            Some(regions) => {
                egui::ScrollArea::vertical().max_height(ui.available_height() - 40.0).show(ui, |ui| {
                    for r in regions {
                        ui.group(|ui| {
                            ui.strong(format!("Region {}", r.region_id));
                            ui.label(format!(
                                "Triangles: {}",
                                r.num_triangles.map_or_else(|| "N/A".to_string(), |n| n.to_string())
                            ));
                            ui.label(format!("Normal: {}", r.normal.map_or_else(|| "N/A".to_string(), fmt_normal)));
                        });
                    }
                });
            }
        }
        if ui.add_enabled(self.loading.is_none(), egui::Button::new("Classify regions")).clicked() {
            self.start_classification();
        }
    }

    fn classification_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Surface classification");
        match &self.classification {
            Some(c) if !c.mapping.regions.is_empty() => {
                if let Some(summary) = &c.mapping.summary {
                    if let Some(description) = &summary.ai_description {
                        ui.group(|ui| {
                            ui.strong("Analysis");
                            ui.label(description);
                        });
                    }
                    ui.label(format!(
                        "Summary: {} regions detected | {} planar | {} freeform",
                        summary.total_regions, summary.planar_surfaces, summary.freeform_surfaces
                    ));
                }
                egui::ScrollArea::vertical().max_height(ui.available_height() - 40.0).show(ui, |ui| {
                    for r in &c.mapping.regions {
                        ui.group(|ui| {
                            ui.strong(format!("Region {}", r.region_id));
                            ui.label(format!("Surface: {}", r.surface_type.as_deref().unwrap_or("Unknown")));
                            let confidence =
                                r.confidence.map_or_else(|| "N/A".to_string(), |c| format!("{:.0}", c * 100.0));
                            ui.label(format!("Confidence: {confidence}%"));
                        });
                    }
                });
            }
            _ => {
                ui.weak("No classification data available.");
            }
        }
        ui.horizontal(|ui| {
            if ui.button("Save mapping").clicked() {
                self.save_mapping(ui.ctx());
            }
            if ui.add_enabled(self.loading.is_none(), egui::Button::new("Generate STEP")).clicked() {
                self.start_conversion();
            }
        });
    }

    fn results_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Results");
        let files = self.converted.clone().unwrap_or_default();
        ui.horizontal(|ui| {
            for (label, artifact) in
                [("Download STEP", Artifact::Step), ("Download mapping", Artifact::Mapping), ("Download report", Artifact::Report)]
            {
                if let Some(file) = files.file(artifact) {
                    if ui.button(label).clicked() {
                        let url = self.client().download_url(file);
                        if let Err(e) = open_url(&url) {
                            self.show_status(ui.ctx(), StatusKind::Error, format!("{e:#}"));
                        }
                    }
                }
            }
        });
        if let Some(stats) = &files.statistics {
            ui.collapsing("Statistics", |ui| {
                ui.monospace(serde_json::to_string_pretty(stats).unwrap_or_default());
            });
        }
        ui.separator();

        let height = (ui.available_height() - 40.0).max(240.0);
        ui.columns(2, |cols| {
            cols[0].strong("STL mesh");
            self.viewport_panel(&mut cols[0], STL_VIEW, height);
            cols[1].strong("STEP surfaces");
            self.viewport_panel(&mut cols[1], STEP_VIEW, height);
        });
    }

    // ── Actions ──────────────────────────────────────────────

    fn start_detection(&mut self) {
        let Some(job_id) = self.job.as_ref().map(|j| j.job_id.clone()) else { return };
        let client = self.client();
        self.spawn("Detecting geometric regions...", async move {
            Event::Detected(client.fetch_regions(&job_id).await)
        });
    }

    fn start_classification(&mut self) {
        let Some(job_id) = self.job.as_ref().map(|j| j.job_id.clone()) else { return };
        let client = self.client();
        self.spawn("Classifying regions...", async move {
            Event::Classified(client.fetch_classification(&job_id).await)
        });
    }

    fn start_conversion(&mut self) {
        let Some(job_id) = self.job.as_ref().map(|j| j.job_id.clone()) else { return };
        let client = self.client();
        self.spawn("Generating STEP file...", async move { Event::Converted(client.convert(&job_id).await) });
    }

    fn save_mapping(&mut self, ctx: &egui::Context) {
        let prepared = match (&self.job, &self.classification) {
            (Some(job), Some(c)) => Some((service::mapping_file_name(&job.job_id), service::mapping_json(&c.raw))),
            _ => None,
        };
        let (file_name, json) = match prepared {
            Some((file_name, Ok(json))) => (file_name, json),
            Some((_, Err(e))) => {
                self.show_status(ctx, StatusKind::Error, format!("Mapping: {e}"));
                return;
            }
            None => {
                self.show_status(ctx, StatusKind::Error, "No mapping data to save");
                return;
            }
        };
        let tx = self.tx.clone();
        execute(async move {
            let result = save_bytes(file_name, json.into_bytes(), "application/json").await;
            let _ = tx.unbounded_send(Event::Saved { what: "Mapping", result });
        });
    }

    fn save_sample(&mut self) {
        let bytes = encode::encode_binary(&sample::cube(10.0), "cadbridge sample cube");
        let tx = self.tx.clone();
        execute(async move {
            let result = save_bytes("sample_cube.stl".to_string(), bytes, "model/stl").await;
            let _ = tx.unbounded_send(Event::Saved { what: "Sample", result });
        });
    }

    fn take_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input_mut(|i| std::mem::take(&mut i.raw.dropped_files));
        for file in dropped {
            let name = if file.name.is_empty() {
                file.path
                    .as_deref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            } else {
                file.name.clone()
            };
            let bytes = match (&file.bytes, &file.path) {
                (Some(bytes), _) => bytes.to_vec(),
                (None, Some(path)) => match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        self.show_status(ctx, StatusKind::Error, format!("{}: {e}", path.display()));
                        continue;
                    }
                },
                (None, None) => continue,
            };
            self.upload(ctx, name, bytes);
        }
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("side_panel").resizable(false).min_width(180.0).show(ctx, |ui| {
            ui.heading("CADBridge");
            ui.separator();

            for section in Section::ALL {
                let enabled = section <= self.reached;
                let selected = self.section == section;
                if ui.add_enabled(enabled, egui::SelectableLabel::new(selected, section.title())).clicked() {
                    self.section = section;
                }
            }

            ui.separator();
            ui.label("Without the service");
            if ui.button("Load local file").clicked() {
                let tx = self.tx.clone();
                self.navigate(Section::Analysis);
                execute(async move {
                    if let Some((name, bytes)) = pick_stl().await {
                        let _ = tx.unbounded_send(Event::PickedLocal { name, bytes });
                    }
                });
            }
            if ui.button("Show sample cube").clicked() {
                self.navigate(Section::Analysis);
                // Queued so the main viewport is laid out before it loads.
                let bytes = encode::encode_binary(&sample::cube(10.0), "sample");
                let _ = self.tx.unbounded_send(Event::PickedLocal { name: "sample cube".to_string(), bytes });
            }
            if ui.button("Save sample STL").clicked() {
                self.save_sample();
            }

            if let Some(job) = &self.job {
                ui.separator();
                ui.label(format!("Job: {}", job.job_id));
                ui.weak(&job.filename);
            }

            if let Some(label) = self.loading {
                ui.separator();
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(label);
                });
            }

            let now = ctx.input(|i| i.time);
            if self.status.as_ref().is_some_and(|s| now - s.shown_at >= STATUS_SECONDS) {
                self.status = None;
            }
            if let Some(status) = &self.status {
                ui.separator();
                let color = match status.kind {
                    StatusKind::Success => egui::Color32::LIGHT_GREEN,
                    StatusKind::Error => egui::Color32::LIGHT_RED,
                };
                ui.colored_label(color, &status.text);
            }
        });
    }
}

impl eframe::App for CadBridgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);
        self.take_dropped_files(ctx);
        self.side_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.section {
            Section::Upload => self.upload_section(ui),
            Section::Analysis => self.analysis_section(ui),
            Section::Detection => self.detection_section(ui),
            Section::Classification => self.classification_section(ui),
            Section::Results => self.results_section(ui),
        });
    }

    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.registry.dispose_all();
    }
}

fn fmt_normal(n: [f64; 3]) -> String {
    format!("[{:.2}, {:.2}, {:.2}]", n[0], n[1], n[2])
}

// ── Platform helpers ─────────────────────────────────────────

#[cfg(not(target_arch = "wasm32"))]
pub trait SendIfNative: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send> SendIfNative for T {}

#[cfg(target_arch = "wasm32")]
pub trait SendIfNative {}
#[cfg(target_arch = "wasm32")]
impl<T> SendIfNative for T {}

async fn pick_stl() -> Option<(String, Vec<u8>)> {
    let handle = AsyncFileDialog::new().add_filter("STL mesh", &["stl", "STL"]).pick_file().await?;
    let name = handle.file_name();
    let bytes = handle.read().await;
    Some((name, bytes))
}

/// Offers `bytes` to the user as `file_name`. `Ok(false)` means cancelled.
#[cfg(target_arch = "wasm32")]
async fn save_bytes(file_name: String, bytes: Vec<u8>, mime: &str) -> anyhow::Result<bool> {
    use wasm_bindgen::JsCast as _;

    let js = |e: wasm_bindgen::JsValue| anyhow::anyhow!("{e:?}");
    let array = js_sys::Uint8Array::from(bytes.as_slice());
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&js_sys::Array::of1(&array), &options)
        .map_err(js)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(js)?;
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow::anyhow!("no document"))?;
    let anchor: web_sys::HtmlAnchorElement = document.create_element("a").map_err(js)?.dyn_into().map_err(|_| {
        anyhow::anyhow!("<a> is not an anchor element")
    })?;
    anchor.set_href(&url);
    anchor.set_download(&file_name);
    anchor.click();
    web_sys::Url::revoke_object_url(&url).map_err(js)?;
    Ok(true)
}

#[cfg(not(target_arch = "wasm32"))]
async fn save_bytes(file_name: String, bytes: Vec<u8>, _mime: &str) -> anyhow::Result<bool> {
    use anyhow::Context as _;

    let Some(handle) = AsyncFileDialog::new().set_file_name(&file_name).save_file().await else {
        return Ok(false);
    };
    handle.write(&bytes).await.with_context(|| format!("writing {file_name}"))?;
    Ok(true)
}

#[cfg(target_arch = "wasm32")]
fn open_url(url: &str) -> anyhow::Result<()> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    window.location().set_href(url).map_err(|e| anyhow::anyhow!("{e:?}"))
}

#[cfg(not(target_arch = "wasm32"))]
fn open_url(url: &str) -> anyhow::Result<()> {
    anyhow::bail!("downloads need the browser build ({url})")
}
