#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = eframe::NativeOptions {
        depth_buffer: 24,
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]).with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "CADBridge",
        options,
        Box::new(|cc| Ok(Box::new(cadbridge_viewer::CadBridgeApp::new(cc)))),
    )
}

// The browser build starts through `cadbridge_viewer::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
