//! STL viewer and workflow client for the CADBridge conversion service.
//!
//! The core is target-independent: [`mesh`] decodes STL bytes, [`viewport`]
//! owns cameras, input and mesh lifecycles over an abstract surface, and
//! [`registry`] maps viewport names to live instances. [`renderer`] and
//! [`app`] bind all of that to egui and OpenGL.

pub mod app;
pub mod config;
pub mod error;
pub mod mesh;
pub mod registry;
pub mod renderer;
pub mod service;
pub mod viewport;

pub use app::CadBridgeApp;
pub use error::{DecodeError, ServiceError, ViewportError};

use std::future::Future;

// ── Web entry‑point ──
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    use wasm_bindgen::JsCast as _;

    eframe::WebLogger::init(log::LevelFilter::Debug).ok();
    console_error_panic_hook::set_once();

    let web_options = eframe::WebOptions { depth_buffer: 24, ..Default::default() };

    // The element id must match the <canvas> in index.html
    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id("cadbridge_canvas"))
        .ok_or_else(|| JsValue::from_str("canvas #cadbridge_canvas not found"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    eframe::WebRunner::new()
        .start(canvas, web_options, Box::new(|cc| Ok(Box::new(CadBridgeApp::new(cc)))))
        .await?;

    Ok(())
}

/// Runs a future to completion off the egui thread.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
