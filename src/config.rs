//! Viewer and service settings.
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration. The browser build reads `localStorage["cadbridge.config"]`;
//! the native build reads the file named by `CADBRIDGE_CONFIG`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewer: ViewerConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Largest bounding-box side of a loaded mesh after normalisation.
    pub target_span: f32,
    pub default_camera_position: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of mesh rotation per pixel of drag.
    pub rotate_sensitivity: f32,
    /// Relative camera distance change per wheel unit.
    pub zoom_sensitivity: f32,
    pub min_camera_distance: f32,
    pub max_camera_distance: f32,
    /// Drawing-surface size used while the container reports zero width or height.
    pub min_surface_size: [u32; 2],
    pub mesh_color: u32,
    pub background: u32,
    /// Dihedral angle above which an edge is drawn in the overlay.
    pub edge_angle_degrees: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            target_span: 40.0,
            default_camera_position: [50.0, 50.0, 50.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            rotate_sensitivity: 0.01,
            zoom_sensitivity: 0.0005,
            min_camera_distance: 1.0,
            max_camera_distance: 900.0,
            min_surface_size: [320, 240],
            mesh_color: 0x3b82f6,
            background: 0x1e293b,
            edge_angle_degrees: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Prefix for every endpoint; empty means same origin.
    pub base_url: String,
    pub units: String,
    pub tolerance: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            units: "mm".to_string(),
            tolerance: 0.01,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the persisted configuration, falling back to defaults.
    pub fn load() -> Self {
        match Self::read_source() {
            Ok(Some(json)) => Self::from_json(&json).unwrap_or_else(|e| {
                log::warn!("ignoring invalid configuration: {e}");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("could not read configuration: {e}");
                Self::default()
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn read_source() -> anyhow::Result<Option<String>> {
        let storage = web_sys::window()
            .ok_or_else(|| anyhow::anyhow!("no window"))?
            .local_storage()
            .map_err(|e| anyhow::anyhow!("{e:?}"))?
            .ok_or_else(|| anyhow::anyhow!("no localStorage"))?;
        storage
            .get_item("cadbridge.config")
            .map_err(|e| anyhow::anyhow!("{e:?}"))
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn read_source() -> anyhow::Result<Option<String>> {
        use anyhow::Context as _;

        let Ok(path) = std::env::var("CADBRIDGE_CONFIG") else {
            return Ok(None);
        };
        let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        Ok(Some(json))
    }
}
