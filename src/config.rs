//! Runtime configuration for the viewer, the generation pipeline and the DOM binding.
//!
//! Every struct implements `Default` with the values the front end ships with;
//! callers override single fields with struct update syntax.

use std::time::Duration;

use cgmath::Point3;

/// Converts a `0xRRGGBB` sRGB colour into linear RGB for the shaders.
pub fn linear_rgb(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

#[derive(Clone, Debug)]
pub struct GridConfig {
    pub size: f32,
    pub divisions: u32,
    pub center_color: u32,
    pub color: u32,
    /// Height of the grid plane; slightly below the fitted object.
    pub elevation: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            divisions: 10,
            center_color: 0x334155,
            color: 0x1e293b,
            elevation: -1.01,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LightConfig {
    pub sky_color: u32,
    pub ground_color: u32,
    pub hemisphere_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            sky_color: 0xffffff,
            ground_color: 0x202040,
            hemisphere_intensity: 1.0,
            directional_color: 0xffffff,
            directional_intensity: 1.2,
            directional_position: [5.0, 10.0, 7.0],
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub background: u32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Pose the camera returns to whenever a new mesh is loaded.
    pub default_camera_position: Point3<f32>,
    pub default_target: Point3<f32>,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub light: LightConfig,
    pub grid: GridConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            background: 0x0b1020,
            fov: 60.0,
            znear: 0.1,
            zfar: 1000.0,
            default_camera_position: Point3::new(3.0, 2.0, 4.0),
            default_target: Point3::new(0.0, 0.0, 0.0),
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.1,
            max_distance: 500.0,
            light: LightConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn clear_colour(&self) -> wgpu::Color {
        let [r, g, b] = linear_rgb(self.background);
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Path of the generation endpoint, resolved against `base_url`.
    pub endpoint: String,
    /// Origin all site-relative paths are resolved against. On the web this is
    /// replaced by the page origin.
    pub base_url: String,
    /// Upper bound for one submission (request and mesh load). `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "/generate-3d".to_string(),
            base_url: "http://127.0.0.1:8000/".to_string(),
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl PipelineConfig {
    /**
     * Reads `MESHGEN_BASE_URL`, `MESHGEN_ENDPOINT` and `MESHGEN_TIMEOUT_SECS`
     * on top of the defaults. A timeout of `0` disables the timeout.
     */
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("MESHGEN_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(endpoint) = std::env::var("MESHGEN_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(secs) = std::env::var("MESHGEN_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(0) => config.timeout = None,
                Ok(secs) => config.timeout = Some(Duration::from_secs(secs)),
                Err(e) => log::warn!("Ignoring MESHGEN_TIMEOUT_SECS={secs}: {e}"),
            }
        }
        config
    }
}

/// Ids of the page elements the web front end binds to.
#[derive(Clone, Debug)]
pub struct DomConfig {
    pub viewer_id: String,
    pub status_id: String,
    pub result_id: String,
    pub mesh_link_id: String,
    pub form_id: String,
    /// Class toggled on the result container to hide it.
    pub hidden_class: String,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            viewer_id: "viewer".to_string(),
            status_id: "status".to_string(),
            result_id: "result".to_string(),
            mesh_link_id: "mesh-link".to_string(),
            form_id: "gen-form".to_string(),
            hidden_class: "hidden".to_string(),
        }
    }
}
