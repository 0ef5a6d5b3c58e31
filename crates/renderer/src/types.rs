use std::path::PathBuf;

use params::ParameterSet;

/// Window size in physical pixels.
pub const WINDOW_WIDTH: u32 = 2560;
pub const WINDOW_HEIGHT: u32 = 1440;

/// Directory the three stage sources are read from when none is given.
pub const DEFAULT_SHADER_DIR: &str = "shaders";

/// Workgroups per simulate dispatch; each runs 256 invocations.
pub const SIMULATE_WORKGROUPS: u32 = 10;
/// The normalize reduction runs in a single workgroup.
pub const NORMALIZE_WORKGROUPS: u32 = 1;

/// Configuration handed to the renderer at start-up.
///
/// `params` is the initial parameter set, usually the defaults with a preset
/// applied on top.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub window_size: (u32, u32),
    /// Directory holding `simulate.wgsl`, `normalize.wgsl` and `present.wgsl`.
    pub shader_dir: PathBuf,
    /// Whether the settings panels start visible.
    pub show_ui: bool,
    pub params: ParameterSet,
}

impl RendererConfig {
    /// Resolution of the accumulation buffer and presentable image.
    pub fn render_target_size(&self) -> (u32, u32) {
        (
            (self.window_size.0 / 2).max(1),
            (self.window_size.1 / 2).max(1),
        )
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: (WINDOW_WIDTH, WINDOW_HEIGHT),
            shader_dir: PathBuf::from(DEFAULT_SHADER_DIR),
            show_ui: true,
            params: ParameterSet::default(),
        }
    }
}
