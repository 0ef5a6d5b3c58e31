//! Renderer crate for the chaos game visualizer.
//!
//! Every frame plays one more round of the chaos game on the GPU and adds the
//! hits to a counter buffer that persists across frames, so the image sharpens
//! the longer the parameters stay put:
//!
//! ```text
//!   ParameterSet ──▶ simulate ──▶ hit counters ──▶ normalize ──▶ presentable
//!        │             (compute)   (atomic u32)     (compute)     (R32Float)
//!        │                                                            │
//!        └─ dirty? clear counters, iteration = 0        present ◀─────┘
//!                                                   (palette lookup)
//! ```
//!
//! [`FrameDriver`] owns the per-frame ordering and decides when accumulated
//! history is discarded. The three stages are WGSL files polled for changes;
//! an edited stage is rebuilt into a candidate and swapped in only if it
//! compiles, otherwise the running program stays. GPU work sits behind
//! [`StageBackend`] and compilation behind [`ProgramCompiler`], so everything
//! above the wgpu layer also runs against the CPU [`reference`] backend.

mod accumulation;
mod compile;
mod driver;
mod egui_ui;
mod gpu;
mod input;
pub mod reference;
mod reload;
mod settings;
mod stage;
mod types;
mod window;

use anyhow::Result;

pub use accumulation::{tone_map, AccumulationState, StageBackend};
pub use compile::{
    prepare_source, simulate_prelude, validate_wgsl, CompileError, COMPUTE_ENTRY, FRAGMENT_ENTRY,
    VERTEX_ENTRY,
};
pub use driver::{FrameClock, FrameDriver, FrameReport};
pub use gpu::GpuProgram;
pub use input::{FrameInput, InputState};
pub use reload::{
    build_program, check_and_reload, check_chain, load_chain, load_stage, FsClock,
    ProgramCompiler, ReloadResult, SourceClock,
};
pub use settings::{draw_overlay, draw_settings, SettingsState, SettingsUi};
pub use stage::{PipelineProgram, StageChain, StageKind};
pub use types::{
    RendererConfig, DEFAULT_SHADER_DIR, NORMALIZE_WORKGROUPS, SIMULATE_WORKGROUPS, WINDOW_HEIGHT,
    WINDOW_WIDTH,
};

/// Entry point that owns the start-up configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and renders until the user exits.
    ///
    /// Fails if the window, the GPU device or any of the three stage shaders
    /// cannot be brought up. Shader errors after start-up are never fatal.
    pub fn run(&mut self) -> Result<()> {
        window::run(self.config.clone())
    }
}
