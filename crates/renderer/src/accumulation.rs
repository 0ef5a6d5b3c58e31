//! Hit-count accumulation across frames and its reset protocol.
//!
//! The counters live on the backend; this module owns the iteration counter
//! and decides when the backend clears, simulates and normalizes.

use params::{ConfigUniform, ParameterSet};

/// GPU work the frame needs, in the order the frame issues it.
pub trait StageBackend {
    type Program;

    /// Zeroes every hit counter.
    fn clear_accumulation(&mut self);
    /// Replaces the record all stages read this frame.
    fn upload_config(&mut self, config: &ConfigUniform);
    /// Adds one iteration of hits to the counters.
    fn dispatch_simulate(&mut self, program: &Self::Program);
    /// Rewrites the presentable image from the counters.
    fn dispatch_normalize(&mut self, program: &Self::Program);
    /// Draws the presentable image through the palette.
    fn draw_present(&mut self, program: &Self::Program);
}

/// Iteration counter of the current epoch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationState {
    iteration: u32,
    epoch: u64,
}

impl AccumulationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Number of resets that discarded accumulated history.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Discards all history. Clearing an empty epoch does not start a new one.
    pub fn clear<B: StageBackend + ?Sized>(&mut self, backend: &mut B) {
        backend.clear_accumulation();
        if self.iteration > 0 {
            self.epoch += 1;
            tracing::debug!(epoch = self.epoch, discarded = self.iteration, "accumulation cleared");
        }
        self.iteration = 0;
    }

    /// Uploads the parameters and runs one simulate pass for the current iteration.
    pub fn advance<B: StageBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        program: &B::Program,
        params: &ParameterSet,
        target: (u32, u32),
    ) {
        backend.upload_config(&params.to_uniform(target, self.iteration));
        backend.dispatch_simulate(program);
        self.iteration = self.iteration.saturating_add(1);
    }

    pub fn derive_presentable<B: StageBackend + ?Sized>(&self, backend: &mut B, program: &B::Program) {
        backend.dispatch_normalize(program);
    }
}

/// Density of one cell in `[0, 1]`, as written by the normalize stage.
///
/// Counts are scaled by the peak, then raised to `1 / exponent`. An exponent
/// that is not positive, or exactly one, leaves the linear value alone.
pub fn tone_map(count: u32, peak: u32, exponent: f32) -> f32 {
    if count == 0 || peak == 0 {
        return 0.0;
    }
    let linear = (count as f32 / peak as f32).min(1.0);
    if exponent <= 0.0 || exponent == 1.0 || !exponent.is_finite() {
        linear
    } else {
        linear.powf(exponent.recip())
    }
}
