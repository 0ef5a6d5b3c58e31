//! CPU stand-in for the GPU backend.
//!
//! Compiles stage sources through the same naga validation the device path
//! uses and runs a small deterministic chaos game on the CPU. The kernel only
//! plays the plain polygon-vertex game; it exists to exercise the frame and
//! reset protocol without a GPU, not to reproduce the shader image.

use params::ConfigUniform;

use crate::accumulation::{tone_map, StageBackend};
use crate::compile::{prepare_source, validate_wgsl, CompileError};
use crate::reload::ProgramCompiler;
use crate::stage::StageKind;

const PARTICLES: u32 = 64;
const STEPS_PER_PARTICLE: u32 = 128;
const WARMUP_STEPS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceProgram {
    stage: StageKind,
    id: u64,
}

impl ReferenceProgram {
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// Unique per successful compile.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Backend call as observed by the reference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    Clear,
    Upload { iteration: u32 },
    Simulate { program: u64 },
    Normalize { program: u64 },
    Present { program: u64 },
}

#[derive(Debug)]
pub struct ReferenceBackend {
    width: u32,
    height: u32,
    hits: Vec<u32>,
    presentable: Vec<f32>,
    config: Option<ConfigUniform>,
    log: Vec<BackendOp>,
    compile_attempts: usize,
    next_program: u64,
}

impl ReferenceBackend {
    pub fn new(width: u32, height: u32) -> Self {
        let cells = (width * height) as usize;
        Self {
            width,
            height,
            hits: vec![0; cells],
            presentable: vec![0.0; cells],
            config: None,
            log: Vec::new(),
            compile_attempts: 0,
            next_program: 1,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn hits(&self) -> &[u32] {
        &self.hits
    }

    pub fn total_hits(&self) -> u64 {
        self.hits.iter().map(|&count| u64::from(count)).sum()
    }

    pub fn presentable(&self) -> &[f32] {
        &self.presentable
    }

    pub fn compile_attempts(&self) -> usize {
        self.compile_attempts
    }

    pub fn log(&self) -> &[BackendOp] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<BackendOp> {
        std::mem::take(&mut self.log)
    }

    /// Overwrites the counters, e.g. to normalize a hand-built field.
    pub fn set_hits(&mut self, hits: &[u32]) {
        let len = self.hits.len().min(hits.len());
        self.hits[..len].copy_from_slice(&hits[..len]);
    }

    fn simulate(&mut self, config: &ConfigUniform) {
        let vertex_count = config.vertex_count.max(1);
        let vertices: Vec<[f32; 2]> = (0..vertex_count)
            .map(|index| {
                let angle = std::f32::consts::TAU * index as f32 / vertex_count as f32
                    - std::f32::consts::FRAC_PI_2;
                [angle.cos(), angle.sin()]
            })
            .collect();
        let center = [self.width as f32 * 0.5, self.height as f32 * 0.5];

        for particle in 0..PARTICLES {
            let mut rng = Pcg::seeded(config.iteration, particle);
            let mut point = [rng.next_signed(), rng.next_signed()];
            for step in 0..STEPS_PER_PARTICLE {
                let target = vertices[(rng.next_u32() % vertex_count) as usize];
                point[0] += (target[0] - point[0]) * config.step;
                point[1] += (target[1] - point[1]) * config.step;
                if step < WARMUP_STEPS {
                    continue;
                }
                let x = center[0] + (point[0] + config.offset[0]) * config.polygon_radius;
                let y = center[1] + (point[1] + config.offset[1]) * config.polygon_radius;
                if x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32 {
                    let cell = y as usize * self.width as usize + x as usize;
                    self.hits[cell] = self.hits[cell].saturating_add(1);
                }
            }
        }
    }
}

impl StageBackend for ReferenceBackend {
    type Program = ReferenceProgram;

    fn clear_accumulation(&mut self) {
        self.hits.fill(0);
        self.log.push(BackendOp::Clear);
    }

    fn upload_config(&mut self, config: &ConfigUniform) {
        self.config = Some(*config);
        self.log.push(BackendOp::Upload {
            iteration: config.iteration,
        });
    }

    fn dispatch_simulate(&mut self, program: &ReferenceProgram) {
        self.log.push(BackendOp::Simulate { program: program.id });
        match self.config {
            Some(config) => self.simulate(&config),
            None => tracing::warn!("simulate dispatched before any config upload"),
        }
    }

    fn dispatch_normalize(&mut self, program: &ReferenceProgram) {
        self.log.push(BackendOp::Normalize { program: program.id });
        let exponent = self.config.map_or(1.0, |config| config.normalize_exponent);
        let peak = self.hits.iter().copied().max().unwrap_or(0);
        for (out, &count) in self.presentable.iter_mut().zip(&self.hits) {
            *out = tone_map(count, peak, exponent);
        }
    }

    fn draw_present(&mut self, program: &ReferenceProgram) {
        self.log.push(BackendOp::Present { program: program.id });
    }
}

impl ProgramCompiler for ReferenceBackend {
    type Program = ReferenceProgram;

    fn compile(&mut self, stage: StageKind, source: &str) -> Result<ReferenceProgram, CompileError> {
        self.compile_attempts += 1;
        validate_wgsl(stage, &prepare_source(stage, source))?;
        let id = self.next_program;
        self.next_program += 1;
        Ok(ReferenceProgram { stage, id })
    }
}

/// Same PCG hash as the simulate kernel.
pub fn pcg_hash(value: u32) -> u32 {
    let state = value.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

struct Pcg(u32);

impl Pcg {
    fn seeded(iteration: u32, particle: u32) -> Self {
        Self(pcg_hash(iteration ^ pcg_hash(particle)))
    }

    fn next_u32(&mut self) -> u32 {
        self.0 = pcg_hash(self.0);
        self.0
    }

    fn next_signed(&mut self) -> f32 {
        (self.next_u32() as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
