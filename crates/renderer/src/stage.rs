//! The three GPU programs the frame runs, in order, and their holders.
//!
//! A [`PipelineProgram`] is only ever built from a successful compile, so a
//! stage that exists is serving a working program. Reloads build a separate
//! candidate and promote it with [`PipelineProgram::promote`].

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::compile::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Simulate,
    Normalize,
    Present,
}

impl StageKind {
    /// Pipeline order.
    pub const ALL: [StageKind; 3] = [StageKind::Simulate, StageKind::Normalize, StageKind::Present];

    pub const fn label(self) -> &'static str {
        match self {
            StageKind::Simulate => "simulate",
            StageKind::Normalize => "normalize",
            StageKind::Present => "present",
        }
    }

    /// Source file name inside the shader directory.
    pub const fn file_name(self) -> &'static str {
        match self {
            StageKind::Simulate => "simulate.wgsl",
            StageKind::Normalize => "normalize.wgsl",
            StageKind::Present => "present.wgsl",
        }
    }

    pub const fn is_compute(self) -> bool {
        !matches!(self, StageKind::Present)
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
pub struct PipelineProgram<P> {
    stage: StageKind,
    program: P,
    source: PathBuf,
    last_seen: Option<SystemTime>,
    generation: u32,
    last_error: Option<String>,
}

impl<P> PipelineProgram<P> {
    pub fn new(stage: StageKind, program: P, source: PathBuf, last_seen: Option<SystemTime>) -> Self {
        Self {
            stage,
            program,
            source,
            last_seen,
            generation: 1,
            last_error: None,
        }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last_seen
    }

    /// Successful loads so far, the initial one included.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Diagnostic of the latest candidate that failed to build.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn mark_seen(&mut self, stamp: Option<SystemTime>) {
        self.last_seen = stamp;
    }

    /// Installs `candidate` and hands back the retired program.
    pub(crate) fn promote(&mut self, candidate: P) -> P {
        self.generation += 1;
        self.last_error = None;
        std::mem::replace(&mut self.program, candidate)
    }

    pub(crate) fn reject(&mut self, error: &CompileError) {
        self.last_error = Some(error.to_string());
    }
}

/// One program per stage, held by value.
#[derive(Debug)]
pub struct StageChain<P> {
    pub simulate: PipelineProgram<P>,
    pub normalize: PipelineProgram<P>,
    pub present: PipelineProgram<P>,
}

impl<P> StageChain<P> {
    pub fn get(&self, stage: StageKind) -> &PipelineProgram<P> {
        match stage {
            StageKind::Simulate => &self.simulate,
            StageKind::Normalize => &self.normalize,
            StageKind::Present => &self.present,
        }
    }

    pub fn get_mut(&mut self, stage: StageKind) -> &mut PipelineProgram<P> {
        match stage {
            StageKind::Simulate => &mut self.simulate,
            StageKind::Normalize => &mut self.normalize,
            StageKind::Present => &mut self.present,
        }
    }
}
