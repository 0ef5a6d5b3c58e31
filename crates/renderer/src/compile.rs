use std::borrow::Cow;
use std::path::PathBuf;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;
use params::{PointType, SelectionMode};

use crate::stage::StageKind;

/// Entry point of both compute stages.
pub const COMPUTE_ENTRY: &str = "main";
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to read {stage} shader {path}: {source}")]
    Read {
        stage: StageKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader failed to parse:\n{message}")]
    Parse { stage: StageKind, message: String },
    #[error("{stage} shader failed validation:\n{message}")]
    Validation { stage: StageKind, message: String },
    #[error("{stage} pipeline rejected by the device: {message}")]
    Device { stage: StageKind, message: String },
}

impl CompileError {
    pub fn stage(&self) -> StageKind {
        match self {
            CompileError::Read { stage, .. }
            | CompileError::Parse { stage, .. }
            | CompileError::Validation { stage, .. }
            | CompileError::Device { stage, .. } => *stage,
        }
    }
}

/// Constants the simulate kernel refers to by name: selection modes and the
/// point-type bits, generated from the parameter crate so both sides agree.
pub fn simulate_prelude() -> String {
    let mut prelude = String::from("// generated constants\n");
    for mode in SelectionMode::ALL {
        prelude.push_str(&format!(
            "const MODE_{}: u32 = {}u;\n",
            mode.label(),
            mode.code()
        ));
    }
    for point in PointType::ALL {
        prelude.push_str(&format!(
            "const {}: u32 = {}u;\n",
            point.shader_constant(),
            point.bit()
        ));
    }
    prelude
}

/// Source text as handed to the compiler for `stage`.
pub fn prepare_source(stage: StageKind, source: &str) -> Cow<'_, str> {
    match stage {
        StageKind::Simulate => Cow::Owned(format!("{}\n{source}", simulate_prelude())),
        StageKind::Normalize | StageKind::Present => Cow::Borrowed(source),
    }
}

/// Parses and validates prepared WGSL, then checks the stage's entry points.
pub fn validate_wgsl(stage: StageKind, source: &str) -> Result<naga::Module, CompileError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| CompileError::Parse {
        stage,
        message: err.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| CompileError::Validation {
            stage,
            message: error_chain(&err),
        })?;

    for (name, shader_stage) in required_entry_points(stage) {
        let present = module
            .entry_points
            .iter()
            .any(|entry| entry.name == *name && entry.stage == *shader_stage);
        if !present {
            return Err(CompileError::Validation {
                stage,
                message: format!("missing {shader_stage:?} entry point `{name}`"),
            });
        }
    }

    Ok(module)
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

fn required_entry_points(stage: StageKind) -> &'static [(&'static str, ShaderStage)] {
    match stage {
        StageKind::Simulate | StageKind::Normalize => &[(COMPUTE_ENTRY, ShaderStage::Compute)],
        StageKind::Present => &[
            (VERTEX_ENTRY, ShaderStage::Vertex),
            (FRAGMENT_ENTRY, ShaderStage::Fragment),
        ],
    }
}
