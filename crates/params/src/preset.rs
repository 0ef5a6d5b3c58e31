//! TOML presets: optional overrides applied over the defaults at startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ParamEdit, ParameterSet, PointSet, PointType, SelectionMode, SLOT_COUNT};

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to read preset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preset: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid preset: {0}")]
    Invalid(String),
}

/// Every field is optional; missing fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    pub step: Option<f32>,
    pub vertex_count: Option<u32>,
    pub polygon_radius: Option<f32>,
    pub vertex_select_period: Option<u32>,
    pub vertex_usage_memory: Option<u32>,
    pub vertex_usage_memory_offset: Option<u32>,
    pub normalize_exponent: Option<f32>,
    pub offset: Option<[f32; 2]>,
    pub selection_mode: Option<SelectionMode>,
    /// One list of point names per slot, slot 0 first.
    pub points: Option<Vec<Vec<PointType>>>,
    pub min_t_bezier: Option<f32>,
    pub step_count: Option<u32>,
}

impl Preset {
    pub fn from_toml_str(input: &str) -> Result<Self, PresetError> {
        let preset: Preset = toml::from_str(input)?;
        preset.validate()?;
        Ok(preset)
    }

    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let contents = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> Result<(), PresetError> {
        if let Some(slots) = &self.points {
            if slots.len() > SLOT_COUNT {
                return Err(PresetError::Invalid(format!(
                    "points lists {} slots but only {SLOT_COUNT} exist",
                    slots.len()
                )));
            }
        }
        Ok(())
    }

    /// Applies the overrides through the clamping edit path; true if anything moved.
    pub fn apply_to(&self, params: &mut ParameterSet) -> bool {
        // vertex count and mode first so the dependent clamps see final values
        let mut edits = Vec::new();
        edits.extend(self.vertex_count.map(ParamEdit::VertexCount));
        edits.extend(self.selection_mode.map(ParamEdit::SelectionMode));
        edits.extend(self.step.map(ParamEdit::Step));
        edits.extend(self.polygon_radius.map(ParamEdit::PolygonRadius));
        edits.extend(self.vertex_select_period.map(ParamEdit::VertexSelectPeriod));
        edits.extend(self.vertex_usage_memory.map(ParamEdit::VertexUsageMemory));
        edits.extend(
            self.vertex_usage_memory_offset
                .map(ParamEdit::VertexUsageMemoryOffset),
        );
        edits.extend(self.normalize_exponent.map(ParamEdit::NormalizeExponent));
        edits.extend(self.offset.map(ParamEdit::Offset));
        edits.extend(self.min_t_bezier.map(ParamEdit::MinTBezier));
        edits.extend(self.step_count.map(ParamEdit::StepCount));
        for (slot, names) in self.points.iter().flatten().enumerate() {
            edits.push(ParamEdit::SetSlot {
                slot,
                points: names.iter().copied().collect::<PointSet>(),
            });
        }

        let mut changed = false;
        for edit in edits {
            changed |= params.apply_edit(edit);
        }
        if changed {
            tracing::debug!(?params, "preset applied");
        }
        changed
    }
}
