//! Chaos-game parameter set: ranges, edit rules and the GPU record.
//!
//! Every mutation goes through [`ParameterSet::apply_edit`], which clamps the
//! incoming value, re-derives dependent fields and reports whether anything
//! observable changed. Nothing here can fail; out-of-range input is clamped.

mod points;
mod preset;
mod uniform;

use serde::{Deserialize, Serialize};

pub use points::{PointSet, PointType, BEZIER_POINT_TYPES, SINGLE_POINT_TYPES};
pub use preset::{Preset, PresetError};
pub use uniform::ConfigUniform;

pub const SLOT_COUNT: usize = 4;

pub const MIN_STEP: f32 = 0.0;
pub const MAX_STEP: f32 = 1.0;
pub const MIN_VERTEX_COUNT: u32 = 2;
pub const MAX_VERTEX_COUNT: u32 = 10;
pub const MIN_POLYGON_RADIUS: f32 = 1.0;
pub const MAX_POLYGON_RADIUS: f32 = 100_000.0;
pub const MIN_SELECT_PERIOD: u32 = 1;
pub const MAX_SELECT_PERIOD: u32 = 20;
pub const MIN_STEP_COUNT: u32 = 1;
pub const MAX_STEP_COUNT: u32 = 20;
pub const MIN_T_BEZIER: f32 = 0.0;
pub const MAX_T_BEZIER: f32 = 1.0;
pub const MIN_NORMALIZE_EXPONENT: f32 = 0.0;
pub const MAX_NORMALIZE_EXPONENT: f32 = 10.0;

/// Radius change per scroll-wheel line.
pub const ZOOM_STEP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Constant,
    Random,
    BezierQuadratic,
    BezierCubic,
}

impl SelectionMode {
    pub const ALL: [SelectionMode; 4] = [
        SelectionMode::Constant,
        SelectionMode::Random,
        SelectionMode::BezierQuadratic,
        SelectionMode::BezierCubic,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SelectionMode::Constant => "CONSTANT",
            SelectionMode::Random => "RANDOM",
            SelectionMode::BezierQuadratic => "BEZIER_QUADRATIC",
            SelectionMode::BezierCubic => "BEZIER_CUBIC",
        }
    }

    /// Value of `selection_type` in the GPU record.
    pub const fn code(self) -> u32 {
        match self {
            SelectionMode::Constant => 0,
            SelectionMode::Random => 1,
            SelectionMode::BezierQuadratic => 2,
            SelectionMode::BezierCubic => 3,
        }
    }

    pub fn index(self) -> usize {
        self.code() as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Number of point slots the mode reads.
    pub const fn slot_count(self) -> usize {
        match self {
            SelectionMode::Constant | SelectionMode::Random => 1,
            SelectionMode::BezierQuadratic => 3,
            SelectionMode::BezierCubic => 4,
        }
    }

    pub const fn is_bezier(self) -> bool {
        matches!(
            self,
            SelectionMode::BezierQuadratic | SelectionMode::BezierCubic
        )
    }

    /// Point types a slot may hold in this mode.
    pub fn offered_points(self) -> &'static [PointType] {
        if self.is_bezier() {
            &BEZIER_POINT_TYPES
        } else {
            &SINGLE_POINT_TYPES
        }
    }
}

/// One user-visible mutation of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEdit {
    Step(f32),
    VertexCount(u32),
    PolygonRadius(f32),
    VertexSelectPeriod(u32),
    VertexUsageMemory(u32),
    VertexUsageMemoryOffset(u32),
    NormalizeExponent(f32),
    SelectionMode(SelectionMode),
    /// Select or deselect `point` in `slot`, following the mode's rules.
    TogglePoint {
        slot: usize,
        point: PointType,
        on: bool,
    },
    /// Replace a slot wholesale; the result is normalised for the mode.
    SetSlot {
        slot: usize,
        points: PointSet,
    },
    MinTBezier(f32),
    StepCount(u32),
    Offset([f32; 2]),
    /// Mouse drag in window pixels.
    Pan {
        dx: f32,
        dy: f32,
    },
    /// Scroll-wheel lines.
    Zoom(f32),
    ResetOffset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    step: f32,
    vertex_count: u32,
    polygon_radius: f32,
    vertex_select_period: u32,
    vertex_usage_memory: u32,
    vertex_usage_memory_offset: u32,
    normalize_exponent: f32,
    offset: [f32; 2],
    selection_mode: SelectionMode,
    points: [PointSet; SLOT_COUNT],
    min_t_bezier: f32,
    step_count: u32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            step: 0.5,
            vertex_count: 7,
            polygon_radius: 300.0,
            vertex_select_period: 1,
            vertex_usage_memory: 0,
            vertex_usage_memory_offset: 0,
            normalize_exponent: 1.0,
            offset: [0.0, 0.0],
            selection_mode: SelectionMode::Constant,
            points: [PointSet::single(PointType::Vertex0); SLOT_COUNT],
            min_t_bezier: 0.1,
            step_count: 1,
        }
    }
}

impl ParameterSet {
    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn polygon_radius(&self) -> f32 {
        self.polygon_radius
    }

    pub fn vertex_select_period(&self) -> u32 {
        self.vertex_select_period
    }

    pub fn vertex_usage_memory(&self) -> u32 {
        self.vertex_usage_memory
    }

    pub fn vertex_usage_memory_offset(&self) -> u32 {
        self.vertex_usage_memory_offset
    }

    pub fn normalize_exponent(&self) -> f32 {
        self.normalize_exponent
    }

    pub fn offset(&self) -> [f32; 2] {
        self.offset
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn min_t_bezier(&self) -> f32 {
        self.min_t_bezier
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn slot(&self, slot: usize) -> PointSet {
        self.points.get(slot).copied().unwrap_or_default()
    }

    pub fn slots(&self) -> [PointSet; SLOT_COUNT] {
        self.points
    }

    /// Largest memory size or offset the current vertex count allows.
    pub fn max_usage_memory(&self) -> u32 {
        self.vertex_count - 1
    }

    /// Applies one edit and returns whether the observable configuration moved.
    pub fn apply_edit(&mut self, edit: ParamEdit) -> bool {
        let before = *self;
        match edit {
            ParamEdit::Step(value) => {
                self.step = clamp_f32(value, MIN_STEP, MAX_STEP, self.step);
            }
            ParamEdit::VertexCount(value) => {
                self.vertex_count = value.clamp(MIN_VERTEX_COUNT, MAX_VERTEX_COUNT);
            }
            ParamEdit::PolygonRadius(value) => {
                self.polygon_radius = clamp_f32(
                    value,
                    MIN_POLYGON_RADIUS,
                    MAX_POLYGON_RADIUS,
                    self.polygon_radius,
                );
            }
            ParamEdit::VertexSelectPeriod(value) => {
                self.vertex_select_period = value.clamp(MIN_SELECT_PERIOD, MAX_SELECT_PERIOD);
            }
            ParamEdit::VertexUsageMemory(value) => self.vertex_usage_memory = value,
            ParamEdit::VertexUsageMemoryOffset(value) => self.vertex_usage_memory_offset = value,
            ParamEdit::NormalizeExponent(value) => {
                self.normalize_exponent = clamp_f32(
                    value,
                    MIN_NORMALIZE_EXPONENT,
                    MAX_NORMALIZE_EXPONENT,
                    self.normalize_exponent,
                );
            }
            ParamEdit::SelectionMode(mode) => self.selection_mode = mode,
            ParamEdit::TogglePoint { slot, point, on } => self.toggle_point(slot, point, on),
            ParamEdit::SetSlot { slot, points } => {
                if let Some(target) = self.points.get_mut(slot) {
                    *target = points;
                }
            }
            ParamEdit::MinTBezier(value) => {
                self.min_t_bezier = clamp_f32(value, MIN_T_BEZIER, MAX_T_BEZIER, self.min_t_bezier);
            }
            ParamEdit::StepCount(value) => {
                self.step_count = value.clamp(MIN_STEP_COUNT, MAX_STEP_COUNT);
            }
            ParamEdit::Offset(offset) => {
                if offset.iter().all(|value| value.is_finite()) {
                    self.offset = offset;
                }
            }
            ParamEdit::Pan { dx, dy } => {
                if dx.is_finite() && dy.is_finite() {
                    let scale = 2.0 * self.polygon_radius;
                    self.offset[0] += dx / scale;
                    self.offset[1] += dy / scale;
                }
            }
            ParamEdit::Zoom(lines) => {
                if lines.is_finite() {
                    self.polygon_radius = (self.polygon_radius + lines * ZOOM_STEP)
                        .clamp(MIN_POLYGON_RADIUS, MAX_POLYGON_RADIUS);
                }
            }
            ParamEdit::ResetOffset => self.offset = [0.0, 0.0],
        }
        self.enforce_invariants();
        *self != before
    }

    /// Re-applies every range and dependency rule; true when a field moved.
    pub fn enforce_invariants(&mut self) -> bool {
        let before = *self;

        self.step = clamp_f32(self.step, MIN_STEP, MAX_STEP, 0.5);
        self.vertex_count = self.vertex_count.clamp(MIN_VERTEX_COUNT, MAX_VERTEX_COUNT);
        self.polygon_radius = clamp_f32(
            self.polygon_radius,
            MIN_POLYGON_RADIUS,
            MAX_POLYGON_RADIUS,
            300.0,
        );
        self.vertex_select_period = self
            .vertex_select_period
            .clamp(MIN_SELECT_PERIOD, MAX_SELECT_PERIOD);
        self.normalize_exponent = clamp_f32(
            self.normalize_exponent,
            MIN_NORMALIZE_EXPONENT,
            MAX_NORMALIZE_EXPONENT,
            1.0,
        );
        self.min_t_bezier = clamp_f32(self.min_t_bezier, MIN_T_BEZIER, MAX_T_BEZIER, 0.1);
        self.step_count = self.step_count.clamp(MIN_STEP_COUNT, MAX_STEP_COUNT);
        if !self.offset.iter().all(|value| value.is_finite()) {
            self.offset = [0.0, 0.0];
        }

        let max_memory = self.max_usage_memory();
        self.vertex_usage_memory = self.vertex_usage_memory.min(max_memory);
        self.vertex_usage_memory_offset = self.vertex_usage_memory_offset.min(max_memory);

        self.normalize_slots();

        let moved = *self != before;
        if moved {
            tracing::trace!("parameter invariants clamped a field");
        }
        moved
    }

    /// Flattens the set into the record the compute stages read.
    pub fn to_uniform(&self, screen: (u32, u32), iteration: u32) -> ConfigUniform {
        ConfigUniform {
            screen_width: screen.0,
            screen_height: screen.1,
            step: self.step,
            iteration,
            vertex_count: self.vertex_count,
            polygon_radius: self.polygon_radius,
            vertex_select_period: self.vertex_select_period,
            vertex_usage_memory: self.vertex_usage_memory,
            vertex_usage_memory_offset: self.vertex_usage_memory_offset,
            normalize_exponent: self.normalize_exponent,
            offset: self.offset,
            points: self.points.map(PointSet::bits),
            selection_type: self.selection_mode.code(),
            min_t_bezier: self.min_t_bezier,
            step_count: self.step_count,
            _padding: 0,
        }
    }

    fn toggle_point(&mut self, slot: usize, point: PointType, on: bool) {
        let mode = self.selection_mode;
        if slot >= mode.slot_count() || !mode.offered_points().contains(&point) {
            return;
        }
        let target = &mut self.points[slot];
        match (mode, on) {
            (SelectionMode::Random, true) => target.insert(point),
            (SelectionMode::Random, false) => target.remove(point),
            // single-selection slots only move when another point is picked
            (_, true) => *target = PointSet::single(point),
            (_, false) => {}
        }
    }

    fn normalize_slots(&mut self) {
        let mode = self.selection_mode;
        let offered = mode.offered_points();
        for slot in &mut self.points[..mode.slot_count()] {
            if mode == SelectionMode::Random {
                *slot = slot.restricted_to(offered);
                continue;
            }
            let restricted = slot.restricted_to(offered);
            if restricted.len() == 1 && restricted == *slot {
                continue;
            }
            let keep = restricted.first_in(offered).unwrap_or(PointType::Vertex0);
            *slot = PointSet::single(keep);
        }
    }
}

fn clamp_f32(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback.clamp(min, max)
    } else {
        value.clamp(min, max)
    }
}
