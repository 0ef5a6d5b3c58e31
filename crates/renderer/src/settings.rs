//! Settings panels and the frame overlay, drawn through [`SettingsUi`].
//!
//! Widgets bind to copies of the parameter values. A widget that reports a
//! change is turned into a [`ParamEdit`], so clamping and slot rules stay in
//! one place and the dirty flag only rises when the set actually moved.

use params::{
    ParamEdit, ParameterSet, PointType, SelectionMode, MAX_NORMALIZE_EXPONENT,
    MAX_POLYGON_RADIUS, MAX_SELECT_PERIOD, MAX_STEP, MAX_STEP_COUNT, MAX_T_BEZIER,
    MAX_VERTEX_COUNT, MIN_NORMALIZE_EXPONENT, MIN_POLYGON_RADIUS, MIN_SELECT_PERIOD, MIN_STEP,
    MIN_STEP_COUNT, MIN_T_BEZIER, MIN_VERTEX_COUNT,
};

/// Distance of panels and overlay text from the window edge, in pixels.
pub const MARGIN: f32 = 10.0;
/// Width of every point-selection panel, in pixels.
pub const POINT_PANEL_WIDTH: f32 = 225.0;
/// Vertical distance between overlay text rows, in pixels.
pub const TEXT_ROW_HEIGHT: f32 = 20.0;

/// Immediate-mode panel toolkit. Positions are window pixels from the top
/// left; every widget returns whether it altered the bound value.
pub trait SettingsUi {
    fn start_panel(&mut self, title: &str, position: [f32; 2], width: Option<f32>);
    fn add_slider_u32(&mut self, label: &str, value: &mut u32, min: u32, max: u32) -> bool;
    fn add_slider_f32(&mut self, label: &str, value: &mut f32, min: f32, max: f32) -> bool;
    fn add_toggle(&mut self, label: &str, value: &mut bool) -> bool;
    fn add_combobox(
        &mut self,
        label: &str,
        options: &[&str],
        selected: &mut usize,
        expanded: &mut bool,
    ) -> bool;
    fn end_panel(&mut self);
    /// Draws a line of text whose bottom-left corner sits at `position`.
    fn add_text(&mut self, position: [f32; 2], text: &str);
}

/// Widget state that outlives a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettingsState {
    pub mode_expanded: bool,
}

/// FPS and iteration counters in the bottom-left corner.
pub fn draw_overlay<U: SettingsUi + ?Sized>(ui: &mut U, fps: f32, iteration: u32, window: [f32; 2]) {
    let bottom = window[1] - MARGIN;
    ui.add_text([MARGIN, bottom], &format!("FPS {}", fps.round() as u32));
    ui.add_text(
        [MARGIN, bottom - TEXT_ROW_HEIGHT],
        &format!("ITERATION {iteration}"),
    );
}

/// Draws every settings panel and returns whether any edit changed `params`.
pub fn draw_settings<U: SettingsUi + ?Sized>(
    ui: &mut U,
    params: &mut ParameterSet,
    state: &mut SettingsState,
    window: [f32; 2],
) -> bool {
    let mut dirty = false;

    ui.start_panel("SETTINGS", [MARGIN, MARGIN], None);
    dirty |= slider_f32(ui, params, "step size", ParameterSet::step, (MIN_STEP, MAX_STEP), ParamEdit::Step);
    dirty |= slider_u32(
        ui,
        params,
        "vertex count",
        ParameterSet::vertex_count,
        (MIN_VERTEX_COUNT, MAX_VERTEX_COUNT),
        ParamEdit::VertexCount,
    );
    dirty |= slider_f32(
        ui,
        params,
        "polygon radius",
        ParameterSet::polygon_radius,
        (MIN_POLYGON_RADIUS, MAX_POLYGON_RADIUS),
        ParamEdit::PolygonRadius,
    );
    dirty |= slider_u32(
        ui,
        params,
        "vertex select period",
        ParameterSet::vertex_select_period,
        (MIN_SELECT_PERIOD, MAX_SELECT_PERIOD),
        ParamEdit::VertexSelectPeriod,
    );
    // read after the vertex count slider so the bound follows this frame's edit
    let max_memory = params.max_usage_memory();
    dirty |= slider_u32(
        ui,
        params,
        "vertex usage memory",
        ParameterSet::vertex_usage_memory,
        (0, max_memory),
        ParamEdit::VertexUsageMemory,
    );
    dirty |= slider_u32(
        ui,
        params,
        "vertex usage memory offset",
        ParameterSet::vertex_usage_memory_offset,
        (0, max_memory),
        ParamEdit::VertexUsageMemoryOffset,
    );
    dirty |= slider_u32(
        ui,
        params,
        "step count",
        ParameterSet::step_count,
        (MIN_STEP_COUNT, MAX_STEP_COUNT),
        ParamEdit::StepCount,
    );
    dirty |= slider_f32(
        ui,
        params,
        "min t bezier",
        ParameterSet::min_t_bezier,
        (MIN_T_BEZIER, MAX_T_BEZIER),
        ParamEdit::MinTBezier,
    );
    dirty |= slider_f32(
        ui,
        params,
        "normalize exp",
        ParameterSet::normalize_exponent,
        (MIN_NORMALIZE_EXPONENT, MAX_NORMALIZE_EXPONENT),
        ParamEdit::NormalizeExponent,
    );

    let labels = SelectionMode::ALL.map(SelectionMode::label);
    let mut selected = params.selection_mode().index();
    if ui.add_combobox("selection type", &labels, &mut selected, &mut state.mode_expanded) {
        if let Some(mode) = SelectionMode::from_index(selected) {
            dirty |= params.apply_edit(ParamEdit::SelectionMode(mode));
        }
    }
    ui.end_panel();

    let mode = params.selection_mode();
    let right = window[0] - MARGIN - POINT_PANEL_WIDTH;
    if mode.is_bezier() {
        // last control point rightmost
        for slot in (0..mode.slot_count()).rev() {
            let column = (mode.slot_count() - 1 - slot) as f32;
            let x = right - column * (POINT_PANEL_WIDTH + MARGIN);
            ui.start_panel(&format!("POINT {slot}"), [x, MARGIN], Some(POINT_PANEL_WIDTH));
            dirty |= point_toggles(ui, params, slot);
            ui.end_panel();
        }
    } else {
        ui.start_panel("POINT TYPES", [right, MARGIN], Some(POINT_PANEL_WIDTH));
        dirty |= point_toggles(ui, params, 0);
        ui.end_panel();
    }

    dirty
}

fn point_toggles<U: SettingsUi + ?Sized>(ui: &mut U, params: &mut ParameterSet, slot: usize) -> bool {
    let mut dirty = false;
    let offered: &[PointType] = params.selection_mode().offered_points();
    for &point in offered {
        let mut on = params.slot(slot).contains(point);
        if ui.add_toggle(point.name(), &mut on) {
            dirty |= params.apply_edit(ParamEdit::TogglePoint { slot, point, on });
        }
    }
    dirty
}

fn slider_u32<U: SettingsUi + ?Sized>(
    ui: &mut U,
    params: &mut ParameterSet,
    label: &str,
    get: fn(&ParameterSet) -> u32,
    (min, max): (u32, u32),
    edit: fn(u32) -> ParamEdit,
) -> bool {
    let mut value = get(params);
    ui.add_slider_u32(label, &mut value, min, max) && params.apply_edit(edit(value))
}

fn slider_f32<U: SettingsUi + ?Sized>(
    ui: &mut U,
    params: &mut ParameterSet,
    label: &str,
    get: fn(&ParameterSet) -> f32,
    (min, max): (f32, f32),
    edit: fn(f32) -> ParamEdit,
) -> bool {
    let mut value = get(params);
    ui.add_slider_f32(label, &mut value, min, max) && params.apply_edit(edit(value))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Replays scripted widget edits and records what was drawn.
    #[derive(Default)]
    pub(crate) struct ScriptedUi {
        pub u32_edits: HashMap<String, u32>,
        pub f32_edits: HashMap<String, f32>,
        /// Keyed by `"<panel>/<label>"`.
        pub toggle_edits: HashMap<String, bool>,
        pub mode_edit: Option<usize>,
        pub panels: Vec<(String, [f32; 2])>,
        pub texts: Vec<String>,
        pub slider_bounds: HashMap<String, (u32, u32)>,
        current: String,
    }

    impl SettingsUi for ScriptedUi {
        fn start_panel(&mut self, title: &str, position: [f32; 2], _width: Option<f32>) {
            self.current = title.to_owned();
            self.panels.push((title.to_owned(), position));
        }

        fn add_slider_u32(&mut self, label: &str, value: &mut u32, min: u32, max: u32) -> bool {
            self.slider_bounds.insert(label.to_owned(), (min, max));
            match self.u32_edits.remove(label) {
                Some(next) if next != *value => {
                    *value = next;
                    true
                }
                _ => false,
            }
        }

        fn add_slider_f32(&mut self, label: &str, value: &mut f32, _min: f32, _max: f32) -> bool {
            match self.f32_edits.remove(label) {
                Some(next) if next != *value => {
                    *value = next;
                    true
                }
                _ => false,
            }
        }

        fn add_toggle(&mut self, label: &str, value: &mut bool) -> bool {
            let key = format!("{}/{label}", self.current);
            match self.toggle_edits.remove(&key) {
                Some(next) if next != *value => {
                    *value = next;
                    true
                }
                _ => false,
            }
        }

        fn add_combobox(
            &mut self,
            _label: &str,
            _options: &[&str],
            selected: &mut usize,
            _expanded: &mut bool,
        ) -> bool {
            match self.mode_edit.take() {
                Some(next) if next != *selected => {
                    *selected = next;
                    true
                }
                _ => false,
            }
        }

        fn end_panel(&mut self) {
            self.current.clear();
        }

        fn add_text(&mut self, _position: [f32; 2], text: &str) {
            self.texts.push(text.to_owned());
        }
    }

    const WINDOW: [f32; 2] = [2560.0, 1440.0];

    #[test]
    fn untouched_panels_are_clean() {
        let mut ui = ScriptedUi::default();
        let mut params = ParameterSet::default();
        let dirty = draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW);
        assert!(!dirty);
        assert_eq!(params, ParameterSet::default());
        let titles: Vec<_> = ui.panels.iter().map(|(title, _)| title.as_str()).collect();
        assert_eq!(titles, ["SETTINGS", "POINT TYPES"]);
    }

    #[test]
    fn shrinking_vertex_count_clamps_memory_and_slider_bound() {
        let mut params = ParameterSet::default();
        params.apply_edit(ParamEdit::VertexCount(7));
        params.apply_edit(ParamEdit::VertexUsageMemory(5));

        let mut ui = ScriptedUi::default();
        ui.u32_edits.insert("vertex count".into(), 3);
        let dirty = draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW);

        assert!(dirty);
        assert_eq!(params.vertex_count(), 3);
        assert_eq!(params.vertex_usage_memory(), 2);
        assert_eq!(ui.slider_bounds["vertex usage memory"], (0, 2));
    }

    #[test]
    fn constant_toggle_replaces_selected_point() {
        let mut params = ParameterSet::default();
        let mut ui = ScriptedUi::default();
        ui.toggle_edits.insert("POINT TYPES/incenter".into(), true);

        assert!(draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW));
        assert!(params.slot(0).contains(PointType::Incenter));
        assert!(!params.slot(0).contains(PointType::Vertex0));
    }

    #[test]
    fn constant_deselect_of_only_point_is_not_a_change() {
        let mut params = ParameterSet::default();
        let mut ui = ScriptedUi::default();
        ui.toggle_edits.insert("POINT TYPES/vertex0".into(), false);

        assert!(!draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW));
        assert!(params.slot(0).contains(PointType::Vertex0));
    }

    #[test]
    fn bezier_panels_run_right_to_left() {
        let mut params = ParameterSet::default();
        params.apply_edit(ParamEdit::SelectionMode(SelectionMode::BezierCubic));
        let mut ui = ScriptedUi::default();
        draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW);

        let points: Vec<_> = ui.panels.iter().skip(1).collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].0, "POINT 3");
        assert_eq!(points[3].0, "POINT 0");
        assert!(points[0].1[0] > points[3].1[0]);
        assert_eq!(points[0].1[0], WINDOW[0] - MARGIN - POINT_PANEL_WIDTH);
    }

    #[test]
    fn mode_combobox_switches_mode() {
        let mut params = ParameterSet::default();
        let mut ui = ScriptedUi::default();
        ui.mode_edit = Some(SelectionMode::BezierQuadratic.index());

        assert!(draw_settings(&mut ui, &mut params, &mut SettingsState::default(), WINDOW));
        assert_eq!(params.selection_mode(), SelectionMode::BezierQuadratic);
        assert!(ui.panels.iter().any(|(title, _)| title == "POINT 2"));
    }

    #[test]
    fn overlay_reports_fps_and_iteration() {
        let mut ui = ScriptedUi::default();
        draw_overlay(&mut ui, 59.6, 42, WINDOW);
        assert_eq!(ui.texts, ["FPS 60", "ITERATION 42"]);
    }
}
