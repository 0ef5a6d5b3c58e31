//! Per-frame orchestration.
//!
//! Each frame runs, in order: key actions, pan and zoom, shader reload
//! checks, invariant enforcement, the settings UI, an optional clear, one
//! simulate and normalize pass, and finally present. Any step that changes
//! what the image depends on raises the frame's dirty flag; a dirty frame
//! clears the accumulation before simulating.

use std::time::{Duration, Instant};

use params::{ParamEdit, ParameterSet};

use crate::accumulation::{AccumulationState, StageBackend};
use crate::input::FrameInput;
use crate::reload::{check_chain, FsClock, ProgramCompiler, ReloadResult, SourceClock};
use crate::settings::{draw_overlay, draw_settings, SettingsState, SettingsUi};
use crate::stage::StageChain;
use crate::types::RendererConfig;

/// Weight of the newest frame in the smoothed FPS.
const FPS_SMOOTHING: f32 = 0.1;

/// Frame delta and smoothed frame rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameClock {
    last: Option<Instant>,
    delta: Duration,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame ending at `now` and returns the time since the last one.
    pub fn tick(&mut self, now: Instant) -> Duration {
        self.delta = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(now);

        let seconds = self.delta.as_secs_f32();
        if seconds > 0.0 {
            let instant_fps = seconds.recip();
            self.fps = if self.fps == 0.0 {
                instant_fps
            } else {
                self.fps + (instant_fps - self.fps) * FPS_SMOOTHING
            };
        }
        self.delta
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub dirty: bool,
    pub cleared: bool,
    /// Stages whose program was replaced this frame.
    pub reloads: usize,
    /// Stages whose changed source failed to build.
    pub failed_reloads: usize,
    /// Simulate passes accumulated in the current epoch, this frame's included.
    pub iteration: u32,
    pub epoch: u64,
    pub exit_requested: bool,
}

pub struct FrameDriver<P> {
    params: ParameterSet,
    accumulation: AccumulationState,
    stages: StageChain<P>,
    source_clock: Box<dyn SourceClock>,
    settings: SettingsState,
    show_ui: bool,
    frame_clock: FrameClock,
    window_size: (u32, u32),
    target_size: (u32, u32),
}

impl<P> FrameDriver<P> {
    pub fn new(config: &RendererConfig, stages: StageChain<P>) -> Self {
        let mut params = config.params;
        params.enforce_invariants();
        Self {
            params,
            accumulation: AccumulationState::new(),
            stages,
            source_clock: Box::new(FsClock),
            settings: SettingsState::default(),
            show_ui: config.show_ui,
            frame_clock: FrameClock::new(),
            window_size: config.window_size,
            target_size: config.render_target_size(),
        }
    }

    /// Replaces the filesystem timestamp source.
    pub fn with_source_clock(mut self, clock: impl SourceClock + 'static) -> Self {
        self.source_clock = Box::new(clock);
        self
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn accumulation(&self) -> AccumulationState {
        self.accumulation
    }

    pub fn stages(&self) -> &StageChain<P> {
        &self.stages
    }

    pub fn show_ui(&self) -> bool {
        self.show_ui
    }

    pub fn frame_clock(&self) -> &FrameClock {
        &self.frame_clock
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    /// Window size the settings panels are laid out against.
    pub fn set_window_size(&mut self, size: (u32, u32)) {
        self.window_size = size;
    }

    pub fn run_frame<B, U>(&mut self, input: &FrameInput, backend: &mut B, ui: &mut U) -> FrameReport
    where
        B: StageBackend<Program = P> + ProgramCompiler<Program = P>,
        U: SettingsUi + ?Sized,
    {
        let mut dirty = false;

        if input.toggle_ui {
            self.show_ui = !self.show_ui;
            tracing::debug!(visible = self.show_ui, "settings ui toggled");
        }
        if input.reset_offset {
            dirty |= self.params.apply_edit(ParamEdit::ResetOffset);
        }

        if !input.ui_captured {
            if input.scroll_lines != 0.0 {
                dirty |= self.params.apply_edit(ParamEdit::Zoom(input.scroll_lines));
            }
            if input.drag != [0.0, 0.0] {
                dirty |= self.params.apply_edit(ParamEdit::Pan {
                    dx: input.drag[0],
                    dy: input.drag[1],
                });
            }
        }

        let outcomes = check_chain(&mut self.stages, backend, self.source_clock.as_ref());
        let count = |wanted: ReloadResult| outcomes.iter().filter(|(_, result)| *result == wanted).count();
        let reloads = count(ReloadResult::Reloaded);
        let failed_reloads = count(ReloadResult::FailedKeptOld);
        dirty |= reloads > 0;

        dirty |= self.params.enforce_invariants();

        if self.show_ui {
            let window = [self.window_size.0 as f32, self.window_size.1 as f32];
            draw_overlay(ui, self.frame_clock.fps(), self.accumulation.iteration(), window);
            dirty |= draw_settings(ui, &mut self.params, &mut self.settings, window);
        }

        if dirty {
            self.accumulation.clear(backend);
        }
        self.accumulation.advance(
            backend,
            self.stages.simulate.program(),
            &self.params,
            self.target_size,
        );
        self.accumulation
            .derive_presentable(backend, self.stages.normalize.program());
        backend.draw_present(self.stages.present.program());

        self.frame_clock.tick(input.now);

        FrameReport {
            dirty,
            cleared: dirty,
            reloads,
            failed_reloads,
            iteration: self.accumulation.iteration(),
            epoch: self.accumulation.epoch(),
            exit_requested: input.exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use params::{PointType, SelectionMode};

    use super::*;
    use crate::reference::{BackendOp, ReferenceBackend, ReferenceProgram};
    use crate::settings::tests::ScriptedUi;
    use crate::stage::{PipelineProgram, StageKind};

    const MINIMAL_COMPUTE: &str = "@compute @workgroup_size(1) fn main() {}";

    struct StillClock;

    impl SourceClock for StillClock {
        fn modified(&self, _path: &std::path::Path) -> Option<std::time::SystemTime> {
            None
        }
    }

    fn driver(backend: &mut ReferenceBackend) -> FrameDriver<ReferenceProgram> {
        let mut program = |stage: StageKind| {
            let source = match stage {
                StageKind::Present => {
                    "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }\n\
                     @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }"
                }
                _ => MINIMAL_COMPUTE,
            };
            let compiled = ProgramCompiler::compile(&mut *backend, stage, source).expect("compiles");
            PipelineProgram::new(stage, compiled, PathBuf::from(stage.file_name()), None)
        };
        let stages = StageChain {
            simulate: program(StageKind::Simulate),
            normalize: program(StageKind::Normalize),
            present: program(StageKind::Present),
        };
        let config = RendererConfig {
            window_size: (64, 64),
            show_ui: false,
            ..RendererConfig::default()
        };
        FrameDriver::new(&config, stages).with_source_clock(StillClock)
    }

    fn idle() -> FrameInput {
        FrameInput::idle(Instant::now())
    }

    #[test]
    fn quiet_frames_accumulate_without_clearing() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let mut ui = ScriptedUi::default();

        for expected in 1..=3 {
            let report = driver.run_frame(&idle(), &mut backend, &mut ui);
            assert!(!report.dirty);
            assert_eq!(report.iteration, expected);
        }
        assert!(!backend.log().contains(&BackendOp::Clear));
    }

    #[test]
    fn frame_issues_stages_in_order() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let input = FrameInput {
            scroll_lines: 1.0,
            ..idle()
        };
        driver.run_frame(&input, &mut backend, &mut ScriptedUi::default());

        let ops: Vec<_> = backend
            .take_log()
            .into_iter()
            .map(|op| match op {
                BackendOp::Clear => "clear",
                BackendOp::Upload { .. } => "upload",
                BackendOp::Simulate { .. } => "simulate",
                BackendOp::Normalize { .. } => "normalize",
                BackendOp::Present { .. } => "present",
            })
            .collect();
        assert_eq!(ops, ["clear", "upload", "simulate", "normalize", "present"]);
    }

    #[test]
    fn scroll_zooms_and_restarts_accumulation() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let mut ui = ScriptedUi::default();
        driver.run_frame(&idle(), &mut backend, &mut ui);
        driver.run_frame(&idle(), &mut backend, &mut ui);
        let radius = driver.params().polygon_radius();

        let input = FrameInput {
            scroll_lines: 2.0,
            ..idle()
        };
        let report = driver.run_frame(&input, &mut backend, &mut ui);
        assert!(report.cleared);
        assert_eq!(report.iteration, 1);
        assert_eq!(report.epoch, 1);
        assert_eq!(driver.params().polygon_radius(), radius + 20.0);
    }

    #[test]
    fn captured_pointer_suppresses_pan_and_zoom() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let before = *driver.params();
        let input = FrameInput {
            ui_captured: true,
            scroll_lines: 3.0,
            drag: [12.0, -4.0],
            ..idle()
        };
        let report = driver.run_frame(&input, &mut backend, &mut ScriptedUi::default());
        assert!(!report.dirty);
        assert_eq!(*driver.params(), before);
    }

    #[test]
    fn reset_offset_is_dirty_only_when_offset_moved() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let mut ui = ScriptedUi::default();
        let reset = FrameInput {
            reset_offset: true,
            ..idle()
        };
        assert!(!driver.run_frame(&reset, &mut backend, &mut ui).dirty);

        let drag = FrameInput {
            drag: [30.0, 0.0],
            ..idle()
        };
        assert!(driver.run_frame(&drag, &mut backend, &mut ui).dirty);
        assert!(driver.run_frame(&reset, &mut backend, &mut ui).dirty);
        assert_eq!(driver.params().offset(), [0.0, 0.0]);
    }

    #[test]
    fn ui_edits_only_apply_while_visible() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let mut ui = ScriptedUi::default();
        ui.u32_edits.insert("vertex count".into(), 3);

        assert!(!driver.run_frame(&idle(), &mut backend, &mut ui).dirty);
        assert_eq!(driver.params().vertex_count(), 7);

        let toggle = FrameInput {
            toggle_ui: true,
            ..idle()
        };
        let report = driver.run_frame(&toggle, &mut backend, &mut ui);
        assert!(driver.show_ui());
        assert!(report.dirty);
        assert_eq!(driver.params().vertex_count(), 3);
        assert!(ui.texts.iter().any(|text| text.starts_with("ITERATION")));
    }

    #[test]
    fn random_mode_toggles_accumulate_through_the_ui() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let mut ui = ScriptedUi::default();
        ui.mode_edit = Some(SelectionMode::Random.index());
        let show = FrameInput {
            toggle_ui: true,
            ..idle()
        };
        driver.run_frame(&show, &mut backend, &mut ui);

        ui.toggle_edits.insert("POINT TYPES/vertex0".into(), false);
        ui.toggle_edits.insert("POINT TYPES/brocard1".into(), true);
        ui.toggle_edits.insert("POINT TYPES/napoleon2".into(), true);
        assert!(driver.run_frame(&idle(), &mut backend, &mut ui).dirty);

        let slot = driver.params().slot(0);
        assert!(slot.contains(PointType::Brocard1));
        assert!(slot.contains(PointType::Napoleon2));
        assert!(!slot.contains(PointType::Vertex0));
    }

    #[test]
    fn exit_still_completes_the_frame() {
        let mut backend = ReferenceBackend::new(32, 32);
        let mut driver = driver(&mut backend);
        let input = FrameInput {
            exit: true,
            ..idle()
        };
        let report = driver.run_frame(&input, &mut backend, &mut ScriptedUi::default());
        assert!(report.exit_requested);
        assert_eq!(report.iteration, 1);
        assert!(backend.log().iter().any(|op| matches!(op, BackendOp::Present { .. })));
    }

    #[test]
    fn frame_clock_smooths_towards_frame_rate() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(start), Duration::ZERO);
        assert_eq!(clock.fps(), 0.0);

        let mut now = start;
        for _ in 0..200 {
            now += Duration::from_millis(10);
            clock.tick(now);
        }
        assert_eq!(clock.delta(), Duration::from_millis(10));
        assert!((clock.fps() - 100.0).abs() < 1.0, "fps {}", clock.fps());
    }
}
