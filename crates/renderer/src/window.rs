//! Interactive window driven by winit.
//!
//! ```text
//!   winit events ──▶ InputState ──▶ FrameInput ─┐
//!                                               ▼
//!   RedrawRequested ──▶ GpuState::begin_frame ──▶ FrameDriver::run_frame
//!                                               │        (egui area)
//!                                               ▼
//!                         OverlayPainter ──▶ GpuState::submit_frame
//! ```

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::driver::{FrameDriver, FrameReport};
use crate::egui_ui::{EguiSettings, OverlayPainter};
use crate::gpu::{GpuProgram, GpuState};
use crate::input::InputState;
use crate::reload::{load_chain, FsClock};
use crate::types::RendererConfig;

const WINDOW_TITLE: &str = "Chaos Game";

/// Everything that exists once the window is open.
struct Session {
    window: Arc<Window>,
    gpu: GpuState,
    driver: FrameDriver<GpuProgram>,
    input: InputState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    overlay: OverlayPainter,
    /// Panel rects of the previous frame, in points.
    panel_rects: Vec<egui::Rect>,
}

impl Session {
    fn new(event_loop: &ActiveEventLoop, config: &RendererConfig) -> Result<Self> {
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(config.window_size.0, config.window_size.1))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );

        let mut gpu = GpuState::new(window.clone(), config.render_target_size())?;
        let stages = load_chain(&mut gpu, &FsClock, &config.shader_dir).with_context(|| {
            format!(
                "failed to load stage shaders from {}",
                config.shader_dir.display()
            )
        })?;

        let mut driver = FrameDriver::new(config, stages);
        let size = window.inner_size();
        driver.set_window_size((size.width, size.height));

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.max_texture_side()),
        );
        let overlay = OverlayPainter::new(gpu.device(), gpu.surface_format());

        tracing::info!(
            width = size.width,
            height = size.height,
            target_width = driver.target_size().0,
            target_height = driver.target_size().1,
            "window ready"
        );

        Ok(Self {
            window,
            gpu,
            driver,
            input: InputState::new(),
            egui_ctx,
            egui_state,
            overlay,
            panel_rects: Vec::new(),
        })
    }

    fn pointer_captured(&self) -> bool {
        if self.egui_ctx.is_using_pointer() || self.egui_ctx.wants_pointer_input() {
            return true;
        }
        self.egui_ctx
            .pointer_latest_pos()
            .is_some_and(|pos| self.panel_rects.iter().any(|rect| rect.contains(pos)))
    }

    /// Runs one frame. Returns `Ok(false)` once the user asked to exit.
    fn redraw(&mut self) -> Result<bool> {
        match self.gpu.begin_frame() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.gpu.resize(self.window.inner_size());
                return Ok(true);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("surface ran out of memory");
            }
            Err(err) => {
                tracing::warn!(error = %err, "skipping frame");
                return Ok(true);
            }
        }

        let input = self
            .input
            .take_frame(Instant::now(), self.pointer_captured());
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.egui_ctx.begin_pass(raw_input);

        let driver = &mut self.driver;
        let gpu = &mut self.gpu;
        let (report, panel_rects) = egui::Area::new(egui::Id::new("chaosgame settings"))
            .fixed_pos(egui::Pos2::ZERO)
            .show(&self.egui_ctx, |ui| {
                let mut settings = EguiSettings::new(ui);
                let report = driver.run_frame(&input, gpu, &mut settings);
                (report, settings.finish())
            })
            .inner;
        self.panel_rects = panel_rects;

        let mut output = self.egui_ctx.end_pass();
        let platform_output = std::mem::take(&mut output.platform_output);
        self.egui_state
            .handle_platform_output(&self.window, platform_output);

        let overlay = match self.gpu.frame_parts() {
            Some(parts) => self.overlay.paint(&self.egui_ctx, parts, output),
            None => Vec::new(),
        };
        self.gpu.submit_frame(overlay);

        log_report(&report);
        Ok(!report.exit_requested)
    }
}

fn log_report(report: &FrameReport) {
    if report.cleared {
        tracing::debug!(
            epoch = report.epoch,
            reloads = report.reloads,
            "parameters changed; accumulation restarted"
        );
    }
    if report.failed_reloads > 0 {
        tracing::debug!(failed = report.failed_reloads, "keeping previous programs");
    }
    tracing::trace!(iteration = report.iteration, "frame presented");
}

struct ChaosApp {
    config: RendererConfig,
    session: Option<Session>,
    error: Option<anyhow::Error>,
}

impl ChaosApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:?}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for ChaosApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        match Session::new(event_loop, &self.config) {
            Ok(session) => {
                session.window.request_redraw();
                self.session = Some(session);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if window_id != session.window.id() {
            return;
        }

        let _ = session.egui_state.on_window_event(&session.window, &event);

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                session
                    .input
                    .handle_key(&event.logical_key, event.state, event.repeat);
            }
            WindowEvent::MouseWheel { delta, .. } => session.input.handle_scroll(delta),
            WindowEvent::CursorMoved { position, .. } => session.input.handle_cursor(position),
            WindowEvent::CursorLeft { .. } => session.input.handle_cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                session.input.handle_button(button, state);
            }
            WindowEvent::Resized(size) => {
                session.gpu.resize(size);
                session.driver.set_window_size((size.width, size.height));
            }
            WindowEvent::RedrawRequested => match session.redraw() {
                Ok(true) => {}
                Ok(false) => event_loop.exit(),
                Err(err) => self.fail(event_loop, err),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
    }
}

/// Opens the window and renders until the user exits.
pub(crate) fn run(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ChaosApp {
        config,
        session: None,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .context("window event loop error")?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
