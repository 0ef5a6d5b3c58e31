//! Window events folded into one snapshot per frame.

use std::time::Instant;

use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{Key, NamedKey};

/// Pixels treated as one scroll line for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

/// Everything the frame driver needs from the platform for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub now: Instant,
    /// The settings UI owns the pointer; pan and zoom are suppressed.
    pub ui_captured: bool,
    pub exit: bool,
    pub toggle_ui: bool,
    pub reset_offset: bool,
    /// Scroll-wheel lines, positive away from the user.
    pub scroll_lines: f32,
    /// Left-button drag in window pixels since the previous frame.
    pub drag: [f32; 2],
}

impl FrameInput {
    /// A frame with no user activity.
    pub fn idle(now: Instant) -> Self {
        Self {
            now,
            ui_captured: false,
            exit: false,
            toggle_ui: false,
            reset_offset: false,
            scroll_lines: 0.0,
            drag: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    cursor: Option<PhysicalPosition<f64>>,
    dragging: bool,
    drag: [f32; 2],
    scroll_lines: f32,
    exit: bool,
    toggle_ui: bool,
    reset_offset: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: &Key, state: ElementState, repeat: bool) {
        if state != ElementState::Pressed || repeat {
            return;
        }
        match key {
            Key::Named(NamedKey::Escape) => self.exit = true,
            Key::Named(NamedKey::F1) => self.toggle_ui = !self.toggle_ui,
            Key::Named(NamedKey::Space) => self.reset_offset = true,
            Key::Character(value) if value.as_str() == " " => self.reset_offset = true,
            _ => {}
        }
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
        };
        if lines.is_finite() {
            self.scroll_lines += lines;
        }
    }

    pub fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        if self.dragging {
            if let Some(previous) = self.cursor {
                self.drag[0] += (position.x - previous.x) as f32;
                self.drag[1] += (position.y - previous.y) as f32;
            }
        }
        self.cursor = Some(position);
    }

    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.dragging = state == ElementState::Pressed;
        }
    }

    /// The pointer left the window; an unfinished drag ends here.
    pub fn handle_cursor_left(&mut self) {
        self.cursor = None;
        self.dragging = false;
    }

    pub fn request_exit(&mut self) {
        self.exit = true;
    }

    /// Drains the accumulated events into the next frame's snapshot.
    pub fn take_frame(&mut self, now: Instant, ui_captured: bool) -> FrameInput {
        let input = FrameInput {
            now,
            ui_captured,
            exit: self.exit,
            toggle_ui: self.toggle_ui,
            reset_offset: self.reset_offset,
            scroll_lines: std::mem::take(&mut self.scroll_lines),
            drag: std::mem::take(&mut self.drag),
        };
        self.toggle_ui = false;
        self.reset_offset = false;
        input
    }
}
