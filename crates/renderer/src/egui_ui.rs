//! egui implementation of the settings toolkit and its wgpu painter.

use egui::layers::ShapeIdx;
use egui::{Align2, Color32, FontId, Rect, RichText, UiBuilder};

use crate::gpu::FrameParts;
use crate::settings::SettingsUi;

/// Width of panels opened without an explicit width, in pixels.
const DEFAULT_PANEL_WIDTH: f32 = 320.0;
/// Space between a panel's border and its widgets, in points.
const PANEL_PADDING: f32 = 6.0;
const PANEL_CORNER_RADIUS: f32 = 4.0;
const OVERLAY_FONT_SIZE: f32 = 16.0;

struct OpenPanel {
    ui: egui::Ui,
    background: ShapeIdx,
}

/// Lays panels out as children of one egui area. Positions arrive in window
/// pixels and are converted to points here.
pub(crate) struct EguiSettings<'a> {
    root: &'a mut egui::Ui,
    panel: Option<OpenPanel>,
    panel_rects: Vec<Rect>,
    pixels_per_point: f32,
}

impl<'a> EguiSettings<'a> {
    pub(crate) fn new(root: &'a mut egui::Ui) -> Self {
        let pixels_per_point = root.ctx().pixels_per_point();
        Self {
            root,
            panel: None,
            panel_rects: Vec::new(),
            pixels_per_point,
        }
    }

    /// Closes any open panel and returns the screen rects of every panel drawn.
    pub(crate) fn finish(mut self) -> Vec<Rect> {
        self.end_panel();
        self.panel_rects
    }

    fn to_points(&self, position: [f32; 2]) -> egui::Pos2 {
        egui::pos2(
            position[0] / self.pixels_per_point,
            position[1] / self.pixels_per_point,
        )
    }

    fn current(&mut self) -> &mut egui::Ui {
        match &mut self.panel {
            Some(panel) => &mut panel.ui,
            None => &mut *self.root,
        }
    }
}

impl SettingsUi for EguiSettings<'_> {
    fn start_panel(&mut self, title: &str, position: [f32; 2], width: Option<f32>) {
        self.end_panel();

        let min = self.to_points(position);
        let width = width.unwrap_or(DEFAULT_PANEL_WIDTH) / self.pixels_per_point;
        let bottom = self.root.ctx().screen_rect().bottom().max(min.y);
        let outer = Rect::from_min_max(min, egui::pos2(min.x + width, bottom));

        let mut ui = self.root.new_child(
            UiBuilder::new()
                .id_salt(title)
                .max_rect(outer.shrink(PANEL_PADDING)),
        );
        let background = ui.painter().add(egui::Shape::Noop);
        ui.label(RichText::new(title).monospace().strong());
        ui.separator();
        self.panel = Some(OpenPanel { ui, background });
    }

    fn add_slider_u32(&mut self, label: &str, value: &mut u32, min: u32, max: u32) -> bool {
        self.current()
            .add(egui::Slider::new(value, min..=max).text(label))
            .changed()
    }

    fn add_slider_f32(&mut self, label: &str, value: &mut f32, min: f32, max: f32) -> bool {
        // log track for ranges spanning several decades
        let logarithmic = min > 0.0 && max / min > 1000.0;
        self.current()
            .add(
                egui::Slider::new(value, min..=max)
                    .text(label)
                    .logarithmic(logarithmic),
            )
            .changed()
    }

    fn add_toggle(&mut self, label: &str, value: &mut bool) -> bool {
        self.current().checkbox(value, label).changed()
    }

    fn add_combobox(
        &mut self,
        label: &str,
        options: &[&str],
        selected: &mut usize,
        expanded: &mut bool,
    ) -> bool {
        let current = options.get(*selected).copied().unwrap_or_default();
        let mut changed = false;
        let response = egui::ComboBox::from_label(label)
            .selected_text(current)
            .show_ui(self.current(), |ui| {
                for (index, option) in options.iter().enumerate() {
                    changed |= ui.selectable_value(selected, index, *option).changed();
                }
            });
        *expanded = response.inner.is_some();
        changed
    }

    fn end_panel(&mut self) {
        let Some(OpenPanel { ui, background }) = self.panel.take() else {
            return;
        };
        let rect = ui.min_rect().expand(PANEL_PADDING);
        let fill = ui.visuals().window_fill;
        ui.painter()
            .set(background, egui::Shape::rect_filled(rect, PANEL_CORNER_RADIUS, fill));
        self.panel_rects.push(rect);
    }

    fn add_text(&mut self, position: [f32; 2], text: &str) {
        let position = self.to_points(position);
        self.root.painter().text(
            position,
            Align2::LEFT_BOTTOM,
            text,
            FontId::monospace(OVERLAY_FONT_SIZE),
            Color32::WHITE,
        );
    }
}

/// Paints egui output over the presented frame.
pub(crate) struct OverlayPainter {
    renderer: egui_wgpu::Renderer,
}

impl OverlayPainter {
    pub(crate) fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, format, None, 1, false),
        }
    }

    /// Records the overlay pass; returned buffers must be submitted before the
    /// frame encoder.
    pub(crate) fn paint(
        &mut self,
        ctx: &egui::Context,
        parts: FrameParts<'_>,
        output: egui::FullOutput,
    ) -> Vec<wgpu::CommandBuffer> {
        let pixels_per_point = output.pixels_per_point;
        let jobs = ctx.tessellate(output.shapes, pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.renderer
                .update_texture(parts.device, parts.queue, *id, delta);
        }

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: parts.size,
            pixels_per_point,
        };
        let commands =
            self.renderer
                .update_buffers(parts.device, parts.queue, parts.encoder, &jobs, &screen);
        {
            let mut pass = parts
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("overlay pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: parts.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer.render(&mut pass, &jobs, &screen);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        commands
    }
}
