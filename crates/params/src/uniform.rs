use bytemuck::{Pod, Zeroable};

/// Flat record bound as `var<uniform> config` by every compute stage.
///
/// Field order and padding match the `Config` struct in the WGSL sources;
/// `points` is a `vec4<u32>` there so the record stays 16-byte aligned.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ConfigUniform {
    pub screen_width: u32,
    pub screen_height: u32,
    pub step: f32,
    pub iteration: u32,
    pub vertex_count: u32,
    pub polygon_radius: f32,
    pub vertex_select_period: u32,
    pub vertex_usage_memory: u32,
    pub vertex_usage_memory_offset: u32,
    pub normalize_exponent: f32,
    pub offset: [f32; 2],
    pub points: [u32; 4],
    pub selection_type: u32,
    pub min_t_bezier: f32,
    pub step_count: u32,
    pub _padding: u32,
}
