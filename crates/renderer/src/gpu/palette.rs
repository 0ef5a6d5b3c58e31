use wgpu::util::{DeviceExt, TextureDataOrder};

/// Texels in the palette lookup row.
pub(crate) const PALETTE_WIDTH: u32 = 256;

/// Magma-like ramp, dark to bright.
const MAGMA: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

pub(crate) fn magma_rgba(t: f32) -> [u8; 4] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let x = t * (MAGMA.len() - 1) as f32;
    let i = x.floor() as usize;
    if i >= MAGMA.len() - 1 {
        let (r, g, b) = MAGMA[MAGMA.len() - 1];
        return [r, g, b, 255];
    }
    let f = x - i as f32;
    let lerp = |a: u8, b: u8| (a as f32 + f * (b as f32 - a as f32)).round() as u8;
    let (r0, g0, b0) = MAGMA[i];
    let (r1, g1, b1) = MAGMA[i + 1];
    [lerp(r0, r1), lerp(g0, g1), lerp(b0, b1), 255]
}

pub(crate) fn palette_texels(width: u32) -> Vec<u8> {
    let last = width.saturating_sub(1).max(1) as f32;
    (0..width)
        .flat_map(|index| magma_rgba(index as f32 / last))
        .collect()
}

pub(crate) struct Palette {
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Palette {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("palette"),
                size: wgpu::Extent3d {
                    width: PALETTE_WIDTH,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &palette_texels(PALETTE_WIDTH),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("palette sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self { view, sampler }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_runs_dark_to_bright() {
        assert_eq!(magma_rgba(0.0), [0, 0, 4, 255]);
        assert_eq!(magma_rgba(1.0), [252, 253, 191, 255]);
        assert_eq!(magma_rgba(f32::NAN), magma_rgba(0.0));
    }

    #[test]
    fn texels_cover_the_row() {
        let texels = palette_texels(PALETTE_WIDTH);
        assert_eq!(texels.len(), PALETTE_WIDTH as usize * 4);
        assert_eq!(&texels[texels.len() - 4..], &magma_rgba(1.0));
    }
}
