use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::mipmap::MipChain;
use crate::pixels::CanonicalPixelBuffer;

use super::{FilterMode, TextureDescriptor, TextureId, WrapMode};

pub(crate) struct TextureResources {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub(crate) fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    id: TextureId,
    image: &CanonicalPixelBuffer,
    descriptor: &TextureDescriptor,
) -> TextureResources {
    let (width, height) = (image.width(), image.height());
    let chain;
    let (mip_level_count, data) = if descriptor.generate_mipmaps {
        chain = MipChain::build(image);
        (chain.levels().len() as u32, chain.data())
    } else {
        (1, image.bytes())
    };

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("{id:?}")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        data,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&sampler_descriptor(descriptor));
    tracing::debug!(?id, width, height, mip_level_count, "uploaded texture");

    TextureResources {
        _texture: texture,
        view,
        sampler,
    }
}

fn sampler_descriptor(descriptor: &TextureDescriptor) -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: None,
        address_mode_u: address_mode(descriptor.wrap_u),
        address_mode_v: address_mode(descriptor.wrap_v),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter_mode(descriptor.mag_filter),
        min_filter: filter_mode(descriptor.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        // Plain linear minification samples level 0 only, as GL_LINEAR does.
        lod_min_clamp: 0.0,
        lod_max_clamp: 0.0,
        ..Default::default()
    }
}

fn address_mode(mode: WrapMode) -> wgpu::AddressMode {
    match mode {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}
