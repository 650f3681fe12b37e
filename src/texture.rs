use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use thiserror::Error;

use crate::gpu::GpuContext;
use crate::shader::ShaderProgram;

pub const TEXTURE_UNIT_COUNT: usize = 5;

/// Texels are sampled as stored, with no sRGB decode.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Image file bound to each texture unit, relative to the asset directory.
pub const SCENE_TEXTURES: [&str; TEXTURE_UNIT_COUNT] = [
    "checker.jpg",
    "metal.jpg",
    "grid.png",
    "sun.png",
    "multi.png",
];

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("error loading texture: {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decode an image file into tightly packed RGBA8.
pub fn decode_rgba(path: &Path) -> Result<RgbaImage, TextureError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Build the full mip chain, halving each level with a triangle filter.
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let levels = mip_level_count(base.width(), base.height()) as usize;
    let mut chain = Vec::with_capacity(levels);
    chain.push(base);

    while chain.len() < levels {
        let next = {
            let prev = &chain[chain.len() - 1];
            let width = (prev.width() / 2).max(1);
            let height = (prev.height() / 2).max(1);
            imageops::resize(prev, width, height, FilterType::Triangle)
        };
        chain.push(next);
    }

    chain
}

/// A mipmapped GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Upload an RGBA image with a generated mip chain.
    pub fn from_image(gpu: &GpuContext, image: RgbaImage, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let (width, height) = image.dimensions();
        let levels = mip_chain(image);
        // Single layer, so layer-major order is just each level in turn.
        let data: Vec<u8> = levels
            .iter()
            .flat_map(|level| level.as_raw().iter().copied())
            .collect();

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: levels.len() as u32,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &Path) -> Result<Self, TextureError> {
        let image = decode_rgba(path)?;
        Ok(Self::from_image(gpu, image, &path.display().to_string()))
    }
}

/// The five textures of the scene, each with the bind group that makes it
/// the active unit.
pub struct TextureUnits {
    textures: Vec<Texture>,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl TextureUnits {
    /// Load every entry of [`SCENE_TEXTURES`] from `asset_dir`. The first file
    /// that fails to decode aborts the load.
    pub fn load(
        gpu: &GpuContext,
        program: &ShaderProgram,
        asset_dir: &Path,
    ) -> Result<Self, TextureError> {
        let mut textures = Vec::with_capacity(TEXTURE_UNIT_COUNT);
        let mut bind_groups = Vec::with_capacity(TEXTURE_UNIT_COUNT);

        for (unit, file) in SCENE_TEXTURES.iter().enumerate() {
            let texture = Texture::from_file(gpu, &asset_dir.join(file))?;
            log::info!(
                "Texture unit {unit}: {file} ({}x{})",
                texture.width,
                texture.height
            );
            bind_groups.push(program.texture_bind_group(gpu, &texture));
            textures.push(texture);
        }

        Ok(Self {
            textures,
            bind_groups,
        })
    }

    pub fn bind_group(&self, unit: usize) -> Option<&wgpu::BindGroup> {
        self.bind_groups.get(unit)
    }

    pub fn unit_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_reports_path() {
        let path = Path::new("no/such/checker.jpg");
        let err = decode_rgba(path).unwrap_err();

        let TextureError::Decode { path: reported, .. } = &err;
        assert_eq!(reported, path);
        assert!(err.to_string().contains("checker.jpg"));
    }

    #[test]
    fn corrupt_file_fails_to_decode() {
        let mut file = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .unwrap();
        file.write_all(b"definitely not a png").unwrap();

        assert!(decode_rgba(file.path()).is_err());
    }

    #[test]
    fn decodes_to_rgba8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let decoded = decode_rgba(&path).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(2, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn mip_level_counts() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 17), 9);
    }

    #[test]
    fn mip_chain_halves_to_one_pixel() {
        let base = RgbaImage::from_pixel(8, 3, image::Rgba([255, 0, 0, 255]));
        let dims: Vec<_> = mip_chain(base).iter().map(|l| l.dimensions()).collect();

        assert_eq!(dims, vec![(8, 3), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn solid_color_survives_downsampling() {
        let base = RgbaImage::from_pixel(4, 4, image::Rgba([40, 80, 120, 255]));
        let chain = mip_chain(base);

        assert_eq!(chain.last().unwrap().get_pixel(0, 0).0, [40, 80, 120, 255]);
    }

    #[test]
    fn texels_are_not_srgb_decoded() {
        assert!(!TEXTURE_FORMAT.is_srgb());
        assert_eq!(TEXTURE_FORMAT.block_copy_size(None), Some(4));
    }

    #[test]
    fn unit_files_in_order() {
        assert_eq!(SCENE_TEXTURES[0], "checker.jpg");
        assert_eq!(SCENE_TEXTURES[2], "grid.png");
        assert_eq!(SCENE_TEXTURES[4], "multi.png");
    }
}
