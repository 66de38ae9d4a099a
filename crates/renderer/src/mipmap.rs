use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::pixels::CanonicalPixelBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Byte offset of this level inside [`MipChain::data`].
    pub offset: usize,
}

impl MipLevel {
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Full RGBA8 mip chain, level 0 first, packed back to back.
#[derive(Clone, Debug)]
pub struct MipChain {
    levels: Vec<MipLevel>,
    data: Vec<u8>,
}

pub fn level_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}

impl MipChain {
    pub fn build(image: &CanonicalPixelBuffer) -> Self {
        let (width, height) = (image.width(), image.height());
        let count = level_count(width, height);
        let mut levels = Vec::with_capacity(count as usize);
        let mut data = Vec::with_capacity(image.bytes().len() * 4 / 3 + 4);

        levels.push(MipLevel {
            width,
            height,
            offset: 0,
        });
        data.extend_from_slice(image.bytes());

        let Some(mut previous) = RgbaImage::from_raw(width, height, image.bytes().to_vec()) else {
            return Self { levels, data };
        };
        for _ in 1..count {
            let next_width = (previous.width() / 2).max(1);
            let next_height = (previous.height() / 2).max(1);
            let next = imageops::resize(&previous, next_width, next_height, FilterType::Triangle);
            levels.push(MipLevel {
                width: next_width,
                height: next_height,
                offset: data.len(),
            });
            data.extend_from_slice(next.as_raw());
            previous = next;
        }

        Self { levels, data }
    }

    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn level_data(&self, index: usize) -> Option<&[u8]> {
        let level = self.levels.get(index)?;
        self.data.get(level.offset..level.offset + level.byte_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::pixels::{PixelBuffer, PixelFormat};

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> CanonicalPixelBuffer {
        let bytes = rgba.repeat((width * height) as usize);
        normalize(PixelBuffer::new(width, height, PixelFormat::RGBA8, bytes).unwrap()).unwrap()
    }

    #[test]
    fn counts_levels_down_to_one_pixel() {
        assert_eq!(level_count(1, 1), 1);
        assert_eq!(level_count(2, 2), 2);
        assert_eq!(level_count(5, 3), 3);
        assert_eq!(level_count(512, 512), 10);
        assert_eq!(level_count(1024, 1), 11);
    }

    #[test]
    fn halves_each_axis_independently() {
        let chain = MipChain::build(&solid(5, 2, [0, 0, 0, 255]));
        let sizes: Vec<_> = chain
            .levels()
            .iter()
            .map(|level| (level.width, level.height))
            .collect();
        assert_eq!(sizes, vec![(5, 2), (2, 1), (1, 1)]);
        assert_eq!(chain.data().len(), (10 + 2 + 1) * 4);
        assert_eq!(chain.levels()[2].offset, (10 + 2) * 4);
    }

    #[test]
    fn solid_colour_survives_downsampling() {
        let chain = MipChain::build(&solid(4, 4, [200, 100, 50, 255]));
        let smallest = chain.level_data(chain.levels().len() - 1).unwrap();
        assert_eq!(smallest, &[200, 100, 50, 255]);
    }

    #[test]
    fn base_level_is_the_source_image() {
        let image = solid(2, 1, [1, 2, 3, 4]);
        let chain = MipChain::build(&image);
        assert_eq!(chain.level_data(0).unwrap(), image.bytes());
    }
}
