//! In-memory pixel surfaces with explicit format metadata.
//!
//! A [`PixelBuffer`] is whatever the image decoder produced: any channel
//! order, any supported sample depth. A [`CanonicalPixelBuffer`] is the one
//! layout the GPU upload path accepts (RGBA, 8 bits per channel, R at byte 0)
//! and can only be obtained through [`crate::normalize::normalize`].

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelError {
    #[error("surface dimensions must be positive (got {width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("payload is {actual} bytes but {width}x{height} {format} needs {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    #[error("invalid pixel format {format}: {reason}")]
    InvalidFormat {
        format: PixelFormat,
        reason: &'static str,
    },
}

/// A single sample slot inside a pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    /// Grey value that stands in for all three colour channels.
    Luminance,
}

impl Channel {
    fn symbol(self) -> char {
        match self {
            Channel::Red => 'R',
            Channel::Green => 'G',
            Channel::Blue => 'B',
            Channel::Alpha => 'A',
            Channel::Luminance => 'L',
        }
    }
}

/// Storage type of every sample in a pixel. Multi-byte samples are native-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleDepth {
    U8,
    U16,
    F32,
}

impl SampleDepth {
    pub const fn bytes(self) -> usize {
        match self {
            SampleDepth::U8 => 1,
            SampleDepth::U16 => 2,
            SampleDepth::F32 => 4,
        }
    }

    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }
}

/// Channel order plus sample depth. Channels are packed back to back, so the
/// byte offset of a channel is its index times the sample size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    channels: &'static [Channel],
    depth: SampleDepth,
}

use self::Channel::{Alpha as A, Blue as B, Green as G, Luminance as L, Red as R};

impl PixelFormat {
    pub const RGBA8: Self = Self::new(&[R, G, B, A], SampleDepth::U8);
    pub const BGRA8: Self = Self::new(&[B, G, R, A], SampleDepth::U8);
    pub const ARGB8: Self = Self::new(&[A, R, G, B], SampleDepth::U8);
    pub const ABGR8: Self = Self::new(&[A, B, G, R], SampleDepth::U8);
    pub const RGB8: Self = Self::new(&[R, G, B], SampleDepth::U8);
    pub const BGR8: Self = Self::new(&[B, G, R], SampleDepth::U8);
    pub const LUMA8: Self = Self::new(&[L], SampleDepth::U8);
    pub const LUMA_ALPHA8: Self = Self::new(&[L, A], SampleDepth::U8);
    pub const RGB16: Self = Self::new(&[R, G, B], SampleDepth::U16);
    pub const RGBA16: Self = Self::new(&[R, G, B, A], SampleDepth::U16);
    pub const LUMA16: Self = Self::new(&[L], SampleDepth::U16);
    pub const LUMA_ALPHA16: Self = Self::new(&[L, A], SampleDepth::U16);
    pub const RGB32F: Self = Self::new(&[R, G, B], SampleDepth::F32);
    pub const RGBA32F: Self = Self::new(&[R, G, B, A], SampleDepth::F32);

    pub const fn new(channels: &'static [Channel], depth: SampleDepth) -> Self {
        Self { channels, depth }
    }

    pub fn channels(&self) -> &'static [Channel] {
        self.channels
    }

    pub fn depth(&self) -> SampleDepth {
        self.depth
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels.len() * self.depth.bytes()
    }

    /// Byte offset of `channel` within one pixel, if the format carries it.
    pub fn offset_of(&self, channel: Channel) -> Option<usize> {
        self.channels
            .iter()
            .position(|candidate| *candidate == channel)
            .map(|index| index * self.depth.bytes())
    }

    /// Exact match against the upload layout: four 8-bit channels with R, G,
    /// B, A at byte offsets 0, 1, 2, 3.
    pub fn is_canonical(&self) -> bool {
        self.depth == SampleDepth::U8
            && self.channels.len() == 4
            && self.offset_of(Channel::Red) == Some(0)
            && self.offset_of(Channel::Green) == Some(1)
            && self.offset_of(Channel::Blue) == Some(2)
            && self.offset_of(Channel::Alpha) == Some(3)
    }

    pub fn validate(&self) -> Result<(), PixelError> {
        let invalid = |reason| PixelError::InvalidFormat {
            format: *self,
            reason,
        };
        if self.channels.is_empty() {
            return Err(invalid("no channels"));
        }
        if self.channels.len() > 4 {
            return Err(invalid("more than four channels"));
        }
        for (index, channel) in self.channels.iter().enumerate() {
            if self.channels[index + 1..].contains(channel) {
                return Err(invalid("channel listed twice"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for channel in self.channels {
            write!(f, "{}", channel.symbol())?;
        }
        match self.depth {
            SampleDepth::F32 => write!(f, "{}F", self.depth.bits()),
            _ => write!(f, "{}", self.depth.bits()),
        }
    }
}

/// Decoded image surface. The payload length always equals
/// `width * height * format.bytes_per_pixel()`.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        bytes: Vec<u8>,
    ) -> Result<Self, PixelError> {
        if width == 0 || height == 0 {
            return Err(PixelError::ZeroDimensions { width, height });
        }
        format.validate()?;
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if bytes.len() != expected {
            return Err(PixelError::LengthMismatch {
                width,
                height,
                format,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            bytes,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &format_args!("{}", self.format))
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A [`PixelBuffer`] proven to be in the canonical RGBA8 layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalPixelBuffer(PixelBuffer);

impl CanonicalPixelBuffer {
    /// Only the normalizer may vouch for a buffer.
    pub(crate) fn new_unchecked(buffer: PixelBuffer) -> Self {
        debug_assert!(buffer.format().is_canonical());
        Self(buffer)
    }

    pub fn width(&self) -> u32 {
        self.0.width
    }

    pub fn height(&self) -> u32 {
        self.0.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    pub fn as_buffer(&self) -> &PixelBuffer {
        &self.0
    }

    pub fn into_inner(self) -> PixelBuffer {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_check_requires_exact_offsets() {
        assert!(PixelFormat::RGBA8.is_canonical());
        assert!(!PixelFormat::BGRA8.is_canonical());
        assert!(!PixelFormat::ARGB8.is_canonical());
        assert!(!PixelFormat::RGB8.is_canonical());
        assert!(!PixelFormat::RGBA16.is_canonical());
    }

    #[test]
    fn offsets_scale_with_sample_depth() {
        assert_eq!(PixelFormat::BGRA8.offset_of(Channel::Red), Some(2));
        assert_eq!(PixelFormat::RGBA16.offset_of(Channel::Alpha), Some(6));
        assert_eq!(PixelFormat::RGB32F.offset_of(Channel::Alpha), None);
        assert_eq!(PixelFormat::RGBA32F.bytes_per_pixel(), 16);
        assert_eq!(PixelFormat::LUMA_ALPHA8.bytes_per_pixel(), 2);
    }

    #[test]
    fn display_names_layout() {
        assert_eq!(PixelFormat::BGRA8.to_string(), "BGRA8");
        assert_eq!(PixelFormat::LUMA16.to_string(), "L16");
        assert_eq!(PixelFormat::RGB32F.to_string(), "RGB32F");
    }

    #[test]
    fn rejects_payload_length_mismatch() {
        let err = PixelBuffer::new(2, 2, PixelFormat::RGB8, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            PixelError::LengthMismatch {
                width: 2,
                height: 2,
                format: PixelFormat::RGB8,
                expected: 12,
                actual: 11,
            }
        );
    }

    #[test]
    fn rejects_empty_surfaces() {
        assert!(matches!(
            PixelBuffer::new(0, 4, PixelFormat::RGBA8, Vec::new()),
            Err(PixelError::ZeroDimensions { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_channels() {
        const RRGB: PixelFormat = PixelFormat::new(
            &[Channel::Red, Channel::Red, Channel::Green, Channel::Blue],
            SampleDepth::U8,
        );
        assert!(matches!(
            PixelBuffer::new(1, 1, RRGB, vec![0; 4]),
            Err(PixelError::InvalidFormat { .. })
        ));
    }
}
