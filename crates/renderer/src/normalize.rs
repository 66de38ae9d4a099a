//! Surface normalization: every decoded image is converted to the canonical
//! RGBA8 layout before it is allowed anywhere near a texture upload.

use thiserror::Error;

use crate::pixels::{CanonicalPixelBuffer, Channel, PixelBuffer, PixelFormat, SampleDepth};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("cannot derive RGB from {0}: no colour or luminance channel")]
    UnsupportedFormat(PixelFormat),

    #[error("conversion from {source_format} produced {produced} instead of RGBA8")]
    NotCanonical {
        source_format: PixelFormat,
        produced: PixelFormat,
    },
}

/// Where an output channel takes its value from.
#[derive(Clone, Copy, Debug)]
enum Source {
    Sample(usize),
    Constant(u8),
}

/// Converts `buffer` to the canonical RGBA8 layout.
///
/// Canonical input is returned as-is without touching the payload. Anything
/// else is remapped into a fresh allocation and the input is dropped.
pub fn normalize(buffer: PixelBuffer) -> Result<CanonicalPixelBuffer, NormalizeError> {
    if buffer.format().is_canonical() {
        return Ok(CanonicalPixelBuffer::new_unchecked(buffer));
    }

    let source_format = buffer.format();
    tracing::debug!(
        from = %source_format,
        width = buffer.width(),
        height = buffer.height(),
        "converting surface to RGBA8"
    );
    let converted = convert(&buffer)?;
    drop(buffer);

    verify_canonical(source_format, converted)
}

/// Re-checks a conversion result before it may be uploaded.
fn verify_canonical(
    source_format: PixelFormat,
    converted: PixelBuffer,
) -> Result<CanonicalPixelBuffer, NormalizeError> {
    if !converted.format().is_canonical() {
        return Err(NormalizeError::NotCanonical {
            source_format,
            produced: converted.format(),
        });
    }
    Ok(CanonicalPixelBuffer::new_unchecked(converted))
}

fn convert(buffer: &PixelBuffer) -> Result<PixelBuffer, NormalizeError> {
    let format = buffer.format();
    let sources = plan_sources(format)?;
    let depth = format.depth();
    let stride = format.bytes_per_pixel();

    let mut out = Vec::with_capacity(buffer.pixel_count() * 4);
    for pixel in buffer.bytes().chunks_exact(stride) {
        for source in sources {
            out.push(match source {
                Source::Sample(offset) => read_sample(pixel, offset, depth),
                Source::Constant(value) => value,
            });
        }
    }

    // Width, height and length are carried over from a valid buffer, so the
    // only way this fails is a broken conversion plan.
    PixelBuffer::new(buffer.width(), buffer.height(), PixelFormat::RGBA8, out).map_err(|_| {
        NormalizeError::NotCanonical {
            source_format: format,
            produced: PixelFormat::RGBA8,
        }
    })
}

fn plan_sources(format: PixelFormat) -> Result<[Source; 4], NormalizeError> {
    let luminance = format.offset_of(Channel::Luminance);
    let colour = [Channel::Red, Channel::Green, Channel::Blue].map(|channel| format.offset_of(channel));
    if luminance.is_none() && colour.iter().all(Option::is_none) {
        return Err(NormalizeError::UnsupportedFormat(format));
    }

    let colour_source = |offset: Option<usize>| match offset.or(luminance) {
        Some(offset) => Source::Sample(offset),
        None => Source::Constant(0),
    };
    let alpha = match format.offset_of(Channel::Alpha) {
        Some(offset) => Source::Sample(offset),
        None => Source::Constant(u8::MAX),
    };
    Ok([
        colour_source(colour[0]),
        colour_source(colour[1]),
        colour_source(colour[2]),
        alpha,
    ])
}

fn read_sample(pixel: &[u8], offset: usize, depth: SampleDepth) -> u8 {
    match depth {
        SampleDepth::U8 => pixel[offset],
        SampleDepth::U16 => {
            let value = u16::from_ne_bytes([pixel[offset], pixel[offset + 1]]);
            ((u32::from(value) * 255 + 32_767) / 65_535) as u8
        }
        SampleDepth::F32 => {
            let value = f32::from_ne_bytes([
                pixel[offset],
                pixel[offset + 1],
                pixel[offset + 2],
                pixel[offset + 3],
            ]);
            // NaN saturates to 0 in the cast.
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
    }
}
