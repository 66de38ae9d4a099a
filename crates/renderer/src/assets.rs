//! Image loading for texture assets.
//!
//! Decoding is delegated to the `image` crate. The decoded surface keeps its
//! native layout so [`crate::normalize`] stays the only place that decides how
//! pixels reach the canonical format.

use std::error::Error as _;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, GenericImageView, ImageError, ImageReader};
use thiserror::Error;

use crate::normalize::{normalize, NormalizeError};
use crate::pixels::{CanonicalPixelBuffer, PixelBuffer, PixelError, PixelFormat};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("image {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to decode image {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("decoded image {} has an inconsistent layout", path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: PixelError,
    },

    #[error("failed to convert image {} to RGBA8", path.display())]
    Normalize {
        path: PathBuf,
        #[source]
        source: NormalizeError,
    },
}

impl AssetError {
    pub fn path(&self) -> &Path {
        match self {
            AssetError::Missing { path }
            | AssetError::Decode { path, .. }
            | AssetError::Layout { path, .. }
            | AssetError::Normalize { path, .. } => path,
        }
    }
}

/// Every asset that failed during start-up.
#[derive(Debug, Error)]
#[error("{}", describe_failures(.0))]
pub struct AssetErrors(pub Vec<AssetError>);

fn describe_failures(failures: &[AssetError]) -> String {
    let mut message = format!("{} texture asset(s) failed to load", failures.len());
    for error in failures {
        let _ = write!(message, "\n  - {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = write!(message, ": {cause}");
            source = cause.source();
        }
    }
    message
}

/// Decodes the image at `path` into a surface in its native pixel layout.
pub fn load_image(path: &Path) -> Result<PixelBuffer, AssetError> {
    if !path.is_file() {
        return Err(AssetError::Missing {
            path: path.to_path_buf(),
        });
    }
    let image = decode_by_content(path).map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    surface_from_image(image).map_err(|source| AssetError::Layout {
        path: path.to_path_buf(),
        source,
    })
}

/// Picks the decoder from the file's leading bytes, falling back to the
/// extension only when the bytes are not recognised.
fn decode_by_content(path: &Path) -> Result<DynamicImage, ImageError> {
    ImageReader::open(path)
        .map_err(ImageError::IoError)?
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .decode()
}

/// Loads `path` and normalizes it for upload.
pub fn load_texture_image(path: &Path) -> Result<CanonicalPixelBuffer, AssetError> {
    let surface = load_image(path)?;
    tracing::debug!(
        path = %path.display(),
        width = surface.width(),
        height = surface.height(),
        format = %surface.format(),
        "decoded texture image"
    );
    normalize(surface).map_err(|source| AssetError::Normalize {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads every path, reporting all failures rather than stopping at the first.
pub fn load_texture_images<const N: usize>(
    paths: &[PathBuf; N],
) -> Result<[CanonicalPixelBuffer; N], AssetErrors> {
    let mut loaded = Vec::with_capacity(N);
    let mut failures = Vec::new();
    for path in paths {
        match load_texture_image(path) {
            Ok(image) => loaded.push(image),
            Err(error) => {
                tracing::error!(path = %path.display(), error = %error, "texture asset failed");
                failures.push(error);
            }
        }
    }
    match <[CanonicalPixelBuffer; N]>::try_from(loaded) {
        Ok(images) if failures.is_empty() => Ok(images),
        _ => Err(AssetErrors(failures)),
    }
}

fn surface_from_image(image: DynamicImage) -> Result<PixelBuffer, PixelError> {
    let (width, height) = image.dimensions();
    let format = match image.color() {
        ColorType::L8 => Some(PixelFormat::LUMA8),
        ColorType::La8 => Some(PixelFormat::LUMA_ALPHA8),
        ColorType::Rgb8 => Some(PixelFormat::RGB8),
        ColorType::Rgba8 => Some(PixelFormat::RGBA8),
        ColorType::L16 => Some(PixelFormat::LUMA16),
        ColorType::La16 => Some(PixelFormat::LUMA_ALPHA16),
        ColorType::Rgb16 => Some(PixelFormat::RGB16),
        ColorType::Rgba16 => Some(PixelFormat::RGBA16),
        ColorType::Rgb32F => Some(PixelFormat::RGB32F),
        ColorType::Rgba32F => Some(PixelFormat::RGBA32F),
        _ => None,
    };
    match format {
        Some(format) => PixelBuffer::new(width, height, format, image.as_bytes().to_vec()),
        None => PixelBuffer::new(
            width,
            height,
            PixelFormat::RGBA8,
            image.to_rgba8().into_raw(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, Rgba};
    use tempfile::TempDir;

    #[test]
    fn rgb_png_keeps_native_layout_then_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rgb.png");
        let image = ImageBuffer::from_fn(2, 2, |x, y| Rgb([x as u8 * 100, y as u8 * 50, 7]));
        image.save(&path).unwrap();

        let surface = load_image(&path).unwrap();
        assert_eq!(surface.format(), PixelFormat::RGB8);
        assert_eq!((surface.width(), surface.height()), (2, 2));

        let canonical = load_texture_image(&path).unwrap();
        assert_eq!(&canonical.bytes()[..8], &[0, 0, 7, 255, 100, 0, 7, 255]);
    }

    #[test]
    fn rgba_png_is_already_canonical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rgba.png");
        ImageBuffer::from_pixel(3, 1, Rgba([1u8, 2, 3, 4]))
            .save(&path)
            .unwrap();

        let canonical = load_texture_image(&path).unwrap();
        assert_eq!(canonical.bytes(), &[1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn grey_png_expands_luminance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grey.png");
        ImageBuffer::from_pixel(1, 1, Luma([90u8])).save(&path).unwrap();

        assert_eq!(load_image(&path).unwrap().format(), PixelFormat::LUMA8);
        assert_eq!(load_texture_image(&path).unwrap().bytes(), &[90, 90, 90, 255]);
    }

    #[test]
    fn missing_file_is_tagged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.png");
        let err = load_texture_image(&path).unwrap_err();
        assert!(matches!(err, AssetError::Missing { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            load_image(&path).unwrap_err(),
            AssetError::Decode { .. }
        ));
    }

    #[test]
    fn format_comes_from_content_not_extension() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("face.png");
        ImageBuffer::from_pixel(1, 1, Rgba([9u8, 8, 7, 255]))
            .save(&png)
            .unwrap();
        let mislabeled = dir.path().join("face.jpg");
        let bare = dir.path().join("face");
        std::fs::copy(&png, &mislabeled).unwrap();
        std::fs::copy(&png, &bare).unwrap();

        assert_eq!(load_texture_image(&mislabeled).unwrap().bytes(), &[9, 8, 7, 255]);
        assert_eq!(load_texture_image(&bare).unwrap().bytes(), &[9, 8, 7, 255]);
    }

    #[test]
    fn batch_load_returns_images_in_path_order() {
        let dir = TempDir::new().unwrap();
        let paths = [dir.path().join("a.png"), dir.path().join("b.png")];
        ImageBuffer::from_pixel(1, 1, Rgba([1u8, 1, 1, 1])).save(&paths[0]).unwrap();
        ImageBuffer::from_pixel(1, 1, Rgba([2u8, 2, 2, 2])).save(&paths[1]).unwrap();

        let [first, second] = load_texture_images(&paths).unwrap();
        assert_eq!(first.bytes(), &[1, 1, 1, 1]);
        assert_eq!(second.bytes(), &[2, 2, 2, 2]);
    }

    #[test]
    fn batch_load_reports_every_failure() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.png");
        ImageBuffer::from_pixel(1, 1, Rgba([0u8, 0, 0, 0]))
            .save(&good)
            .unwrap();
        let paths = [
            dir.path().join("first-missing.png"),
            good,
            dir.path().join("second-missing.png"),
        ];

        let err = load_texture_images(&paths).unwrap_err();
        assert_eq!(err.0.len(), 2);
        let message = err.to_string();
        assert!(message.contains("first-missing.png"));
        assert!(message.contains("second-missing.png"));
    }
}
