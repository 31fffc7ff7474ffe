// Image preparation for trxs: sniffing, renaming and shrinking attachments
// so a post always fits the ledger's size window.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

use quill_shared::ImageAttachment;

/// Combined size window for all attachments on one trx.
pub const IMAGE_MAX_BYTES: usize = 200 * 1024;

/// A trx carries at most this many images; extra inputs are dropped.
pub const IMAGE_MAX_COUNT: usize = 4;

const SHRINK_ROUNDS: usize = 40;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Image read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No images supplied")]
    NoImages,

    #[error("Image {0} cannot be compressed into its size budget")]
    CompressionFailed(usize),

    #[error("Unrecognized image format")]
    UnknownFormat,
}

/// Accepted image inputs for a post.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Read from disk; the file name is kept (sanitized).
    Path(PathBuf),
    /// Raw encoded bytes; a name is generated from the sniffed format.
    Bytes(Vec<u8>),
    /// Already packed elsewhere; passed through untouched.
    Packed(ImageAttachment),
}

impl From<&Path> for ImageSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<ImageAttachment> for ImageSource {
    fn from(value: ImageAttachment) -> Self {
        Self::Packed(value)
    }
}

/// Prepare attachments for one trx. Keeps the first [`IMAGE_MAX_COUNT`]
/// inputs and shares [`IMAGE_MAX_BYTES`] evenly between them, shrinking each
/// image that exceeds its slice.
pub fn pack_images(sources: Vec<ImageSource>) -> Result<Vec<ImageAttachment>, MediaError> {
    if sources.is_empty() {
        return Err(MediaError::NoImages);
    }
    let kept = sources.len().min(IMAGE_MAX_COUNT);
    if sources.len() > kept {
        debug!(dropped = sources.len() - kept, "dropping excess images");
    }
    let budget = IMAGE_MAX_BYTES / kept;

    sources
        .into_iter()
        .take(kept)
        .enumerate()
        .map(|(index, source)| pack_one(source, budget, index))
        .collect()
}

/// Prepare a single avatar image, with the whole size window to itself.
pub fn pack_profile_image(source: ImageSource) -> Result<ImageAttachment, MediaError> {
    pack_one(source, IMAGE_MAX_BYTES, 0)
}

fn pack_one(
    source: ImageSource,
    budget: usize,
    index: usize,
) -> Result<ImageAttachment, MediaError> {
    let (bytes, name) = match source {
        ImageSource::Packed(attachment) => return Ok(attachment),
        ImageSource::Path(path) => {
            let bytes = std::fs::read(&path)?;
            let name = path
                .file_name()
                .map(|n| sanitize_name(&n.to_string_lossy()))
                .unwrap_or_else(|| generated_name(&bytes));
            (bytes, name)
        }
        ImageSource::Bytes(bytes) => {
            let name = generated_name(&bytes);
            (bytes, name)
        }
    };

    let (content, media_type) = shrink_to_budget(bytes, budget, index)?;
    Ok(ImageAttachment {
        name,
        media_type: media_type.to_string(),
        content,
    })
}

/// Shrink by repeated 5% downscales re-encoded as JPEG until the encoded
/// size fits. Images already inside the budget pass through byte-identical.
fn shrink_to_budget(
    bytes: Vec<u8>,
    budget: usize,
    index: usize,
) -> Result<(Vec<u8>, &'static str), MediaError> {
    let format = image::guess_format(&bytes).map_err(|_| MediaError::UnknownFormat)?;
    if bytes.len() <= budget {
        return Ok((bytes, format.to_mime_type()));
    }

    let mut img = image::load_from_memory(&bytes)?;
    for round in 0..SHRINK_ROUNDS {
        let width = (f64::from(img.width()) * 0.95) as u32;
        let height = (f64::from(img.height()) * 0.95) as u32;
        if width == 0 || height == 0 {
            break;
        }
        img = img.resize(width, height, FilterType::Triangle);

        // JPEG has no alpha, so flatten before encoding
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?;
        let encoded = out.into_inner();
        if encoded.len() <= budget {
            debug!(index, rounds = round + 1, size = encoded.len(), "image shrunk");
            return Ok((encoded, ImageFormat::Jpeg.to_mime_type()));
        }
    }
    Err(MediaError::CompressionFailed(index))
}

/// `uuid-date.ext`, with the extension taken from the sniffed format.
fn generated_name(bytes: &[u8]) -> String {
    let extension = image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin");
    format!(
        "{}-{}.{}",
        uuid::Uuid::new_v4(),
        chrono::Utc::now().date_naive(),
        extension
    )
}

/// Spaces and colons confuse downstream renderers; replace both.
fn sanitize_name(name: &str) -> String {
    name.replace([' ', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    // incompressible noise so the input is guaranteed over budget
    fn big_noisy_png() -> Vec<u8> {
        let mut state = 0x2545F4914F6CDD1Du64;
        let img = image::RgbImage::from_fn(600, 600, |_, _| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let b = state.to_le_bytes();
            image::Rgb([b[0], b[1], b[2]])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_small_image_passes_through() {
        let bytes = tiny_png();
        let packed = pack_images(vec![bytes.clone().into()]).unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].content, bytes);
        assert_eq!(packed[0].media_type, "image/png");
        assert!(packed[0].name.ends_with(".png"));
    }

    #[test]
    fn test_excess_images_dropped() {
        let sources: Vec<ImageSource> = (0..6).map(|_| tiny_png().into()).collect();
        let packed = pack_images(sources).unwrap();
        assert_eq!(packed.len(), IMAGE_MAX_COUNT);
    }

    #[test]
    fn test_no_images_rejected() {
        assert!(matches!(pack_images(Vec::new()), Err(MediaError::NoImages)));
    }

    #[test]
    fn test_oversized_image_shrinks_into_budget() {
        let bytes = big_noisy_png();
        assert!(bytes.len() > IMAGE_MAX_BYTES);

        let packed = pack_profile_image(bytes.into()).unwrap();
        assert!(packed.content.len() <= IMAGE_MAX_BYTES);
        assert_eq!(packed.media_type, "image/jpeg");
    }

    #[test]
    fn test_shared_budget_applies_per_image() {
        let sources: Vec<ImageSource> = (0..2).map(|_| big_noisy_png().into()).collect();
        let packed = pack_images(sources).unwrap();
        for attachment in &packed {
            assert!(attachment.content.len() <= IMAGE_MAX_BYTES / 2);
        }
    }

    #[test]
    fn test_path_source_keeps_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my pic:1.png");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&tiny_png()).unwrap();

        let packed = pack_profile_image(ImageSource::Path(path)).unwrap();
        assert_eq!(packed.name, "my_pic_1.png");
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let err = pack_profile_image(vec![0u8; 64].into()).unwrap_err();
        assert!(matches!(err, MediaError::UnknownFormat));
    }

    #[test]
    fn test_packed_source_untouched() {
        let attachment = ImageAttachment {
            name: "done.jpg".into(),
            media_type: "image/jpeg".into(),
            content: vec![1, 2, 3],
        };
        let packed = pack_profile_image(attachment.clone().into()).unwrap();
        assert_eq!(packed.content, attachment.content);
        assert_eq!(packed.name, "done.jpg");
    }
}
