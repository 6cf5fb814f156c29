use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Failed to load image: {0}")]
    Decode(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Decodes `source`, scales it to exactly `width` x `height` and encodes the
/// result as JPEG.
pub fn render(source: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, RenderError> {
    let img = image::load_from_memory(source).map_err(|e| RenderError::Decode(e.to_string()))?;

    let resized = resize_exact(img, width, height);

    encode_jpeg(&resized, quality)
}

// Ignores aspect ratio, the caller asked for these exact dimensions.
pub fn resize_exact(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::Lanczos3)
}

pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, RenderError> {
    let mut output = Vec::new();
    let quality = quality.clamp(1, 100);

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn render_produces_requested_dimensions() {
        let source = png_fixture(64, 48);
        for (w, h) in [(100, 200), (1, 1), (64, 48), (7, 300)] {
            let out = render(&source, w, h, 75).unwrap();
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!(decoded.dimensions(), (w, h));
        }
    }

    #[test]
    fn output_is_jpeg() {
        let out = render(&png_fixture(16, 16), 8, 8, 75).unwrap();
        assert!(out.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn render_is_deterministic() {
        let source = png_fixture(40, 30);
        assert_eq!(render(&source, 33, 21, 80).unwrap(), render(&source, 33, 21, 80).unwrap());
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            render(b"definitely not an image", 10, 10, 75),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let source = png_fixture(8, 8);
        assert!(render(&source, 4, 4, 0).is_ok());
        assert!(render(&source, 4, 4, 255).is_ok());
    }
}
