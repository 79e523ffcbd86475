use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use once_cell::sync::Lazy;

use crate::llm::request::ImagePart;
use crate::locales::Language;

// Logo placement mirrors the studio branding: 15% of the base width in the
// bottom-right corner with 2% padding, at 80% opacity.
const LOGO_WIDTH_RATIO: f32 = 0.15;
const PADDING_RATIO: f32 = 0.02;
const LOGO_OPACITY: f32 = 0.8;
const JPEG_QUALITY: u8 = 90;

static LOGO_PNG: &[u8] = include_bytes!("../assets/logo.png");

static LOGO: Lazy<DynamicImage> =
    Lazy::new(|| image::load_from_memory(LOGO_PNG).expect("embedded logo decodes"));

/// Composites the studio logo onto a generated image and re-encodes it as
/// a JPEG data URL.
pub fn apply_watermark(image_data_url: &str, lang: Language) -> Result<String> {
    let part = ImagePart::from_data_url(image_data_url, lang)?;
    let bytes = general_purpose::STANDARD
        .decode(part.data.as_bytes())
        .context("generated image payload is not valid base64")?;
    let base = image::load_from_memory(&bytes).context("generated image could not be decoded")?;

    let (width, height) = base.dimensions();
    let logo_width = ((width as f32) * LOGO_WIDTH_RATIO).round().max(1.0) as u32;
    let logo_height = ((LOGO.height() as f32) * (logo_width as f32 / LOGO.width() as f32))
        .round()
        .max(1.0) as u32;
    let padding = ((width as f32) * PADDING_RATIO).round() as u32;

    let mut scaled = image::imageops::resize(
        &LOGO.to_rgba8(),
        logo_width,
        logo_height,
        FilterType::Lanczos3,
    );
    for pixel in scaled.pixels_mut() {
        pixel.0[3] = (pixel.0[3] as f32 * LOGO_OPACITY) as u8;
    }

    let x = width.saturating_sub(logo_width + padding);
    let y = height.saturating_sub(logo_height + padding);

    let mut canvas = base.to_rgba8();
    image::imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);

    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .context("watermarked image could not be encoded")?;

    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(&out)
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encodes");
        format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&buf)
        )
    }

    #[test]
    fn produces_a_jpeg_data_url_with_unchanged_dimensions() {
        let url = apply_watermark(&png_data_url(200, 100), Language::En).expect("watermarks");
        let payload = url
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data url prefix");
        let bytes = general_purpose::STANDARD.decode(payload).expect("valid base64");
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let out = image::load_from_memory(&bytes).expect("decodes");
        assert_eq!(out.dimensions(), (200, 100));
    }

    #[test]
    fn handles_images_smaller_than_the_logo() {
        let url = apply_watermark(&png_data_url(8, 8), Language::En).expect("watermarks");
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn rejects_a_malformed_data_url() {
        assert!(apply_watermark("not a data url", Language::En).is_err());
    }

    #[test]
    fn rejects_an_undecodable_payload() {
        assert!(apply_watermark("data:image/png;base64,AAAA", Language::En).is_err());
    }
}
