//! Photo downscaling: decode, fit within a square bound, re-encode as a JPEG data URL.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{
    DynamicImage, ExtendedColorType, ImageFormat, RgbImage, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use thiserror::Error;

use crate::{config::ImageConfig, error::ServiceError};

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Failures of the downscaler.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The uploaded bytes are not a decodable image.
    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),
    /// Re-encoding the resized image failed.
    #[error("failed to encode image")]
    Encode(#[source] image::ImageError),
    /// Target dimensions leave nothing to draw on.
    #[error("no drawing surface for a {width}x{height} image bounded by {max_edge}")]
    EmptySurface {
        width: u32,
        height: u32,
        max_edge: u32,
    },
}

/// Re-encoded photo ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// `data:image/jpeg;base64,...` payload.
    pub data_url: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Output dimensions for a `width`×`height` source bounded by `max_edge` on its longer side.
///
/// Sources already inside the bound keep their exact size.
pub fn scaled_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let scale = |short: u32, long: u32, new_long: u32| -> u32 {
        let scaled = (f64::from(short) * f64::from(new_long) / f64::from(long)).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        let new_w = width.min(max_edge);
        if new_w == width {
            return (width, height);
        }
        (new_w, scale(height, width, new_w))
    } else {
        let new_h = height.min(max_edge);
        if new_h == height {
            return (width, height);
        }
        (scale(width, height, new_h), new_h)
    }
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Decode `bytes`, fit them within `max_edge`, and re-encode at `quality` in `[0, 1]`.
pub fn downscale(bytes: &[u8], max_edge: u32, quality: f32) -> Result<EncodedImage, ImageError> {
    let source = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
    let (width, height) = (source.width(), source.height());
    if max_edge == 0 || width == 0 || height == 0 {
        return Err(ImageError::EmptySurface {
            width,
            height,
            max_edge,
        });
    }

    let (new_w, new_h) = scaled_dimensions(width, height, max_edge);
    let resized = if (new_w, new_h) == (width, height) {
        source
    } else {
        source.resize_exact(new_w, new_h, FilterType::Triangle)
    };
    let rgb = resized.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality(quality))
        .encode(rgb.as_raw(), new_w, new_h, ExtendedColorType::Rgb8)
        .map_err(ImageError::Encode)?;

    Ok(EncodedImage {
        data_url: format!("{JPEG_DATA_URL_PREFIX}{}", STANDARD.encode(&jpeg)),
        width: new_w,
        height: new_h,
    })
}

/// Run [`downscale`] on the blocking pool with the configured bound and quality.
pub async fn downscale_async(
    bytes: Vec<u8>,
    config: ImageConfig,
) -> Result<EncodedImage, ServiceError> {
    let result =
        tokio::task::spawn_blocking(move || downscale(&bytes, config.max_edge, config.quality))
            .await
            .map_err(|err| ServiceError::Internal(format!("image worker failed: {err}")))?;
    Ok(result?)
}

/// Encode an RGB canvas as PNG bytes.
pub fn encode_png(canvas: RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut png, ImageFormat::Png)
        .map_err(ImageError::Encode)?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let canvas = RgbImage::from_pixel(width, height, Rgb([200, 120, 80]));
        encode_png(canvas).unwrap()
    }

    fn decode_data_url(url: &str) -> DynamicImage {
        let payload = url.strip_prefix(JPEG_DATA_URL_PREFIX).unwrap();
        let jpeg = STANDARD.decode(payload).unwrap();
        image::load_from_memory(&jpeg).unwrap()
    }

    #[test]
    fn small_images_keep_their_size() {
        let encoded = downscale(&png_bytes(100, 100), 300, 0.7).unwrap();
        assert_eq!((encoded.width, encoded.height), (100, 100));
        let decoded = decode_data_url(&encoded.data_url);
        assert_eq!((decoded.width(), decoded.height()), (100, 100));
    }

    #[test]
    fn landscape_is_bounded_by_width() {
        let encoded = downscale(&png_bytes(1200, 600), 300, 0.7).unwrap();
        assert_eq!((encoded.width, encoded.height), (300, 150));
        let decoded = decode_data_url(&encoded.data_url);
        assert_eq!((decoded.width(), decoded.height()), (300, 150));
    }

    #[test]
    fn portrait_is_bounded_by_height() {
        let encoded = downscale(&png_bytes(600, 1200), 300, 0.7).unwrap();
        assert_eq!((encoded.width, encoded.height), (150, 300));
    }

    #[test]
    fn dimension_math() {
        assert_eq!(scaled_dimensions(300, 300, 300), (300, 300));
        assert_eq!(scaled_dimensions(1000, 333, 300), (300, 100));
        assert_eq!(scaled_dimensions(4000, 3, 300), (300, 1));
        assert_eq!(scaled_dimensions(640, 480, 300), (300, 225));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            downscale(b"definitely not an image", 300, 0.7),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn zero_bound_has_no_surface() {
        assert!(matches!(
            downscale(&png_bytes(10, 10), 0, 0.7),
            Err(ImageError::EmptySurface { max_edge: 0, .. })
        ));
    }

    #[test]
    fn quality_is_clamped_into_encoder_range() {
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(-2.0), 1);
        assert_eq!(jpeg_quality(4.0), 100);
    }

    #[tokio::test]
    async fn async_variant_runs_off_the_event_loop() {
        let config = ImageConfig {
            max_edge: 50,
            quality: 0.5,
        };
        let encoded = downscale_async(png_bytes(200, 100), config).await.unwrap();
        assert_eq!((encoded.width, encoded.height), (50, 25));
        assert!(
            downscale_async(vec![1, 2, 3], config).await.is_err(),
            "garbage must not decode"
        );
    }
}
