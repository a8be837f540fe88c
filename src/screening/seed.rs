//! 图像种子提取
//!
//! 从画布左上角 `min(200,w) × min(200,h)` 区域内的前 100×100 子块中，
//! 以步长 2 采样像素，对 R/G/B 依次做 FNV 风格的异或-乘法哈希，得到 32 位种子。
//! 像素不可读（零尺寸、缓冲区过短、解码失败）时回退到固定种子 12345，
//! 保证后续流程始终能产出结果。

use std::io::Cursor;

use base64::Engine;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::constants::{CANVAS_MAX_HEIGHT, CANVAS_MAX_WIDTH, SEED_HASH_EDGE, SEED_REGION_EDGE};
use crate::screening::types::Seed;

const PRIME_MULTIPLIER_1: u32 = 16_777_619;
const PRIME_MULTIPLIER_2: u32 = 65_537;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("image has zero dimensions ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("pixel buffer too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// 解码后、已适配到画布尺寸的 RGBA 像素。
#[derive(Debug, Clone)]
pub struct ImageSample {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageSample {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// 解码 PNG/JPEG 等编码字节，并按比例缩小到 600×450 画布内（只缩不放）。
    pub fn decode(bytes: &[u8]) -> Result<Self, SampleError> {
        if bytes.is_empty() {
            return Err(SampleError::Empty);
        }
        let img = image::load_from_memory(bytes)?;
        let fitted = fit_to_canvas(img);
        let rgba = fitted.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn validate(&self) -> Result<(), SampleError> {
        if self.width == 0 || self.height == 0 {
            return Err(SampleError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() < expected {
            return Err(SampleError::Truncated {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// 以 JPEG data URL 形式重新编码，供远程关键点服务使用
    pub fn to_jpeg_data_url(&self) -> Result<String, SampleError> {
        self.validate()?;
        let rgba = RgbaImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            SampleError::Truncated {
                expected: self.width as usize * self.height as usize * 4,
                actual: self.pixels.len(),
            },
        )?;
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb).write_to(&mut buf, ImageFormat::Jpeg)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(buf.into_inner());
        Ok(format!("data:image/jpeg;base64,{encoded}"))
    }
}

fn fit_to_canvas(img: DynamicImage) -> DynamicImage {
    if img.width() <= CANVAS_MAX_WIDTH && img.height() <= CANVAS_MAX_HEIGHT {
        return img;
    }
    img.resize(CANVAS_MAX_WIDTH, CANVAS_MAX_HEIGHT, FilterType::Triangle)
}

/// 解析请求中的图像载荷：支持 `data:image/...;base64,` 前缀或裸 base64。
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, SampleError> {
    let trimmed = payload.trim();
    let data = match trimmed.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    if data.is_empty() {
        return Err(SampleError::Empty);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

pub fn try_extract_seed(sample: &ImageSample) -> Result<Seed, SampleError> {
    sample.validate()?;

    let region_w = sample.width.min(SEED_REGION_EDGE);
    let region_h = sample.height.min(SEED_REGION_EDGE);
    let stride = sample.width as usize * 4;
    let px = &sample.pixels;

    let mut acc: u32 = 0;
    for y in (0..region_h.min(SEED_HASH_EDGE)).step_by(2) {
        for x in (0..region_w.min(SEED_HASH_EDGE)).step_by(2) {
            let i = y as usize * stride + x as usize * 4;
            acc = (acc ^ u32::from(px[i])).wrapping_mul(PRIME_MULTIPLIER_1);
            acc = (acc ^ u32::from(px[i + 1])).wrapping_mul(PRIME_MULTIPLIER_2);
            acc = (acc ^ u32::from(px[i + 2])).wrapping_mul(PRIME_MULTIPLIER_1);
        }
    }
    Ok(Seed(acc))
}

pub fn extract_seed(sample: &ImageSample) -> Seed {
    match try_extract_seed(sample) {
        Ok(seed) => seed,
        Err(e) => {
            tracing::warn!(error = %e, fallback = Seed::FALLBACK.value(), "Seed extraction failed, using fallback seed");
            Seed::FALLBACK
        }
    }
}

/// 编码字节 → 种子；解码失败时回退
pub fn seed_from_encoded(bytes: &[u8]) -> Seed {
    match ImageSample::decode(bytes) {
        Ok(sample) => extract_seed(&sample),
        Err(e) => {
            tracing::warn!(error = %e, "Image decode failed, using fallback seed");
            Seed::FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageSample {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[
                    ((x * 16 + y) % 256) as u8,
                    ((x + y * 3) % 256) as u8,
                    (255 - (x * y) % 256) as u8,
                    255,
                ]);
            }
        }
        ImageSample::from_rgba(width, height, pixels)
    }

    #[test]
    fn single_pixel_hash_matches_hand_computation() {
        let sample = ImageSample::from_rgba(1, 1, vec![1, 2, 3, 255]);
        assert_eq!(extract_seed(&sample), Seed(2_621_798_614));
    }

    #[test]
    fn samples_every_second_pixel() {
        assert_eq!(extract_seed(&gradient(4, 4)), Seed(4_234_372_532));
    }

    #[test]
    fn same_pixels_same_seed() {
        let a = gradient(320, 240);
        let b = gradient(320, 240);
        assert_eq!(extract_seed(&a), extract_seed(&b));
        assert_eq!(extract_seed(&a), extract_seed(&a));
    }

    #[test]
    fn pixels_outside_hash_block_are_ignored() {
        let mut a = gradient(150, 150);
        let before = extract_seed(&a);
        // (120, 120) lies outside the 100x100 hash block
        let i = (120 * 150 + 120) * 4;
        a.pixels[i] ^= 0xFF;
        assert_eq!(extract_seed(&a), before);
    }

    #[test]
    fn zero_dimensions_fall_back() {
        let sample = ImageSample::from_rgba(0, 10, Vec::new());
        assert_eq!(extract_seed(&sample), Seed::FALLBACK);
        assert!(matches!(
            try_extract_seed(&sample),
            Err(SampleError::ZeroDimensions { .. })
        ));
    }

    #[test]
    fn truncated_buffer_falls_back() {
        let sample = ImageSample::from_rgba(10, 10, vec![0; 12]);
        assert_eq!(extract_seed(&sample), Seed::FALLBACK);
    }

    #[test]
    fn undecodable_bytes_fall_back() {
        assert_eq!(seed_from_encoded(b"definitely not an image"), Seed::FALLBACK);
        assert_eq!(seed_from_encoded(&[]), Seed::FALLBACK);
    }

    #[test]
    fn png_roundtrip_through_decoder_keeps_pixels() {
        let sample = gradient(8, 6);
        let img = RgbaImage::from_raw(8, 6, sample.pixels.clone()).unwrap();
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        let decoded = ImageSample::decode(buf.get_ref()).unwrap();
        assert_eq!(extract_seed(&decoded), extract_seed(&sample));
    }

    #[test]
    fn large_images_are_fitted_to_canvas() {
        let img = RgbaImage::from_pixel(1200, 300, image::Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        let decoded = ImageSample::decode(buf.get_ref()).unwrap();
        assert_eq!(decoded.width(), 600);
        assert_eq!(decoded.height(), 150);
    }

    #[test]
    fn payload_accepts_data_url_and_bare_base64() {
        let raw = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
        assert_eq!(
            decode_payload(&format!("data:image/png;base64,{raw}")).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(decode_payload(&raw).unwrap(), vec![1, 2, 3]);
        assert!(decode_payload("data:image/png;base64,").is_err());
        assert!(decode_payload("!!!").is_err());
    }

    #[test]
    fn jpeg_data_url_has_prefix() {
        let url = gradient(16, 16).to_jpeg_data_url().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
