// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image decoder — turns an embedded PDF image into an 8-bit luma pixel grid
// using the `image` crate. Everything downstream only needs to tell pure black
// from anything else, so all colour models are collapsed to luma here.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, instrument};

use crate::source::{ColorSpace, EmbeddedImage, ImageEncoding};

/// A decoded voucher code image.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    /// 1-based page the image was found on.
    pub page: u32,
    /// 0-based position among the images of that page.
    pub index: usize,
    pub pixels: GrayImage,
}

impl ExtractedImage {
    pub fn new(page: u32, index: usize, pixels: GrayImage) -> Self {
        Self {
            page,
            index,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decode one embedded image.
#[instrument(skip_all, fields(page = embedded.page, index = embedded.index))]
pub fn decode(embedded: &EmbeddedImage) -> Result<ExtractedImage> {
    let fail = |reason: String| StampError::Decode {
        page: embedded.page,
        image: embedded.index,
        reason,
    };

    let mut pixels = match &embedded.encoding {
        ImageEncoding::Jpeg => image::load_from_memory_with_format(&embedded.data, ImageFormat::Jpeg)
            .map_err(|err| fail(format!("invalid JPEG data: {}", err)))?
            .to_luma8(),
        ImageEncoding::Raw => decode_raw(embedded).map_err(fail)?,
        ImageEncoding::Unsupported(filters) => {
            return Err(fail(format!("unsupported filter chain: {}", filters)));
        }
    };

    if embedded.inverted {
        image::imageops::invert(&mut pixels);
    }

    debug!(
        width = pixels.width(),
        height = pixels.height(),
        "Embedded image decoded"
    );

    Ok(ExtractedImage::new(embedded.page, embedded.index, pixels))
}

/// Raw samples: PNG data is recognised by its signature, everything else is
/// interpreted according to the image dictionary.
fn decode_raw(embedded: &EmbeddedImage) -> std::result::Result<GrayImage, String> {
    if embedded.data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return image::load_from_memory_with_format(&embedded.data, ImageFormat::Png)
            .map(|img| img.to_luma8())
            .map_err(|err| format!("invalid PNG data: {}", err));
    }

    let (width, height) = (embedded.width, embedded.height);
    let components = match &embedded.color_space {
        ColorSpace::Gray => 1,
        ColorSpace::Rgb => 3,
        ColorSpace::Indexed { .. } => 1,
        ColorSpace::Unsupported(name) => {
            return Err(format!("unsupported colour space {}", name));
        }
    };

    let samples = unpack_samples(
        &embedded.data,
        width as usize,
        height as usize,
        components,
        embedded.bits_per_component,
    )?;

    match &embedded.color_space {
        ColorSpace::Gray => {
            let levels = scale_to_byte(&samples, embedded.bits_per_component);
            GrayImage::from_raw(width, height, levels)
                .ok_or_else(|| "sample buffer does not match image size".to_string())
        }
        ColorSpace::Rgb => {
            let levels = scale_to_byte(&samples, embedded.bits_per_component);
            let rgb = RgbImage::from_raw(width, height, levels)
                .ok_or_else(|| "sample buffer does not match image size".to_string())?;
            Ok(DynamicImage::ImageRgb8(rgb).to_luma8())
        }
        ColorSpace::Indexed {
            components,
            palette,
        } => {
            let mut rgb = Vec::with_capacity(samples.len() * 3);
            for &entry in &samples {
                let start = entry as usize * components;
                let color = palette
                    .get(start..start + components)
                    .ok_or_else(|| format!("palette index {} out of range", entry))?;
                match color {
                    [g] => rgb.extend_from_slice(&[*g, *g, *g]),
                    [r, g, b] => rgb.extend_from_slice(&[*r, *g, *b]),
                    _ => return Err(format!("unsupported palette width {}", components)),
                }
            }
            let rgb = RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| "palette buffer does not match image size".to_string())?;
            Ok(DynamicImage::ImageRgb8(rgb).to_luma8())
        }
        ColorSpace::Unsupported(_) => unreachable!("rejected above"),
    }
}

/// Split packed rows into one sample per byte. Rows are padded to whole bytes.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bits: u8,
) -> std::result::Result<Vec<u8>, String> {
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(format!("unsupported bits per component {}", bits));
    }
    let per_row = width * components;
    let row_bytes = (per_row * bits as usize).div_ceil(8);
    let needed = row_bytes * height;
    if data.len() < needed {
        return Err(format!(
            "sample data too short: {} bytes, expected {}",
            data.len(),
            needed
        ));
    }

    if bits == 8 {
        return Ok(data[..needed].to_vec());
    }

    let mask = (1u16 << bits) as u8 - 1;
    let mut samples = Vec::with_capacity(per_row * height);
    for row in data[..needed].chunks_exact(row_bytes) {
        for i in 0..per_row {
            let bit_offset = i * bits as usize;
            let byte = row[bit_offset / 8];
            let shift = 8 - bits as usize - (bit_offset % 8);
            samples.push((byte >> shift) & mask);
        }
    }
    Ok(samples)
}

/// Stretch `bits`-wide samples to the full 0..=255 range.
fn scale_to_byte(samples: &[u8], bits: u8) -> Vec<u8> {
    if bits == 8 {
        return samples.to_vec();
    }
    let max = ((1u16 << bits) - 1) as u16;
    samples
        .iter()
        .map(|&s| (s as u16 * 255 / max) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use std::io::Cursor;

    fn embedded(
        color_space: ColorSpace,
        bits: u8,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> EmbeddedImage {
        EmbeddedImage {
            page: 1,
            index: 0,
            width,
            height,
            bits_per_component: bits,
            color_space,
            encoding: ImageEncoding::Raw,
            inverted: false,
            data,
        }
    }

    #[test]
    fn one_bit_gray_unpacks_to_black_and_white() {
        // 10 pixels wide: two bytes per row, last 6 bits padding.
        let data = vec![0b1010_1010, 0b1100_0000, 0b0000_0000, 0b0100_0000];
        let img = decode(&embedded(ColorSpace::Gray, 1, 10, 2, data)).expect("decode");
        assert_eq!(img.pixels.get_pixel(0, 0), &Luma([255]));
        assert_eq!(img.pixels.get_pixel(1, 0), &Luma([0]));
        assert_eq!(img.pixels.get_pixel(8, 0), &Luma([255]));
        assert_eq!(img.pixels.get_pixel(9, 0), &Luma([255]));
        assert_eq!(img.pixels.get_pixel(8, 1), &Luma([0]));
        assert_eq!(img.pixels.get_pixel(9, 1), &Luma([255]));
    }

    #[test]
    fn inverted_decode_flips_levels() {
        let mut image = embedded(ColorSpace::Gray, 8, 2, 1, vec![0, 255]);
        image.inverted = true;
        let img = decode(&image).expect("decode");
        assert_eq!(img.pixels.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn rgb_black_stays_black() {
        let data = vec![0, 0, 0, 255, 255, 255, 10, 0, 0];
        let img = decode(&embedded(ColorSpace::Rgb, 8, 3, 1, data)).expect("decode");
        assert_eq!(img.pixels.get_pixel(0, 0), &Luma([0]));
        assert_eq!(img.pixels.get_pixel(1, 0), &Luma([255]));
        assert_ne!(img.pixels.get_pixel(2, 0), &Luma([0]));
    }

    #[test]
    fn indexed_palette_lookup() {
        let cs = ColorSpace::Indexed {
            components: 3,
            palette: vec![255, 255, 255, 0, 0, 0],
        };
        let img = decode(&embedded(cs, 8, 2, 1, vec![1, 0])).expect("decode");
        assert_eq!(img.pixels.as_raw(), &vec![0, 255]);
    }

    #[test]
    fn truncated_samples_are_a_decode_error() {
        let result = decode(&embedded(ColorSpace::Gray, 8, 4, 4, vec![0; 10]));
        match result {
            Err(StampError::Decode { page, image, reason }) => {
                assert_eq!((page, image), (1, 0));
                assert!(reason.contains("too short"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_filters_are_rejected() {
        let mut image = embedded(ColorSpace::Gray, 8, 1, 1, vec![0]);
        image.encoding = ImageEncoding::Unsupported("JPXDecode".into());
        assert!(matches!(decode(&image), Err(StampError::Decode { .. })));
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let rgb = RgbImage::from_pixel(16, 8, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .expect("encode jpeg");
        let mut image = embedded(ColorSpace::Rgb, 8, 16, 8, bytes);
        image.encoding = ImageEncoding::Jpeg;
        let img = decode(&image).expect("decode");
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn garbage_jpeg_is_a_decode_error() {
        let mut image = embedded(ColorSpace::Rgb, 8, 1, 1, b"not a jpeg".to_vec());
        image.encoding = ImageEncoding::Jpeg;
        assert!(matches!(decode(&image), Err(StampError::Decode { .. })));
    }
}
