//! Image XObjects for the logo.
//!
//! Per ISO 32000-1 Section 8.9, images are embedded as XObjects:
//! - **JPEG**: pass-through with the DCTDecode filter; the color space is
//!   taken from the frame header's component count
//! - **PNG**: decoded, alpha split into a soft mask, Flate-compressed

use crate::document::{ImageBlock, ImageFormat};
use crate::error::{Error, Result};
use crate::pdf::{Dict, Object};
use bytes::Bytes;
use std::io::Write;

/// Maximum logo box on the cover, in points.
const LOGO_MAX_WIDTH: f32 = 160.0;
const LOGO_MAX_HEIGHT: f32 = 60.0;

/// Display size of a logo in points, preserving aspect ratio.
pub fn logo_size(image: &ImageBlock) -> (f32, f32) {
    let (w, h) = (image.width_px.max(1) as f32, image.height_px.max(1) as f32);
    let scale = (LOGO_MAX_WIDTH / w).min(LOGO_MAX_HEIGHT / h);
    (w * scale, h * scale)
}

/// Image ready to be written: the XObject plus its optional soft mask.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Image XObject (without `/SMask`; the writer links it)
    pub xobject: Object,
    /// Alpha channel as a DeviceGray image XObject
    pub soft_mask: Option<Object>,
}

impl EmbeddedImage {
    /// Build the XObjects for an image block.
    pub fn from_block(image: &ImageBlock) -> Result<Self> {
        match image.format {
            ImageFormat::Jpeg => match jpeg_components(&image.data) {
                Some(components) => Ok(Self::jpeg(image, components)),
                // Unusual JPEG layouts are re-encoded losslessly
                None => Self::decoded(image),
            },
            ImageFormat::Png => Self::decoded(image),
        }
    }

    fn jpeg(image: &ImageBlock, components: u8) -> Self {
        let color_space = match components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };
        let mut dict: Dict = [
            ("Type", Object::name("XObject")),
            ("Subtype", Object::name("Image")),
            ("Width", Object::Integer(image.width_px as i64)),
            ("Height", Object::Integer(image.height_px as i64)),
            ("ColorSpace", Object::name(color_space)),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::name("DCTDecode")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        if components == 4 {
            // Adobe CMYK JPEGs are stored inverted
            dict.insert(
                "Decode".to_string(),
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].into_iter().map(Object::Integer).collect()),
            );
        }
        Self {
            xobject: Object::Stream {
                dict,
                data: Bytes::from(image.data.clone()),
            },
            soft_mask: None,
        }
    }

    fn decoded(image: &ImageBlock) -> Result<Self> {
        let format = match image.format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        };
        let decoded = image::load_from_memory_with_format(&image.data, format)
            .map_err(|e| Error::Serialize(format!("logo could not be decoded: {}", e)))?;
        let (width, height) = (decoded.width(), decoded.height());

        let soft_mask = if decoded.color().has_alpha() {
            let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
            Some(flate_image(width, height, "DeviceGray", &alpha)?)
        } else {
            None
        };
        let rgb = decoded.to_rgb8().into_raw();
        Ok(Self {
            xobject: flate_image(width, height, "DeviceRGB", &rgb)?,
            soft_mask,
        })
    }
}

fn flate_image(width: u32, height: u32, color_space: &str, samples: &[u8]) -> Result<Object> {
    let data = compress(samples)?;
    let dict = [
        ("Type", Object::name("XObject")),
        ("Subtype", Object::name("Image")),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::name(color_space)),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::name("FlateDecode")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    Ok(Object::Stream {
        dict,
        data: Bytes::from(data),
    })
}

/// Zlib-compress data for the FlateDecode filter.
pub(crate) fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Component count from the first SOF marker of a baseline or progressive JPEG.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        match marker {
            0xC0 | 0xC1 | 0xC2 => {
                // length(2) precision(1) height(2) width(2) components(1)
                return data.get(i + 9).copied();
            },
            0xD9 | 0xDA => return None,
            _ => i += 2 + len,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
        let img = if alpha {
            image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([10, 20, 30, 128]),
            ))
        } else {
            image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
                width,
                height,
                image::Rgb([10, 20, 30]),
            ))
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageOutputFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn assert_size(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-3 && (actual.1 - expected.1).abs() < 1e-3,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_logo_size_keeps_aspect_ratio() {
        let block = ImageBlock {
            data: vec![],
            format: ImageFormat::Png,
            width_px: 400,
            height_px: 100,
        };
        assert_size(logo_size(&block), (160.0, 40.0));
        let tall = ImageBlock {
            width_px: 100,
            height_px: 400,
            ..block
        };
        assert_size(logo_size(&tall), (15.0, 60.0));
    }

    #[test]
    fn test_png_with_alpha_gets_soft_mask() {
        let block = ImageBlock {
            data: png_bytes(4, 3, true),
            format: ImageFormat::Png,
            width_px: 4,
            height_px: 3,
        };
        let embedded = EmbeddedImage::from_block(&block).unwrap();
        assert!(embedded.soft_mask.is_some());
        match embedded.xobject {
            Object::Stream { dict, .. } => {
                assert_eq!(dict.get("Filter").and_then(Object::as_name), Some("FlateDecode"));
                assert_eq!(dict.get("Width").and_then(Object::as_integer), Some(4));
            },
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_opaque_png_has_no_mask() {
        let block = ImageBlock {
            data: png_bytes(2, 2, false),
            format: ImageFormat::Png,
            width_px: 2,
            height_px: 2,
        };
        assert!(EmbeddedImage::from_block(&block).unwrap().soft_mask.is_none());
    }

    #[test]
    fn test_jpeg_components() {
        // SOI, APP0 (len 4), SOF0 with 3 components
        let data = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00,
            0x10, 0x00, 0x10, 0x03,
        ];
        assert_eq!(jpeg_components(&data), Some(3));
        assert_eq!(jpeg_components(b"not a jpeg"), None);
    }
}
