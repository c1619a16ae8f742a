//! Image dimensions and resolution.
//!
//! The format is sniffed and the pixel size read through `image`'s
//! `ImageReader`. Pixel density comes from the codec crates that expose it:
//! `png` (`pHYs`) and `tiff` (`XResolution`, `YResolution`,
//! `ResolutionUnit`). JPEG density is taken from the JFIF `APP0` segment.
//! Pixel data is never decoded.

use image::ImageReader;
use std::{error::Error as StdError, fmt, io::Cursor, path::Path};
use thiserror::Error;
use tiff::{decoder::ifd::Value, tags::Tag};

#[derive(Debug, Error)]
pub enum ExifError {
    #[error("Failed to read image '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Truncated or corrupt {format} image: {source}")]
    Corrupt {
        format: ImageFormat,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl ExifError {
    fn corrupt(format: ImageFormat, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Corrupt {
            format,
            source: Box::new(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Tiff => "TIFF",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionUnit {
    /// Values only give the aspect ratio.
    None,
    Inches,
    Centimeters,
}

impl fmt::Display for ResolutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionUnit::None => "none",
            ResolutionUnit::Inches => "inches",
            ResolutionUnit::Centimeters => "cm",
        })
    }
}

/// Header metadata of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrdExif {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub x_resolution: Option<f64>,
    pub y_resolution: Option<f64>,
    pub resolution_unit: ResolutionUnit,
}

struct Density {
    x: Option<f64>,
    y: Option<f64>,
    unit: ResolutionUnit,
}

impl Density {
    const UNKNOWN: Density = Density {
        x: None,
        y: None,
        unit: ResolutionUnit::None,
    };
}

impl OcrdExif {
    pub fn from_path(path: &Path) -> Result<Self, ExifError> {
        let bytes = std::fs::read(path).map_err(|source| ExifError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExifError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|_| ExifError::UnknownFormat)?;
        let format = match reader.format() {
            Some(image::ImageFormat::Png) => ImageFormat::Png,
            Some(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Some(image::ImageFormat::Tiff) => ImageFormat::Tiff,
            _ => return Err(ExifError::UnknownFormat),
        };
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ExifError::corrupt(format, e))?;
        let density = match format {
            ImageFormat::Png => png_density(bytes).map_err(|e| ExifError::corrupt(format, e))?,
            ImageFormat::Jpeg => jfif_density(bytes),
            ImageFormat::Tiff => tiff_density(bytes).map_err(|e| ExifError::corrupt(format, e))?,
        };
        Ok(Self {
            format,
            width,
            height,
            x_resolution: density.x,
            y_resolution: density.y,
            resolution_unit: density.unit,
        })
    }

    /// Horizontal resolution in pixels per inch. Unitless values are
    /// returned unchanged.
    pub fn x_ppi(&self) -> Option<f64> {
        self.x_resolution.map(|v| self.to_ppi(v))
    }

    /// Vertical resolution in pixels per inch.
    pub fn y_ppi(&self) -> Option<f64> {
        self.y_resolution.map(|v| self.to_ppi(v))
    }

    fn to_ppi(&self, value: f64) -> f64 {
        match self.resolution_unit {
            ResolutionUnit::Centimeters => value * 2.54,
            ResolutionUnit::Inches | ResolutionUnit::None => value,
        }
    }
}

fn png_density(bytes: &[u8]) -> Result<Density, png::DecodingError> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info()?;
    Ok(match reader.info().pixel_dims {
        // pixels per meter, reported as rounded dpi
        Some(dims) if matches!(dims.unit, png::Unit::Meter) => Density {
            x: Some((f64::from(dims.xppu) * 0.0254).round()),
            y: Some((f64::from(dims.yppu) * 0.0254).round()),
            unit: ResolutionUnit::Inches,
        },
        Some(dims) => Density {
            x: Some(f64::from(dims.xppu)),
            y: Some(f64::from(dims.yppu)),
            unit: ResolutionUnit::None,
        },
        None => Density::UNKNOWN,
    })
}

fn tiff_density(bytes: &[u8]) -> Result<Density, tiff::TiffError> {
    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes))?;
    // inches when the tag is absent
    let unit = match decoder.find_tag_unsigned::<u16>(Tag::ResolutionUnit)? {
        Some(1) => ResolutionUnit::None,
        Some(3) => ResolutionUnit::Centimeters,
        _ => ResolutionUnit::Inches,
    };
    Ok(Density {
        x: rational(decoder.find_tag(Tag::XResolution)?),
        y: rational(decoder.find_tag(Tag::YResolution)?),
        unit,
    })
}

fn rational(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Rational(n, d) if d != 0 => Some(f64::from(n) / f64::from(d)),
        Value::Short(v) => Some(f64::from(v)),
        Value::Unsigned(v) => Some(f64::from(v)),
        _ => None,
    }
}

/// Density from the JFIF `APP0` segment right after SOI.
fn jfif_density(bytes: &[u8]) -> Density {
    let Some(data) = bytes
        .get(2..)
        .filter(|b| b.starts_with(&[0xFF, 0xE0]))
        .and_then(|app0| app0.get(4..18))
        .filter(|d| d.starts_with(b"JFIF\0"))
    else {
        return Density::UNKNOWN;
    };
    let unit = match data[7] {
        1 => ResolutionUnit::Inches,
        2 => ResolutionUnit::Centimeters,
        _ => ResolutionUnit::None,
    };
    Density {
        x: Some(f64::from(u16::from_be_bytes([data[8], data[9]]))),
        y: Some(f64::from(u16::from_be_bytes([data[10], data[11]]))),
        unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{
        ExtendedColorType,
        codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit},
    };
    use tiff::encoder::{Rational, TiffEncoder, colortype};

    /// A grayscale PNG; `ppm` is pixels per meter when given.
    fn png_bytes(width: u32, height: u32, ppm: Option<u32>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(ppm.map(|p| png::PixelDimensions {
            xppu: p,
            yppu: p,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header().unwrap();
        writer
            .write_image_data(&vec![0; (width * height) as usize])
            .unwrap();
        writer.finish().unwrap();
        out
    }

    fn tiff_bytes(width: u32, height: u32, unit: tiff::tags::ResolutionUnit, x: u32, y: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut out).unwrap();
            let mut image = encoder.new_image::<colortype::Gray8>(width, height).unwrap();
            image.resolution_unit(unit);
            image.x_resolution(Rational { n: x, d: 1 });
            image.y_resolution(Rational { n: y, d: 1 });
            image
                .write_data(&vec![0; (width * height) as usize])
                .unwrap();
        }
        out.into_inner()
    }

    #[test]
    fn test_png_with_density() {
        // 300 dpi = 11811 pixels per meter
        let exif = OcrdExif::from_bytes(&png_bytes(20, 30, Some(11811))).unwrap();
        assert_eq!(exif.format, ImageFormat::Png);
        assert_eq!((exif.width, exif.height), (20, 30));
        assert_eq!(exif.x_resolution, Some(300.0));
        assert_eq!(exif.resolution_unit, ResolutionUnit::Inches);
    }

    #[test]
    fn test_png_without_density() {
        let exif = OcrdExif::from_bytes(&png_bytes(10, 20, None)).unwrap();
        assert_eq!(exif.x_resolution, None);
        assert_eq!(exif.resolution_unit, ResolutionUnit::None);
    }

    #[test]
    fn test_jpeg_jfif_density() {
        let mut jpeg = Vec::new();
        {
            let mut encoder = JpegEncoder::new(&mut jpeg);
            encoder.set_pixel_density(PixelDensity {
                density: (300, 150),
                unit: PixelDensityUnit::Inches,
            });
            encoder
                .encode(&[128; 60 * 40], 60, 40, ExtendedColorType::L8)
                .unwrap();
        }
        let exif = OcrdExif::from_bytes(&jpeg).unwrap();
        assert_eq!(exif.format, ImageFormat::Jpeg);
        assert_eq!((exif.width, exif.height), (60, 40));
        assert_eq!(exif.x_resolution, Some(300.0));
        assert_eq!(exif.y_resolution, Some(150.0));
        assert_eq!(exif.resolution_unit, ResolutionUnit::Inches);
    }

    #[test]
    fn test_tiff_centimeters() {
        let tiff = tiff_bytes(64, 48, tiff::tags::ResolutionUnit::Centimeter, 150, 75);
        let exif = OcrdExif::from_bytes(&tiff).unwrap();
        assert_eq!(exif.format, ImageFormat::Tiff);
        assert_eq!((exif.width, exif.height), (64, 48));
        assert_eq!(exif.x_resolution, Some(150.0));
        assert_eq!(exif.y_resolution, Some(75.0));
        assert_eq!(exif.resolution_unit, ResolutionUnit::Centimeters);
        assert_eq!(exif.x_ppi(), Some(381.0));
    }

    #[test]
    fn test_ppi_keeps_inches_and_unitless() {
        let tiff = tiff_bytes(8, 8, tiff::tags::ResolutionUnit::Inch, 300, 300);
        let exif = OcrdExif::from_bytes(&tiff).unwrap();
        assert_eq!(exif.y_ppi(), Some(300.0));
        let tiff = tiff_bytes(8, 8, tiff::tags::ResolutionUnit::None, 2, 1);
        let exif = OcrdExif::from_bytes(&tiff).unwrap();
        assert_eq!(exif.resolution_unit, ResolutionUnit::None);
        assert_eq!(exif.x_ppi(), Some(2.0));
    }

    #[test]
    fn test_unknown_format() {
        assert!(matches!(
            OcrdExif::from_bytes(b"plain text, not an image"),
            Err(ExifError::UnknownFormat)
        ));
        assert!(matches!(
            OcrdExif::from_bytes(b"\x89PNG\r\n\x1a\n"),
            Err(ExifError::Corrupt {
                format: ImageFormat::Png,
                ..
            })
        ));
    }
}
