use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, Frame, ImageEncoder, ImageReader, RgbImage};
use img_parts::{Bytes, DynImage, ImageEXIF};
use printpdf::{
    ColorBits, ColorSpace, Image as PdfImage, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use super::batch::Converter;
use super::formats::TargetFormat;
use crate::error::{ConversionError, ConversionFailure};

pub const COMPRESSED_QUALITY: u8 = 85;
pub const FULL_QUALITY: u8 = 100;
/// libwebp effort level; 6 is the slowest and smallest.
pub const WEBP_METHOD: i32 = 6;
pub const ICON_SIZE: u32 = 256;
/// Pixels per inch used to size PDF pages.
pub const PDF_DPI: f32 = 100.0;
const MM_PER_INCH: f32 = 25.4;
/// NeuQuant sampling factor, 1 samples every pixel.
const GIF_QUANTIZE_SPEED: i32 = 1;

/// Encoder settings chosen for a target format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveParams {
    Jpeg { quality: u8 },
    Png { optimize: bool },
    Webp { quality: u8, method: i32 },
    Gif,
    Icon { size: u32 },
    Pdf { dpi: f32 },
    Passthrough(TargetFormat),
}

impl SaveParams {
    pub fn for_format(format: TargetFormat, max_compression: bool) -> Self {
        let quality = if max_compression { COMPRESSED_QUALITY } else { FULL_QUALITY };
        match format {
            TargetFormat::Jpg | TargetFormat::Jpeg => SaveParams::Jpeg { quality },
            TargetFormat::Png => SaveParams::Png { optimize: max_compression },
            TargetFormat::Webp => SaveParams::Webp { quality, method: WEBP_METHOD },
            TargetFormat::Gif => SaveParams::Gif,
            TargetFormat::Ico => SaveParams::Icon { size: ICON_SIZE },
            TargetFormat::Pdf => SaveParams::Pdf { dpi: PDF_DPI },
            other => SaveParams::Passthrough(other),
        }
    }

    /// Containers that carry an EXIF blob. Icons and PDFs are written
    /// before metadata is considered, so they never receive one.
    pub fn accepts_exif(&self) -> bool {
        matches!(
            self,
            SaveParams::Jpeg { .. } | SaveParams::Png { .. } | SaveParams::Webp { .. }
        )
    }
}

pub fn output_path(source: &Path, format: TargetFormat, output_dir: &Path) -> Option<PathBuf> {
    let mut name = source.file_stem()?.to_os_string();
    name.push(".");
    name.push(format.token());
    Some(output_dir.join(name))
}

/// Converts `source` into `output_dir/<stem>.<token>` and returns the written path.
pub fn convert(
    source: &Path,
    format: TargetFormat,
    output_dir: &Path,
    preserve_metadata: bool,
    max_compression: bool,
) -> Result<PathBuf, ConversionError> {
    convert_file(source, format, output_dir, preserve_metadata, max_compression)
        .map_err(|e| ConversionError::new(source, e))
}

/// The [`Converter`] used by the batch controller outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageExporter;

impl Converter for ImageExporter {
    fn convert(
        &self,
        source: &Path,
        format: TargetFormat,
        output_dir: &Path,
        preserve_metadata: bool,
        max_compression: bool,
    ) -> Result<PathBuf, ConversionError> {
        convert(source, format, output_dir, preserve_metadata, max_compression)
    }
}

fn convert_file(
    source: &Path,
    format: TargetFormat,
    output_dir: &Path,
    preserve_metadata: bool,
    max_compression: bool,
) -> Result<PathBuf, ConversionFailure> {
    let bytes = fs::read(source)?;
    let img = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()?
        .decode()?;

    let save_path = output_path(source, format, output_dir).ok_or(ConversionFailure::InvalidFileName)?;
    let params = SaveParams::for_format(format, max_compression);

    let encoded = match params {
        SaveParams::Icon { size } => {
            let icon = DynamicImage::ImageRgba8(
                img.resize_exact(size, size, FilterType::Lanczos3).to_rgba8(),
            );
            icon.save_with_format(&save_path, image::ImageFormat::Ico)?;
            return Ok(save_path);
        }
        SaveParams::Pdf { dpi } => {
            write_pdf(&img, dpi, &save_path)?;
            return Ok(save_path);
        }
        SaveParams::Jpeg { quality } => encode_jpeg(&img.to_rgb8(), quality)?,
        SaveParams::Png { optimize } => encode_png(&img, optimize)?,
        SaveParams::Webp { quality, method } => encode_webp(&img, quality, method)?,
        SaveParams::Gif => encode_gif(&img)?,
        SaveParams::Passthrough(format) => encode_passthrough(&img, format)?,
    };

    let encoded = match preserve_metadata.then(|| source_exif(&bytes)).flatten() {
        Some(exif) if params.accepts_exif() => splice_exif(encoded, exif)?,
        _ => encoded,
    };

    fs::write(&save_path, encoded)?;
    Ok(save_path)
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, ConversionFailure> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// One page, sized so the image covers it exactly at `dpi`.
fn write_pdf(img: &DynamicImage, dpi: f32, path: &Path) -> Result<(), ConversionFailure> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let page_w = Mm(width as f32 * MM_PER_INCH / dpi);
    let page_h = Mm(height as f32 * MM_PER_INCH / dpi);

    let (doc, page, layer) = PdfDocument::new("Prism export", page_w, page_h, "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);

    let image = PdfImage::from(ImageXObject {
        width: Px(width as usize),
        height: Px(height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: rgb.into_raw(),
        image_filter: None,
        clipping_bbox: None,
        smask: None,
    });
    image.add_to_layer(
        layer,
        ImageTransform {
            dpi: Some(dpi),
            ..Default::default()
        },
    );

    let mut writer = BufWriter::new(File::create(path)?);
    doc.save(&mut writer).map_err(|e| ConversionFailure::Encode {
        format: TargetFormat::Pdf,
        message: format!("{e:?}"),
    })?;
    Ok(())
}

fn encode_png(img: &DynamicImage, optimize: bool) -> Result<Vec<u8>, ConversionFailure> {
    let compression = if optimize {
        CompressionType::Best
    } else {
        CompressionType::Default
    };
    let img = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(img.to_rgba16())
        }
        other => other.clone(),
    };

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive).write_image(
        img.as_bytes(),
        img.width(),
        img.height(),
        img.color().into(),
    )?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: u8, method: i32) -> Result<Vec<u8>, ConversionFailure> {
    let encode_error = |message: String| ConversionFailure::Encode {
        format: TargetFormat::Webp,
        message,
    };

    // The libwebp bindings only accept 8-bit RGB(A) buffers.
    let prepared = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&prepared).map_err(|e| encode_error(e.to_string()))?;

    let mut config = webp::WebPConfig::new()
        .map_err(|_| encode_error("invalid encoder configuration".to_string()))?;
    config.lossless = 0;
    config.quality = f32::from(quality);
    config.method = method;

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| encode_error(format!("{e:?}")))?;
    Ok(memory.to_vec())
}

fn encode_gif(img: &DynamicImage) -> Result<Vec<u8>, ConversionFailure> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buf, GIF_QUANTIZE_SPEED);
        encoder.encode_frame(Frame::new(img.to_rgba8()))?;
    }
    Ok(buf)
}

fn encode_passthrough(img: &DynamicImage, format: TargetFormat) -> Result<Vec<u8>, ConversionFailure> {
    let image_format = image::ImageFormat::from_extension(format.token())
        .filter(|f| f.writing_enabled())
        .ok_or(ConversionFailure::Unsupported(format))?;

    let img = match image_format {
        image::ImageFormat::Bmp if img.color().has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        image::ImageFormat::Bmp => DynamicImage::ImageRgb8(img.to_rgb8()),
        image::ImageFormat::Tiff => match img {
            DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(img.to_rgba8()),
            DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgba16(img.to_rgba16()),
            other => other.clone(),
        },
        _ => img.clone(),
    };

    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, image_format)?;
    Ok(cursor.into_inner())
}

fn source_exif(bytes: &[u8]) -> Option<Bytes> {
    DynImage::from_bytes(Bytes::copy_from_slice(bytes))
        .ok()
        .flatten()
        .and_then(|image| image.exif())
}

fn splice_exif(encoded: Vec<u8>, exif: Bytes) -> Result<Vec<u8>, ConversionFailure> {
    let encoded = Bytes::from(encoded);
    match DynImage::from_bytes(encoded.clone())? {
        Some(mut container) => {
            container.set_exif(Some(exif));
            let mut out = Vec::with_capacity(encoded.len());
            container.encoder().write_to(&mut out)?;
            Ok(out)
        }
        None => Ok(encoded.to_vec()),
    }
}
