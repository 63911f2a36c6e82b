//! Image transcoding
//!
//! Decides whether an embedded raster image is worth touching, downsamples it
//! and re-encodes it as JPEG. Any failure along the way is reported as a
//! [`SkipReason`] and leaves the original image untouched.

use crate::tier::ImagePolicy;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fmt;
use std::io::Read;
use tracing::debug;

/// Images smaller than this in both dimensions are treated as icons
pub const MIN_TRANSCODE_DIMENSION: u32 = 100;

/// Dictionary entries carried over from the source image onto its replacement.
/// `/Mask` is only carried when it references a stencil mask stream.
const CARRIED_KEYS: [&[u8]; 7] = [
    b"SMask",
    b"Mask",
    b"Interpolate",
    b"Intent",
    b"OC",
    b"Metadata",
    b"StructParent",
];

/// One embedded raster image, read from the document by identity
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    /// Color channels, alpha included
    pub channels: u8,
    /// Alpha channels (1 when the image carries a soft mask)
    pub alpha: u8,
    pub bits_per_component: u32,
    /// Color space family name (`DeviceRGB`, `ICCBased`, ...)
    pub color_space: String,
    /// Stencil masks have no color data of their own
    pub is_stencil_mask: bool,
    pub stream: Stream,
}

impl ImageResource {
    /// Read an image XObject. Returns `None` if `stream` is not an image.
    pub fn from_stream(id: ObjectId, stream: &Stream, doc: &Document) -> Option<Self> {
        if !is_image_stream(stream) {
            return None;
        }

        let dict = &stream.dict;
        let width = dict_u32(dict, b"Width").unwrap_or(0);
        let height = dict_u32(dict, b"Height").unwrap_or(0);
        let bits_per_component = dict_u32(dict, b"BitsPerComponent").unwrap_or(8);
        let is_stencil_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));

        let (color_space, color_channels) = match dict.get(b"ColorSpace") {
            Ok(cs) => (
                get_color_space_name(cs, doc),
                color_channel_count(cs, doc).unwrap_or(3),
            ),
            Err(_) if is_stencil_mask => ("DeviceGray".to_string(), 1),
            Err(_) => ("Unknown".to_string(), 3),
        };

        let has_soft_mask = matches!(dict.get(b"SMask"), Ok(Object::Reference(_)))
            || dict_u32(dict, b"SMaskInData").unwrap_or(0) > 0;
        let alpha = u8::from(has_soft_mask);

        Some(ImageResource {
            id,
            width,
            height,
            channels: color_channels + alpha,
            alpha,
            bits_per_component,
            color_space,
            is_stencil_mask,
            stream: stream.clone(),
        })
    }

    /// Both dimensions below the icon threshold
    pub fn is_icon_sized(&self) -> bool {
        self.width < MIN_TRANSCODE_DIMENSION && self.height < MIN_TRANSCODE_DIMENSION
    }

    /// Channels carrying color, i.e. excluding alpha
    pub fn color_channels(&self) -> u8 {
        self.channels.saturating_sub(self.alpha)
    }

    /// First entry of the stream's `/Filter`, if any
    pub fn filter(&self) -> Option<String> {
        filter_names(&self.stream).into_iter().next()
    }
}

/// Why an image was left untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooSmall { width: u32, height: u32 },
    StencilMask,
    Unsupported(String),
    Decode(String),
    Encode(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooSmall { width, height } => {
                write!(f, "too small ({}x{})", width, height)
            }
            SkipReason::StencilMask => write!(f, "stencil mask"),
            SkipReason::Unsupported(what) => write!(f, "unsupported: {}", what),
            SkipReason::Decode(msg) => write!(f, "could not decode: {}", msg),
            SkipReason::Encode(msg) => write!(f, "could not encode: {}", msg),
        }
    }
}

/// Result of transcoding one image
#[derive(Debug, Clone)]
pub enum TranscodeOutcome {
    /// Replacement stream for the image identity
    Transcoded(Stream),
    Skipped(SkipReason),
}

/// Re-encodes a single image under a policy.
///
/// Implementations must be shareable across worker threads; the rewriter may
/// call them from a pool.
pub trait Transcoder: Sync {
    fn transcode(&self, image: &ImageResource, policy: &ImagePolicy) -> TranscodeOutcome;
}

/// Default transcoder: decode, convert to RGB when needed, Lanczos downscale,
/// optimized baseline JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegTranscoder;

impl Transcoder for JpegTranscoder {
    fn transcode(&self, image: &ImageResource, policy: &ImagePolicy) -> TranscodeOutcome {
        if image.is_icon_sized() {
            return TranscodeOutcome::Skipped(SkipReason::TooSmall {
                width: image.width,
                height: image.height,
            });
        }
        if image.is_stencil_mask {
            return TranscodeOutcome::Skipped(SkipReason::StencilMask);
        }

        match transcode_image(image, policy) {
            Ok(stream) => TranscodeOutcome::Transcoded(stream),
            Err(reason) => TranscodeOutcome::Skipped(reason),
        }
    }
}

fn transcode_image(image: &ImageResource, policy: &ImagePolicy) -> Result<Stream, SkipReason> {
    if image.stream.dict.has(b"Decode") {
        return Err(SkipReason::Unsupported("Decode array".to_string()));
    }
    if stream_predictor(&image.stream) > 1 {
        return Err(SkipReason::Unsupported("predictor".to_string()));
    }
    // Color-key masking needs exact sample values, which JPEG does not keep
    if matches!(image.stream.dict.get(b"Mask"), Ok(Object::Array(_))) {
        return Err(SkipReason::Unsupported("color key mask".to_string()));
    }

    let mut img = decode_image_stream(
        &image.stream,
        image.width,
        image.height,
        &image.color_space,
        image.color_channels(),
        image.bits_per_component,
    )
    .map_err(SkipReason::Decode)?;

    if image.color_channels() > 3 {
        img = DynamicImage::ImageRgb8(img.to_rgb8());
    }

    if img.width() > policy.max_width {
        let (target_width, target_height) =
            scaled_dimensions(img.width(), img.height(), policy.max_width);
        debug!(
            id = ?image.id,
            from_w = img.width(),
            from_h = img.height(),
            to_w = target_width,
            to_h = target_height,
            "Downscaling image"
        );
        img = resample_image(&img, target_width, target_height);
    }

    encode_as_jpeg_stream(&img, policy.quality, &image.stream.dict).map_err(SkipReason::Encode)
}

/// Dimensions after fitting `width` to `max_width`, keeping the aspect ratio
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled as u32).max(1))
}

/// Resample an image to target dimensions
fn resample_image(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    img.resize_exact(
        target_width,
        target_height,
        image::imageops::FilterType::Lanczos3,
    )
}

fn is_image_stream(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(n)) if *n >= 0 => u32::try_from(*n).ok(),
        _ => None,
    }
}

/// All filter names of a stream, in application order
fn filter_names(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| match f {
                Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `/Predictor` from the stream's decode parameters (1 when absent)
fn stream_predictor(stream: &Stream) -> i64 {
    let parms = match stream.dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(d)) => Some(d),
        Ok(Object::Array(arr)) => arr.iter().find_map(|p| match p {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }),
        _ => None,
    };
    parms
        .and_then(|d| d.get(b"Predictor").ok())
        .and_then(|p| p.as_i64().ok())
        .unwrap_or(1)
}

/// Get color space name from PDF object
fn get_color_space_name(obj: &Object, doc: &Document) -> String {
    match obj {
        Object::Name(name) => String::from_utf8_lossy(name).to_string(),
        Object::Array(arr) => {
            if let Some(Object::Name(name)) = arr.first() {
                String::from_utf8_lossy(name).to_string()
            } else {
                "Unknown".to_string()
            }
        }
        Object::Reference(id) => {
            if let Ok(resolved) = doc.get_object(*id) {
                get_color_space_name(resolved, doc)
            } else {
                "Unknown".to_string()
            }
        }
        _ => "Unknown".to_string(),
    }
}

/// Number of color components a color space produces per pixel
fn color_channel_count(obj: &Object, doc: &Document) -> Option<u8> {
    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"Lab" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(arr) => {
            let family = match arr.first() {
                Some(Object::Name(n)) => n.as_slice(),
                _ => return None,
            };
            match family {
                b"ICCBased" => {
                    let profile = match arr.get(1)? {
                        Object::Reference(id) => doc.get_object(*id).ok()?,
                        other => other,
                    };
                    match profile {
                        Object::Stream(s) => s
                            .dict
                            .get(b"N")
                            .ok()
                            .and_then(|n| n.as_i64().ok())
                            .and_then(|n| u8::try_from(n).ok()),
                        _ => None,
                    }
                }
                b"Indexed" | b"I" | b"Separation" | b"CalGray" => Some(1),
                b"CalRGB" | b"Lab" => Some(3),
                b"DeviceN" => match arr.get(1)? {
                    Object::Array(names) => u8::try_from(names.len()).ok(),
                    _ => None,
                },
                _ => color_channel_count(arr.first()?, doc),
            }
        }
        Object::Reference(id) => color_channel_count(doc.get_object(*id).ok()?, doc),
        _ => None,
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| e.to_string())?;
    Ok(decoded)
}

/// Decode a PDF image stream into a pixel buffer
fn decode_image_stream(
    stream: &Stream,
    width: u32,
    height: u32,
    color_space: &str,
    color_channels: u8,
    bits_per_component: u32,
) -> Result<DynamicImage, String> {
    let mut data = stream.content.clone();

    for filter in filter_names(stream) {
        match filter.as_str() {
            "FlateDecode" | "Fl" => data = inflate(&data)?,
            "DCTDecode" | "DCT" => {
                return image::load_from_memory_with_format(&data, ImageFormat::Jpeg)
                    .map_err(|e| format!("Failed to decode JPEG image: {}", e));
            }
            "JPXDecode" => {
                return image::load_from_memory(&data)
                    .map_err(|e| format!("Failed to decode JPEG2000 image: {}", e));
            }
            other => return Err(format!("Unsupported filter: {}", other)),
        }
    }

    if bits_per_component != 8 {
        return Err(format!("Unsupported bit depth: {}", bits_per_component));
    }
    if matches!(color_space, "Indexed" | "I" | "Lab" | "Separation" | "DeviceN") {
        return Err(format!("Unsupported color space: {}", color_space));
    }

    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| format!("{}x{} is too large to decode", width, height))?;
    let sample_count = |channels: usize| {
        pixels
            .checked_mul(channels)
            .ok_or_else(|| format!("{}x{} is too large to decode", width, height))
    };

    match color_channels {
        1 => {
            if data.len() < pixels {
                return Err(size_mismatch("grayscale", data.len(), pixels));
            }
            data.truncate(pixels);
            let img = image::GrayImage::from_raw(width, height, data)
                .ok_or("Failed to create grayscale image from raw data")?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        3 => {
            let expected = sample_count(3)?;
            if data.len() < expected {
                return Err(size_mismatch("RGB", data.len(), expected));
            }
            data.truncate(expected);
            let img = RgbImage::from_raw(width, height, data)
                .ok_or("Failed to create RGB image from raw data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        4 => {
            let expected = sample_count(4)?;
            if data.len() < expected {
                return Err(size_mismatch("CMYK", data.len(), expected));
            }
            let img = RgbImage::from_raw(width, height, cmyk_to_rgb(&data[..expected]))
                .ok_or("Failed to create RGB image from CMYK data")?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        n => Err(format!("Unsupported channel count: {}", n)),
    }
}

fn size_mismatch(kind: &str, got: usize, expected: usize) -> String {
    format!(
        "{} data size mismatch: got {} bytes, expected {}",
        kind, got, expected
    )
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for chunk in cmyk.chunks_exact(4) {
        let c = chunk[0] as f32 / 255.0;
        let m = chunk[1] as f32 / 255.0;
        let y = chunk[2] as f32 / 255.0;
        let k = chunk[3] as f32 / 255.0;

        rgb.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
        rgb.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
        rgb.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
    }
    rgb
}

/// Encode an image as JPEG and create a PDF image stream.
///
/// Grayscale buffers stay grayscale; everything else is written as RGB.
/// Entries such as `/SMask` are copied from `source` so the replacement keeps
/// its soft mask and optional-content membership.
fn encode_as_jpeg_stream(
    img: &DynamicImage,
    quality: u8,
    source: &Dictionary,
) -> Result<Stream, String> {
    let (width, height) = (img.width(), img.height());
    if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
        return Err(format!("{}x{} exceeds JPEG dimensions", width, height));
    }

    let (raw, color_type, color_space) = match img {
        DynamicImage::ImageLuma8(gray) => (
            gray.as_raw().clone(),
            jpeg_encoder::ColorType::Luma,
            &b"DeviceGray"[..],
        ),
        _ => (
            img.to_rgb8().into_raw(),
            jpeg_encoder::ColorType::Rgb,
            &b"DeviceRGB"[..],
        ),
    };

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
    encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(&raw, width as u16, height as u16, color_type)
        .map_err(|e| format!("Failed to encode JPEG: {}", e))?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Length", Object::Integer(jpeg_bytes.len() as i64));
    for key in CARRIED_KEYS {
        if let Ok(value) = source.get(key) {
            dict.set(key.to_vec(), value.clone());
        }
    }

    Ok(Stream::new(dict, jpeg_bytes).with_compression(false))
}
