use std::collections::HashMap;

use crate::config::ImagingConfig;
use crate::error::{GreenlabelError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader, Luma, Rgb, RgbImage};

/// Sigma of the unsharp mask applied in both modes.
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessMode {
    /// Binarized grayscale on a white square canvas, for barcode decoding and label OCR.
    Barcode,
    /// Colour-preserving, bounded size, for logo keyword and colour detection.
    Logo,
}

impl std::fmt::Display for PreprocessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Barcode => write!(f, "barcode"),
            Self::Logo => write!(f, "logo"),
        }
    }
}

/// Pixel buffer produced by [`preprocess_image`].
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    image: DynamicImage,
    mode: PreprocessMode,
}

impl PreprocessedImage {
    pub fn new(image: DynamicImage, mode: PreprocessMode) -> Self {
        Self { image, mode }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn mode(&self) -> PreprocessMode {
        self.mode
    }

    /// Per-pixel luminance as the unweighted mean of R, G and B, row-major.
    pub fn luminance(&self) -> Vec<u8> {
        match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.as_raw().clone(),
            other => other
                .to_rgb8()
                .pixels()
                .map(|p| ((p[0] as u16 + p[1] as u16 + p[2] as u16) / 3) as u8)
                .collect(),
        }
    }

    /// Photometric negative of the same buffer.
    pub fn inverted(&self) -> Self {
        let mut image = self.image.clone();
        image.invert();
        Self {
            image,
            mode: self.mode,
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.image
            .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| GreenlabelError::Preprocess(format!("Failed to encode image: {e}")))?;
        Ok(output)
    }

    pub fn dominant_color(&self) -> [u8; 3] {
        dominant_color(&self.image.to_rgb8())
    }
}

/// Decode `bytes` and run the pipeline for `mode`. Pure and CPU bound.
pub fn preprocess_image_blocking(
    bytes: &[u8],
    mode: PreprocessMode,
    config: &ImagingConfig,
) -> Result<PreprocessedImage> {
    let img = decode(bytes)?;

    let image = match mode {
        PreprocessMode::Barcode => DynamicImage::ImageLuma8(barcode_pipeline(img, config)),
        PreprocessMode::Logo => DynamicImage::ImageRgb8(logo_pipeline(img, config)),
    };

    tracing::debug!(
        mode = %mode,
        width = image.width(),
        height = image.height(),
        "Image preprocessed"
    );

    Ok(PreprocessedImage { image, mode })
}

/// Async entry point; the pixel work runs on the blocking pool.
pub async fn preprocess_image(
    bytes: Vec<u8>,
    mode: PreprocessMode,
    config: &ImagingConfig,
) -> Result<PreprocessedImage> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || preprocess_image_blocking(&bytes, mode, &config))
        .await
        .map_err(|e| GreenlabelError::Internal(format!("Preprocessing task panicked: {e}")))?
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GreenlabelError::Preprocess(format!("Failed to read image: {e}")))?;

    reader
        .decode()
        .map_err(|e| GreenlabelError::Preprocess(format!("Failed to decode image: {e}")))
}

fn barcode_pipeline(img: DynamicImage, config: &ImagingConfig) -> GrayImage {
    let gray = img.to_luma8();
    let gray = linear_contrast(gray, config.barcode_contrast_gain);
    let gray = enhance_grayscale_contrast(gray);
    let gray = imageops::unsharpen(&gray, SHARPEN_SIGMA, SHARPEN_THRESHOLD);
    let gray = binarize(gray, config.barcode_threshold);
    fit_on_white_canvas(&gray, config.barcode_canvas_size)
}

fn logo_pipeline(img: DynamicImage, config: &ImagingConfig) -> RgbImage {
    let img = resize_if_needed(img, config.logo_max_dimension);
    let rgb = normalize_channels(img.to_rgb8());
    imageops::unsharpen(&rgb, SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// `v * gain`, clamped to the u8 range.
fn linear_contrast(mut gray: GrayImage, gain: f32) -> GrayImage {
    for pixel in gray.pixels_mut() {
        pixel[0] = (pixel[0] as f32 * gain).round().clamp(0.0, 255.0) as u8;
    }
    gray
}

/// Maps the darkest pixel to 0 and the lightest to 255, linearly in between.
fn enhance_grayscale_contrast(gray: GrayImage) -> GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0];
        let normalized = (value - min_val) as f32 / range;
        Luma([(normalized * 255.0).round() as u8])
    })
}

/// Histogram stretch applied to each colour channel independently.
fn normalize_channels(mut rgb: RgbImage) -> RgbImage {
    let mut lo = [u8::MAX; 3];
    let mut hi = [u8::MIN; 3];
    for pixel in rgb.pixels() {
        for c in 0..3 {
            lo[c] = lo[c].min(pixel[c]);
            hi[c] = hi[c].max(pixel[c]);
        }
    }

    for pixel in rgb.pixels_mut() {
        for c in 0..3 {
            if hi[c] > lo[c] {
                let range = (hi[c] - lo[c]) as f32;
                pixel[c] = (((pixel[c] - lo[c]) as f32 / range) * 255.0).round() as u8;
            }
        }
    }
    rgb
}

fn binarize(mut gray: GrayImage, threshold: u8) -> GrayImage {
    for pixel in gray.pixels_mut() {
        pixel[0] = if pixel[0] >= threshold { 255 } else { 0 };
    }
    gray
}

/// Scale to fit inside a `size`x`size` square, centred on white padding.
fn fit_on_white_canvas(gray: &GrayImage, size: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let ratio = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_width = ((width as f32 * ratio).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * ratio).round() as u32).clamp(1, size);

    // nearest keeps the bitmap binary
    let resized = imageops::resize(gray, new_width, new_height, FilterType::Nearest);

    let mut canvas = GrayImage::from_pixel(size, size, Luma([255]));
    let x = (size - new_width) / 2;
    let y = (size - new_height) / 2;
    imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
    canvas
}

/// Downscale so both sides fit within `max_dim`, never enlarging.
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();

    if width <= max_dim && height <= max_dim {
        return img;
    }

    let ratio = if width > height {
        max_dim as f32 / width as f32
    } else {
        max_dim as f32 / height as f32
    };

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

/// Most frequent colour after quantizing each channel to 16 levels,
/// reported as the centre of the winning bin.
pub fn dominant_color(rgb: &RgbImage) -> [u8; 3] {
    let mut bins: HashMap<[u8; 3], u32> = HashMap::new();
    for pixel in rgb.pixels() {
        let Rgb([r, g, b]) = *pixel;
        *bins.entry([r >> 4, g >> 4, b >> 4]).or_insert(0) += 1;
    }

    bins.into_iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(bin, _)| bin.map(|v| (v << 4) | 8))
        .unwrap_or([0, 0, 0])
}
