//! Loading image references and turning them into embeddable pixels.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbaImage;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

const MAX_REMOTE_BYTES: u64 = 32 * 1024 * 1024;

/// Largest SVG canvas rasterized, in pixels (64 MiB of RGBA).
pub const MAX_RASTER_PIXELS: u64 = 4096 * 4096;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("empty image reference")]
    Empty,
    #[error("malformed data URI")]
    InvalidDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to fetch {url}: {message}")]
    Http { url: String, message: String },
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image data: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid SVG: {0}")]
    Svg(String),
    #[error("SVG canvas {width}x{height} exceeds {MAX_RASTER_PIXELS} pixels")]
    TooLarge { width: u32, height: u32 },
}

/// Resolves an image reference to its bytes.
pub trait AssetLoader {
    fn load(&self, reference: &str) -> Result<Vec<u8>, AssetError>;
}

/// Handles `data:` URIs, `http(s)` URLs and filesystem paths.
///
/// Relative paths resolve against `base_dir` when one is set.
#[derive(Debug, Clone, Default)]
pub struct DefaultAssetLoader {
    base_dir: Option<PathBuf>,
}

impl DefaultAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: Some(base_dir.into()) }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let http_error = |message: String| AssetError::Http { url: url.to_owned(), message };

        let response = ureq::get(url).call().map_err(|err| http_error(err.to_string()))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_REMOTE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|err| http_error(err.to_string()))?;
        Ok(bytes)
    }

    fn read_file(&self, reference: &str) -> Result<Vec<u8>, AssetError> {
        let path = Path::new(reference.strip_prefix("file://").unwrap_or(reference));
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        fs::read(&path).map_err(|source| AssetError::Io { path, source })
    }
}

impl AssetLoader for DefaultAssetLoader {
    fn load(&self, reference: &str) -> Result<Vec<u8>, AssetError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AssetError::Empty);
        }

        if reference.starts_with("data:") {
            return decode_data_uri(reference).map(|(_, bytes)| bytes);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch(reference);
        }
        self.read_file(reference)
    }
}

/// Splits a data URI into its media type and decoded payload.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), AssetError> {
    let rest = uri.strip_prefix("data:").ok_or(AssetError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(AssetError::InvalidDataUri)?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    let is_base64 = params.any(|param| param.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)?
    } else {
        percent_decode(payload)
    };
    Ok((media_type, bytes))
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Whether a reference or its bytes hold SVG markup.
pub fn is_svg(reference: &str, bytes: &[u8]) -> bool {
    let lowered = reference.trim_start().get(..32).unwrap_or(reference).to_ascii_lowercase();
    if lowered.starts_with("data:image/svg+xml") {
        return true;
    }
    if reference.to_ascii_lowercase().ends_with(".svg") {
        return true;
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// Renders SVG markup onto an opaque white canvas of the given pixel size.
pub fn rasterize_svg(bytes: &[u8], width: u32, height: u32) -> Result<RgbaImage, AssetError> {
    use resvg::{tiny_skia, usvg};

    let (width, height) = (width.max(1), height.max(1));
    if u64::from(width) * u64::from(height) > MAX_RASTER_PIXELS {
        return Err(AssetError::TooLarge { width, height });
    }

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|err| AssetError::Svg(err.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| AssetError::Svg(format!("cannot allocate {width}x{height} canvas")))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        pixmap.width() as f32 / size.width(),
        pixmap.height() as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // The canvas is opaque, so premultiplied and straight alpha coincide.
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixmap.take())
        .ok_or_else(|| AssetError::Svg("rasterized buffer has unexpected size".to_owned()))
}

/// Decoded pixels ready to embed: RGB samples plus an optional alpha mask.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddableImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

impl EmbeddableImage {
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let pixel_count = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);

        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        let opaque = alpha.iter().all(|&a| a == u8::MAX);
        Self { width, height, rgb, alpha: (!opaque).then_some(alpha) }
    }
}

/// Turns a loaded reference into pixels, rasterizing SVG at `target` size.
pub fn prepare_image(
    reference: &str,
    bytes: &[u8],
    target: (u32, u32),
) -> Result<EmbeddableImage, AssetError> {
    let rgba = if is_svg(reference, bytes) {
        rasterize_svg(bytes, target.0, target.1)?
    } else {
        image::load_from_memory(bytes)?.to_rgba8()
    };
    Ok(EmbeddableImage::from_rgba(&rgba))
}
