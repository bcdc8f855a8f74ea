// ============================================================================
// IMAGE LOADER — format/size validation, then decode to RGBA
// ============================================================================

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

use image::RgbaImage;

/// Default upload size cap: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted by default.
pub const DEFAULT_ACCEPTED_FORMATS: &[&str] =
    &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// File extensions matching the default accepted formats, for dialog filters
/// and drag-and-drop checks.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Construction-time loader configuration.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub max_file_size: u64,
    pub accepted_formats: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            accepted_formats: DEFAULT_ACCEPTED_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A decoded bitmap with its natural pixel dimensions. Immutable once
/// decoded.
pub struct SourceImage {
    pixels: RgbaImage,
}

impl SourceImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Why a file could not be turned into a [`SourceImage`].
///
/// `UnsupportedFormat` and `FileTooLarge` are synchronous validation
/// failures; `ReadFailure` and `DecodeFailure` surface only after the read
/// and decode steps settle. All are recoverable by retrying with another
/// file.
#[derive(Debug)]
pub enum LoadError {
    /// Declared MIME type is not in the accepted set.
    UnsupportedFormat(String),
    /// File exceeds the configured size cap.
    FileTooLarge { size: u64, max: u64 },
    /// Bytes are not a valid image despite an accepted MIME type.
    DecodeFailure(String),
    /// I/O error reading the file.
    ReadFailure(io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedFormat(mime) => write!(
                f,
                "unsupported file format '{}' (supported: JPEG, PNG, GIF, WebP)",
                mime
            ),
            LoadError::FileTooLarge { size, max } => {
                let max_mb = (*max as f64 / 1024.0 / 1024.0).round();
                write!(
                    f,
                    "file is {} bytes, exceeding the {} MB maximum",
                    size, max_mb
                )
            }
            LoadError::DecodeFailure(msg) => {
                write!(f, "failed to decode image: {}", msg)
            }
            LoadError::ReadFailure(e) => write!(f, "failed to read file: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::ReadFailure(e)
    }
}

/// MIME type a file would declare for its extension, or `None` for anything
/// outside the accepted image families.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Synchronous validation: MIME type must be accepted and the byte size must
/// not exceed the cap. Runs before any read or decode work starts.
pub fn validate(mime: &str, size: u64, config: &LoaderConfig) -> Result<(), LoadError> {
    if !config.accepted_formats.iter().any(|f| f == mime) {
        return Err(LoadError::UnsupportedFormat(mime.to_string()));
    }
    if size > config.max_file_size {
        return Err(LoadError::FileTooLarge {
            size,
            max: config.max_file_size,
        });
    }
    Ok(())
}

/// Validate a file on disk without reading its contents: extension-derived
/// MIME type plus metadata size against `config`.
pub fn validate_path(path: &Path, config: &LoaderConfig) -> Result<(), LoadError> {
    let mime = mime_for_path(path).ok_or_else(|| {
        let shown = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_string();
        LoadError::UnsupportedFormat(shown)
    })?;
    let meta = fs::metadata(path)?;
    validate(mime, meta.len(), config)
}

/// Validate, read, and decode a file into a [`SourceImage`].
pub fn load_image(path: &Path, config: &LoaderConfig) -> Result<SourceImage, LoadError> {
    validate_path(path, config)?;

    let bytes = fs::read(path)?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| LoadError::DecodeFailure(e.to_string()))?;
    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(LoadError::DecodeFailure(
            "decoded image has zero area".to_string(),
        ));
    }
    Ok(SourceImage::from_rgba(pixels))
}

/// Outcome of a background load, tagged with the session token it was
/// started under so stale results can be discarded on receipt.
pub struct LoadResult {
    pub token: u64,
    pub filename: String,
    pub result: Result<SourceImage, LoadError>,
}

/// Run [`load_image`] on a worker thread, delivering the result over
/// `sender`. The read and decode both happen off the UI thread.
pub fn spawn_load(path: PathBuf, token: u64, config: LoaderConfig, sender: Sender<LoadResult>) {
    thread::spawn(move || {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = load_image(&path, &config);
        // Receiver may already be gone on shutdown; nothing to do then.
        let _ = sender.send(LoadResult {
            token,
            filename,
            result,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_small_png() {
        let config = LoaderConfig::default();
        assert!(validate("image/png", 2 * 1024 * 1024, &config).is_ok());
    }

    #[test]
    fn rejects_an_oversized_jpeg() {
        let config = LoaderConfig::default();
        match validate("image/jpeg", 15 * 1024 * 1024, &config) {
            Err(LoadError::FileTooLarge { size, max }) => {
                assert_eq!(size, 15 * 1024 * 1024);
                assert_eq!(max, DEFAULT_MAX_FILE_SIZE);
            }
            other => panic!("expected FileTooLarge, got {:?}", other.err()),
        }
    }

    #[test]
    fn rejects_a_pdf_mime_type() {
        let config = LoaderConfig::default();
        match validate("application/pdf", 1024, &config) {
            Err(LoadError::UnsupportedFormat(mime)) => assert_eq!(mime, "application/pdf"),
            other => panic!("expected UnsupportedFormat, got {:?}", other.err()),
        }
    }

    #[test]
    fn size_exactly_at_the_cap_is_accepted() {
        let config = LoaderConfig::default();
        assert!(validate("image/webp", DEFAULT_MAX_FILE_SIZE, &config).is_ok());
        assert!(validate("image/webp", DEFAULT_MAX_FILE_SIZE + 1, &config).is_err());
    }

    #[test]
    fn mime_derivation_covers_the_accepted_set() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("a.png")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("a.gif")), Some("image/gif"));
        assert_eq!(mime_for_path(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("a.pdf")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        match load_image(&path, &LoaderConfig::default()) {
            Err(LoadError::DecodeFailure(_)) => {}
            other => panic!("expected DecodeFailure, got {:?}", other.err()),
        }
    }

    #[test]
    fn missing_file_fails_with_read_error() {
        let err = load_image(Path::new("/no/such/file.png"), &LoaderConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::ReadFailure(_)));
    }

    #[test]
    fn valid_png_round_trips_through_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.png");
        let img = RgbaImage::from_pixel(12, 7, image::Rgba([1, 2, 3, 255]));
        img.save(&path).unwrap();
        let loaded = load_image(&path, &LoaderConfig::default()).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (12, 7));
    }
}
