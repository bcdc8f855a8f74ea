// ============================================================================
// EXPORTER — PNG encode, filename derivation, save/clipboard delivery
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::ImageError;
use image::codecs::png::PngEncoder;

use crate::compositor::RenderSurface;

/// Prefix applied to every derived output filename.
const FILENAME_PREFIX: &str = "lgtm-";

/// Derive the download filename from the original upload's name: strip the
/// last extension only, prefix, append `.png`.
///
/// `photo.jpg` → `lgtm-photo.png`, `archive.tar.gz` → `lgtm-archive.tar.png`,
/// `noext` → `lgtm-noext.png`.
pub fn lgtm_filename(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(original);
    format!("{}{}.png", FILENAME_PREFIX, stem)
}

/// Encode the surface to PNG bytes in memory.
pub fn encode_png(surface: &RenderSurface) -> Result<Vec<u8>, ImageError> {
    let img = surface.pixels();
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new(&mut bytes);
    #[allow(deprecated)]
    encoder.encode(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Encode the surface to PNG and write it to `path`.
pub fn write_png(surface: &RenderSurface, path: &Path) -> Result<(), ImageError> {
    let img = surface.pixels();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}

/// Ask the user where to save, seeded with the derived filename.
pub fn save_dialog(suggested_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("PNG image", &["png"])
        .set_file_name(suggested_name)
        .save_file()
}

/// Secondary delivery path: put the composited image on the OS clipboard.
pub fn copy_to_clipboard(surface: &RenderSurface) -> Result<(), String> {
    let img = surface.pixels();
    let mut clip = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clip.set_image(arboard::ImageData {
        width: img.width() as usize,
        height: img.height() as usize,
        bytes: std::borrow::Cow::Borrowed(img.as_raw()),
    })
    .map_err(|e| e.to_string())
}
