// ============================================================================
// COMPOSITOR — fit-to-bounds scaling + centered stroked caption rendering
// ============================================================================

use ab_glyph::{Font, FontArc, OutlinedGlyph, ScaleFont, point};
use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use crate::loader::SourceImage;

/// The caption text stamped on every image.
pub const CAPTION: &str = "LGTM";

/// Caption height as a fraction of the output height.
const FONT_SIZE_FACTOR: f32 = 0.1;
/// Caption size floor — keeps the text readable on tiny images.
const FONT_SIZE_MIN: f32 = 40.0;
/// Caption size ceiling — keeps the text from overwhelming large images.
const FONT_SIZE_MAX: f32 = 200.0;
/// Outline thickness as a fraction of the font size.
const STROKE_WIDTH_FACTOR: f32 = 0.05;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const STROKE_COLOR: [u8; 4] = [0, 0, 0, 255];
const FILL_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Maximum output dimensions for a render, derived from the window at render
/// time. Zero or negative bounds are a caller contract violation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub max_width: f32,
    pub max_height: f32,
}

impl Bounds {
    pub fn new(max_width: f32, max_height: f32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Bounds for a window of the given size: 90% of the width, 70% of the
    /// height, leaving room for the surrounding controls.
    pub fn from_window(width: f32, height: f32) -> Self {
        Self::new(width * 0.9, height * 0.7)
    }
}

impl Default for Bounds {
    /// Headless default: the window factors applied to a 1920×1080 reference
    /// screen.
    fn default() -> Self {
        Self::from_window(1920.0, 1080.0)
    }
}

/// Result of fitting a source image into [`Bounds`]. Geometry stays in floats;
/// truncation to whole pixels happens only when the surface is resized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputDimensions {
    pub width: f64,
    pub height: f64,
}

/// Scale `src_w`×`src_h` to fit within `bounds`, preserving aspect ratio.
///
/// Width is corrected first, then height — a wide image constrained by width
/// may still overflow the height bound, which the second pass fixes. Each
/// pass only shrinks, so two passes always suffice. Images already inside the
/// bounds are returned unchanged (never upscaled).
pub fn fit_to_bounds(src_w: u32, src_h: u32, bounds: Bounds) -> OutputDimensions {
    debug_assert!(src_w > 0 && src_h > 0, "zero-area source image");
    debug_assert!(
        bounds.max_width > 0.0 && bounds.max_height > 0.0,
        "degenerate bounds"
    );

    let mut width = src_w as f64;
    let mut height = src_h as f64;
    let aspect = width / height;
    let max_w = bounds.max_width as f64;
    let max_h = bounds.max_height as f64;

    if width > max_w {
        width = max_w;
        height = width / aspect;
    }
    if height > max_h {
        height = max_h;
        width = height * aspect;
    }

    OutputDimensions { width, height }
}

/// Caption font size for a given output height: 10% of the height, clamped
/// to [40, 200].
pub fn font_size_for_height(height: f32) -> f32 {
    (height * FONT_SIZE_FACTOR).clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}

/// The pixel buffer holding the composited output. Recreated per render;
/// [`clear`](RenderSurface::clear) is a full teardown back to 0×0 so stale
/// dimensions cannot leak into the next render.
#[derive(Default)]
pub struct RenderSurface {
    pixels: RgbaImage,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resize to the given dimensions, discarding prior contents. Fractional
    /// dimensions are truncated to whole pixels, with a floor of 1.
    pub fn resize(&mut self, dims: OutputDimensions) {
        let w = (dims.width as u32).max(1);
        let h = (dims.height as u32).max(1);
        self.pixels = RgbaImage::new(w, h);
    }

    /// Discard the pixel buffer entirely (0×0).
    pub fn clear(&mut self) {
        self.pixels = RgbaImage::new(0, 0);
    }

    fn fill(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }
}

/// Raised when no usable caption typeface can be found. Fatal for the
/// session: reported once at startup, never per-operation.
#[derive(Debug)]
pub enum CompositorError {
    NoUsableFont,
}

impl std::fmt::Display for CompositorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompositorError::NoUsableFont => {
                write!(f, "no usable sans-serif font found for caption rendering")
            }
        }
    }
}

impl std::error::Error for CompositorError {}

/// Scales an image into bounds and overlays the centered caption.
///
/// Holds the caption typeface and reusable scratch buffers, so one instance
/// should be kept across renders.
pub struct Compositor {
    font: FontArc,
    coverage: Vec<f32>,
    dilated: Vec<f32>,
}

impl Compositor {
    /// Probe the environment for a bold sans-serif typeface. Absence means
    /// the host cannot render the caption at all.
    pub fn new() -> Result<Self, CompositorError> {
        let font = load_caption_font().ok_or(CompositorError::NoUsableFont)?;
        Ok(Self::with_font(font))
    }

    pub fn with_font(font: FontArc) -> Self {
        Self {
            font,
            coverage: Vec::new(),
            dilated: Vec::new(),
        }
    }

    /// Composite `image` onto `surface`: fit to `bounds`, fill white, draw
    /// the scaled image, then render `caption` centered with a black outline
    /// under a white fill.
    ///
    /// Returns the dimensions the surface was resized to.
    pub fn render(
        &mut self,
        surface: &mut RenderSurface,
        image: &SourceImage,
        caption: &str,
        bounds: Bounds,
    ) -> OutputDimensions {
        let dims = fit_to_bounds(image.width(), image.height(), bounds);
        surface.resize(dims);

        let (w, h) = (surface.width(), surface.height());

        // Opaque white base — transparent sources must not leave artifacts.
        surface.fill(BACKGROUND);

        let scaled = imageops::resize(image.pixels(), w, h, imageops::FilterType::Triangle);
        imageops::overlay(&mut surface.pixels, &scaled, 0, 0);

        let font_size = font_size_for_height(h as f32);
        self.draw_caption(surface, caption, w as f32 * 0.5, h as f32 * 0.5, font_size);

        dims
    }

    /// Render `text` anchored at `(cx, cy)`, centered on both axes.
    ///
    /// Two passes: black outline first (glyph coverage dilated by half the
    /// stroke width with a disc kernel, which gives round joins), then the
    /// white fill from the undilated coverage on top.
    fn draw_caption(
        &mut self,
        surface: &mut RenderSurface,
        text: &str,
        cx: f32,
        cy: f32,
        font_size: f32,
    ) {
        let scaled = self.font.as_scaled(font_size);
        let ascent = scaled.ascent();
        let descent = scaled.descent();

        // Middle baseline: center the ascent..descent span on cy.
        let baseline = cy + (ascent + descent) * 0.5;

        // Single-line advance layout with kerning, left-aligned at 0.
        let mut placed: Vec<(ab_glyph::GlyphId, f32)> = Vec::new();
        let mut cursor = 0.0f32;
        let mut last = None;
        for ch in text.chars() {
            let gid = self.font.glyph_id(ch);
            if let Some(prev) = last {
                cursor += scaled.kern(prev, gid);
            }
            placed.push((gid, cursor));
            cursor += scaled.h_advance(gid);
            last = Some(gid);
        }
        let origin_x = cx - cursor * 0.5;

        let outlined: Vec<OutlinedGlyph> = placed
            .iter()
            .filter_map(|&(gid, gx)| {
                let glyph = gid.with_scale_and_position(font_size, point(origin_x + gx, baseline));
                self.font.outline_glyph(glyph)
            })
            .collect();
        if outlined.is_empty() {
            return;
        }

        let stroke_width = font_size * STROKE_WIDTH_FACTOR;
        // The stroke straddles the glyph edge; only the outer half extends
        // beyond the fill.
        let radius = (stroke_width * 0.5).max(1.0);
        let pad = radius.ceil() as i32 + 1;

        // Union of glyph pixel bounds, padded for the outline, clamped to the
        // surface.
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for o in &outlined {
            let b = o.px_bounds();
            min_x = min_x.min(b.min.x.floor() as i32);
            min_y = min_y.min(b.min.y.floor() as i32);
            max_x = max_x.max(b.max.x.ceil() as i32);
            max_y = max_y.max(b.max.y.ceil() as i32);
        }
        let x0 = (min_x - pad).max(0);
        let y0 = (min_y - pad).max(0);
        let x1 = (max_x + pad).min(surface.width() as i32);
        let y1 = (max_y + pad).min(surface.height() as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let bw = (x1 - x0) as usize;
        let bh = (y1 - y0) as usize;
        let n = bw * bh;

        // Rasterize glyph coverage into the reusable scratch buffer.
        self.coverage.resize(n, 0.0);
        self.coverage[..n].fill(0.0);
        for o in &outlined {
            let b = o.px_bounds();
            let gx0 = b.min.x as i32;
            let gy0 = b.min.y as i32;
            o.draw(|px, py, cov| {
                let lx = gx0 + px as i32 - x0;
                let ly = gy0 + py as i32 - y0;
                if lx >= 0 && ly >= 0 && (lx as usize) < bw && (ly as usize) < bh {
                    let idx = ly as usize * bw + lx as usize;
                    self.coverage[idx] = self.coverage[idx].max(cov);
                }
            });
        }

        // Disc offsets for the dilation kernel.
        let r = radius.ceil() as i32;
        let r_sq = radius * radius + 0.5;
        let mut offsets: Vec<(i32, i32)> = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if ((dx * dx + dy * dy) as f32) <= r_sq {
                    offsets.push((dx, dy));
                }
            }
        }

        self.dilated.resize(n, 0.0);
        let coverage = &self.coverage;
        self.dilated[..n]
            .par_chunks_mut(bw)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let mut m = 0.0f32;
                    for &(dx, dy) in &offsets {
                        let sx = x as i32 + dx;
                        let sy = y as i32 + dy;
                        if sx >= 0 && sy >= 0 && (sx as usize) < bw && (sy as usize) < bh {
                            m = m.max(coverage[sy as usize * bw + sx as usize]);
                        }
                    }
                    *out = m;
                }
            });

        // Blend both passes into the surface, row-parallel. Stroke under fill:
        // at glyph interiors the fill fully covers the black, at edges the
        // outline ring remains.
        let dilated = &self.dilated;
        let sw = surface.width() as usize;
        let x0u = x0 as usize;
        let y0u = y0 as usize;
        let data: &mut [u8] = &mut surface.pixels;
        data.par_chunks_mut(sw * 4)
            .enumerate()
            .skip(y0u)
            .take(bh)
            .for_each(|(gy, row)| {
                let ly = gy - y0u;
                for lx in 0..bw {
                    let i = ly * bw + lx;
                    let base = (x0u + lx) * 4;
                    let px = &mut row[base..base + 4];
                    let s = dilated[i];
                    if s > 0.001 {
                        blend_px(px, STROKE_COLOR, s);
                    }
                    let f = coverage[i];
                    if f > 0.001 {
                        blend_px(px, FILL_COLOR, f);
                    }
                }
            });
    }
}

/// Source-over blend of `color` at `cov` opacity onto an opaque pixel.
fn blend_px(px: &mut [u8], color: [u8; 4], cov: f32) {
    let a = cov.clamp(0.0, 1.0);
    for c in 0..3 {
        px[c] = (color[c] as f32 * a + px[c] as f32 * (1.0 - a)).round() as u8;
    }
    px[3] = 255;
}

/// Find a bold sans-serif typeface for the caption. Tries the generic
/// sans-serif family first, then a few common concrete families.
fn load_caption_font() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::{Properties, Weight};
    use font_kit::source::SystemSource;

    let mut props = Properties::new();
    props.weight = Weight::BOLD;

    let candidates = [
        FamilyName::SansSerif,
        FamilyName::Title("DejaVu Sans".to_string()),
        FamilyName::Title("Liberation Sans".to_string()),
        FamilyName::Title("Arial".to_string()),
    ];

    let handle = SystemSource::new()
        .select_best_match(&candidates, &props)
        .ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    FontArc::try_from_vec((*data).clone()).ok()
}
