//! End-to-end pipeline tests: decode a real file from disk, composite it,
//! and encode the result back to PNG.

use image::{Rgba, RgbaImage};
use lgtmify::compositor::{Bounds, CAPTION, Compositor, RenderSurface};
use lgtmify::exporter::{encode_png, lgtm_filename, write_png};
use lgtmify::loader::{LoadError, LoaderConfig, load_image};
use lgtmify::session::Session;

/// Render tests need a system font; skip when the host has none.
fn compositor() -> Option<Compositor> {
    Compositor::new().ok()
}

#[test]
fn load_render_export_round_trip() {
    let Some(mut comp) = compositor() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    RgbaImage::from_pixel(4000, 2000, Rgba([90, 120, 150, 255]))
        .save(&input)
        .unwrap();

    let image = load_image(&input, &LoaderConfig::default()).unwrap();
    let mut surface = RenderSurface::new();
    let dims = comp.render(&mut surface, &image, CAPTION, Bounds::new(1800.0, 1400.0));
    assert_eq!((dims.width, dims.height), (1800.0, 900.0));

    let output = dir.path().join(lgtm_filename("photo.png"));
    write_png(&surface, &output).unwrap();

    let reloaded = image::open(&output).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (1800, 900));
}

#[test]
fn oversized_file_is_rejected_before_decode() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("huge.jpg");
    // 15 MB of zeros with a .jpg name: size validation must reject it
    // without ever attempting a decode.
    std::fs::write(&input, vec![0u8; 15 * 1024 * 1024]).unwrap();
    match load_image(&input, &LoaderConfig::default()) {
        Err(LoadError::FileTooLarge { size, .. }) => assert_eq!(size, 15 * 1024 * 1024),
        other => panic!("expected FileTooLarge, got {:?}", other.err()),
    }
}

#[test]
fn unsupported_extension_is_rejected_without_reading() {
    // The path does not even exist; extension validation fires first.
    let err = load_image(
        std::path::Path::new("report.pdf"),
        &LoaderConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, LoadError::UnsupportedFormat(_)));
}

#[test]
fn rerender_after_reset_starts_clean() {
    let Some(mut comp) = compositor() else {
        return;
    };
    let mut session = Session::new();
    let mut surface = RenderSurface::new();

    let token = session.begin_load();
    let first = lgtmify::SourceImage::from_rgba(RgbaImage::from_pixel(
        3000,
        3000,
        Rgba([10, 10, 10, 255]),
    ));
    assert!(session.complete_load(token, first, "first.png".into()));
    comp.render(
        &mut surface,
        session.image().unwrap(),
        CAPTION,
        Bounds::new(1800.0, 1400.0),
    );
    assert_eq!((surface.width(), surface.height()), (1400, 1400));

    session.reset();
    surface.clear();
    assert!(surface.is_empty());

    // A smaller follow-up upload must not inherit the previous dimensions.
    let token = session.begin_load();
    let second =
        lgtmify::SourceImage::from_rgba(RgbaImage::from_pixel(200, 100, Rgba([10, 10, 10, 255])));
    assert!(session.complete_load(token, second, "second.png".into()));
    comp.render(
        &mut surface,
        session.image().unwrap(),
        CAPTION,
        Bounds::new(1800.0, 1400.0),
    );
    assert_eq!((surface.width(), surface.height()), (200, 100));
}

#[test]
fn encoded_bytes_carry_the_caption() {
    let Some(mut comp) = compositor() else {
        return;
    };
    let image =
        lgtmify::SourceImage::from_rgba(RgbaImage::from_pixel(800, 600, Rgba([128, 128, 128, 255])));
    let mut surface = RenderSurface::new();
    comp.render(&mut surface, &image, CAPTION, Bounds::new(1800.0, 1400.0));

    let bytes = encode_png(&surface).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    // The black outline must survive the encode round trip.
    assert!(decoded.pixels().any(|p| p.0 == [0, 0, 0, 255]));
}
