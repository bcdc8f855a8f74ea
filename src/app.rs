// ============================================================================
// GUI — drop zone, composited preview, save / copy / reset
// ============================================================================

use std::path::PathBuf;
use std::sync::mpsc;

use eframe::egui;

use crate::compositor::{Bounds, CAPTION, Compositor, OutputDimensions, RenderSurface};
use crate::exporter;
use crate::loader::{self, ACCEPTED_EXTENSIONS, LoadResult, LoaderConfig};
use crate::session::Session;
use crate::{log_err, log_info};

/// Transient errors disappear on their own after this many seconds.
const ERROR_DISPLAY_SECS: f64 = 5.0;

pub struct LgtmApp {
    session: Session,
    /// `None` when no usable caption font exists; `fatal_error` is set then.
    compositor: Option<Compositor>,
    /// Startup capability failure, shown persistently instead of the UI.
    fatal_error: Option<String>,
    surface: RenderSurface,
    preview: Option<egui::TextureHandle>,
    output_dims: Option<OutputDimensions>,
    /// Transient error message and the time it appeared.
    error_message: Option<(String, f64)>,
    loader_config: LoaderConfig,

    // Background load pipeline: reads and decodes run on worker threads,
    // results are polled here each frame.
    load_sender: mpsc::Sender<LoadResult>,
    load_receiver: mpsc::Receiver<LoadResult>,
    pending_loads: usize,
}

impl LgtmApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (load_sender, load_receiver) = mpsc::channel();

        let (compositor, fatal_error) = match Compositor::new() {
            Ok(c) => (Some(c), None),
            Err(e) => {
                log_err!("startup capability check failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Self {
            session: Session::new(),
            compositor,
            fatal_error,
            surface: RenderSurface::new(),
            preview: None,
            output_dims: None,
            error_message: None,
            loader_config: LoaderConfig::default(),
            load_sender,
            load_receiver,
            pending_loads: 0,
        }
    }

    fn show_error(&mut self, message: String, now: f64) {
        log_err!("{}", message);
        self.error_message = Some((message, now));
    }

    /// Kick off a load for `path`. Validation runs synchronously here so bad
    /// files are rejected before any worker thread is spawned.
    fn begin_upload(&mut self, path: PathBuf, now: f64) {
        // Every new operation starts with a clean slate.
        self.error_message = None;

        if let Err(e) = loader::validate_path(&path, &self.loader_config) {
            self.show_error(e.to_string(), now);
            return;
        }

        let token = self.session.begin_load();
        log_info!("loading {} (token {})", path.display(), token);
        loader::spawn_load(
            path,
            token,
            self.loader_config.clone(),
            self.load_sender.clone(),
        );
        self.pending_loads += 1;
    }

    /// Apply a finished background load. Results carrying a superseded token
    /// are dropped; their errors are not shown either, since the operation
    /// they belong to no longer exists.
    fn finish_load(&mut self, res: LoadResult, ctx: &egui::Context, now: f64) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        if !self.session.is_current(res.token) {
            log_info!("discarding stale load result for {}", res.filename);
            return;
        }
        match res.result {
            Ok(image) => {
                self.session.complete_load(res.token, image, res.filename);
                self.rerender(ctx);
            }
            Err(e) => self.show_error(e.to_string(), now),
        }
    }

    /// Composite the current image into the surface and refresh the preview
    /// texture. Bounds derive from the window size at render time.
    fn rerender(&mut self, ctx: &egui::Context) {
        let Some(compositor) = self.compositor.as_mut() else {
            return;
        };
        let Some(image) = self.session.image() else {
            return;
        };

        let rect = ctx.screen_rect();
        let bounds = Bounds::from_window(rect.width(), rect.height());
        let dims = compositor.render(&mut self.surface, image, CAPTION, bounds);
        self.output_dims = Some(dims);

        let pixels = self.surface.pixels();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [pixels.width() as usize, pixels.height() as usize],
            pixels.as_raw(),
        );
        self.preview = Some(ctx.load_texture("lgtm-preview", color_image, Default::default()));
    }

    fn handle_download(&mut self, now: f64) {
        if !self.session.has_image() {
            self.show_error("no image to download".to_string(), now);
            return;
        }
        self.error_message = None;
        let suggested = exporter::lgtm_filename(self.session.filename());
        if let Some(path) = exporter::save_dialog(&suggested) {
            match exporter::write_png(&self.surface, &path) {
                Ok(()) => log_info!("saved {}", path.display()),
                Err(e) => self.show_error(format!("failed to save PNG: {}", e), now),
            }
        }
    }

    fn handle_copy(&mut self, now: f64) {
        if !self.session.has_image() {
            return;
        }
        self.error_message = None;
        match exporter::copy_to_clipboard(&self.surface) {
            Ok(()) => log_info!("copied composited image to clipboard"),
            Err(e) => self.show_error(format!("failed to copy to clipboard: {}", e), now),
        }
    }

    fn reset(&mut self) {
        self.session.reset();
        self.surface.clear();
        self.preview = None;
        self.output_dims = None;
        self.error_message = None;
        log_info!("session reset");
    }

    fn browse(&mut self, now: f64) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", ACCEPTED_EXTENSIONS)
            .pick_file()
        {
            self.begin_upload(path, now);
        }
    }
}

impl eframe::App for LgtmApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);

        // --- Finished background loads ---
        while let Ok(res) = self.load_receiver.try_recv() {
            self.finish_load(res, ctx, now);
        }
        if self.pending_loads > 0 {
            ctx.request_repaint();
        }

        // --- Drag-and-drop uploads ---
        let dropped: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.begin_upload(path, now);
            }
        }

        // --- Error toast lifetime ---
        if let Some((_, shown_at)) = self.error_message {
            if now - shown_at >= ERROR_DISPLAY_SECS {
                self.error_message = None;
            } else {
                ctx.request_repaint_after(std::time::Duration::from_millis(250));
            }
        }

        let mut do_download = false;
        let mut do_copy = false;
        let mut do_reset = false;
        let mut do_browse = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(fatal) = &self.fatal_error {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.colored_label(
                        egui::Color32::RED,
                        format!("This environment cannot render captions: {}", fatal),
                    );
                });
                return;
            }

            if let Some(preview) = self.preview.clone() {
                ui.vertical_centered(|ui| {
                    ui.heading("Preview");
                    ui.add_space(8.0);
                    let size = preview.size_vec2();
                    ui.image((preview.id(), size));
                    if let Some(dims) = self.output_dims {
                        ui.weak(format!(
                            "{} × {} px",
                            dims.width as u32, dims.height as u32
                        ));
                    }
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Download PNG").clicked() {
                            do_download = true;
                        }
                        if ui.button("Copy to Clipboard").clicked() {
                            do_copy = true;
                        }
                        if ui.button("Reset").clicked() {
                            do_reset = true;
                        }
                    });
                });
            } else {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.heading("LGTM");
                    ui.add_space(12.0);
                    ui.label("Drop an image here to stamp it with the LGTM caption.");
                    ui.label("JPEG, PNG, GIF, or WebP up to 10 MB.");
                    ui.add_space(12.0);
                    if self.pending_loads > 0 {
                        ui.spinner();
                        ui.label("Loading…");
                    } else if ui.button("Browse…").clicked() {
                        do_browse = true;
                    }
                });
            }
        });

        if do_download {
            self.handle_download(now);
        }
        if do_copy {
            self.handle_copy(now);
        }
        if do_reset {
            self.reset();
        }
        if do_browse {
            self.browse(now);
        }

        // --- Transient error toast ---
        if let Some((message, _)) = &self.error_message {
            let message = message.clone();
            egui::TopBottomPanel::bottom("error-toast").show(ctx, |ui| {
                ui.colored_label(egui::Color32::from_rgb(220, 60, 60), message);
            });
        }
    }
}
