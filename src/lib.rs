//! lgtmify — stamp a bold, outlined "LGTM" caption onto an image and save
//! the result as a PNG.
//!
//! The pipeline is loader → compositor → exporter: a file is validated and
//! decoded into a [`SourceImage`], the [`Compositor`] fits it into bounds
//! and overlays the centered caption on a [`RenderSurface`], and the
//! exporter serializes the surface to PNG under a `lgtm-` derived filename.
//! Two front ends drive it: the egui app in [`app`] and the headless [`cli`].

pub mod app;
pub mod cli;
pub mod compositor;
pub mod exporter;
pub mod loader;
pub mod logger;
pub mod session;

pub use compositor::{
    Bounds, CAPTION, Compositor, CompositorError, OutputDimensions, RenderSurface, fit_to_bounds,
    font_size_for_height,
};
pub use loader::{LoadError, LoaderConfig, SourceImage};
pub use session::Session;
