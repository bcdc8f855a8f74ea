//! Explicit current-image state for one upload/render cycle.
//!
//! Loads run on worker threads and may settle after the user has reset or
//! started a newer upload. Every load is tagged with a monotonically
//! increasing token; a result whose token no longer matches is stale and
//! gets discarded on receipt instead of overwriting newer state.

use crate::loader::SourceImage;

#[derive(Default)]
pub struct Session {
    current_image: Option<SourceImage>,
    current_filename: String,
    load_token: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load, superseding any in-flight one. Returns the token
    /// the load must carry back.
    pub fn begin_load(&mut self) -> u64 {
        self.load_token += 1;
        self.load_token
    }

    /// True while `token` identifies the most recent operation.
    pub fn is_current(&self, token: u64) -> bool {
        token == self.load_token
    }

    /// Install a finished load's image, unless it has been superseded.
    /// Returns whether the result was accepted.
    pub fn complete_load(&mut self, token: u64, image: SourceImage, filename: String) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.current_image = Some(image);
        self.current_filename = filename;
        true
    }

    /// Drop the current image and invalidate any in-flight load.
    pub fn reset(&mut self) {
        self.current_image = None;
        self.current_filename.clear();
        self.load_token += 1;
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.current_image.as_ref()
    }

    pub fn filename(&self) -> &str {
        &self.current_filename
    }

    pub fn has_image(&self) -> bool {
        self.current_image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn img() -> SourceImage {
        SourceImage::from_rgba(RgbaImage::new(4, 4))
    }

    #[test]
    fn current_load_is_accepted() {
        let mut s = Session::new();
        let token = s.begin_load();
        assert!(s.complete_load(token, img(), "a.png".into()));
        assert!(s.has_image());
        assert_eq!(s.filename(), "a.png");
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut s = Session::new();
        let old = s.begin_load();
        let new = s.begin_load();
        assert!(!s.complete_load(old, img(), "old.png".into()));
        assert!(!s.has_image());
        assert!(s.complete_load(new, img(), "new.png".into()));
        assert_eq!(s.filename(), "new.png");
    }

    #[test]
    fn load_resolving_after_reset_is_stale() {
        let mut s = Session::new();
        let token = s.begin_load();
        s.reset();
        assert!(!s.complete_load(token, img(), "late.png".into()));
        assert!(!s.has_image());
        assert_eq!(s.filename(), "");
    }

    #[test]
    fn reset_clears_an_installed_image() {
        let mut s = Session::new();
        let token = s.begin_load();
        s.complete_load(token, img(), "a.png".into());
        s.reset();
        assert!(!s.has_image());
        assert_eq!(s.filename(), "");
    }
}
