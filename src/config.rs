use std::ffi::OsString;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Environment variable overriding the folder scanned for pending images.
pub const SOURCE_ENV: &str = "IMAGE_RENAMER_SOURCE";
/// Environment variable overriding the folder receiving renamed crops.
pub const DEST_ENV: &str = "IMAGE_RENAMER_DEST";

/// Startup settings. Nothing here is written back to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Flat folder scanned once for pending images
    pub source_dir: PathBuf,
    /// Root of the `{XY}/{XYZ}-{GRAIN}.jpg` output tree
    pub dest_dir: PathBuf,
    /// Accepted extensions, lowercase, without the dot
    pub extensions: Vec<String>,
    /// Side of the crop square before zoom is applied
    pub crop_size: u32,
    pub crop_size_range: RangeInclusive<u32>,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("images"),
            dest_dir: PathBuf::from("photos"),
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            crop_size: 250,
            crop_size_range: 50..=500,
            jpeg_quality: 90,
        }
    }
}

impl Config {
    /// Defaults overlaid with the `IMAGE_RENAMER_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var_os(key))
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        if let Some(dir) = lookup(SOURCE_ENV).filter(|v| !v.is_empty()) {
            self.source_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(DEST_ENV).filter(|v| !v.is_empty()) {
            self.dest_dir = PathBuf::from(dir);
        }
        self
    }

    /// Clamp a requested crop size into the slider range.
    pub fn clamp_crop_size(&self, size: u32) -> u32 {
        size.clamp(*self.crop_size_range.start(), *self.crop_size_range.end())
    }
}
