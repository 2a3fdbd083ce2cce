//! Folder source configuration

use core_runtime::error::{Error, Result};
use std::path::PathBuf;

/// Extensions recognised as photos
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "heic", "heif", "webp", "gif", "bmp", "tif", "tiff", "avif",
];

/// Extensions recognised as camera raw files
pub const RAW_EXTENSIONS: &[&str] = &[
    "3fr", "arw", "cr2", "cr3", "crw", "dng", "erf", "kdc", "mrw", "nef", "nrw", "orf", "pef",
    "raf", "raw", "rw2", "sr2", "srf", "srw", "x3f",
];

/// Extensions recognised as videos
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "3gp", "mts", "m2ts", "webm", "mpg", "mpeg", "wmv",
];

/// What to read from the local file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSourceConfig {
    pub roots: Vec<PathBuf>,
    /// Only these extensions, when not empty
    pub select_extensions: Vec<String>,
    /// Never these extensions
    pub exclude_extensions: Vec<String>,
    pub follow_links: bool,
}

impl FolderSourceConfig {
    pub fn builder() -> FolderSourceConfigBuilder {
        FolderSourceConfigBuilder::default()
    }

    /// Whether a file with this extension is picked up
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        let media = IMAGE_EXTENSIONS.contains(&ext.as_str())
            || RAW_EXTENSIONS.contains(&ext.as_str())
            || VIDEO_EXTENSIONS.contains(&ext.as_str());
        if !media {
            return false;
        }
        if !self.select_extensions.is_empty() {
            return self.select_extensions.contains(&ext);
        }
        !self.exclude_extensions.contains(&ext)
    }
}

#[derive(Debug, Default)]
pub struct FolderSourceConfigBuilder {
    roots: Vec<PathBuf>,
    select_extensions: Vec<String>,
    exclude_extensions: Vec<String>,
    follow_links: Option<bool>,
}

/// `.JPG`, `jpg ` and `Jpg` all become `jpg`
fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

impl FolderSourceConfigBuilder {
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.roots.push(path.into());
        self
    }

    pub fn select_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    pub fn exclude_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_extensions = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .collect();
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = Some(follow);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Config`] when no root is given, or when both select
    /// and exclude lists are set.
    pub fn build(self) -> Result<FolderSourceConfig> {
        if self.roots.is_empty() {
            return Err(Error::Config(
                "At least one folder to import is required".to_string(),
            ));
        }

        if !self.select_extensions.is_empty() && !self.exclude_extensions.is_empty() {
            return Err(Error::Config(
                "select_extensions and exclude_extensions are mutually exclusive".to_string(),
            ));
        }

        if let Some(empty) = self
            .select_extensions
            .iter()
            .chain(&self.exclude_extensions)
            .find(|e| e.is_empty())
        {
            return Err(Error::Config(format!("Invalid extension: '{}'", empty)));
        }

        Ok(FolderSourceConfig {
            roots: self.roots,
            select_extensions: self.select_extensions,
            exclude_extensions: self.exclude_extensions,
            follow_links: self.follow_links.unwrap_or(false),
        })
    }
}
