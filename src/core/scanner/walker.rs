//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, ImageScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    /// Scan a single root, which may be a directory or a file
    fn scan_root(
        &self,
        root: &Path,
        events: &EventSender,
        images: &mut Vec<PathBuf>,
        errors: &mut Vec<ScanError>,
    ) -> Result<(), ScanError> {
        if !root.exists() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        if root.is_file() {
            if self.filter.should_include(root) {
                self.found(root, events, images);
            }
            return Ok(());
        }

        let mut directories_scanned = 0;
        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);

        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        // hidden directories are pruned, not just skipped, unless it is the root itself
        let entries = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !self.filter.is_excluded_hidden(e.path()));

        for entry_result in entries {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    if entry.file_type().is_dir() {
                        directories_scanned += 1;
                        events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                            directories_scanned,
                            images_found: images.len(),
                            current_path: path.to_path_buf(),
                        })));
                        continue;
                    }

                    if self.filter.should_include(path) {
                        self.found(path, events, images);
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    tracing::warn!("{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));

                    errors.push(error);
                }
            }
        }

        Ok(())
    }

    fn found(&self, path: &Path, events: &EventSender, images: &mut Vec<PathBuf>) {
        let path = absolute(path);
        events.send(Event::Scan(ScanEvent::ImageFound { path: path.clone() }));
        images.push(path);
    }
}

/// Canonical form of `path`, or the path joined onto the working directory
/// if it cannot be canonicalized
fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl ImageScanner for WalkDirScanner {
    fn scan(&self, roots: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(roots, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            paths: roots.to_vec(),
        }));

        let mut images = Vec::new();
        let mut errors = Vec::new();

        for root in roots {
            if let Err(e) = self.scan_root(root, events, &mut images, &mut errors) {
                tracing::warn!("{}", e);
                events.send(Event::Scan(ScanEvent::Error {
                    path: root.clone(),
                    message: e.to_string(),
                }));
                errors.push(e);
            }
        }

        images.sort();
        images.dedup();
        tracing::info!("Found {} images under {} roots", images.len(), roots.len());

        events.send(Event::Scan(ScanEvent::Completed {
            total_images: images.len(),
        }));

        Ok(ScanResult { images, errors })
    }
}
