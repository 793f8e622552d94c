//! Input expansion: directory walking and image pre-filtering.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use walkdir::WalkDir;

use crate::error::{Error, FormatError};
use crate::record::name_from_relative;

/// Lists the regular files beneath a directory, recursively.
///
/// Implementations must return the same order for the same tree so that
/// packing a directory twice yields the same container.
pub trait DirectoryWalker {
    fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>, Error>;
}

/// Decides whether a path should be attempted as a decodable image.
/// Rejection is silent exclusion, not an error.
pub trait FileValidator {
    fn accepts(&self, path: &Path) -> bool;
}

// ── SortedWalker ─────────────────────────────────────────────────────────────

/// `walkdir` traversal sorted by file name at every level.  Symlinks are
/// not followed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SortedWalker;

impl DirectoryWalker for SortedWalker {
    fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                Error::read(path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

// ── LosslessImageFilter ──────────────────────────────────────────────────────

/// Accepts paths whose extension names a lossless format this build can
/// decode.
#[derive(Debug, Default, Clone, Copy)]
pub struct LosslessImageFilter;

impl FileValidator for LosslessImageFilter {
    fn accepts(&self, path: &Path) -> bool {
        matches!(
            ImageFormat::from_path(path),
            Ok(ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff)
        )
    }
}

// ── Expansion ────────────────────────────────────────────────────────────────

/// Decode-side expansion: drop paths that do not exist, keep files, and
/// replace each directory with its files, in place.  Directories that
/// cannot be walked are logged and skipped.
pub fn expand_inputs(paths: &[PathBuf], walker: &dyn DirectoryWalker) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_file() {
            out.push(path.clone());
        } else if path.is_dir() {
            match walker.walk(path) {
                Ok(files) => out.extend(files),
                Err(e)    => tracing::warn!(path = %path.display(), "skipping directory: {e}"),
            }
        } else {
            tracing::debug!(path = %path.display(), "input does not exist");
        }
    }
    out
}

/// A file on disk and the name it is stored under in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub path: PathBuf,
    pub name: String,
}

/// Encode-side expansion.  A plain file is stored under its file name; a
/// directory's files are stored under their path relative to the
/// directory's parent, so `docs/a.txt` unpacks back into `docs/`.
///
/// Every input that cannot be named or walked comes back as an error in
/// its input position.
pub fn expand_sources(
    paths: &[PathBuf],
    walker: &dyn DirectoryWalker,
) -> Vec<Result<FileSource, (PathBuf, Error)>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let root = match path.file_name() {
                Some(_) => path.parent().unwrap_or(path),
                None    => path.as_path(),
            };
            match walker.walk(path) {
                Ok(files) => {
                    for file in files {
                        let rel = file.strip_prefix(root).unwrap_or(&file);
                        out.push(
                            name_from_relative(rel)
                                .map(|name| FileSource { path: file.clone(), name })
                                .map_err(|e| (file.clone(), e.into())),
                        );
                    }
                }
                Err(e) => out.push(Err((path.clone(), e))),
            }
        } else {
            let name = match path.file_name() {
                Some(n) => n.to_str().map(str::to_owned).ok_or(FormatError::NameNotUtf8),
                None    => Err(FormatError::InvalidPath(path.to_string_lossy().into_owned())),
            };
            out.push(
                name.map(|name| FileSource { path: path.clone(), name })
                    .map_err(|e| (path.clone(), e.into())),
            );
        }
    }
    out
}
