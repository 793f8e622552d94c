//! Image → container → files.
//!
//! # Per-image pass
//! 1. Load the image and normalize it to 8-bit RGB.
//! 2. Flatten its pixels into a byte stream (R, G, B, row-major).
//! 3. Walk the container and write each record under the output directory
//!    as soon as it is parsed.
//!
//! Every file and directory created in step 3 is tracked by a [`WriteSet`].
//! If the pass ends early (a truncated record, an unusable name, a failed
//! write, a rejected collision) the write set deletes everything it created
//! when it is dropped, so an image either contributes all of its files or
//! none of them.
//!
//! # Parallelism
//! With the `parallel` feature, step 1 and 2 run concurrently across images
//! on the Rayon pool.  Step 3 always runs sequentially in input order, which
//! serializes writes to the shared output directory.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::container::{ContainerReader, RecordRef};
use crate::error::{batch_outcome, Error, FormatError, ItemFailure};
use crate::pixels::PixelGrid;
use crate::record::resolve_output_path;

// ── DecodeOptions ────────────────────────────────────────────────────────────

/// What to do when a record's output path is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Treat the image as corrupt if the path already exists or was
    /// written earlier in the same batch.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub collisions: CollisionPolicy,
}

// ── DecodeReport ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DecodeReport {
    /// Files written and kept, in the order they were written.
    pub written:          Vec<PathBuf>,
    pub failures:         Vec<ItemFailure>,
    pub images_attempted: usize,
    /// Images whose container parsed through to the sentinel.
    pub images_decoded:   usize,
}

impl DecodeReport {
    /// At least one file was written and kept.
    pub fn succeeded(&self) -> bool {
        !self.written.is_empty()
    }

    pub fn outcome(self) -> Result<(), Error> {
        let successes = self.images_decoded;
        batch_outcome(self.failures, successes)
    }
}

// ── WriteSet ─────────────────────────────────────────────────────────────────

/// Scoped record of everything one image has written.  Dropping an
/// uncommitted set deletes its files (newest first) and then any
/// directories it created that are now empty.
#[derive(Debug, Default)]
pub struct WriteSet {
    files:     Vec<PathBuf>,
    dirs:      Vec<PathBuf>,
    committed: bool,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Write `data` to `path`, creating missing parent directories.
    pub fn write(&mut self, path: &Path, data: &[u8]) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            self.create_dirs(parent)?;
        }
        // Tracked only once created: a failed open leaves whatever was
        // already at `path` alone, a failed write is cleaned up.
        let mut file = File::create(path).map_err(|e| Error::write(path, e))?;
        self.files.push(path.to_path_buf());
        file.write_all(data).map_err(|e| Error::write(path, e))
    }

    fn create_dirs(&mut self, dir: &Path) -> Result<(), Error> {
        let mut missing = Vec::new();
        let mut cur = Some(dir);
        while let Some(d) = cur {
            if d.as_os_str().is_empty() || d.exists() {
                break;
            }
            missing.push(d.to_path_buf());
            cur = d.parent();
        }
        for d in missing.into_iter().rev() {
            fs::create_dir(&d).map_err(|e| Error::write(&d, e))?;
            self.dirs.push(d);
        }
        Ok(())
    }

    /// Keep everything written so far and return the file list.
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.committed = true;
        std::mem::take(&mut self.files)
    }

    fn rollback(&mut self) {
        for file in self.files.drain(..).rev() {
            if let Err(e) = fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %file.display(), "rollback could not remove file: {e}");
                }
            }
        }
        for dir in self.dirs.drain(..).rev() {
            // Fails harmlessly if something else now lives there.
            let _ = fs::remove_dir(&dir);
        }
    }
}

impl Drop for WriteSet {
    fn drop(&mut self) {
        if !self.committed && !(self.files.is_empty() && self.dirs.is_empty()) {
            tracing::warn!(files = self.files.len(), "rolling back partially extracted image");
            self.rollback();
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Load an image and flatten it into its byte stream.
pub fn read_stream(image: &Path) -> Result<Vec<u8>, Error> {
    Ok(PixelGrid::load(image)?.unpack())
}

/// Decode every image into `output_dir`.  Images are independent: a
/// failure is recorded and the next image is attempted.
pub fn decode(images: &[PathBuf], output_dir: &Path, opts: &DecodeOptions) -> DecodeReport {
    let mut report = DecodeReport { images_attempted: images.len(), ..Default::default() };
    if images.is_empty() {
        return report;
    }
    if let Err(e) = fs::create_dir_all(output_dir) {
        let err = Error::write(output_dir, e);
        tracing::error!("{err}");
        report.failures.push(ItemFailure::new(output_dir, err));
        return report;
    }

    let mut batch_paths: HashSet<PathBuf> = HashSet::new();
    for (image, stream) in images.iter().zip(load_all(images)) {
        let result = stream.and_then(|stream| {
            extract(&stream, output_dir, opts, &mut batch_paths)
        });
        match result {
            Ok(files) => {
                tracing::info!(image = %image.display(), files = files.len(), "image decoded");
                report.images_decoded += 1;
                report.written.extend(files);
            }
            Err(e) => {
                tracing::debug!(image = %image.display(), "image failed: {e}");
                report.failures.push(ItemFailure::new(image, e));
            }
        }
    }

    // An overwrite by a later, rolled-back image removes a file an earlier
    // image had kept.
    report.written.retain(|p| batch_paths.contains(p));
    let mut seen = HashSet::new();
    report.written.retain(|p| seen.insert(p.clone()));
    report
}

#[cfg(feature = "parallel")]
fn load_all(images: &[PathBuf]) -> Vec<Result<Vec<u8>, Error>> {
    use rayon::prelude::*;
    images.par_iter().map(|p| read_stream(p)).collect()
}

#[cfg(not(feature = "parallel"))]
fn load_all(images: &[PathBuf]) -> impl Iterator<Item = Result<Vec<u8>, Error>> + '_ {
    images.iter().map(|p| read_stream(p))
}

/// Parse `stream` and write its records under `output_dir`.
///
/// `batch_paths` holds every path kept so far in the current batch; it is
/// updated with this image's files on success and cleared of them on
/// failure.
pub fn extract(
    stream: &[u8],
    output_dir: &Path,
    opts: &DecodeOptions,
    batch_paths: &mut HashSet<PathBuf>,
) -> Result<Vec<PathBuf>, Error> {
    let mut set = WriteSet::new();
    let result = write_records(stream, output_dir, opts, batch_paths, &mut set);
    match result {
        Ok(()) => {
            let files = set.commit();
            batch_paths.extend(files.iter().cloned());
            Ok(files)
        }
        Err(e) => {
            for file in set.files() {
                batch_paths.remove(file);
            }
            Err(e)
        }
    }
}

fn write_records(
    stream: &[u8],
    output_dir: &Path,
    opts: &DecodeOptions,
    batch_paths: &HashSet<PathBuf>,
    set: &mut WriteSet,
) -> Result<(), Error> {
    let mut this_image: HashSet<PathBuf> = HashSet::new();
    for record in ContainerReader::new(stream) {
        let record = record?;
        let path = resolve_output_path(output_dir, record.name_str()?)?;

        if opts.collisions == CollisionPolicy::Reject
            && (batch_paths.contains(&path) || this_image.contains(&path) || path.exists())
        {
            return Err(FormatError::NameCollision(path).into());
        }

        set.write(&path, record.content)?;
        tracing::debug!(path = %path.display(), size = record.content.len(), "extracted");
        this_image.insert(path);
    }
    Ok(())
}

// ── Inspection ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name:   String,
    pub size:   usize,
    /// BLAKE3 of the content, hex.
    pub blake3: String,
}

impl EntryInfo {
    fn from_record(record: &RecordRef<'_>) -> Result<Self, FormatError> {
        Ok(Self {
            name:   record.name_str()?.to_owned(),
            size:   record.content.len(),
            blake3: hex::encode(blake3::hash(record.content).as_bytes()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub width:      u32,
    pub height:     u32,
    /// Bytes the canvas can carry.
    pub capacity:   usize,
    /// Useful bytes, sentinel included.
    pub stream_len: usize,
    pub entries:    Vec<EntryInfo>,
}

/// Parse an image's container without writing anything.
pub fn inspect(image: &Path) -> Result<Inspection, Error> {
    let grid = PixelGrid::load(image)?;
    let (width, height) = (grid.width(), grid.height());
    let stream = grid.unpack();

    let mut reader = ContainerReader::new(&stream);
    let mut entries = Vec::new();
    for record in reader.by_ref() {
        entries.push(EntryInfo::from_record(&record?)?);
    }
    Ok(Inspection {
        width,
        height,
        capacity: stream.len(),
        stream_len: reader.position(),
        entries,
    })
}
