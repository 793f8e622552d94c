//! Files → container → image.
//!
//! ```no_run
//! use pixpack::encoder::{encode_records, EncodeOptions};
//! use pixpack::FileRecord;
//!
//! let records = vec![FileRecord::new("a.txt", b"hi".to_vec())?];
//! let report = encode_records(&records, "out.png".as_ref(), &EncodeOptions::default());
//! assert!(report.succeeded());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use serde::Serialize;

use crate::container::ContainerWriter;
use crate::error::{batch_outcome, Error, ItemFailure};
use crate::pixels::{Layout, PixelGrid};
use crate::record::FileRecord;
use crate::walk::FileSource;

// ── EncodeOptions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub layout: Layout,
}

// ── EncodeReport ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EncodeReport {
    /// Names packed into the image, in container order.
    pub packed:     Vec<String>,
    pub failures:   Vec<ItemFailure>,
    /// Useful length of the byte stream, sentinel included.
    pub stream_len: usize,
    pub width:      u32,
    pub height:     u32,
    /// Set once the image is on disk.
    pub written:    bool,
}

impl EncodeReport {
    /// At least one record was packed and the image was written.
    pub fn succeeded(&self) -> bool {
        self.written && !self.packed.is_empty()
    }

    pub fn summary(&self) -> EncodeSummary {
        EncodeSummary {
            packed:     self.packed.clone(),
            failed:     self.failures.len(),
            stream_len: self.stream_len,
            width:      self.width,
            height:     self.height,
        }
    }

    /// Collapse into a single result; see [`crate::error::Error::PartialFailure`].
    pub fn outcome(self) -> Result<(), Error> {
        let successes = if self.written { self.packed.len() } else { 0 };
        batch_outcome(self.failures, successes)
    }
}

/// Serializable digest of an [`EncodeReport`] for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeSummary {
    pub packed:     Vec<String>,
    pub failed:     usize,
    pub stream_len: usize,
    pub width:      u32,
    pub height:     u32,
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Read each source, pack every readable record in input order and write
/// the image.  Sources that cannot be read or framed are skipped and listed
/// in the report; no image is written when nothing could be packed.
pub fn encode(sources: &[FileSource], output: &Path, opts: &EncodeOptions) -> EncodeReport {
    let mut report = EncodeReport::default();
    let mut records = Vec::with_capacity(sources.len());

    for source in sources {
        match FileRecord::from_path(&source.path, &source.name) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(path = %source.path.display(), "skipping: {e}");
                report.failures.push(ItemFailure::new(&source.path, e));
            }
        }
    }

    write_image(&records, output, opts, &mut report);
    report
}

/// Pack already-validated in-memory records.
pub fn encode_records(records: &[FileRecord], output: &Path, opts: &EncodeOptions) -> EncodeReport {
    let mut report = EncodeReport::default();
    write_image(records, output, opts, &mut report);
    report
}

fn write_image(records: &[FileRecord], output: &Path, opts: &EncodeOptions, report: &mut EncodeReport) {
    if records.is_empty() {
        tracing::info!(output = %output.display(), "nothing to pack; image not written");
        return;
    }

    let mut writer = ContainerWriter::with_capacity(crate::container::stream_len(records));
    let mut packed = Vec::with_capacity(records.len());
    for record in records {
        match writer.push(record) {
            Ok(()) => {
                tracing::debug!(name = record.name(), size = record.content().len(), "packed");
                packed.push(record.name().to_owned());
            }
            Err(e) => report.failures.push(ItemFailure::new(record.name(), e)),
        }
    }
    if packed.is_empty() {
        return;
    }
    let stream = writer.finish();
    report.stream_len = stream.len();

    let grid = match PixelGrid::pack(stream, opts.layout) {
        Ok(grid) => grid,
        Err(e) => {
            report.failures.push(ItemFailure::new(output, e));
            return;
        }
    };
    report.width = grid.width();
    report.height = grid.height();

    if let Err(e) = grid.save(output) {
        report.failures.push(ItemFailure::new(output, e));
        return;
    }

    tracing::info!(
        output = %output.display(),
        records = packed.len(),
        width = grid.width(),
        height = grid.height(),
        "image written"
    );
    report.packed = packed;
    report.written = true;
}
