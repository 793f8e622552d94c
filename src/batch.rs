//! Batch entry points.
//!
//! These are the two calls a front end makes.  They expand directory
//! inputs, run the encoder or decoder over every item, send one
//! notification per failed item and return a single "at least one
//! success" flag.  Nothing a single item does can abort the batch.
//!
//! ```no_run
//! use pixpack::batch;
//! use pixpack::notify::ConsoleNotifier;
//! use std::path::PathBuf;
//!
//! let sink = ConsoleNotifier::default();
//! let ok = batch::encode(&[PathBuf::from("notes")], "notes.png".as_ref(), &Default::default(), &sink);
//! let ok = ok && batch::decode(&[PathBuf::from("notes.png")], "restored".as_ref(), &Default::default(), &sink);
//! assert!(ok);
//! ```

use std::path::{Path, PathBuf};

use crate::decoder::{self, DecodeOptions, DecodeReport};
use crate::encoder::{self, EncodeOptions, EncodeReport};
use crate::error::{Error, ErrorKind, ItemFailure};
use crate::notify::Notifier;
use crate::walk::{
    expand_inputs, expand_sources, DirectoryWalker, FileValidator, LosslessImageFilter,
    SortedWalker,
};

/// Encode/decode runner with its collaborators injected.
pub struct Batch<'a> {
    pub walker:    &'a dyn DirectoryWalker,
    pub validator: &'a dyn FileValidator,
    pub notifier:  &'a dyn Notifier,
}

impl<'a> Batch<'a> {
    /// Default walker and validator, caller-supplied sink.
    pub fn new(notifier: &'a dyn Notifier) -> Self {
        Self { walker: &SortedWalker, validator: &LosslessImageFilter, notifier }
    }

    pub fn encode(&self, inputs: &[PathBuf], output: &Path, opts: &EncodeOptions) -> EncodeReport {
        let mut sources = Vec::new();
        let mut early = Vec::new();
        for item in expand_sources(inputs, self.walker) {
            match item {
                Ok(source)         => sources.push(source),
                Err((path, error)) => early.push(ItemFailure::new(path, error)),
            }
        }

        let mut report = encoder::encode(&sources, output, opts);
        early.append(&mut report.failures);
        report.failures = early;

        for failure in &report.failures {
            self.notify_encode_failure(failure, output);
        }
        report
    }

    pub fn decode(&self, inputs: &[PathBuf], output_dir: &Path, opts: &DecodeOptions) -> DecodeReport {
        let images: Vec<PathBuf> = expand_inputs(inputs, self.walker)
            .into_iter()
            .filter(|p| {
                let keep = self.validator.accepts(p);
                if !keep {
                    tracing::debug!(path = %p.display(), "not a supported image; skipped");
                }
                keep
            })
            .collect();

        let report = decoder::decode(&images, output_dir, opts);
        for failure in &report.failures {
            self.notify_decode_failure(failure);
        }
        report
    }

    fn notify_encode_failure(&self, failure: &ItemFailure, output: &Path) {
        let path = failure.path.display();
        match failure.error.kind() {
            ErrorKind::Format if failure.path != output => self.notifier.error(
                "Invalid input",
                &format!("Skipped {path}: {}", failure.error),
            ),
            ErrorKind::Read => self
                .notifier
                .exception(&failure.error, &format!("Failed to read file: {path}")),
            _ => self
                .notifier
                .exception(&failure.error, &format!("Failed to create image: {path}")),
        }
    }

    fn notify_decode_failure(&self, failure: &ItemFailure) {
        let path = failure.path.display();
        let message = match &failure.error {
            Error::Format(_)                           => "Incorrectly encoded input image!".to_owned(),
            Error::Read { .. } | Error::ImageRead { .. } => format!("Failed to read image: {path}"),
            _                                          => format!("Failed to create files from: {path}"),
        };
        self.notifier.exception(&failure.error, &message);
    }
}

/// Pack `inputs` (files and directories) into one image at `output`.
/// True when at least one file was packed and the image was written.
pub fn encode(
    inputs: &[PathBuf],
    output: &Path,
    opts: &EncodeOptions,
    notifier: &dyn Notifier,
) -> bool {
    Batch::new(notifier).encode(inputs, output, opts).succeeded()
}

/// Extract every file from `inputs` (images and directories of images)
/// into `output_dir`.  True when at least one file was written and kept.
pub fn decode(
    inputs: &[PathBuf],
    output_dir: &Path,
    opts: &DecodeOptions,
    notifier: &dyn Notifier,
) -> bool {
    Batch::new(notifier).decode(inputs, output_dir, opts).succeeded()
}
