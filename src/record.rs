//! File records and the rules their names must follow.
//!
//! A record name is UTF-8 text of 1..=255 bytes.  Length 0 is reserved for
//! the end-of-container sentinel.  Names use `/` as the component separator
//! regardless of platform so that a container packed on one OS unpacks with
//! the same layout on another.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, FormatError};

/// Longest name the 1-byte length field can describe.
pub const MAX_NAME_LEN: usize = u8::MAX as usize;
/// Largest content the 4-byte length field is allowed to describe.
pub const MAX_CONTENT_LEN: u64 = i32::MAX as u64;

/// One named file, owned for the duration of a single encode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    name:    String,
    content: Vec<u8>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Result<Self, FormatError> {
        let name = name.into();
        validate_name(&name)?;
        if content.len() as u64 > MAX_CONTENT_LEN {
            return Err(FormatError::ContentTooLarge(content.len() as u64));
        }
        Ok(Self { name, content })
    }

    /// Read `path` from disk and store it under `name`.
    pub fn from_path(path: &Path, name: &str) -> Result<Self, Error> {
        validate_name(name)?;
        let len = fs::metadata(path).map_err(|e| Error::read(path, e))?.len();
        if len > MAX_CONTENT_LEN {
            return Err(FormatError::ContentTooLarge(len).into());
        }
        let content = fs::read(path).map_err(|e| Error::read(path, e))?;
        Ok(Self::new(name, content)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.name, self.content)
    }
}

pub fn validate_name(name: &str) -> Result<(), FormatError> {
    match name.len() {
        0                         => Err(FormatError::EmptyName),
        n if n > MAX_NAME_LEN     => Err(FormatError::NameTooLong(n)),
        _                         => Ok(()),
    }
}

/// Build a record name from a path relative to some root, joining the
/// components with `/`.
pub fn name_from_relative(rel: &Path) -> Result<String, FormatError> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                parts.push(part.to_str().ok_or(FormatError::NameNotUtf8)?);
            }
            Component::CurDir => {}
            _ => return Err(FormatError::InvalidPath(rel.to_string_lossy().into_owned())),
        }
    }
    let name = parts.join("/");
    validate_name(&name)?;
    Ok(name)
}

/// Map a record name onto a path under `dir`.
///
/// Rejects anything that would not land strictly inside `dir`: absolute
/// names, `.`/`..` and empty components, backslashes and NUL bytes.
pub fn resolve_output_path(dir: &Path, name: &str) -> Result<PathBuf, FormatError> {
    let invalid = || FormatError::InvalidPath(name.to_owned());
    if name.is_empty() || name.contains('\0') || name.contains('\\') {
        return Err(invalid());
    }
    let mut out = dir.to_path_buf();
    for part in name.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return Err(invalid());
        }
        let mut comps = Path::new(part).components();
        match (comps.next(), comps.next()) {
            (Some(Component::Normal(_)), None) => out.push(part),
            _                                  => return Err(invalid()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_boundaries() {
        assert!(matches!(FileRecord::new("", vec![]), Err(FormatError::EmptyName)));
        assert!(FileRecord::new("a".repeat(255), vec![]).is_ok());
        assert!(matches!(
            FileRecord::new("a".repeat(256), vec![]),
            Err(FormatError::NameTooLong(256))
        ));
    }

    #[test]
    fn name_length_counts_utf8_bytes() {
        // 128 two-byte characters = 256 bytes.
        let name = "é".repeat(128);
        assert!(matches!(validate_name(&name), Err(FormatError::NameTooLong(256))));
    }

    #[test]
    fn relative_names_use_forward_slashes() {
        let rel = Path::new("docs").join("sub").join("notes.txt");
        assert_eq!(name_from_relative(&rel).unwrap(), "docs/sub/notes.txt");
    }

    #[test]
    fn output_paths_stay_inside_dir() {
        let dir = Path::new("out");
        assert_eq!(resolve_output_path(dir, "a/b.txt").unwrap(), dir.join("a").join("b.txt"));
        for bad in ["../escape", "/abs", "a//b", "a/./b", "trailing/", "nul\0", "back\\slash"] {
            assert!(
                matches!(resolve_output_path(dir, bad), Err(FormatError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
