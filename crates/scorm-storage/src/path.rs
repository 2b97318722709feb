//! Folder name and relative path validation
//!
//! Every name that reaches a backend goes through this module first. Names
//! are split on `/` and each segment must be a plain file name: no `.` or
//! `..`, no empty segments, no backslashes, no NUL bytes and no leading `/`.

use crate::{Result, StorageError};
use std::fmt;
use std::path::{Path, PathBuf};

/// Maximum length of a single path segment
pub const MAX_SEGMENT_LEN: usize = 255;

/// Validate a single path segment
pub fn validate_segment(segment: &str) -> Result<&str> {
    if segment.is_empty() {
        return Err(StorageError::InvalidName("empty path segment".to_string()));
    }
    if segment == "." || segment == ".." {
        return Err(StorageError::InvalidName(format!(
            "relative segment '{}' is not allowed",
            segment
        )));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(StorageError::InvalidName(format!(
            "segment exceeds {} bytes",
            MAX_SEGMENT_LEN
        )));
    }
    if segment.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidName(format!(
            "segment '{}' contains a reserved character",
            segment.escape_debug()
        )));
    }
    if segment.chars().any(char::is_control) {
        return Err(StorageError::InvalidName(format!(
            "segment '{}' contains a control character",
            segment.escape_debug()
        )));
    }
    Ok(segment)
}

/// A validated top-level folder name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderName(String);

impl FolderName {
    /// Parse and validate a folder name
    pub fn parse(name: &str) -> Result<Self> {
        validate_segment(name)?;
        Ok(Self(name.to_string()))
    }

    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated relative path inside a folder (one or more segments)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelativePath(Vec<String>);

impl RelativePath {
    /// Parse a slash-separated relative path
    pub fn parse(path: &str) -> Result<Self> {
        if path.starts_with('/') {
            return Err(StorageError::InvalidName(format!(
                "absolute path '{}' is not allowed",
                path
            )));
        }
        Self::from_segments(path.split('/'))
    }

    /// Build from individual segments
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = segments
            .into_iter()
            .map(|s| validate_segment(s.as_ref()).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        if segments.is_empty() {
            return Err(StorageError::InvalidName("empty relative path".to_string()));
        }
        Ok(Self(segments))
    }

    /// The path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment (the file's own name)
    pub fn file_name(&self) -> &str {
        // from_segments guarantees at least one segment
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Join onto a filesystem base directory
    pub fn to_path(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for segment in &self.0 {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Full key of a stored object: folder plus relative path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub folder: FolderName,
    pub path: RelativePath,
}

impl ObjectKey {
    /// Create a key from validated parts
    pub fn new(folder: FolderName, path: RelativePath) -> Self {
        Self { folder, path }
    }

    /// Parse both parts from raw strings
    pub fn parse(folder: &str, path: &str) -> Result<Self> {
        Ok(Self::new(FolderName::parse(folder)?, RelativePath::parse(path)?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("course")]
    #[case("my package v2")]
    #[case("index.html")]
    #[case(".hidden")]
    fn test_valid_segments(#[case] segment: &str) {
        assert!(validate_segment(segment).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("nul\0byte")]
    #[case("line\nbreak")]
    fn test_invalid_segments(#[case] segment: &str) {
        assert!(matches!(
            validate_segment(segment),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_segment_length_limit() {
        let long = "a".repeat(MAX_SEGMENT_LEN + 1);
        assert!(validate_segment(&long).is_err());
        assert!(validate_segment(&long[1..]).is_ok());
    }

    #[test]
    fn test_relative_path_parse() {
        let path = RelativePath::parse("res/js/app.js").unwrap();
        assert_eq!(path.segments(), ["res", "js", "app.js"]);
        assert_eq!(path.file_name(), "app.js");
        assert_eq!(path.to_string(), "res/js/app.js");
    }

    #[test]
    fn test_relative_path_rejects_traversal() {
        assert!(RelativePath::parse("../etc/passwd").is_err());
        assert!(RelativePath::parse("a/../../b").is_err());
        assert!(RelativePath::parse("/abs/path").is_err());
        assert!(RelativePath::parse("a//b").is_err());
        assert!(RelativePath::parse("").is_err());
    }

    #[test]
    fn test_to_path_stays_under_base() {
        let base = Path::new("/srv/public/course");
        let path = RelativePath::parse("a/b.txt").unwrap();
        assert_eq!(path.to_path(base), Path::new("/srv/public/course/a/b.txt"));
    }

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::parse("course", "index.html").unwrap();
        assert_eq!(key.to_string(), "course/index.html");
        assert!(ObjectKey::parse("..", "index.html").is_err());
    }
}
