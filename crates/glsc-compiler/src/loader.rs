//! Reading shader sources.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// The complete contents of one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl SourceBuffer {
    /// Wraps bytes that were obtained for `path`.
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    /// The path the buffer was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty file.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Source of shader text. A build calls [`SourceLoader::load`] once per
/// input, in order, and stops at the first unit that fails.
pub trait SourceLoader {
    /// Reads all of `path`. No partial buffer is ever returned.
    fn load(&self, path: &Path) -> Result<SourceBuffer, LoadError>;
}

/// Loads sources from the file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<SourceBuffer, LoadError> {
        let not_found = |source| LoadError::NotFound {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(not_found)?;
        let len = file.metadata().map_err(not_found)?.len();
        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.read_to_end(&mut bytes).map_err(not_found)?;
        log::debug!("loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(SourceBuffer::new(path, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_whole_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".vert")
            .tempfile()
            .expect("temp file");
        file.write_all(b"void main() {}\n").expect("write");

        let buffer = FsLoader.load(file.path()).expect("load");
        assert_eq!(buffer.bytes(), b"void main() {}\n");
        assert_eq!(buffer.len(), 15);
        assert_eq!(buffer.path(), file.path());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.frag");
        let err = FsLoader.load(&path).expect_err("file does not exist");
        assert_eq!(
            err.to_string(),
            format!("File \"{}\" does not exist.", path.display())
        );
    }

    #[test]
    fn directory_is_not_a_source() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(FsLoader.load(dir.path()).is_err());
    }
}
