//! Filesystem abstraction backing the tree reader.
//!
//! Validators never touch `std::fs` directly; everything goes through the
//! [`FileSystem`] trait so the platform shim stays a single seam.

use crate::issues::{CoreError, CoreResult};
use std::path::Path;

/// A single directory entry as reported by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Trait abstracting filesystem operations for the tree reader.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Read a file as text.
    ///
    /// Decoding is lossy UTF-8 with two fixed rules: a replacement
    /// character at position 0 means the content is UTF-16 read as UTF-8
    /// and fails with [`CoreError::UnicodeDecode`]; otherwise a leading
    /// UTF-8 BOM is stripped.
    fn read_text(&self, path: &Path) -> CoreResult<String>;

    /// Read the raw bytes of a file.
    fn read_bytes(&self, path: &Path) -> CoreResult<Vec<u8>>;

    /// List a directory in the order the underlying enumeration returns.
    fn read_dir(&self, path: &Path) -> CoreResult<Vec<DirEntry>>;

    /// Size of a file in bytes.
    fn size_of(&self, path: &Path) -> CoreResult<u64>;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Decode bytes per the `read_text` contract.
pub(crate) fn decode_text(path: &Path, bytes: &[u8]) -> CoreResult<String> {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().next() == Some('\u{FFFD}') {
        return Err(CoreError::UnicodeDecode {
            path: path.to_path_buf(),
        });
    }
    Ok(text.strip_prefix('\u{FEFF}').unwrap_or(&text).to_string())
}

/// Production implementation over the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_text(&self, path: &Path) -> CoreResult<String> {
        let bytes = self.read_bytes(path)?;
        decode_text(path, &bytes)
    }

    fn read_bytes(&self, path: &Path) -> CoreResult<Vec<u8>> {
        std::fs::read(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    fn read_dir(&self, path: &Path) -> CoreResult<Vec<DirEntry>> {
        let entries = std::fs::read_dir(path).map_err(|source| CoreError::DirRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CoreError::DirRead {
                path: path.to_path_buf(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| CoreError::FileRead {
                path: entry.path(),
                source,
            })?;
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }
        // Directory enumeration order is platform-dependent; sort so the
        // traversal (and therefore issue insertion order) is deterministic.
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn size_of(&self, path: &Path) -> CoreResult<u64> {
        std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|source| CoreError::FileRead {
                path: path.to_path_buf(),
                source,
            })
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_text_plain() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plain.txt");
        fs::write(&path, "hello").unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.read_text(&path).unwrap(), "hello");
    }

    #[test]
    fn test_read_text_strips_utf8_bom() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bom.json");
        fs::write(&path, b"\xEF\xBB\xBF{\"a\": 1}").unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.read_text(&path).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_read_text_rejects_utf16() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("utf16.csv");
        // "ab" as UTF-16LE with BOM: decoded as UTF-8 the BOM byte 0xFF is
        // invalid, so the first decoded char is U+FFFD.
        fs::write(&path, b"\xFF\xFEa\x00b\x00").unwrap();

        let fs = RealFileSystem;
        match fs.read_text(&path) {
            Err(CoreError::UnicodeDecode { path: p }) => assert_eq!(p, path),
            other => panic!("expected UnicodeDecode, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "").unwrap();
        fs::write(temp.path().join("a.txt"), "").unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();

        let fs = RealFileSystem;
        let names: Vec<_> = fs
            .read_dir(temp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn test_size_of() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sized.bin");
        fs::write(&path, [0u8; 42]).unwrap();

        assert_eq!(RealFileSystem.size_of(&path).unwrap(), 42);
    }
}
