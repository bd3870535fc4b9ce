//! Writing output files all at once.
//!
//! Data goes to a temporary file next to the destination, which is renamed
//! into place only after every byte has been flushed. A failed write leaves
//! the destination untouched.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Replace `path` with `bytes`, or leave it as it was on failure
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        writer.write_all(bytes)?;
        writer.flush()?;
    }
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.2bpp");
        std::fs::write(&path, b"old contents").unwrap();

        write_file(&path, &[1, 2, 3]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(entries(dir.path()), vec!["tiles.2bpp"]);
    }

    #[test]
    fn test_failed_rename_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail
        let path = dir.path().join("level.tlm");
        std::fs::create_dir(&path).unwrap();

        assert!(write_file(&path, &[7; 64]).is_err());
        assert!(path.is_dir());
        assert_eq!(entries(dir.path()), vec!["level.tlm"]);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("tiles.2bpp");
        assert!(write_file(&path, &[0; 16]).is_err());
        assert!(!path.exists());
    }
}
