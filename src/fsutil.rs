use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Atomically write content to a file
///
/// Writes to a temporary file in the same directory, syncs to disk,
/// then renames over the target path, so a partial write never leaves
/// a corrupt file behind.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory_exists(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

/// Ensure a directory exists, creating it and all parents if needed
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("store.json");

        atomic_write(&test_file, b"{}").unwrap();

        assert_eq!(std::fs::read(&test_file).unwrap(), b"{}");
    }

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("nested").join("dir").join("store.json");

        atomic_write(&test_file, b"content").unwrap();

        assert_eq!(std::fs::read(&test_file).unwrap(), b"content");
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("store.json");

        atomic_write(&test_file, b"first").unwrap();
        atomic_write(&test_file, b"second").unwrap();

        assert_eq!(std::fs::read(&test_file).unwrap(), b"second");
    }

    #[test]
    fn test_ensure_directory_exists_idempotent() {
        let temp_dir = tempdir().unwrap();
        let test_dir = temp_dir.path().join("a").join("b");

        ensure_directory_exists(&test_dir).unwrap();
        ensure_directory_exists(&test_dir).unwrap();

        assert!(test_dir.is_dir());
    }
}
