use crate::error::{PanelError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

fn builder<'a>(prefix: &'a str, suffix: &'a str) -> Builder<'a, 'a> {
    let mut builder = Builder::new();
    builder.prefix(prefix).suffix(suffix);
    builder
}

fn create(builder: &Builder<'_, '_>, dir: Option<&Path>) -> Result<NamedTempFile> {
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file)
}

/// Reserves a unique `.png` path for the generator to write into. The file is
/// kept on disk; whoever receives the path owns it.
pub fn allocate_output_image(dir: Option<&Path>) -> Result<PathBuf> {
    let file = create(&builder("fibo-", ".png"), dir)?;
    let (_, path) = file.keep().map_err(|e| PanelError::IoError(e.error))?;
    Ok(path)
}

/// Writes a structured prompt to a temp file that is deleted when the handle
/// drops.
pub fn write_structured_prompt(dir: Option<&Path>, json: &str) -> Result<NamedTempFile> {
    let mut file = create(&builder("fibo-prompt-", ".json"), dir)?;
    file.write_all(json.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Writes uploaded image bytes to a temp file that is deleted when the handle
/// drops.
pub fn write_upload(dir: Option<&Path>, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = create(&builder("fibo-upload-", ".png"), dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Best-effort removal of a file nobody will claim.
pub fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_images_are_unique_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let first = allocate_output_image(Some(dir.path())).unwrap();
        let second = allocate_output_image(Some(dir.path())).unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("png"));
        assert!(first.starts_with(dir.path()));
    }

    #[test]
    fn test_structured_prompt_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_structured_prompt(Some(dir.path()), "{\"a\": 1}").unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\": 1}");

        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        discard(&dir.path().join("never-created.png"));
    }
}
