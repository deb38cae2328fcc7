//! PDF + JSON metadata pair writer.
//!
//! A downloaded PDF is always stored next to a pretty-printed JSON copy of its
//! bib record, sharing the filename stem. Both files are written under
//! temporary names first and then renamed into place; if anything fails, both
//! are removed so a PDF never exists without its sidecar.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors produced while persisting a pair.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// I/O error writing or renaming one of the files.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// File name has no usable stem.
    #[error("invalid PDF file name: {0:?}")]
    InvalidName(String),

    /// The blocking write task panicked or was cancelled.
    #[error("persist task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Paths of a written pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPair {
    pub pdf_path: PathBuf,
    pub json_path: PathBuf,
}

/// Derives the sidecar `.json` path from a PDF path.
///
/// - `paper.pdf` → `paper.json`
/// - `no_extension` → `no_extension.json`
#[must_use]
pub fn sidecar_path(pdf_path: &Path) -> PathBuf {
    let mut p = pdf_path.to_path_buf();
    p.set_extension("json");
    p
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Writes `<output_dir>/<pdf_name>` and its `.json` sidecar. Existing files
/// with the same names are replaced.
///
/// # Errors
///
/// Returns [`SidecarError`] after removing whatever was written.
#[instrument(skip(bytes, bib_info), fields(len = bytes.len()))]
pub fn write_pair(
    output_dir: &Path,
    pdf_name: &str,
    bytes: &[u8],
    bib_info: &Value,
) -> Result<SavedPair, SidecarError> {
    let pdf_path = output_dir.join(pdf_name);
    if pdf_path.file_stem().is_none() || pdf_path.parent() != Some(output_dir) {
        return Err(SidecarError::InvalidName(pdf_name.to_string()));
    }
    let pair = SavedPair {
        json_path: sidecar_path(&pdf_path),
        pdf_path,
    };

    let result = write_parts(&pair, bytes, bib_info);
    if let Err(err) = &result {
        warn!(error = %err, pdf = %pair.pdf_path.display(), "Persist failed, removing partial pair");
        for path in [
            part_path(&pair.pdf_path),
            part_path(&pair.json_path),
            pair.pdf_path.clone(),
            pair.json_path.clone(),
        ] {
            // Best-effort: the file may never have been created.
            let _ = fs::remove_file(path);
        }
    }
    result.map(|()| {
        debug!(pdf = %pair.pdf_path.display(), "Pair written");
        pair
    })
}

/// Async wrapper around [`write_pair`] that runs the file I/O on the
/// blocking pool.
///
/// # Errors
///
/// Same as [`write_pair`], plus [`SidecarError::Task`] if the task dies.
pub async fn save_pair(
    output_dir: PathBuf,
    pdf_name: String,
    bytes: Vec<u8>,
    bib_info: Value,
) -> Result<SavedPair, SidecarError> {
    tokio::task::spawn_blocking(move || write_pair(&output_dir, &pdf_name, &bytes, &bib_info))
        .await?
}

fn write_parts(pair: &SavedPair, bytes: &[u8], bib_info: &Value) -> Result<(), SidecarError> {
    let pdf_part = part_path(&pair.pdf_path);
    let json_part = part_path(&pair.json_path);
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| SidecarError::Io { path, source }
    };

    fs::write(&pdf_part, bytes).map_err(io_err(&pdf_part))?;

    let file = fs::File::create(&json_part).map_err(io_err(&json_part))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, bib_info)?;
    writer.flush().map_err(io_err(&json_part))?;
    drop(writer);

    fs::rename(&pdf_part, &pair.pdf_path).map_err(io_err(&pair.pdf_path))?;
    fs::rename(&json_part, &pair.json_path).map_err(io_err(&pair.json_path))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_path_replaces_extension() {
        assert_eq!(sidecar_path(Path::new("/o/paper.pdf")), Path::new("/o/paper.json"));
        assert_eq!(sidecar_path(Path::new("/o/plain")), Path::new("/o/plain.json"));
    }

    #[test]
    fn test_write_pair_shares_stem_and_leaves_no_parts() {
        let dir = TempDir::new().unwrap();
        let bib = json!({"title": "T", "extra": {"k": 1}});
        let pair = write_pair(dir.path(), "10.1_x.pdf", b"%PDF-1.4", &bib).unwrap();

        assert_eq!(std::fs::read(&pair.pdf_path).unwrap(), b"%PDF-1.4");
        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(&pair.json_path).unwrap()).unwrap();
        assert_eq!(saved, bib);
        assert_eq!(pair.pdf_path.file_stem(), pair.json_path.file_stem());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {names:?}");
    }

    #[test]
    fn test_write_pair_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        write_pair(dir.path(), "a.pdf", b"old", &json!({"v": 1})).unwrap();
        let pair = write_pair(dir.path(), "a.pdf", b"new", &json!({"v": 2})).unwrap();
        assert_eq!(std::fs::read(&pair.pdf_path).unwrap(), b"new");
    }

    #[test]
    fn test_write_pair_failure_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        // A directory where the JSON file should go makes the final rename fail.
        std::fs::create_dir(dir.path().join("b.json")).unwrap();
        std::fs::write(dir.path().join("b.json").join("keep"), b"x").unwrap();

        let err = write_pair(dir.path(), "b.pdf", b"%PDF", &json!({})).unwrap_err();
        assert!(matches!(err, SidecarError::Io { .. }));
        assert!(!dir.path().join("b.pdf").exists());
        assert!(!dir.path().join("b.pdf.part").exists());
        assert!(!dir.path().join("b.json.part").exists());
    }

    #[test]
    fn test_write_pair_rejects_nested_names() {
        let dir = TempDir::new().unwrap();
        let err = write_pair(dir.path(), "../escape.pdf", b"%PDF", &json!({})).unwrap_err();
        assert!(matches!(err, SidecarError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_save_pair_writes_from_async_context() {
        let dir = TempDir::new().unwrap();
        let bib = json!({"title": "Async", "savedPdfName": "a.pdf"});
        let pair = save_pair(
            dir.path().to_path_buf(),
            "a.pdf".to_string(),
            b"%PDF-1.4".to_vec(),
            bib.clone(),
        )
        .await
        .unwrap();
        assert_eq!(fs::read(&pair.pdf_path).unwrap(), b"%PDF-1.4");
        let written: Value = serde_json::from_str(&fs::read_to_string(&pair.json_path).unwrap()).unwrap();
        assert_eq!(written, bib);
    }
}
