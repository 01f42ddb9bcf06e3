//! Output placement: write the note, optionally copy the source next to it.
//!
//! Notes are named `{source stem}_{language suffix}.md` and overwrite any
//! earlier note for the same source and language. Copies are never
//! overwritten: a taken name gets `_copy_1`, `_copy_2`, … before its
//! extension.

use crate::error::NoteError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the note for `source_name` in a language with `suffix`.
pub fn note_file_name(source_name: &str, suffix: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "note".to_string());
    format!("{}_{}.md", stem, suffix)
}

/// Write `text` as the note for `source_name` into `output_dir`.
///
/// Creates the directory if needed. The write goes through a temporary
/// sibling and a rename, so a reader sees the old note or the new one,
/// never a partial file.
pub async fn write_note(
    text: &str,
    output_dir: &Path,
    source_name: &str,
    suffix: &str,
) -> Result<PathBuf, NoteError> {
    let path = output_dir.join(note_file_name(source_name, suffix));
    let write_err = |source| NoteError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(output_dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote note: {}", path.display());
    Ok(path)
}

/// Copy `source` into `target_dir` without overwriting anything.
///
/// The copy is named `desired_name` (its final component) when given, else
/// after the source file itself.
pub async fn copy_source(
    source: &Path,
    target_dir: &Path,
    desired_name: Option<&str>,
) -> Result<PathBuf, NoteError> {
    tokio::fs::create_dir_all(target_dir)
        .await
        .map_err(|e| NoteError::OutputWriteFailed {
            path: target_dir.to_path_buf(),
            source: e,
        })?;

    let base = desired_name
        .map(Path::new)
        .and_then(Path::file_name)
        .or_else(|| source.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| NoteError::InvalidFilename {
            name: desired_name.unwrap_or_default().to_string(),
        })?;

    let dest = reserve(target_dir, &base).await?;
    if let Err(e) = tokio::fs::copy(source, &dest).await {
        let _ = tokio::fs::remove_file(&dest).await;
        return Err(NoteError::OutputWriteFailed {
            path: dest,
            source: e,
        });
    }

    info!("Copied source to: {}", dest.display());
    Ok(dest)
}

/// Create an empty file under the first free name derived from `base`.
async fn reserve(dir: &Path, base: &str) -> Result<PathBuf, NoteError> {
    let base_path = Path::new(base);
    let stem = base_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for n in 0u32.. {
        let name = if n == 0 {
            base.to_string()
        } else {
            format!("{}_copy_{}{}", stem, n, ext)
        };
        let candidate = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next name", candidate.display());
            }
            Err(e) => {
                return Err(NoteError::OutputWriteFailed {
                    path: candidate,
                    source: e,
                })
            }
        }
    }
    Err(NoteError::Internal(format!(
        "no free copy name for '{}' in {}",
        base,
        dir.display()
    )))
}
