//! Zip extraction for downloaded bundle archives.
//!
//! Bundle zips nest everything under a single versioned top-level directory;
//! extraction strips that first path component so the result is a plain
//! `lib/` + `VERSIONS.txt` tree the index builder can walk directly.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Unpack an in-memory zip byte stream into `dest_dir`.
///
/// Directory entries and paths that are empty after stripping the top-level
/// component are skipped. Entry paths are taken from `enclosed_name`, which
/// rejects absolute and `..`-escaping names.
pub fn extract_zip(zip_data: &[u8], dest_dir: &Path) -> Result<(), ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_data))
        .map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        let Some(full_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };
        let Some(relative) = strip_top_level(&full_path) else {
            continue;
        };

        let target = dest_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&target)?;
        io::copy(&mut file, &mut outfile)?;
    }

    Ok(())
}

/// Drop the first path component; `None` if nothing remains.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let rest: PathBuf = components
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}
