//! Library discovery, packing orchestration, and the manifest document.
//!
//! Walks the `lib/` directory of an extracted bundle in sorted order,
//! dispatches each entry to the single-file or directory packer, and
//! cross-references every library against the externally supplied dependency
//! index. The manifest is accumulated in memory and written once, in full,
//! only after every library has packed successfully.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::pack::{self, PackError};

/// Manifest format version written into `index.json`.
pub const FORMAT_VERSION: u32 = 1;

/// Suffix of pre-compiled single-file libraries inside the bundle.
pub const LIB_SUFFIX: &str = ".mpy";

/// Extension of packed container files.
pub const PACKED_EXT: &str = "mpylib";

/// Name of the version descriptor inside the bundle root.
pub const VERSIONS_FILE: &str = "VERSIONS.txt";

/// Name of the manifest document inside the destination directory.
pub const MANIFEST_FILE: &str = "index.json";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Library not present in dependency index: {0}")]
    NotFound(String),

    #[error("Packing failed: {0}")]
    Pack(#[from] PackError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// One library's entry in the externally supplied dependency index.
///
/// The index document carries more fields than these; everything not read
/// here is ignored rather than validated.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    /// Names of other bundle libraries this library imports.
    pub dependencies: Vec<String>,
    /// Upstream version of the library itself.
    pub version: String,
}

/// Mapping from canonical library name to its dependency-index entry.
pub type DependencyIndex = HashMap<String, IndexEntry>;

/// One packed library as recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryRecord {
    pub name: String,
    pub deps: Vec<String>,
    pub version: String,
}

/// The manifest document written next to the packed containers.
#[derive(Debug, Serialize, Deserialize)]
pub struct LibraryIndex {
    pub format: u32,
    /// Bundle release version, read from the first line of `VERSIONS.txt`.
    pub version: String,
    /// Library records in sorted discovery order.
    pub libs: Vec<LibraryRecord>,
}

/// Pack every library under `{bundle_root}/lib` into `dest_dir`.
///
/// Entries are processed in lexicographic order. A `.mpy` file becomes a
/// one-record container; a directory is flattened with its canonical name as
/// the record-name prefix. Each container lands at
/// `{dest_dir}/{name}.mpylib`, and the manifest is written to
/// `{dest_dir}/index.json` after the last library succeeds.
///
/// # Errors
///
/// Returns [`IndexError::NotFound`] if a discovered library has no entry in
/// `dep_index`; any error aborts the run before the manifest is written,
/// leaving whatever containers were already packed. Callers must treat the
/// destination as stale and clear it before retrying.
pub fn pack_libraries(
    bundle_root: &Path,
    dest_dir: &Path,
    dep_index: &DependencyIndex,
) -> Result<LibraryIndex, IndexError> {
    let lib_root = bundle_root.join("lib");
    let release_version = read_release_version(bundle_root)?;

    let mut entries: Vec<String> = Vec::new();
    for entry in fs::read_dir(&lib_root)? {
        let entry = entry?;
        entries.push(entry.file_name().to_string_lossy().into_owned());
    }
    entries.sort();

    let mut libs = Vec::with_capacity(entries.len());
    for lib in &entries {
        let name = lib.strip_suffix(LIB_SUFFIX).unwrap_or(lib);
        info!(library = name, "packing");

        let index_entry = dep_index
            .get(name)
            .ok_or_else(|| IndexError::NotFound(name.to_string()))?;

        let source = lib_root.join(lib);
        let packed = dest_dir.join(format!("{name}.{PACKED_EXT}"));
        if lib.ends_with(LIB_SUFFIX) {
            pack::pack_file(&source, &packed)?;
        } else {
            pack::pack_dir(&source, &packed, name)?;
        }

        libs.push(LibraryRecord {
            name: name.to_string(),
            deps: index_entry.dependencies.clone(),
            version: index_entry.version.clone(),
        });
    }

    let manifest = LibraryIndex {
        format: FORMAT_VERSION,
        version: release_version,
        libs,
    };
    let json = serde_json::to_string(&manifest)?;
    fs::write(dest_dir.join(MANIFEST_FILE), json)?;

    Ok(manifest)
}

/// First line of the bundle's version descriptor, trimmed.
fn read_release_version(bundle_root: &Path) -> io::Result<String> {
    let content = fs::read_to_string(bundle_root.join(VERSIONS_FILE))?;
    Ok(content.lines().next().unwrap_or("").trim().to_string())
}
