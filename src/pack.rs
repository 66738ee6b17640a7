//! Single-file and directory packers.
//!
//! Both packers write mpylib containers: the destination is created (or
//! truncated) once, written to strictly in traversal order, and closed once.
//! The directory packer flattens a nested tree breadth-first with a sorted
//! worklist so repeated runs over unchanged input are byte-identical,
//! independent of the filesystem's listing order.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::format::{self, FormatError};

#[derive(Error, Debug)]
pub enum PackError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Header encoding failed: {0}")]
    Format(#[from] FormatError),

    #[error("Unsupported directory entry (not a regular file or directory): {0}")]
    UnsupportedEntry(PathBuf),

    #[error("Source file has no usable filename: {0}")]
    BadSourceName(PathBuf),
}

/// Pack a single source file into a one-record container at `dest`.
///
/// The record name is the source's base filename. On success the destination
/// holds exactly header + content; any pre-existing content is discarded. On
/// error the destination's content is undefined and must not be reused.
pub fn pack_file(source: &Path, dest: &Path) -> Result<(), PackError> {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PackError::BadSourceName(source.to_path_buf()))?;

    let content = fs::read(source)?;
    let header = format::encode_header(name, content.len() as u64)?;

    let mut output = File::create(dest)?;
    output.write_all(&header)?;
    output.write_all(&content)?;
    output.flush()?;
    Ok(())
}

/// Flatten `source` into a multi-record container at `dest`.
///
/// Record names are `{prefix}/{relative_path}`; all nesting information lives
/// in those names, the format itself has no directory concept. Traversal is
/// breadth-first: the worklist is seeded with the sorted immediate children
/// of `source` and processed strictly FIFO, with each directory's children
/// sorted before they are enqueued.
///
/// # Errors
///
/// Symlinks and other non-regular, non-directory entries are rejected with
/// [`PackError::UnsupportedEntry`] rather than skipped, so a container can
/// never silently omit part of the tree.
pub fn pack_dir(source: &Path, dest: &Path, prefix: &str) -> Result<(), PackError> {
    let mut output = File::create(dest)?;
    let mut queue: VecDeque<String> = sorted_children(source)?.into();

    while let Some(rel_path) = queue.pop_front() {
        let full_path = source.join(&rel_path);
        let meta = fs::symlink_metadata(&full_path)?;

        if meta.is_dir() {
            for child in sorted_children(&full_path)? {
                queue.push_back(format!("{rel_path}/{child}"));
            }
            continue;
        }
        if !meta.is_file() {
            return Err(PackError::UnsupportedEntry(full_path));
        }

        let content = fs::read(&full_path)?;
        let archive_name = format!("{prefix}/{rel_path}");
        let header = format::encode_header(&archive_name, content.len() as u64)?;
        output.write_all(&header)?;
        output.write_all(&content)?;
    }

    output.flush()?;
    Ok(())
}

/// List the child names of `dir`, sorted lexicographically.
fn sorted_children(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().into_string().map_err(|raw| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Non-UTF-8 filename: {}", raw.to_string_lossy()),
            )
        })?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::read_entries;
    use tempfile::tempdir;

    #[test]
    fn test_pack_file_layout() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("abc.mpy");
        fs::write(&src, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let dest = dir.path().join("abc.mpylib");
        pack_file(&src, &dest).unwrap();

        let bytes = fs::read(&dest).unwrap();
        assert_eq!(bytes.len(), 28);

        let entries = read_entries(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "abc.mpy");
        assert_eq!(entries[0].payload, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_pack_file_truncates_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("x.mpy");
        fs::write(&src, b"xy").unwrap();

        let dest = dir.path().join("out.mpylib");
        fs::write(&dest, vec![0u8; 4096]).unwrap();
        pack_file(&src, &dest).unwrap();

        let bytes = fs::read(&dest).unwrap();
        assert_eq!(bytes.len(), 16 + 5 + 2);
    }

    #[test]
    fn test_pack_dir_sorted_order() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("mylib");
        fs::create_dir_all(src.join("b")).unwrap();
        fs::create_dir_all(src.join("a")).unwrap();
        fs::write(src.join("a/x.mpy"), b"one").unwrap();
        fs::write(src.join("b/y.mpy"), b"two").unwrap();

        let dest = dir.path().join("mylib.mpylib");
        pack_dir(&src, &dest, "mylib").unwrap();

        let entries = read_entries(&fs::read(&dest).unwrap()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["mylib/a/x.mpy", "mylib/b/y.mpy"]);
    }

    #[test]
    fn test_pack_dir_breadth_first() {
        // Top-level files come before any nested files, regardless of name.
        let dir = tempdir().unwrap();
        let src = dir.path().join("lib");
        fs::create_dir_all(src.join("aaa")).unwrap();
        fs::write(src.join("aaa/inner.mpy"), b"inner").unwrap();
        fs::write(src.join("zzz.mpy"), b"top").unwrap();

        let dest = dir.path().join("lib.mpylib");
        pack_dir(&src, &dest, "lib").unwrap();

        let entries = read_entries(&fs::read(&dest).unwrap()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["lib/zzz.mpy", "lib/aaa/inner.mpy"]);
    }

    #[test]
    fn test_pack_dir_idempotent() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("lib");
        fs::create_dir_all(src.join("sub/deep")).unwrap();
        fs::write(src.join("top.mpy"), b"t").unwrap();
        fs::write(src.join("sub/mid.mpy"), b"m").unwrap();
        fs::write(src.join("sub/deep/leaf.mpy"), b"l").unwrap();

        let dest1 = dir.path().join("one.mpylib");
        let dest2 = dir.path().join("two.mpylib");
        pack_dir(&src, &dest1, "lib").unwrap();
        pack_dir(&src, &dest2, "lib").unwrap();

        assert_eq!(fs::read(&dest1).unwrap(), fs::read(&dest2).unwrap());
    }

    #[test]
    fn test_pack_dir_flattening_complete() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("lib");
        fs::create_dir_all(src.join("a/b/c")).unwrap();
        fs::write(src.join("root.mpy"), b"r").unwrap();
        fs::write(src.join("a/one.mpy"), b"1").unwrap();
        fs::write(src.join("a/b/two.mpy"), b"2").unwrap();
        fs::write(src.join("a/b/c/three.mpy"), b"3").unwrap();

        let dest = dir.path().join("lib.mpylib");
        pack_dir(&src, &dest, "lib").unwrap();

        let entries = read_entries(&fs::read(&dest).unwrap()).unwrap();
        let mut got: Vec<(String, Vec<u8>)> =
            entries.into_iter().map(|e| (e.name, e.payload)).collect();
        got.sort();

        let mut expected = vec![
            ("lib/root.mpy".to_string(), b"r".to_vec()),
            ("lib/a/one.mpy".to_string(), b"1".to_vec()),
            ("lib/a/b/two.mpy".to_string(), b"2".to_vec()),
            ("lib/a/b/c/three.mpy".to_string(), b"3".to_vec()),
        ];
        expected.sort();
        assert_eq!(got, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_pack_dir_rejects_symlink() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("lib");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("real.mpy"), b"real").unwrap();
        std::os::unix::fs::symlink(src.join("real.mpy"), src.join("zlink.mpy")).unwrap();

        let dest = dir.path().join("lib.mpylib");
        let err = pack_dir(&src, &dest, "lib").unwrap_err();
        assert!(matches!(err, PackError::UnsupportedEntry(p) if p.ends_with("zlink.mpy")));
    }
}
