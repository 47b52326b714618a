//! Filesystem helpers for the source and output folders.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Files already carrying a `-` are taken to be renamed output and skipped.
const PROCESSED_MARKER: char = '-';

/// Whether `name` is a pending source image: an allowed extension (compared
/// case-insensitively) and no `-` anywhere in the name.
pub fn is_pending(name: &str, extensions: &[String]) -> bool {
    if name.contains(PROCESSED_MARKER) {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

/// List pending images directly inside `dir`, sorted by file name.
/// Subdirectories are not descended into.
pub fn scan_pending(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            log::debug!("Skipping non UTF-8 file name {:?}", name);
            continue;
        };
        if is_pending(name, extensions) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

pub fn write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(path, bytes)
}

pub fn delete(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}
