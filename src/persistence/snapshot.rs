//! Snapshot files: save/load full store content to/from disk.
//!
//! Saves go through a sibling `<path>.tmp` file that is fsynced and then
//! renamed over the target, so an interrupted save never damages the last
//! committed snapshot. On Unix the parent directory is fsynced after the
//! rename so the new directory entry survives a crash.

use crate::document::Document;
use crate::error::Result;
use crate::persistence::codec::{self, StoreSnapshot};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the temporary file used while saving `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Encode and atomically write store content to `path`.
pub fn save(
    path: &Path,
    dimension: Option<usize>,
    next_id: u64,
    documents: &[Document],
) -> Result<()> {
    let data = codec::encode(dimension, next_id, documents)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    if let Err(e) = write_and_sync(&tmp, &data) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    sync_parent(path)?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn write_and_sync(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Read and decode the snapshot at `path`.
pub fn load(path: &Path) -> Result<StoreSnapshot> {
    let data = fs::read(path)?;
    codec::decode(&data)
}
