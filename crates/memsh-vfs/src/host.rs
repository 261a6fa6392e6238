//! Bridges between the host filesystem and a [`Vfs`].
//!
//! These are the only places memsh touches real disk, and only when the
//! caller asks for it (e.g. `memsh --import ./fixtures:/work`).

use std::path::Path;

use memsh_types::error::Result;

use crate::{EntryKind, Vfs, join};

/// Copy a host file or directory tree into the VFS at `vfs_path`.
///
/// Missing VFS parent directories are created. Returns the number of files
/// copied.
pub fn import_host(vfs: &mut dyn Vfs, host: &Path, vfs_path: &str) -> Result<usize> {
    let meta = std::fs::metadata(host)?;
    if meta.is_file() {
        let data = std::fs::read(host)?;
        if let Some((parent, _)) = vfs_path.trim_end_matches('/').rsplit_once('/')
            && !parent.is_empty()
        {
            vfs.mkdir_all(parent)?;
        }
        vfs.write(vfs_path, &data)?;
        log::info!("Imported {} -> {vfs_path} ({} bytes)", host.display(), data.len());
        return Ok(1);
    }

    vfs.mkdir_all(vfs_path)?;
    let mut count = 0;
    for entry in std::fs::read_dir(host)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non-UTF-8 host path {}", path.display());
            continue;
        };
        let child = join(vfs_path, name);
        if path.is_dir() {
            count += import_host(vfs, &path, &child)?;
        } else if path.is_file() {
            let data = std::fs::read(&path)?;
            log::debug!("Imported {} -> {child} ({} bytes)", path.display(), data.len());
            vfs.write(&child, &data)?;
            count += 1;
        }
    }
    log::info!("Imported {count} files from {} into {vfs_path}", host.display());
    Ok(count)
}

/// Write a VFS file or directory tree out to `host`.
///
/// Returns the number of files written.
pub fn export_host(vfs: &dyn Vfs, vfs_path: &str, host: &Path) -> Result<usize> {
    let meta = vfs.stat(vfs_path)?;
    if meta.kind == EntryKind::File {
        if let Some(parent) = host.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(host, vfs.read(vfs_path)?)?;
        log::info!("Exported {vfs_path} -> {}", host.display());
        return Ok(1);
    }

    std::fs::create_dir_all(host)?;
    let mut count = 0;
    for entry in vfs.walk(vfs_path)? {
        let target = host.join(&entry.path);
        match entry.kind {
            EntryKind::Directory => std::fs::create_dir_all(&target)?,
            EntryKind::File => {
                std::fs::write(&target, vfs.read(&join(vfs_path, &entry.path))?)?;
                count += 1;
            },
        }
    }
    log::info!("Exported {count} files from {vfs_path} to {}", host.display());
    Ok(count)
}
