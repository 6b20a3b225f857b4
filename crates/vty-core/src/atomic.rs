//! Atomic file replacement: write `<path>.tmp`, then rename over `<path>`.

use crate::error::AtomicWriteError;
use std::ffi::OsString;
use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Sibling temp file used while writing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace `path` with `data`, with `mode` permissions.
///
/// Readers see either the old file or the complete new one.
pub async fn atomic_write(path: &Path, data: &[u8], mode: u32) -> Result<(), AtomicWriteError> {
    let tmp = temp_path(path);

    write_temp(&tmp, data, mode)
        .await
        .map_err(|source| AtomicWriteError::WriteTemp {
            path: tmp.clone(),
            source,
        })?;

    if let Err(source) = fs::rename(&tmp, path).await {
        if let Err(e) = fs::remove_file(&tmp).await {
            warn!("Failed to remove {} after rename failure: {}", tmp.display(), e);
        }
        return Err(AtomicWriteError::Rename {
            from: tmp,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

async fn write_temp(tmp: &Path, data: &[u8], mode: u32) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(tmp)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;

    // `mode` only applies on creation; a leftover temp file keeps its old bits.
    fs::set_permissions(tmp, Permissions::from_mode(mode)).await
}
