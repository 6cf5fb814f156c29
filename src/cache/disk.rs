use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::resolver::source::has_extension;

/// First regular file in `dir` carrying `extension`, if any.
///
/// Temporary files written by [`write_atomic`] never match.
pub async fn lookup(dir: &Path, extension: &str) -> Option<PathBuf> {
    let mut entries = fs::read_dir(dir).await.ok()?;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !has_extension(&path, extension) {
            continue;
        }
        match entry.file_type().await {
            Ok(file_type) if file_type.is_file() => return Some(path),
            _ => continue,
        }
    }

    None
}

/// Writes `bytes` next to `path` and renames it into place, creating parent
/// directories as needed. Readers see either no file or the complete one.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        // create_dir_all succeeds when a concurrent caller created it first
        fs::create_dir_all(dir).await?;
    }

    let tmp = temp_path(path);

    if let Err(e) = fs::write(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{:016x}.tmp", name, rand::random::<u64>()))
}
