//! Guest photo blob storage and best-effort cleanup.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

/// Writes a photo blob into `dir` under a generated name and returns the
/// stored file's path as a reference string.
pub fn save_photo(dir: impl AsRef<Path>, bytes: &[u8]) -> io::Result<String> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let ms = now_ms();
    let mut path = dir.join(format!("guest_{ms}.jpg"));
    // Timestamp names can collide when saves land in the same millisecond.
    let mut n = 1u32;
    while path.exists() {
        path = dir.join(format!("guest_{ms}_{n}.jpg"));
        n += 1;
    }
    fs::write(&path, bytes)?;
    Ok(path.to_string_lossy().into_owned())
}

/// Best-effort removal of a photo file.
///
/// An empty reference or a missing file is a no-op; a removal failure is
/// logged and never propagated. Returns true when a file was deleted.
pub fn discard(photo_ref: &str) -> bool {
    if photo_ref.is_empty() {
        return false;
    }

    let path = Path::new(photo_ref);
    if !path.exists() {
        return false;
    }

    match fs::remove_file(path) {
        Ok(()) => {
            debug!(photo_ref, "deleted guest photo");
            true
        }
        Err(err) => {
            warn!(photo_ref, %err, "failed to delete guest photo");
            false
        }
    }
}

/// Discards the previous photo when an update replaced the reference.
///
/// The new reference is never touched.
pub fn discard_replaced(old_ref: &str, new_ref: &str) {
    if old_ref != new_ref {
        discard(old_ref);
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
