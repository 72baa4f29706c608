//! Small JSON documents kept next to the config file.
//!
//! Reads never fail: a missing file yields the type's default, a broken one
//! is logged and also yields the default. Writes go to a sibling temp file
//! that is renamed over the target, so an interrupted write leaves the
//! previous document readable.

use std::path::Path;

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::{debug, warn},
};

/// Read `path` as JSON, falling back to `T::default()`.
pub fn load_document<T: DeserializeOwned + Default>(path: &Path) -> T {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document, using defaults");
            return T::default();
        },
    };

    serde_json::from_str(&data).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to parse document, using defaults");
        T::default()
    })
}

/// Write `value` to `path` as pretty JSON, replacing the file atomically.
///
/// On Unix the file is restricted to the owner (0600).
pub fn save_document<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), "saved document");
    Ok(())
}
