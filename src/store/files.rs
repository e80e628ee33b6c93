//! JSON file helpers shared by the store and the allow-lists.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StoreError, StoreResult};

/// Read and decode `path`. A missing file is `Ok(None)`; a file that does not
/// decode is [`StoreError::Malformed`].
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// Encode `value` as pretty JSON and replace `path` with it.
///
/// Writes to a sibling temp file first so a crash never leaves a truncated
/// record behind.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialization {
        what: path.display().to_string(),
        message: e.to_string(),
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| StoreError::Io {
        path: tmp.display().to_string(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
