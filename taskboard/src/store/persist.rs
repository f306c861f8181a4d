//! Saving and restoring a [`MemoryStore`] between runs.

use std::path::{Path, PathBuf};

use taskboard_proto::codec::{self, CodecError};

use super::memory::MemoryStore;

/// Errors from reading or writing a state file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The file could not be read or written.
    #[error("state file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file contents are not a valid store state.
    #[error("state file {path}: {source}")]
    Codec {
        /// File involved.
        path: PathBuf,
        /// Decode or encode failure.
        source: CodecError,
    },
}

/// Loads a store from `path`. A missing file gives an empty store.
///
/// # Errors
///
/// Returns [`PersistError`] if the file exists but cannot be read or
/// decoded.
pub fn load(path: &Path) -> Result<MemoryStore, PersistError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no saved state, starting empty");
            return Ok(MemoryStore::new());
        }
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let state = codec::decode_state(&bytes).map_err(|source| PersistError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), records = state.documents.len(), "state loaded");
    Ok(MemoryStore::from_state(state))
}

/// Writes every record of `store` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`PersistError`] if the state cannot be encoded or written.
pub fn save(store: &MemoryStore, path: &Path) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let state = store.export_state();
    let bytes = codec::encode_state(&state).map_err(|source| PersistError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)?;
    tracing::info!(path = %path.display(), records = state.documents.len(), "state saved");
    Ok(())
}
