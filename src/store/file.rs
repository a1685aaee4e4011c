use crate::backend::SessionStore;
use crate::error::StoreError;
use crate::session::SessionState;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One bincode snapshot per session under a directory.
///
/// Writes go to a temporary file that is renamed into place, so a reader
/// never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Opens the store, creating `root` if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::Io(format!("Could not create directory '{}': {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        let name: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.session", name))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionState>, StoreError> {
        let path = self.path_for(session_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Could not read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        let (session, _) = decode_from_slice(&bytes, standard())
            .map_err(|e| StoreError::Serialization(format!("Deserialization failed: {}", e)))?;
        Ok(Some(session))
    }

    fn save(&self, session_id: &str, session: &SessionState) -> Result<(), StoreError> {
        let bytes = encode_to_vec(session, standard())
            .map_err(|e| StoreError::Serialization(format!("Serialization failed: {}", e)))?;
        let path = self.path_for(session_id);
        let staging = path.with_extension("session.tmp");
        fs::write(&staging, &bytes).map_err(|e| {
            StoreError::Io(format!("Could not write '{}': {}", staging.display(), e))
        })?;
        fs::rename(&staging, &path).map_err(|e| {
            StoreError::Io(format!("Could not move '{}' into place: {}", path.display(), e))
        })?;
        debug!(session_id, bytes = bytes.len(), "Session snapshot written");
        Ok(())
    }
}
