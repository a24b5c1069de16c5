//! Conversation id storage
//!
//! Stores the active conversation id in ~/.local/share/parley/conversation_id
//! with restricted permissions (0o600)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use parley_session::{ConversationStore, Error, Result};

/// Get the default storage file path
pub fn default_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parley")
        .join("conversation_id")
}

/// [`ConversationStore`] backed by a single text file
#[derive(Debug, Clone)]
pub struct FileConversationStore {
    path: PathBuf,
}

impl FileConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, conversation_id: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.exists()) {
            fs::create_dir_all(dir)?;
            #[cfg(unix)]
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }

        fs::write(&self.path, conversation_id)?;

        #[cfg(unix)]
        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}

fn persistence(e: io::Error) -> Error {
    Error::Persistence(e.to_string())
}

impl ConversationStore for FileConversationStore {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence(e)),
        }
    }

    fn save(&self, conversation_id: &str) -> Result<()> {
        self.write(conversation_id).map_err(persistence)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence(e)),
        }
    }
}
