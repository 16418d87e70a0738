use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::Session;

/// Keeps the signed-in session across CLI invocations.
///
/// A JSON file in the data dir. Loading an unreadable session, or an expired
/// one with no refresh token, removes the file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at `<data dir>/grippy/session.json`
    pub fn open_default() -> crate::Result<Self> {
        Ok(Self::at(crate::Config::data_dir()?.join("session.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted session, if there is one that is valid or refreshable
    pub fn load(&self) -> crate::Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let session: Session = match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(e) => {
                info!("Discarding unreadable session file: {}", e);
                self.clear()?;
                return Ok(None);
            }
        };

        if session.is_expired() && !session.can_refresh() {
            info!("Stored session for {} has expired", session.email);
            self.clear()?;
            return Ok(None);
        }

        debug!("Restored session for {}", session.email);
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> crate::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
