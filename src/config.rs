//! Credential persistence and pre-network validation.
//!
//! Credentials (server URL plus JWT) are kept in a single JSON file so a
//! session survives restarts. Registration input is validated locally
//! before any request is made.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoadscanError};

/// Minimum accepted password length for registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A stored login: which server, and the token proving who we are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub server: String,
    pub jwt: String,
}

/// File-backed credential store.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved credentials. A missing file is not an error; it just
    /// means nobody has logged in yet.
    pub fn load(&self) -> Result<Option<Credentials>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no credential file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let credentials = serde_json::from_str(&data)?;
        Ok(Some(credentials))
    }

    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, data)?;
        info!("saved credentials for {}", credentials.server);
        Ok(())
    }

    /// Remove stored credentials (logout). Idempotent.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared credentials at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Validate registration input before hitting the network.
pub fn validate_registration(email: &str, password: &str, confirm: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(RoadscanError::validation("all fields are required"));
    }
    if password != confirm {
        return Err(RoadscanError::validation("passwords do not match"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(RoadscanError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
