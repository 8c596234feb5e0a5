use std::path::{Path, PathBuf};

use pdm_types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Name of the per-workspace directory holding config and state.
pub const PDM_DIR: &str = ".pdm";
pub const CONFIG_FILE: &str = "config.toml";

/// Client configuration, stored as TOML at `.pdm/config.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Acting user for locks and check-ins.
    pub user: Option<String>,
    /// Directory for the version log, blobs, locks and local state,
    /// relative to the workspace root.
    pub state_dir: PathBuf,
    /// Default tracing filter for the CLI.
    pub log_level: String,
    /// Append user-visible operations to `activity.jsonl`.
    pub record_activity: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: None,
            state_dir: PathBuf::from(PDM_DIR),
            log_level: "warn".into(),
            record_activity: true,
        }
    }
}

impl ClientConfig {
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(PDM_DIR).join(CONFIG_FILE)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn user_id(&self) -> SdkResult<UserId> {
        match self.user.as_deref() {
            Some(name) => Ok(UserId::new(name)?),
            None => Err(SdkError::NoUser),
        }
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_dir)
    }
}
