use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("workspace not initialized at {0}")]
    NotInitialized(PathBuf),

    #[error("workspace already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("file already tracked: {0}")]
    AlreadyTracked(String),

    #[error("no tracked file matches '{0}'")]
    NotTracked(String),

    #[error("'{0}' matches more than one tracked file")]
    Ambiguous(String),

    #[error("no user configured; set `user` in the config file or pass --user")]
    NoUser,

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Sync(#[from] pdm_sync::SyncError),

    #[error("version log error: {0}")]
    Log(#[from] pdm_log::LogError),

    #[error("store error: {0}")]
    Store(#[from] pdm_store::StoreError),

    #[error("lock error: {0}")]
    Lock(#[from] pdm_lock::LockError),

    #[error("working copy error: {0}")]
    Workdir(#[from] pdm_workdir::WorkdirError),

    #[error("invalid value: {0}")]
    Type(#[from] pdm_types::TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
