//! Extension lifecycle errors
//!
//! Errors raised into scripts are `glirc_lua_runtime::BindingError`s. The
//! types here cover the embedder's side: starting a session, loading
//! configuration and running scripts.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtensionError>;

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("host passed a null client pointer")]
    NullClient,

    #[error("host passed a null API table")]
    NullApi,

    #[error("failed to read script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
