//! Error types for the server

use std::io;

use idlereap_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read listener address")]
    LocalAddr(#[source] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
