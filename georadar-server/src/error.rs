use std::path::PathBuf;

use georadar_core::RadarError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Cannot read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Radar setup failed: {0}")]
    Radar(#[from] RadarError),
}
