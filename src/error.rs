use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to write config file {path}: {source}")]
    ConfigWrite { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("failed to load image '{source_id}': {error}")]
    Image {
        source_id: String,
        error: image::ImageError,
    },

    #[error("image loader for '{0}' stopped before reporting a size")]
    LoaderDisconnected(String),

    #[error("nothing to save: no image or empty crop")]
    NothingToSave,

    #[error("failed to save cropped image to {path}: {error}")]
    Save {
        path: PathBuf,
        error: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
