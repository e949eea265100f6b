use std::path::PathBuf;

/// Errors that can occur while fetching or parsing scene assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load glTF data: {0}")]
    GltfLoadFailed(String),

    #[error("failed to load OBJ data: {0}")]
    ObjLoadFailed(String),

    #[error("I/O error loading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("unsupported scene format '{0}'")]
    UnsupportedFormat(String),

    #[error("malformed scene: {0}")]
    Malformed(String),
}
