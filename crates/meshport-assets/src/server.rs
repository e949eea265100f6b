use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::AssetError;

/// Non-blocking source of raw asset bytes, addressed by an opaque string.
pub trait DataLoader {
    /// Return the bytes for `address` if they are available right now.
    ///
    /// `Ok(None)` means "not yet", and callers are expected to poll again on a
    /// later tick. Errors are permanent for this attempt.
    fn try_consume(&mut self, address: &str) -> Result<Option<Vec<u8>>, AssetError>;
}

/// Default byte source: sources registered in memory first, then files under
/// an optional base directory.
///
/// Registered sources stay registered after they are consumed, so a later
/// re-import of the same address is served again.
#[derive(Debug, Default)]
pub struct DataServer {
    base_path: Option<PathBuf>,
    sources: HashMap<String, Vec<u8>>,
}

impl DataServer {
    /// Create a server that only serves registered sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server that also resolves addresses as paths under `base_path`.
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        info!("DataServer created with base path: {}", base_path.display());
        Self {
            base_path: Some(base_path),
            sources: HashMap::new(),
        }
    }

    /// Register (or replace) the bytes served for `address`.
    pub fn insert(&mut self, address: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let address = address.into();
        let bytes = bytes.into();
        debug!("Registered {} bytes for '{}'", bytes.len(), address);
        self.sources.insert(address, bytes);
    }

    /// Stop serving a registered source.
    pub fn remove(&mut self, address: &str) -> Option<Vec<u8>> {
        self.sources.remove(address)
    }

    /// Whether `address` is registered in memory.
    pub fn contains(&self, address: &str) -> bool {
        self.sources.contains_key(address)
    }

    /// The base path file addresses are resolved against.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Resolve an address against the base path.
    fn resolve(&self, address: &str) -> Option<PathBuf> {
        let base_path = self.base_path.as_ref()?;
        let path = Path::new(address);
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_path.join(path)
        })
    }
}

impl DataLoader for DataServer {
    fn try_consume(&mut self, address: &str) -> Result<Option<Vec<u8>>, AssetError> {
        if let Some(bytes) = self.sources.get(address) {
            return Ok(Some(bytes.clone()));
        }

        let Some(path) = self.resolve(address) else {
            return Ok(None);
        };

        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AssetError::Io(path, e)),
        }
    }
}
