use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::source::{AssetError, AssetFuture, AssetSource};

/// In-memory asset source for tests and embedded assets.
///
/// Cloning shares the underlying storage, so files can be added or replaced
/// after the source has been handed to an engine.
#[derive(Clone, Default)]
pub struct MemorySource {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, overwriting any existing file with the same name.
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.write().insert(name.into(), data.into());
    }

    /// Remove a file, returning its data if it existed.
    pub fn remove(&self, name: &str) -> Option<Vec<u8>> {
        self.files.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }
}

impl AssetSource for MemorySource {
    fn read(&self, name: &str) -> AssetFuture {
        let files = self.files.clone();
        let name = name.to_owned();
        Box::pin(async move {
            let map = files.read();
            map.get(&name).cloned().ok_or(AssetError::NotFound(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_now(source: &MemorySource, name: &str) -> Result<Vec<u8>, AssetError> {
        pollster::block_on(source.read(name))
    }

    #[test]
    fn read_inserted_file() {
        let source = MemorySource::new();
        source.insert("model.obj", b"v 0 0 0".to_vec());
        assert_eq!(read_now(&source, "model.obj").unwrap(), b"v 0 0 0");
    }

    #[test]
    fn missing_file_is_not_found() {
        let source = MemorySource::new();
        assert!(matches!(
            read_now(&source, "absent.wgsl"),
            Err(AssetError::NotFound(name)) if name == "absent.wgsl"
        ));
    }

    #[test]
    fn clones_share_storage() {
        let source = MemorySource::new();
        let clone = source.clone();
        clone.insert("a", "1");
        assert!(source.contains("a"));
        assert_eq!(source.remove("a"), Some(b"1".to_vec()));
        assert!(!clone.contains("a"));
    }
}
