use std::path::PathBuf;

use super::source::{AssetError, AssetFuture, AssetSource};

/// Asset source reading files below a root directory.
///
/// Reads go through `tokio::fs`, so the returned futures must run on the
/// [`IoRuntime`](crate::assets::IoRuntime).
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// The directory does not need to exist yet; it is checked at read time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn read(&self, name: &str) -> AssetFuture {
        let name = name.to_owned();
        if name.split('/').any(|segment| segment == "..") {
            return Box::pin(async move { Err(AssetError::NotFound(name)) });
        }
        let full_path = self.root.join(&name);
        Box::pin(async move {
            tokio::fs::read(&full_path)
                .await
                .map_err(|err| AssetError::from_io(name, err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::IoRuntime;
    use std::time::Duration;

    const PATIENCE: Duration = Duration::from_secs(5);

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fogmap-renderer-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_file_below_root() {
        let dir = scratch_dir("read");
        std::fs::write(dir.join("model.obj"), b"v 1 2 3\n").unwrap();

        let io = IoRuntime::new().unwrap();
        let source = DirectorySource::new(&dir);
        let bytes = io.run(source.read("model.obj")).recv_timeout(PATIENCE).unwrap().unwrap();
        assert_eq!(bytes, b"v 1 2 3\n");

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = scratch_dir("missing");
        let io = IoRuntime::new().unwrap();
        let source = DirectorySource::new(&dir);
        let result = io.run(source.read("nope.wgsl")).recv_timeout(PATIENCE).unwrap();
        assert!(matches!(result, Err(AssetError::NotFound(name)) if name == "nope.wgsl"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn parent_segments_are_rejected() {
        let io = IoRuntime::new().unwrap();
        let source = DirectorySource::new("/tmp");
        let result = io.run(source.read("../etc/passwd")).recv_timeout(PATIENCE).unwrap();
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }
}
