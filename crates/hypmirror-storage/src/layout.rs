//! On-disk and public addressing of stored content.

use std::path::{Path, PathBuf};

use hypmirror_catalogue::FileKey;
use url::Url;

/// Content lives at `<root>/<hash>/<name>`; the same key is published either
/// relative or joined onto a base URL.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    base: Option<Url>,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, base: Option<Url>) -> Self {
        let base = base.map(|mut url| {
            // `Url::join` replaces the last segment unless the path is a directory.
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        });
        Self {
            root: root.into(),
            base,
        }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn dir(&self, key: &FileKey) -> PathBuf { self.root.join(key.content_hash.as_str()) }

    pub fn content(&self, key: &FileKey) -> PathBuf { self.dir(key).join(&key.name) }

    /// Sibling of the content file, e.g. `with_suffix(key, ".aria2")`.
    pub fn with_suffix(&self, key: &FileKey, suffix: &str) -> PathBuf {
        self.dir(key).join(format!("{}{suffix}", key.name))
    }

    pub fn public_path(&self, key: &FileKey) -> String {
        let relative = format!("{}/{}", key.content_hash, key.name);
        match &self.base {
            Some(base) => base.join(&relative).map(String::from).unwrap_or(relative),
            None => relative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypmirror_catalogue::ContentHash;

    fn key() -> FileKey { FileKey::new("game.zip", ContentHash::new("ABC").unwrap()).unwrap() }

    #[test]
    fn test_paths() {
        let layout = Layout::new("/srv/mirror", None);
        assert_eq!(layout.dir(&key()), PathBuf::from("/srv/mirror/abc"));
        assert_eq!(layout.content(&key()), PathBuf::from("/srv/mirror/abc/game.zip"));
        assert_eq!(layout.with_suffix(&key(), ".aria2"), PathBuf::from("/srv/mirror/abc/game.zip.aria2"));
    }

    #[test]
    fn test_public_path_relative() {
        assert_eq!(Layout::new("/srv", None).public_path(&key()), "abc/game.zip");
    }

    #[test]
    fn test_public_path_joins_base() {
        let with_slash = Layout::new("/srv", Some("https://cdn.example/mirror/".parse().unwrap()));
        let without = Layout::new("/srv", Some("https://cdn.example/mirror".parse().unwrap()));
        assert_eq!(with_slash.public_path(&key()), "https://cdn.example/mirror/abc/game.zip");
        assert_eq!(without.public_path(&key()), "https://cdn.example/mirror/abc/game.zip");
    }
}
