//! The canonical, flattened representation of one downloadable artifact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CatalogueError, Result};

/// Content checksum used as the storage identity key.
///
/// The provider publishes digests in mixed case; construction lowercases them
/// so that equality, hashing and on-disk addressing agree. Only ASCII
/// alphanumerics are accepted, which also keeps the value safe to use as a
/// directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CatalogueError::InvalidHash(value.to_string()));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for ContentHash {
    type Err = CatalogueError;

    fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for ContentHash {
    type Error = CatalogueError;

    fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self { hash.0 }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str { &self.0 }
}

/// Validate a destination file name: a single, non-special path component.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CatalogueError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Storage address of an artifact: `{name, content_hash}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileKey {
    pub name:         String,
    pub content_hash: ContentHash,
}

impl FileKey {
    pub fn new(name: impl Into<String>, content_hash: ContentHash) -> Result<Self> {
        let name = name.into();
        validate_file_name(&name)?;
        Ok(Self { name, content_hash })
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.content_hash, self.name)
    }
}

/// One artifact that should exist in the mirror.
///
/// Equality is structural over every field, tags included; identity for
/// storage purposes is [`FileDescriptor::content_hash`] alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name:                String,
    pub content_hash:        ContentHash,
    pub source:              Url,
    pub size:                u64,
    pub required_free_space: u64,
    pub tags:                Vec<String>,
}

impl FileDescriptor {
    pub fn key(&self) -> FileKey {
        FileKey {
            name:         self.name.clone(),
            content_hash: self.content_hash.clone(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool { self.tags.iter().any(|t| t == tag) }
}

impl From<&FileDescriptor> for FileKey {
    fn from(descriptor: &FileDescriptor) -> Self { descriptor.key() }
}
