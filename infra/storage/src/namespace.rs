use crate::engine::Storage;
use crate::error::StorageError;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceName(pub String);

impl TryFrom<String> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, StorageError> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = StorageError;

    fn try_from(value: &str) -> Result<Self, StorageError> {
        let name = value.to_lowercase();

        if name.is_empty() {
            return Err(StorageError::PathTraversalAttempt {
                message: "EMPTY".into(),
                context: Some("Namespace cannot be empty".into()),
            });
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StorageError::PathTraversalAttempt {
                message: name.into(),
                context: Some("Namespace contains illegal characters".into()),
            });
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lightweight, namespaced view of the storage engine.
///
/// `NamespacedStorage` provides a scoped interface where all paths are automatically
/// prefixed with the namespace name. This is the recommended way to keep each
/// feature's snapshots apart.
///
/// # Characteristics
/// - **Inherited Config**: Inherits compression and security settings from the
///   parent [`Storage`] instance.
/// - **Zero Copy**: Cloning a `NamespacedStorage` is inexpensive as it only holds a
///   reference-counted handle to the core engine.
#[derive(Debug, Clone)]
pub struct NamespacedStorage {
    storage: Storage,
    namespace: Arc<Cow<'static, str>>,
}

impl NamespacedStorage {
    pub(crate) fn new(storage: Storage, namespace: impl Into<Cow<'static, str>>) -> Self {
        Self { storage, namespace: Arc::new(namespace.into()) }
    }

    /// Resolves a relative path to a physical path within the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path tries to escape the sandbox.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        crate::security::resolve_path(&self.storage.root, Some(&self.namespace), path)
    }

    /// Reads the entire contents of a file. See [`Storage::read`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the path does not exist.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        self.storage.read_internal(Some(&self.namespace), path).await
    }

    /// Reads a file and decodes it as UTF-8. See [`Storage::read_text`].
    ///
    /// # Errors
    ///
    /// Same as [`NamespacedStorage::read`], plus [`StorageError::Encoding`].
    pub async fn read_text(&self, path: impl AsRef<Path>) -> Result<String, StorageError> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| StorageError::Encoding {
            message: e.to_string().into(),
            context: None,
        })
    }

    /// Writes data atomically within the namespace. See [`Storage::write`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if disk space is full or hardware failure occurs.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        self.storage.write_internal(Some(&self.namespace), path, data).await
    }

    /// Writes a UTF-8 string atomically. See [`Storage::write`].
    ///
    /// # Errors
    ///
    /// Same as [`NamespacedStorage::write`].
    pub async fn write_text(
        &self,
        path: impl AsRef<Path>,
        text: &str,
    ) -> Result<(), StorageError> {
        self.write(path, text.as_bytes()).await
    }

    /// Deletes a file within the namespace. See [`Storage::delete`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        self.storage.delete_internal(Some(&self.namespace), path).await
    }

    /// Checks if a file exists within the namespace.
    ///
    /// # Errors
    ///
    /// Returns an `Err` only if path resolution fails.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        Ok(resolved.exists())
    }
}
