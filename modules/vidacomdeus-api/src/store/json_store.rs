use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug)]
pub enum JsonStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A directory of JSON documents.
///
/// Writes go to a temp file that is renamed over the target, and every
/// read-modify-write holds one async mutex, so concurrent requests never
/// interleave or observe a half-written file.
pub struct JsonStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, JsonStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_err(&dir, source))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a document. Missing and empty files both read as `None`.
    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, JsonStoreError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked(name).await
    }

    /// Read a document, writing `seed()` first when it is missing or blank.
    /// An existing document is never rewritten.
    pub async fn read_or_seed<T, S>(&self, name: &str, seed: S) -> Result<Option<T>, JsonStoreError>
    where
        T: Serialize + DeserializeOwned,
        S: FnOnce() -> Option<T>,
    {
        let _guard = self.lock.lock().await;
        if let Some(doc) = self.read_unlocked(name).await? {
            return Ok(Some(doc));
        }
        let Some(doc) = seed() else {
            return Ok(None);
        };
        self.write_unlocked(name, &doc).await?;
        Ok(Some(doc))
    }

    pub async fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), JsonStoreError> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(name, value).await
    }

    /// Load (or initialise with `init`), apply `f`, persist, return `f`'s result.
    pub async fn update<T, R, I, F>(&self, name: &str, init: I, f: F) -> Result<R, JsonStoreError>
    where
        T: Serialize + DeserializeOwned,
        I: FnOnce(Option<T>) -> T,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = self.lock.lock().await;
        let mut doc = init(self.read_unlocked(name).await?);
        let result = f(&mut doc);
        self.write_unlocked(name, &doc).await?;
        Ok(result)
    }

    async fn read_unlocked<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, JsonStoreError> {
        let path = self.dir.join(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(io_err(&path, source)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| JsonStoreError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    async fn write_unlocked<T: Serialize>(&self, name: &str, value: &T) -> Result<(), JsonStoreError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        let json = serde_json::to_vec_pretty(value).map_err(|source| JsonStoreError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| io_err(&tmp, source))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| io_err(&path, source))?;

        debug!(path = %path.display(), bytes = json.len(), "JSON document written");
        Ok(())
    }
}

fn io_err(path: &Path, source: std::io::Error) -> JsonStoreError {
    JsonStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
