//! Image fetching and storage
//!
//! Images are stored flat in one directory under the last path segment of
//! their URL. Two different URLs with the same last segment share a file;
//! the later write wins and the collision is reported to the caller.

use crate::crawler::fetcher::fetch_bytes;
use crate::record::StoredImage;
use crate::FetchError;
use reqwest::Client;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use tokio::sync::Mutex;
use url::Url;

/// Directory of stored images plus the URL each file name was written from
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    written: Mutex<HashMap<String, String>>,
}

impl ImageStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches an absolute image URL, validates the payload and writes it
    ///
    /// # Returns
    ///
    /// * `Ok(StoredImage)` - The image was written
    /// * `Err(FetchError)` - Transport, non-200 status, decode or write failure;
    ///   no file is guaranteed to exist for the URL
    pub async fn fetch_image(&self, client: &Client, url: &str) -> Result<StoredImage, FetchError> {
        let file_name = file_name_for(url)?;
        let bytes = fetch_bytes(client, url).await?;
        validate_image(url, &bytes)?;
        self.store(url, &file_name, &bytes).await
    }

    /// Writes already validated image bytes under `file_name`
    ///
    /// The registry lock is held across the write, so the recorded source of
    /// a file name always matches the bytes on disk.
    async fn store(&self, url: &str, file_name: &str, bytes: &[u8]) -> Result<StoredImage, FetchError> {
        let path = self.dir.join(file_name);
        let storage_error = |e: std::io::Error| FetchError::Storage {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut written = self.written.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(storage_error)?;
        tokio::fs::write(&path, bytes).await.map_err(storage_error)?;

        let overwrote = match written.insert(file_name.to_string(), url.to_string()) {
            Some(previous) if previous != url => Some(previous),
            _ => None,
        };
        drop(written);

        Ok(StoredImage {
            url: url.to_string(),
            file_name: file_name.to_string(),
            path,
            overwrote,
        })
    }

    /// Snapshot of stored file names and the URL each was last written from
    pub async fn stored(&self) -> HashMap<String, String> {
        self.written.lock().await.clone()
    }
}

/// Checks that the payload carries a recognizable image header
///
/// Only the format and dimensions are read; pixel data is not decoded.
fn validate_image(url: &str, bytes: &[u8]) -> Result<(), FetchError> {
    let decode_error = |message: String| FetchError::Decode {
        url: url.to_string(),
        message,
    };

    image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_error(e.to_string()))?;
    Ok(())
}

/// Derives the storage name from the URL's final path segment
///
/// The segment is percent-decoded. Names that could escape the image
/// directory are rejected.
pub fn file_name_for(url: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidName {
        url: url.to_string(),
    };

    let parsed = Url::parse(url).map_err(|_| invalid())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let name = match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    };

    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
    {
        return Err(invalid());
    }

    Ok(name)
}
