//! File-backed zone store.
//!
//! The whole `FeatureCollection` lives in one pretty-printed `GeoJSON`
//! file. Saves replace the file wholesale by writing a sibling temp file
//! (unique per save) and renaming it over the original, so readers never
//! see a half-written document. Concurrent writers race; the last rename
//! wins.

use std::path::{Path, PathBuf};

use geojson::{FeatureCollection, GeoJson};

use crate::ZoneError;

/// Reads and writes the flood zone `FeatureCollection`.
#[derive(Debug, Clone)]
pub struct ZoneStore {
    path: PathBuf,
}

impl ZoneStore {
    /// Creates a store backed by the file at `path`.
    ///
    /// The file does not need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored document as untyped JSON.
    ///
    /// A blank file yields an empty `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// * [`ZoneError::NotFound`] if nothing has been stored yet
    /// * [`ZoneError::Io`] if the file cannot be read
    /// * [`ZoneError::Json`] if the file is not valid JSON
    pub async fn load_raw(&self) -> Result<serde_json::Value, ZoneError> {
        let Some(contents) = self.read_contents().await? else {
            return Ok(empty_collection_json());
        };

        Ok(serde_json::from_str(&contents)?)
    }

    /// Reads the stored zones.
    ///
    /// A blank file yields an empty `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// * [`ZoneError::NotFound`] if nothing has been stored yet
    /// * [`ZoneError::Io`] if the file cannot be read
    /// * [`ZoneError::Invalid`] if the file is not a `FeatureCollection`
    pub async fn load(&self) -> Result<FeatureCollection, ZoneError> {
        let Some(contents) = self.read_contents().await? else {
            return Ok(empty_collection());
        };

        parse_feature_collection(&contents)
    }

    /// Replaces the stored zones with `zones`.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError`] if the directory cannot be created or the
    /// file cannot be written.
    pub async fn save(&self, zones: &FeatureCollection) -> Result<(), ZoneError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(zones)?;

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        log::info!(
            "Saved {} flood zones to {}",
            zones.features.len(),
            self.path.display()
        );

        Ok(())
    }

    /// Returns the file contents, or `None` if the file is blank.
    async fn read_contents(&self) -> Result<Option<String>, ZoneError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ZoneError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            log::warn!("{} is empty", self.path.display());
            return Ok(None);
        }

        Ok(Some(contents))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
        self.path.with_file_name(name)
    }
}

/// Parses a `GeoJSON` document that must be a `FeatureCollection`.
///
/// # Errors
///
/// Returns [`ZoneError::Invalid`] if `s` is not valid `GeoJSON` or is some
/// other `GeoJSON` type.
pub fn parse_feature_collection(s: &str) -> Result<FeatureCollection, ZoneError> {
    let geojson: GeoJson = s.parse().map_err(|e| ZoneError::Invalid {
        message: format!("{e}"),
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(ZoneError::Invalid {
            message: "expected a FeatureCollection".to_string(),
        }),
    }
}

/// An empty `FeatureCollection`.
#[must_use]
pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

fn empty_collection_json() -> serde_json::Value {
    serde_json::json!({ "type": "FeatureCollection", "features": [] })
}
