//! Disk cache for expensive pipeline stages.
//!
//! A cached value is stored as a JSON blob. The [`CachePolicy`] decides whether
//! an existing blob is used, and every result is tagged with its
//! [`Provenance`]. A blob that exists but does not deserialize is reported as
//! [`Error::CacheCorrupt`], never treated as absent.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    ForceRecompute,
    #[default]
    UseIfPresent,
    RequireCache,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    CacheHit,
    Computed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Cached<T> {
    #[inline]
    pub fn computed(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Computed,
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.provenance == Provenance::CacheHit
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cache {
    pub path: PathBuf,
    #[serde(default)]
    pub policy: CachePolicy,
    /// Store freshly computed values at `path`.
    #[serde(default = "default_write_back")]
    pub write_back: bool,
}

fn default_write_back() -> bool {
    true
}

impl Cache {
    pub fn new<P: Into<PathBuf>>(path: P, policy: CachePolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            write_back: true,
        }
    }

    /// Reads the blob. `Ok(None)` only when the file does not exist.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, Error> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::CacheCorrupt {
                path: self.path.clone(),
                source,
            })
    }

    pub fn save<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(fs::File::create(&self.path)?);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;

        debug!(path = %self.path.display(), "cache written");
        Ok(())
    }

    pub fn load_or_compute<T, F>(&self, compute: F) -> Result<Cached<T>, Error>
    where
        T: serde::Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, Error>,
    {
        match self.policy {
            CachePolicy::ForceRecompute => {}
            CachePolicy::UseIfPresent | CachePolicy::RequireCache => {
                if let Some(value) = self.load()? {
                    info!(path = %self.path.display(), "cache hit");
                    return Ok(Cached {
                        value,
                        provenance: Provenance::CacheHit,
                    });
                }

                if self.policy == CachePolicy::RequireCache {
                    return Err(Error::CacheMissing(self.path.clone()));
                }

                info!(path = %self.path.display(), "cache absent, computing");
            }
        }

        let value = compute()?;

        if self.write_back {
            self.save(&value)?;
        }

        Ok(Cached::computed(value))
    }
}

/// Runs `compute` through `cache` when one is configured.
pub fn cached<T, F>(cache: Option<&Cache>, compute: F) -> Result<Cached<T>, Error>
where
    T: serde::Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T, Error>,
{
    match cache {
        Some(cache) => cache.load_or_compute(compute),
        None => compute().map(Cached::computed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_use_if_present_computes_then_hits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hit.json");
        let cache = Cache::new(&path, CachePolicy::UseIfPresent);

        let first = cache.load_or_compute(|| Ok(vec![1.5f32, 2.0])).unwrap();
        assert_eq!(first.provenance, Provenance::Computed);
        assert!(path.is_file());

        let second: Cached<Vec<f32>> = cache
            .load_or_compute(|| panic!("must not recompute"))
            .unwrap();
        assert!(second.is_hit());
        assert_eq!(second.value, first.value);
    }

    #[test]
    fn test_force_recompute_ignores_blob() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("force.json");
        fs::write(&path, "[9.0]").unwrap();

        let cache = Cache::new(&path, CachePolicy::ForceRecompute);
        let result = cache.load_or_compute(|| Ok(vec![1.0f32])).unwrap();

        assert_eq!(result.provenance, Provenance::Computed);
        assert_eq!(result.value, vec![1.0]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1.0]");
    }

    #[test]
    fn test_require_cache_reports_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let cache = Cache::new(&path, CachePolicy::RequireCache);

        let err = cache.load_or_compute(|| Ok(0u32)).unwrap_err();
        assert!(matches!(err, Error::CacheMissing(p) if p == path));
        assert!(!path.is_file());
    }

    #[test]
    fn test_corrupt_blob_is_not_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = Cache::new(&path, CachePolicy::UseIfPresent);
        let err = cache
            .load_or_compute(|| Ok(vec![0.0f32]))
            .unwrap_err();

        assert!(matches!(err, Error::CacheCorrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_no_write_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nowrite.json");
        let mut cache = Cache::new(&path, CachePolicy::UseIfPresent);
        cache.write_back = false;

        let result = cache.load_or_compute(|| Ok(3u8)).unwrap();
        assert_eq!(result.value, 3);
        assert!(!path.is_file());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stubs").join("nested.json");

        Cache::new(&path, CachePolicy::UseIfPresent).save(&[1u8, 2]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2]");
    }

    #[test]
    fn test_cached_without_cache() {
        let result = cached(None, || Ok(7i32)).unwrap();
        assert_eq!(result, Cached::computed(7));
    }
}
