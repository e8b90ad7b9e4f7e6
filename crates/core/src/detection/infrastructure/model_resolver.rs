use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::error::TrackingError;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file {0} does not exist")]
    Missing(PathBuf),
    #[error("model {name} not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[cfg(feature = "download")]
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ModelResolveError> for TrackingError {
    fn from(err: ModelResolveError) -> Self {
        let path = match &err {
            ModelResolveError::Missing(path) | ModelResolveError::Write { path, .. } => path.clone(),
            ModelResolveError::NotFound { name, .. } => PathBuf::from(name),
            _ => PathBuf::new(),
        };
        TrackingError::ModelLoad {
            path,
            reason: err.to_string(),
        }
    }
}

/// Resolve a detector model file.
///
/// Resolution order:
/// 1. Explicit path (must exist)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory (development / pre-packaged installs)
pub fn resolve(
    name: &str,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }
    let cache_dir = model_cache_dir().ok();
    resolve_in(name, cache_dir.as_deref(), bundled_dir)
}

fn resolve_in(
    name: &str,
    cache_dir: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let searched: Vec<PathBuf> = [cache_dir, bundled_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(name))
        .collect();

    match searched.iter().find(|p| p.is_file()) {
        Some(found) => {
            log::debug!("resolved model {name} at {}", found.display());
            Ok(found.clone())
        }
        None => Err(ModelResolveError::NotFound {
            name: name.to_string(),
            searched,
        }),
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/EyeTrack/models/`
/// - Linux: `$XDG_CACHE_HOME/EyeTrack/models/` or `~/.cache/EyeTrack/models/`
/// - Windows: `%LOCALAPPDATA%/EyeTrack/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("EyeTrack").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("EyeTrack").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

/// Like [`resolve`], but downloads the model into the cache directory when
/// no local copy exists.
#[cfg(feature = "download")]
pub fn resolve_or_download(
    name: &str,
    url: &str,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    match resolve(name, explicit, bundled_dir) {
        Err(ModelResolveError::NotFound { .. }) => {
            let cache_dir = model_cache_dir()?;
            std::fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
            let dest = cache_dir.join(name);
            log::info!("downloading {name} from {url}");
            download(url, &dest)?;
            Ok(dest)
        }
        other => other,
    }
}

#[cfg(feature = "download")]
fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_inner(url, dest, &temp_path);
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

#[cfg(feature = "download")]
fn download_inner(url: &str, dest: &Path, temp_path: &Path) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut file = std::fs::File::create(temp_path).map_err(write_err(temp_path))?;
    // Streams the body instead of buffering whole models in memory.
    std::io::copy(&mut response, &mut file).map_err(write_err(temp_path))?;
    drop(file);

    std::fs::rename(temp_path, dest).map_err(write_err(dest))
}
