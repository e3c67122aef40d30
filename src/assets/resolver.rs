//! Virtual file resolution: maps the relative URIs a manifest declares to bytes.
//!
//! Three backings exist: [`VirtualFileSet`] (file list, archive contents or a
//! walked directory), [`HttpResolver`] (base URL + relative fetch) and
//! [`DetachedResolver`] (a lone in-memory manifest with nothing beside it).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::AssetError;

/// How many known paths a `ResourceNotFound` error carries.
const KNOWN_PATH_SAMPLE: usize = 8;

pub trait FileResolver {
    /// Combines the manifest's directory with a declared `uri`.
    fn join(&self, manifest_dir: &str, uri: &str) -> String {
        let decoded = urlencoding::decode(uri)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| uri.to_string());
        if manifest_dir.is_empty() {
            normalize_path(&decoded)
        } else {
            normalize_path(&format!("{manifest_dir}/{decoded}"))
        }
    }

    /// Returns the bytes behind an already joined path.
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// A byte source that is only read when resolved.
#[derive(Debug, Clone)]
pub enum ByteSource {
    Memory(Arc<[u8]>),
    File(PathBuf),
}

impl ByteSource {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        match self {
            Self::Memory(bytes) => Ok(bytes.to_vec()),
            Self::File(file) => std::fs::read(file).map_err(|source| AssetError::ResourceRead {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// Ordered `normalized relative path -> byte source` table. Read-only once
/// handed to the loader.
#[derive(Debug, Clone, Default)]
pub struct VirtualFileSet {
    entries: BTreeMap<String, ByteSource>,
}

impl VirtualFileSet {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Builds a set from in-memory files, e.g. a picked file list or the
    /// entries of a decompressed archive.
    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: AsRef<str>,
    {
        let mut set = Self::new();
        for (path, bytes) in files {
            set.insert_bytes(path.as_ref(), bytes);
        }
        set
    }

    /// Walks `root` recursively. Keys keep the nesting relative to `root`
    /// (`"textures/albedo.png"`); contents are read lazily on resolve.
    /// Symlinks are not followed and unreadable entries are skipped.
    pub fn from_directory(root: &Path) -> std::io::Result<Self> {
        std::fs::metadata(root)?;
        let mut set = Self::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Skipping entry under {}: {}", root.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            set.insert(&key, ByteSource::File(entry.path().to_path_buf()));
        }
        log::debug!("Indexed {} files under {}", set.len(), root.display());
        Ok(set)
    }

    pub fn insert(&mut self, path: &str, source: ByteSource) {
        self.entries.insert(normalize_path(path), source);
    }

    pub fn insert_bytes(&mut self, path: &str, bytes: Vec<u8>) {
        self.insert(path, ByteSource::Memory(bytes.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Picks the primary manifest: a full-path match on `hint`, then a
    /// file-name match on `hint`, then the smallest root-level `.gltf`, then
    /// the smallest `.gltf` anywhere. Ties among file-name matches follow
    /// the same root-then-smallest order.
    pub fn select_manifest(&self, hint: Option<&str>) -> Option<&str> {
        let candidates: Vec<&str> = self.paths().filter(|path| is_manifest_path(path)).collect();
        if let Some(hint) = hint {
            let hint = normalize_path(hint);
            if let Some(path) = candidates.iter().find(|path| **path == hint) {
                return Some(*path);
            }
            let by_name: Vec<&str> = candidates
                .iter()
                .copied()
                .filter(|path| file_name(path) == hint)
                .collect();
            if let Some(path) = root_then_smallest(&by_name) {
                return Some(path);
            }
        }
        root_then_smallest(&candidates)
    }

    fn known_sample(&self) -> Vec<String> {
        self.entries.keys().take(KNOWN_PATH_SAMPLE).cloned().collect()
    }
}

impl FileResolver for VirtualFileSet {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let key = normalize_path(path);
        match self.entries.get(&key) {
            Some(source) => source.read(&key),
            None => Err(AssetError::ResourceNotFound {
                path: key,
                known: self.known_sample(),
            }),
        }
    }
}

/// Resolves sub-resources relative to the manifest URL over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpResolver;

impl FileResolver for HttpResolver {
    fn join(&self, manifest_dir: &str, uri: &str) -> String {
        if uri.contains("://") {
            uri.to_string()
        } else {
            format!("{}/{}", manifest_dir.trim_end_matches('/'), uri.trim_start_matches("./"))
        }
    }

    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        fetch_url(path).map_err(|reason| {
            log::debug!("Fetch of {} failed: {}", path, reason);
            AssetError::ResourceNotFound {
                path: path.to_string(),
                known: Vec::new(),
            }
        })
    }
}

/// Backing for a manifest supplied as raw bytes: no sibling resources exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedResolver;

impl FileResolver for DetachedResolver {
    fn resolve(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        Err(AssetError::ResourceNotFound {
            path: path.to_string(),
            known: Vec::new(),
        })
    }
}

/// `paths` are in ascending order.
fn root_then_smallest<'a>(paths: &[&'a str]) -> Option<&'a str> {
    paths
        .iter()
        .find(|path| !path.contains('/'))
        .or_else(|| paths.first())
        .copied()
}

pub(crate) fn fetch_url(url: &str) -> Result<Vec<u8>, String> {
    let response = ureq::get(url).call().map_err(|err| match err {
        ureq::Error::Status(code, _) => format!("HTTP {code}"),
        other => other.to_string(),
    })?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| err.to_string())?;
    Ok(bytes)
}

/// Forward slashes only, `.` and `..` collapsed, no leading separator.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of a virtual path; empty at the root of the set.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Directory part of a URL, without query or fragment.
pub fn url_directory(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(path)
}

pub fn file_name(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// File name with its extension stripped.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

pub fn is_manifest_path(path: &str) -> bool {
    file_name(path)
        .rsplit_once('.')
        .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("gltf"))
}
