//! Source discovery: walk the configured inputs and build the flattened,
//! path-keyed namespace the bundler consumes.
//!
//! Keys follow the bundle convention: extension stripped, separators
//! slash-normalized, so `pkg/init.lua` keys as `pkg/init` and the
//! directory/package fallback comes for free.

use std::io;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::fs::FileSystem;
use crate::path::ModulePath;

pub const LUA_EXTENSION: &str = "lua";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("input path does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("duplicate module key `{key}` (from `{}` and `{}`)", .first.display(), .second.display())]
    DuplicateKey {
        key: ModulePath,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("entry point `{0}` is not among the discovered sources")]
    MissingEntry(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One discovered source unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Where the unit came from on disk.
    pub origin: PathBuf,
    pub source: String,
}

/// The discovered namespace: flattened keys mapped to source text in
/// deterministic discovery order, plus the entry key.
#[derive(Debug)]
pub struct DiscoveredSources {
    pub units: IndexMap<ModulePath, SourceFile>,
    pub entry: ModulePath,
}

/// Compute the flattened namespace key for a source file path: strip the
/// extension, join the components with `/`, normalize.
pub fn module_key(path: &Path) -> ModulePath {
    let stripped = path.with_extension("");
    let mut key = String::new();
    for component in stripped.components() {
        if let Component::Normal(segment) = component {
            if !key.is_empty() {
                key.push('/');
            }
            key.push_str(&segment.to_string_lossy());
        }
    }
    ModulePath::new(key)
}

/// Walk the project's `files` entries and read every `.lua` source.
pub fn discover(
    fs: &dyn FileSystem,
    project: &ProjectConfig,
) -> Result<DiscoveredSources, DiscoveryError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in &project.files {
        if fs.is_file(input) {
            files.push(input.clone());
        } else if fs.is_dir(input) {
            walk(fs, input, &mut files)?;
        } else {
            return Err(DiscoveryError::MissingInput(input.clone()));
        }
    }

    let mut units: IndexMap<ModulePath, SourceFile> = IndexMap::new();
    for file in files {
        if !has_lua_extension(&file) {
            continue;
        }
        let key = module_key(&file);
        debug!(key = %key, file = %file.display(), "discovered source unit");
        let source = fs.read_file(&file)?;
        if let Some(existing) = units.get(&key) {
            return Err(DiscoveryError::DuplicateKey {
                key,
                first: existing.origin.clone(),
                second: file,
            });
        }
        units.insert(
            key,
            SourceFile {
                origin: file,
                source,
            },
        );
    }

    let entry = module_key(&project.entry_point);
    if !units.contains_key(&entry) {
        return Err(DiscoveryError::MissingEntry(project.entry_point.clone()));
    }

    Ok(DiscoveredSources { units, entry })
}

fn has_lua_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == LUA_EXTENSION)
        .unwrap_or(false)
}

fn walk(fs: &dyn FileSystem, dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for child in fs.read_dir(dir)? {
        if fs.is_dir(&child) {
            walk(fs, &child, files)?;
        } else if fs.is_file(&child) {
            files.push(child);
        }
    }
    Ok(())
}
