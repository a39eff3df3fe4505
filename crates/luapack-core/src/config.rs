//! `build.toml` manifest: which sources go into which bundle.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_MANIFEST: &str = "build.toml";

fn default_require_function() -> String {
    "require".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("build")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find `{0}`")]
    ManifestNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("manifest has no [[project]] entries")]
    NoProjects,

    #[error("no [[project]] entry named `{0}`")]
    UnknownProject(String),
}

/// Lua version the emitted bundle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LuaVersion {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[serde(rename = "5.3")]
    Lua53,
    #[serde(rename = "5.4")]
    #[default]
    Lua54,
}

impl LuaVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            LuaVersion::Lua51 => "5.1",
            LuaVersion::Lua52 => "5.2",
            LuaVersion::Lua53 => "5.3",
            LuaVersion::Lua54 => "5.4",
        }
    }
}

/// One `[[project]]` entry: a single bundle to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Bundle name; the output file is `<output>/<name>.lua`.
    pub name: String,

    /// Output directory (default: `build`).
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Source file that traversal starts from. Must be among the
    /// discovered `files`.
    pub entry_point: PathBuf,

    /// Files and directories to include. Directories are walked
    /// recursively for `.lua` sources.
    pub files: Vec<PathBuf>,

    /// Target Lua version (default: 5.4).
    #[serde(default)]
    pub lua_version: LuaVersion,

    /// Search-root prefixes for non-relative specifiers. The project root
    /// is appended implicitly.
    #[serde(default)]
    pub roots: Vec<String>,
}

impl ProjectConfig {
    /// The path of the bundle this project produces.
    pub fn output_file(&self) -> PathBuf {
        self.output.join(format!("{}.lua", self.name))
    }
}

/// The whole `build.toml` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    /// The local name bound to the resolution function inside each
    /// bundled module body (default: `require`).
    #[serde(default = "default_require_function")]
    pub require_function: String,

    #[serde(rename = "project")]
    pub projects: Vec<ProjectConfig>,
}

impl BuildManifest {
    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ManifestNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let manifest: BuildManifest = toml::from_str(&content)?;
        if manifest.projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }
        Ok(manifest)
    }

    /// Write a starter manifest to a file.
    pub fn init_file(path: &Path) -> Result<(), ConfigError> {
        let starter = r#"require_function = "require"

[[project]]
name = "bundle"
output = "build"
entry_point = "src/main.lua"
files = ["src"]
lua_version = "5.4"
"#;
        std::fs::write(path, starter)?;
        Ok(())
    }

    /// Select one project by name, or all of them.
    pub fn select_projects(&self, name: Option<&str>) -> Result<Vec<&ProjectConfig>, ConfigError> {
        match name {
            Some(name) => {
                let project = self
                    .projects
                    .iter()
                    .find(|p| p.name == name)
                    .ok_or_else(|| ConfigError::UnknownProject(name.to_string()))?;
                Ok(vec![project])
            }
            None => Ok(self.projects.iter().collect()),
        }
    }
}
