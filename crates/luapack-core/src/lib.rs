pub mod bundle;
pub mod config;
pub mod discovery;
pub mod fs;
pub mod path;
pub mod registry;
pub mod resolver;

pub use bundle::{generate_bundle, BundleOptions};
pub use config::{BuildManifest, ConfigError, LuaVersion, ProjectConfig};
pub use discovery::{discover, DiscoveredSources, DiscoveryError, SourceFile};
pub use fs::{FileSystem, MockFileSystem, StdFileSystem};
pub use path::{normalize, ModulePath};
pub use registry::{LoadError, ModuleContext, ModuleRegistry, Namespace};
pub use resolver::{KeySet, ModuleResolver, Resolution, SearchRoots};
