//! Bundle serialization: the runtime prelude plus every source unit
//! wrapped as a loader function, then the entry kickoff.

use luapack_runtime::{entry_invocation, lua_quote, search_roots};
use tracing::debug;

use crate::config::LuaVersion;
use crate::discovery::DiscoveredSources;
use crate::resolver::SearchRoots;

/// Everything the serializer needs besides the sources themselves.
#[derive(Debug, Clone)]
pub struct BundleOptions<'a> {
    /// The local name bound to the resolution function in each module
    /// body.
    pub require_name: &'a str,
    pub lua_version: LuaVersion,
    pub roots: &'a SearchRoots,
}

/// Serialize the discovered namespace into one self-contained Lua chunk.
///
/// Layout: banner, runtime prelude (state half, `__roots`, resolver
/// half), one `__modules[...]` block per unit in discovery order, entry
/// kickoff last. The chunk returns the entry module's export.
pub fn generate_bundle(sources: &DiscoveredSources, options: &BundleOptions<'_>) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "-- luapack bundle (target Lua {})\n",
        options.lua_version.as_str()
    ));
    output.push_str("-- generated file, do not edit\n\n");

    output.push_str(luapack_runtime::PRELUDE_STATE);
    output.push('\n');
    let roots: Vec<String> = options.roots.iter().map(str::to_string).collect();
    output.push_str(&search_roots(&roots));
    output.push('\n');
    output.push_str(luapack_runtime::PRELUDE_RESOLVER);
    output.push('\n');

    for (key, unit) in &sources.units {
        debug!(module = %key, "emitting module block");
        output.push_str(&format!("-- Module: {}\n", key));
        output.push_str(&format!(
            "__modules[{}] = function({})\n",
            lua_quote(key.as_str()),
            options.require_name
        ));
        for line in unit.source.lines() {
            if !line.is_empty() {
                output.push_str("    ");
            }
            output.push_str(line);
            output.push('\n');
        }
        output.push_str("end\n\n");
    }

    output.push_str("-- Execute entry point\n");
    output.push_str(&entry_invocation(sources.entry.as_str()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::discovery::discover;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    fn sources() -> DiscoveredSources {
        let mut fs = MockFileSystem::new();
        fs.add_file("src/main.lua", "local util = require(\"./util\")\nprint(util)");
        fs.add_file("src/util.lua", "return 42");

        let project = ProjectConfig {
            name: "test".to_string(),
            output: PathBuf::from("build"),
            entry_point: PathBuf::from("src/main.lua"),
            files: vec![PathBuf::from("src")],
            lua_version: LuaVersion::default(),
            roots: Vec::new(),
        };
        discover(&fs, &project).unwrap()
    }

    #[test]
    fn test_bundle_layout() {
        let roots = SearchRoots::project_root();
        let bundle = generate_bundle(
            &sources(),
            &BundleOptions {
                require_name: "require",
                lua_version: LuaVersion::Lua54,
                roots: &roots,
            },
        );

        assert!(bundle.starts_with("-- luapack bundle (target Lua 5.4)\n"));
        assert!(bundle.contains("local __modules = {}"));
        assert!(bundle.contains("local __roots = { \"\" }"));
        assert!(bundle.contains("__modules[\"src/main\"] = function(require)"));
        assert!(bundle.contains("__modules[\"src/util\"] = function(require)"));
        assert!(bundle.contains("    return 42"));
        assert!(bundle.ends_with("return __load(\"src/main\", nil)\n"));
    }

    #[test]
    fn test_bundle_custom_require_name() {
        let roots = SearchRoots::new(vec!["vendor".to_string()]);
        let bundle = generate_bundle(
            &sources(),
            &BundleOptions {
                require_name: "import",
                lua_version: LuaVersion::Lua51,
                roots: &roots,
            },
        );

        assert!(bundle.contains("(target Lua 5.1)"));
        assert!(bundle.contains("__modules[\"src/main\"] = function(import)"));
        assert!(bundle.contains("local __roots = { \"vendor\", \"\" }"));
    }
}
