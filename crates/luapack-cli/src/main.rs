use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use luapack_core::bundle::{generate_bundle, BundleOptions};
use luapack_core::config::{BuildManifest, ProjectConfig, DEFAULT_MANIFEST};
use luapack_core::discovery::discover;
use luapack_core::fs::StdFileSystem;
use luapack_core::resolver::{ModuleResolver, Resolution, SearchRoots};

/// luapack - packs a tree of Lua sources into one self-contained file
#[derive(Parser, Debug)]
#[command(name = "luapack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the build.toml manifest
    #[arg(value_name = "MANIFEST")]
    manifest_path: Option<PathBuf>,

    /// Path to the build.toml manifest (takes precedence over the
    /// positional form)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Build only the named [[project]] entry
    #[arg(short, long, value_name = "NAME")]
    project: Option<String>,

    /// Override the output directory for every project
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Entry specifier override, resolved against the discovered sources
    #[arg(long, value_name = "SPECIFIER")]
    entry: Option<String>,

    /// Discover and resolve without writing any output
    #[arg(long)]
    check: bool,

    /// Initialize a new luapack project
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=info for normal output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_project()?;
        return Ok(());
    }

    let manifest_path = cli
        .manifest
        .clone()
        .or_else(|| cli.manifest_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));
    let manifest = BuildManifest::from_file(&manifest_path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", manifest_path.display()))?;

    let projects = manifest.select_projects(cli.project.as_deref())?;
    info!("Bundling {} project(s)", projects.len());

    let mut had_errors = false;
    for project in projects {
        if let Err(error) = build_project(project, &manifest.require_function, &cli) {
            had_errors = true;
            eprintln!("error: project `{}`: {error:#}", project.name);
        }
    }

    if had_errors {
        std::process::exit(1);
    }

    Ok(())
}

/// Bundle one [[project]] entry.
fn build_project(project: &ProjectConfig, require_name: &str, cli: &Cli) -> anyhow::Result<()> {
    info!("Project `{}`: discovering sources", project.name);

    let mut sources = discover(&StdFileSystem, project)?;
    info!(
        "Project `{}`: {} source unit(s), entry `{}`",
        project.name,
        sources.units.len(),
        sources.entry
    );

    // The entry specifier goes through the same resolution the emitted
    // runtime performs, so path mistakes surface at bundle time.
    let roots = SearchRoots::new(project.roots.iter().cloned());
    let resolver = ModuleResolver::new(roots.clone());
    let entry_spec = cli
        .entry
        .clone()
        .unwrap_or_else(|| sources.entry.as_str().to_string());
    match resolver.resolve(&entry_spec, None, &sources.units) {
        Resolution::Resolved(key) => {
            debug!(entry = %key, "entry point resolved");
            sources.entry = key;
        }
        Resolution::NotFound => {
            anyhow::bail!("entry specifier `{entry_spec}` does not resolve")
        }
    }

    if cli.check {
        info!("Project `{}`: check passed, no output written", project.name);
        return Ok(());
    }

    let bundle = generate_bundle(
        &sources,
        &BundleOptions {
            require_name,
            lua_version: project.lua_version,
            roots: &roots,
        },
    );

    let out_file = match &cli.out_dir {
        Some(dir) => dir.join(format!("{}.lua", project.name)),
        None => project.output_file(),
    };
    if let Some(parent) = out_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out_file, bundle)?;
    info!("Generated: {}", out_file.display());

    Ok(())
}

/// Initialize a new luapack project with a manifest and a sample entry.
fn init_project() -> anyhow::Result<()> {
    println!("Initializing new luapack project...");

    BuildManifest::init_file(&PathBuf::from(DEFAULT_MANIFEST))?;
    println!("Created {DEFAULT_MANIFEST}");

    std::fs::create_dir_all("src")?;
    println!("Created src/ directory");

    let sample = r#"-- Welcome to luapack!
-- Requires resolve relative to this file first, then from the project root.

local greeting = require("./greeting")

print(greeting.hello("world"))
"#;
    std::fs::write("src/main.lua", sample)?;
    println!("Created src/main.lua");

    let greeting = r#"local M = {}

function M.hello(name)
    return "Hello, " .. name .. "!"
end

return M
"#;
    std::fs::write("src/greeting.lua", greeting)?;
    println!("Created src/greeting.lua");

    println!("\nProject initialized successfully!");
    println!("Run `luapack` to produce build/bundle.lua");

    Ok(())
}
