//! Module registry: the `{key → loader}` namespace, the memo table, and
//! the loader/executor that runs each thunk exactly once.
//!
//! Evaluation is lazy, synchronous and depth-first: nothing runs until
//! `load` is called for the entry specifier, and the observable side
//! effect order is the pre-order traversal of the requires graph, each
//! unit visited at most once regardless of in-degree.

use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::path::ModulePath;
use crate::resolver::{KeySet, ModuleResolver, Resolution, SearchRoots};

/// A loader for one source unit: runs the unit's top-level code and
/// produces its export value.
pub type LoaderThunk<T> = Rc<dyn Fn(&mut ModuleContext<'_, T>) -> anyhow::Result<T>>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot resolve module `{specifier}`, required {}", requirer(.caller))]
    Unresolved {
        specifier: String,
        caller: Option<ModulePath>,
    },

    #[error("cyclic module chain: {}", format_chain(.chain))]
    Cyclic { chain: Vec<ModulePath> },

    #[error("module `{module}` failed to load")]
    Loader {
        module: ModulePath,
        #[source]
        source: anyhow::Error,
    },
}

fn requirer(caller: &Option<ModulePath>) -> String {
    match caller {
        Some(caller) => format!("from `{caller}`"),
        None => "as the entry point".to_string(),
    }
}

fn format_chain(chain: &[ModulePath]) -> String {
    chain
        .iter()
        .map(ModulePath::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Immutable mapping from [`ModulePath`] to loader thunk.
///
/// Built once by the packaging layer, then handed to the registry for the
/// lifetime of a bundle run. Insertion order is preserved so iteration is
/// deterministic.
pub struct Namespace<T> {
    units: IndexMap<ModulePath, LoaderThunk<T>>,
}

impl<T> Namespace<T> {
    pub fn new() -> Self {
        Self {
            units: IndexMap::new(),
        }
    }

    /// Register a source unit. The key is normalized; a later insert for
    /// the same key replaces the earlier thunk.
    pub fn insert(
        &mut self,
        key: impl Into<ModulePath>,
        thunk: impl Fn(&mut ModuleContext<'_, T>) -> anyhow::Result<T> + 'static,
    ) {
        self.units.insert(key.into(), Rc::new(thunk));
    }

    pub fn get(&self, key: &ModulePath) -> Option<&LoaderThunk<T>> {
        self.units.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModulePath> {
        self.units.keys()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeySet for Namespace<T> {
    fn contains(&self, key: &ModulePath) -> bool {
        self.units.contains_key(key)
    }
}

/// Lifecycle of one namespace key. `Unloaded` is represented by absence
/// from the memo table; there is no transition back out of `Loaded`.
enum Slot<T> {
    Loading,
    Loaded(Rc<T>),
}

/// Owns the namespace, the search roots and the memo table, and exposes
/// the single entry point: load a module by specifier.
///
/// Memoization is keyed by the resolved [`ModulePath`], never the raw
/// specifier, so distinct specifiers that resolve to the same unit share
/// one evaluation and one result instance.
pub struct ModuleRegistry<T> {
    namespace: Namespace<T>,
    resolver: ModuleResolver,
    memo: FxHashMap<ModulePath, Slot<T>>,
    stack: Vec<ModulePath>,
}

impl<T> ModuleRegistry<T> {
    pub fn new(namespace: Namespace<T>, roots: SearchRoots) -> Self {
        Self {
            namespace,
            resolver: ModuleResolver::new(roots),
            memo: FxHashMap::default(),
            stack: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &Namespace<T> {
        &self.namespace
    }

    /// Load the entry module. Nested requires issued by running thunks go
    /// through [`ModuleContext::require`] and resolve relative to the unit
    /// that issued them.
    pub fn load(&mut self, specifier: &str) -> Result<Rc<T>, LoadError> {
        self.load_from(specifier, None)
    }

    /// Evaluated result for `key`, if its loader has already run.
    pub fn cached(&self, key: &ModulePath) -> Option<Rc<T>> {
        match self.memo.get(key) {
            Some(Slot::Loaded(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn load_from(
        &mut self,
        specifier: &str,
        caller: Option<&ModulePath>,
    ) -> Result<Rc<T>, LoadError> {
        let key = match self.resolver.resolve(specifier, caller, &self.namespace) {
            Resolution::Resolved(key) => key,
            Resolution::NotFound => {
                return Err(LoadError::Unresolved {
                    specifier: specifier.to_string(),
                    caller: caller.cloned(),
                })
            }
        };

        match self.memo.get(&key) {
            Some(Slot::Loaded(value)) => return Ok(value.clone()),
            Some(Slot::Loading) => {
                let first = self.stack.iter().position(|p| p == &key).unwrap_or(0);
                let mut chain: Vec<ModulePath> = self.stack[first..].to_vec();
                chain.push(key);
                return Err(LoadError::Cyclic { chain });
            }
            None => {}
        }

        self.execute(key)
    }

    /// Run the loader thunk for `key` exactly once and memoize its result.
    fn execute(&mut self, key: ModulePath) -> Result<Rc<T>, LoadError> {
        let thunk = self
            .namespace
            .get(&key)
            .map(Rc::clone)
            .expect("resolver only returns keys present in the namespace");

        debug!(module = %key, "executing module loader");
        self.memo.insert(key.clone(), Slot::Loading);
        self.stack.push(key.clone());

        let mut context = ModuleContext {
            current: key.clone(),
            registry: self,
        };
        let result = thunk(&mut context);

        self.stack.pop();
        match result {
            Ok(value) => {
                let value = Rc::new(value);
                self.memo.insert(key, Slot::Loaded(value.clone()));
                Ok(value)
            }
            Err(error) => {
                // The run is over either way; clear the in-progress mark
                // so the state table stays truthful.
                self.memo.remove(&key);
                // Nested load errors surface through the thunk's `?`;
                // pass them through unchanged instead of re-wrapping at
                // every level of the require chain.
                Err(match error.downcast::<LoadError>() {
                    Ok(inner) => inner,
                    Err(source) => LoadError::Loader {
                        module: key,
                        source,
                    },
                })
            }
        }
    }
}

/// Per-load execution context handed to a running loader thunk: the path
/// of the unit currently executing plus the registry its nested requires
/// go through. Created on entry into the executor, discarded on return.
pub struct ModuleContext<'r, T> {
    current: ModulePath,
    registry: &'r mut ModuleRegistry<T>,
}

impl<T> ModuleContext<'_, T> {
    /// Resolve and load `specifier` relative to the unit that is currently
    /// executing.
    pub fn require(&mut self, specifier: &str) -> Result<Rc<T>, LoadError> {
        let current = self.current.clone();
        self.registry.load_from(specifier, Some(&current))
    }

    /// The key of the unit currently executing.
    pub fn path(&self) -> &ModulePath {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_load_returns_export() {
        let mut namespace = Namespace::new();
        namespace.insert("main", |_ctx: &mut ModuleContext<'_, i32>| Ok(41 + 1));

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        assert_eq!(*registry.load("main").unwrap(), 42);
    }

    #[test]
    fn test_loader_runs_exactly_once() {
        let runs = Rc::new(Cell::new(0u32));
        let counter = runs.clone();

        let mut namespace = Namespace::new();
        namespace.insert("src/util", move |_ctx: &mut ModuleContext<'_, ()>| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        namespace.insert("src/main", |ctx: &mut ModuleContext<'_, ()>| {
            ctx.require("./util")?;
            ctx.require("util")?;
            Ok(())
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        registry.load("src/main").unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_memo_is_keyed_by_resolved_path() {
        let mut namespace = Namespace::new();
        namespace.insert("src/util", |_ctx: &mut ModuleContext<'_, String>| {
            Ok("shared".to_string())
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        let a = registry.load("src/util").unwrap();
        let b = registry.load("src/./util").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unresolved_entry() {
        let namespace: Namespace<()> = Namespace::new();
        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());

        let err = registry.load("missing").unwrap_err();
        match err {
            LoadError::Unresolved { specifier, caller } => {
                assert_eq!(specifier, "missing");
                assert!(caller.is_none());
            }
            other => panic!("expected Unresolved, got {other}"),
        }
    }

    #[test]
    fn test_unresolved_carries_caller() {
        let mut namespace = Namespace::new();
        namespace.insert("a", |ctx: &mut ModuleContext<'_, ()>| {
            ctx.require("b")?;
            Ok(())
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        let err = registry.load("a").unwrap_err();
        match err {
            LoadError::Unresolved { specifier, caller } => {
                assert_eq!(specifier, "b");
                assert_eq!(caller, Some(ModulePath::new("a")));
            }
            other => panic!("expected Unresolved, got {other}"),
        }
    }

    #[test]
    fn test_cycle_is_rejected_with_chain() {
        let mut namespace = Namespace::new();
        namespace.insert("a", |ctx: &mut ModuleContext<'_, ()>| {
            ctx.require("b")?;
            Ok(())
        });
        namespace.insert("b", |ctx: &mut ModuleContext<'_, ()>| {
            ctx.require("a")?;
            Ok(())
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        let err = registry.load("a").unwrap_err();
        match err {
            LoadError::Cyclic { chain } => {
                let chain: Vec<&str> = chain.iter().map(ModulePath::as_str).collect();
                assert_eq!(chain, ["a", "b", "a"]);
            }
            other => panic!("expected Cyclic, got {other}"),
        }
    }

    #[test]
    fn test_loader_fault_propagates() {
        let mut namespace = Namespace::new();
        namespace.insert("bad", |_ctx: &mut ModuleContext<'_, ()>| {
            anyhow::bail!("top-level body failed")
        });
        namespace.insert("main", |ctx: &mut ModuleContext<'_, ()>| {
            ctx.require("bad")?;
            Ok(())
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        let err = registry.load("main").unwrap_err();
        match err {
            LoadError::Loader { module, source } => {
                assert_eq!(module, ModulePath::new("bad"));
                assert_eq!(source.to_string(), "top-level body failed");
            }
            other => panic!("expected Loader, got {other}"),
        }
    }

    #[test]
    fn test_failed_load_aborts_without_caching() {
        let runs = Rc::new(Cell::new(0u32));
        let counter = runs.clone();

        let mut namespace = Namespace::new();
        namespace.insert("flaky", move |_ctx: &mut ModuleContext<'_, ()>| {
            counter.set(counter.get() + 1);
            anyhow::bail!("boom")
        });

        let mut registry = ModuleRegistry::new(namespace, SearchRoots::project_root());
        assert!(registry.load("flaky").is_err());
        // A failed unit was never Loaded; a later run starts it over.
        assert!(registry.load("flaky").is_err());
        assert_eq!(runs.get(), 2);
    }
}
