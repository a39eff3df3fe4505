//! Specifier resolution against the flattened namespace.
//!
//! A specifier is tried relative to the requesting module first, then
//! against each configured search root in order. Every candidate goes
//! through the same namespace match: the candidate key itself, then the
//! `<candidate>/init` package key.

use crate::path::ModulePath;

/// Anything that can answer whether a normalized key names a source unit.
pub trait KeySet {
    fn contains(&self, key: &ModulePath) -> bool;
}

impl<V> KeySet for indexmap::IndexMap<ModulePath, V> {
    fn contains(&self, key: &ModulePath) -> bool {
        self.contains_key(key)
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The canonical key the specifier resolved to.
    Resolved(ModulePath),
    NotFound,
}

impl Resolution {
    pub fn ok(self) -> Option<ModulePath> {
        match self {
            Resolution::Resolved(key) => Some(key),
            Resolution::NotFound => None,
        }
    }
}

/// Ordered root prefixes tried when relative resolution fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    prefixes: Vec<String>,
}

impl SearchRoots {
    /// Just the project root (the empty prefix).
    pub fn project_root() -> Self {
        Self {
            prefixes: vec![String::new()],
        }
    }

    /// Configured prefixes with the project root appended as the implicit
    /// lowest-priority member, unless it was configured explicitly.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        let mut prefixes: Vec<String> = prefixes.into_iter().collect();
        if !prefixes.iter().any(|p| p.is_empty()) {
            prefixes.push(String::new());
        }
        Self { prefixes }
    }

    /// Exactly the given prefixes, no implicit project root.
    pub fn explicit(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }
}

impl Default for SearchRoots {
    fn default() -> Self {
        Self::project_root()
    }
}

/// Resolves raw specifiers to canonical namespace keys.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    roots: SearchRoots,
}

impl ModuleResolver {
    pub fn new(roots: SearchRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Resolve `specifier` against the namespace.
    ///
    /// Relative resolution (against the caller's directory) strictly
    /// precedes root resolution; within root resolution the configured
    /// order is total and the first match wins.
    pub fn resolve(
        &self,
        specifier: &str,
        caller: Option<&ModulePath>,
        namespace: &impl KeySet,
    ) -> Resolution {
        if let Some(caller) = caller {
            let candidate = ModulePath::new(format!("{}/{}", caller.dir(), specifier));
            if let Some(key) = match_key(&candidate, namespace) {
                return Resolution::Resolved(key);
            }
        }

        for root in self.roots.iter() {
            let candidate = ModulePath::new(format!("{}/{}", root, specifier));
            if let Some(key) = match_key(&candidate, namespace) {
                return Resolution::Resolved(key);
            }
        }

        Resolution::NotFound
    }
}

/// Namespace match for one normalized candidate: the key itself, or the
/// `<key>/init` package key.
fn match_key(candidate: &ModulePath, namespace: &impl KeySet) -> Option<ModulePath> {
    if namespace.contains(candidate) {
        return Some(candidate.clone());
    }
    let init = candidate.init_key();
    if namespace.contains(&init) {
        return Some(init);
    }
    None
}
