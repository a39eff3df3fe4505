//! Lua runtime fragments embedded into every emitted bundle.

pub mod module;

pub use module::{entry_invocation, lua_quote, search_roots, PRELUDE_RESOLVER, PRELUDE_STATE};
