//! # memoctx
//!
//! Request-scoped function memoization over immutable, hierarchical contexts.
//!
//! Bind a `K -> V` loader into a [`Context`] under a [`BindingId`]; anything
//! holding that context (or a child derived from it) can recover a
//! [`CachedFn`] that computes each distinct key at most once for the life of
//! the context and serves the stored value afterwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use memoctx::Context;
//!
//! // Binding returns a *new* context; the original is untouched.
//! let ctx = Context::new().with_cache("users", |id: u64| format!("user-{id}"));
//!
//! let users = ctx.cached_fn::<u64, String>("users").expect("bound above");
//! assert_eq!(users.call(42), "user-42"); // computed
//! assert_eq!(users.call(42), "user-42"); // served from the cache
//!
//! // A child context resolves the same store.
//! let child = ctx.with_value("request-id", 7u32);
//! let same = child.cached_fn::<u64, String>("users").expect("inherited");
//! assert_eq!(same.call(42), "user-42"); // still cached
//! ```
//!
//! When code cannot assume a cache was bound upstream,
//! [`Context::cached_fn_or`] always yields a usable callable, falling back
//! to the supplied loader uncached.

pub mod cache;
pub mod context;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheStats, CachedFn, MemoCache};
pub use context::{BindingId, Context};
