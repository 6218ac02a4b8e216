//! Request-scoped context — immutable, hierarchical binding storage.
//!
//! A [`Context`] is a persistent key-value structure scoped to one logical
//! request or operation. It is never mutated in place: binding a value
//! produces a *new* context that layers the binding on top of the old one,
//! so a callee can extend the context it received without the caller ever
//! observing the addition.
//!
//! ## Core types
//!
//! - [`Context`] — the immutable binding chain; cheap to clone and share
//!   across threads.
//! - [`BindingId`] — the name token a binding is addressed by.
//!
//! ## Lookup semantics
//!
//! Lookup walks the chain from the newest binding toward the root, so a
//! child binding shadows a parent binding with the same id. Values are
//! stored type-erased and recovered with a checked downcast: asking for the
//! wrong type at an id is answered exactly like asking for an id that was
//! never bound.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The name token a context binding is addressed by.
///
/// `BindingId` has value equality: two ids with the same name select the
/// same binding, regardless of where they were created. Cloning is cheap
/// (the name is reference-counted).
///
/// # Examples
///
/// ```
/// use memoctx::BindingId;
///
/// let a = BindingId::new("users");
/// let b = BindingId::from("users");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingId(Arc<str>);

impl BindingId {
    /// Creates an id from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::from(name.into()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BindingId {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for BindingId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// One link in the binding chain. Frames are immutable once created; child
// contexts share their ancestors' frames by reference count.
struct Frame {
    parent: Option<Arc<Frame>>,
    id: BindingId,
    value: Arc<dyn Any + Send + Sync>,
}

/// An immutable, hierarchical, request-scoped key-value context.
///
/// Bindings are added with [`with_value`](Context::with_value) (or
/// [`with_cache`](Context::with_cache) for memoizing caches), which returns
/// an extended child context and leaves the receiver untouched. Lookup with
/// [`value`](Context::value) sees the receiver's own bindings and every
/// ancestor's; a parent never sees bindings added by a child.
///
/// Cloning a `Context` is O(1) — both clones share the same binding chain.
///
/// # Examples
///
/// ```
/// use memoctx::Context;
///
/// let root = Context::new();
/// let ctx = root.with_value("request-id", 1234u64);
///
/// // The child sees the binding; the root does not.
/// assert_eq!(ctx.value::<u64>("request-id").as_deref(), Some(&1234));
/// assert!(root.value::<u64>("request-id").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Frame>>,
}

impl Context {
    /// Creates an empty root context with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new context extending `self` with `value` bound under `id`.
    ///
    /// The receiver is not modified; it remains valid and never observes the
    /// new binding. Binding the same id again shadows the earlier binding
    /// for the returned context and its descendants.
    ///
    /// # Arguments
    ///
    /// - `id` — the name to bind under.
    /// - `value` — any `Send + Sync + 'static` value; stored reference-counted.
    pub fn with_value<T>(&self, id: impl Into<BindingId>, value: T) -> Context
    where
        T: Send + Sync + 'static,
    {
        Context {
            head: Some(Arc::new(Frame {
                parent: self.head.clone(),
                id: id.into(),
                value: Arc::new(value),
            })),
        }
    }

    /// Looks up the binding for `id`, checking it against the requested type.
    ///
    /// The nearest binding wins: if a child context re-bound `id`, that
    /// binding is the one inspected. A nearest binding holding a different
    /// type is answered with `None`, the same as an id that was never bound.
    pub fn value<T>(&self, id: impl Into<BindingId>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let id = id.into();
        self.lookup(&id).and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns `true` if `id` is bound anywhere in the chain, regardless of
    /// the bound value's type.
    pub fn contains(&self, id: impl Into<BindingId>) -> bool {
        let id = id.into();
        self.lookup(&id).is_some()
    }

    // Walks the chain from the newest frame and returns the nearest value
    // bound under `id`.
    fn lookup(&self, id: &BindingId) -> Option<Arc<dyn Any + Send + Sync>> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.id == *id {
                return Some(Arc::clone(&f.value));
            }
            frame = f.parent.as_deref();
        }
        None
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = Vec::new();
        let mut frame = self.head.as_deref();
        while let Some(frame_ref) = frame {
            ids.push(frame_ref.id.as_str());
            frame = frame_ref.parent.as_deref();
        }
        f.debug_struct("Context").field("bindings", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_roundtrip() {
        let ctx = Context::new().with_value("answer", 42u32);
        assert_eq!(ctx.value::<u32>("answer").as_deref(), Some(&42));
    }

    #[test]
    fn absent_id_is_none() {
        let ctx = Context::new();
        assert!(ctx.value::<u32>("missing").is_none());
        assert!(!ctx.contains("missing"));
    }

    #[test]
    fn child_sees_parent_bindings() {
        let parent = Context::new().with_value("a", 1u32);
        let child = parent.with_value("b", 2u32);

        assert_eq!(child.value::<u32>("a").as_deref(), Some(&1));
        assert_eq!(child.value::<u32>("b").as_deref(), Some(&2));
    }

    #[test]
    fn parent_never_sees_child_bindings() {
        let parent = Context::new().with_value("a", 1u32);
        let _child = parent.with_value("b", 2u32);

        assert!(parent.value::<u32>("b").is_none());
        assert!(!parent.contains("b"));
    }

    #[test]
    fn nearest_binding_shadows() {
        let outer = Context::new().with_value("n", 1u32);
        let inner = outer.with_value("n", 2u32);

        assert_eq!(inner.value::<u32>("n").as_deref(), Some(&2));
        assert_eq!(outer.value::<u32>("n").as_deref(), Some(&1));
    }

    #[test]
    fn type_mismatch_is_answered_as_absent() {
        let ctx = Context::new().with_value("n", 1u32);

        assert!(ctx.value::<String>("n").is_none());
        // The id is still present as far as `contains` is concerned.
        assert!(ctx.contains("n"));
    }

    #[test]
    fn mismatch_on_nearest_binding_does_not_fall_through() {
        // A child shadowing "n" with a different type hides the parent's
        // u32 binding entirely.
        let outer = Context::new().with_value("n", 1u32);
        let inner = outer.with_value("n", "shadowed".to_string());

        assert!(inner.value::<u32>("n").is_none());
        assert_eq!(
            inner.value::<String>("n").as_deref().map(String::as_str),
            Some("shadowed")
        );
    }

    #[test]
    fn clones_share_the_chain() {
        let ctx = Context::new().with_value("a", 7i64);
        let cloned = ctx.clone();
        assert_eq!(cloned.value::<i64>("a").as_deref(), Some(&7));
    }

    #[test]
    fn debug_lists_binding_ids_newest_first() {
        let ctx = Context::new().with_value("a", 1u8).with_value("b", 2u8);
        let rendered = format!("{ctx:?}");
        assert_eq!(rendered, r#"Context { bindings: ["b", "a"] }"#);
    }

    #[test]
    fn binding_id_display_and_equality() {
        let id = BindingId::new(String::from("users"));
        assert_eq!(id.to_string(), "users");
        assert_eq!(id, BindingId::from("users"));
    }
}
