//! Caching value-or-error loaders.
//!
//! The store caches a single result value per key, so a loader that can fail
//! wraps its `Result` as the cached value. Successes *and* failures memoize:
//! a key that failed once keeps answering with the same error for the life
//! of the context.
//!
//! Run with `cargo run --example fallible`.

use memoctx::Context;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum LookupError {
    #[error("invalid user id: must be positive")]
    InvalidId,
    #[error("user {0} not found")]
    NotFound(i64),
}

#[derive(Debug, Clone)]
struct User {
    id: i64,
    name: &'static str,
}

// Simulated database lookup; every invocation logs, so cached answers are
// visible as silence.
fn fetch_user(id: i64) -> Result<User, LookupError> {
    info!(id, "querying user store");
    if id <= 0 {
        return Err(LookupError::InvalidId);
    }
    match id {
        1 => Ok(User { id: 1, name: "Alice" }),
        2 => Ok(User { id: 2, name: "Bob" }),
        42 => Ok(User { id: 42, name: "Douglas" }),
        _ => Err(LookupError::NotFound(id)),
    }
}

fn report(result: Result<User, LookupError>) {
    match result {
        Ok(user) => info!(id = user.id, name = user.name, "found user"),
        Err(error) => warn!(%error, "lookup failed"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ctx = Context::new().with_cache("users", fetch_user);
    let users = ctx
        .cached_fn::<i64, Result<User, LookupError>>("users")
        .expect("bound above");

    report(users.call(1)); // queries
    report(users.call(1)); // cached — no query log
    report(users.call(42)); // queries

    report(users.call(-1)); // queries, fails
    report(users.call(-1)); // the error is cached too
}
