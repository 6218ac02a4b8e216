//! Basic usage: bind an expensive computation into a context and watch it
//! run once per distinct key.
//!
//! Run with `cargo run --example basic`.

use memoctx::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn expensive_square(n: u64) -> u64 {
    info!(n, "computing square");
    n * n
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ctx = Context::new().with_cache("square", expensive_square);
    let square = ctx.cached_fn::<u64, u64>("square").expect("bound above");

    info!(result = square.call(12), "first call computes");
    info!(result = square.call(12), "second call is served from the cache");
    info!(result = square.call(30), "a new key computes again");

    // A descendant context resolves the same store the parent bound.
    let child = ctx.with_value("request-id", 7u32);
    let same = child
        .cached_fn::<u64, u64>("square")
        .expect("inherited from parent");
    info!(result = same.call(12), "child context shares the parent cache");
}
