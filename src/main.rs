//! Nocturne -- a werewolf night/day resolution engine.
//!
//! This binary reads moderator commands from stdin and writes one JSON
//! response per line to stdout. Diagnostics go to stderr via `RUST_LOG`.

use std::io::{self, BufWriter};

use tracing_subscriber::EnvFilter;

use nocturne::engine::Engine;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    Engine::new().run(stdin.lock(), out)
}
