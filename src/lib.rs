//! Rewrites old-style percent interpolation in Python sources into
//! interpolated string literals: `'%s: %d' % (key, count)` becomes
//! `f'{key}: {count}'`.

pub mod ast;
pub mod diff;
pub mod error;
pub mod parser;
pub mod processor;
pub mod rewriter;
pub mod runner;
pub mod selector;

use tracing_subscriber::{EnvFilter, fmt};

pub use error::{Error, Result};
pub use parser::PythonParser;
pub use processor::{Transformation, Transformer};
pub use rewriter::{Rewrite, SkipReason};
pub use runner::{Options, Runner, Summary};
pub use selector::Selector;

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,fstringify=info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
