use tracing::{debug, error, warn};

use crate::error::Result;
use crate::parser::PythonParser;
use crate::rewriter::{Rewrite, rewrite};
use crate::selector::Selector;

/// Outcome of transforming one source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub output: String,
    /// Expressions turned into interpolated literals
    pub rewritten: usize,
    /// Expressions left alone because the rewrite was not provably safe
    pub skipped: usize,
    /// Expressions where substitution contradicted its own count check
    pub failed: usize,
}

impl Transformation {
    pub fn is_changed(&self) -> bool {
        self.rewritten > 0
    }
}

/// Rewrites every old-style interpolation in a source text
pub struct Transformer {
    selector: Selector,
}

impl Transformer {
    pub fn new(selector: Selector) -> Self {
        Self { selector }
    }

    /// Parse, select all matches up front, then rewrite each one independently.
    pub fn transform(&self, source: &str) -> Result<Transformation> {
        let mut tree = PythonParser::parse_input(source)?;
        let matches = self.selector.select(&tree);
        debug!(matches = matches.len(), "selected expressions");

        let mut transformation = Transformation {
            output: String::new(),
            rewritten: 0,
            skipped: 0,
            failed: 0,
        };

        for selected in &matches {
            let Some(node) = tree.node_mut(&selected.path) else {
                warn!(path = ?selected.path, "matched expression no longer in tree");
                transformation.skipped += 1;
                continue;
            };

            match rewrite(node, &selected.captures) {
                Ok(Rewrite::Rewritten { literal }) => {
                    debug!(%literal, "rewrote expression");
                    transformation.rewritten += 1;
                }
                Ok(Rewrite::Skipped(reason)) => {
                    debug!(?reason, "skipped expression");
                    transformation.skipped += 1;
                }
                Err(e) => {
                    error!(path = ?selected.path, "rewrite aborted: {e}");
                    transformation.failed += 1;
                }
            }
        }

        transformation.output = tree.to_string();
        Ok(transformation)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(Selector::old_interpolation())
    }
}
