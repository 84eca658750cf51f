//! Declarative tree patterns with named captures.
//!
//! A [`Pattern`] describes a node kind together with the exact sequence of its
//! children. Matching backtracks over repetitions, so a pattern such as
//! `(NAME ',')* NAME [',']` finds every way it can consume a child list.

use std::collections::HashMap;

use tracing::info;

use crate::ast::{ChildPath, Element, Node, NodeKind, TokenKind};

/// What a named capture resolved to, relative to the matched node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    /// A single-element pattern matched one node or leaf
    Single(ChildPath),
    /// A sequence or repetition matched a run of siblings, in source order
    Sequence(Vec<ChildPath>),
}

pub type Bindings = HashMap<&'static str, Captured>;

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A leaf of the given kind, optionally with an exact value
    Leaf {
        kind: TokenKind,
        value: Option<&'static str>,
    },
    /// A node of the given kind whose children match `children` exactly
    Node {
        kind: NodeKind,
        children: Vec<Pattern>,
    },
    /// Consecutive siblings matching each pattern in turn
    Sequence(Vec<Pattern>),
    /// Between `min` and `max` consecutive repetitions
    Repeat {
        pattern: Box<Pattern>,
        min: usize,
        max: Option<usize>,
    },
    /// First-to-last alternatives; every successful one is reported
    AnyOf(Vec<Pattern>),
    /// Binds whatever `pattern` matched under `name`
    Capture {
        name: &'static str,
        pattern: Box<Pattern>,
    },
}

impl Pattern {
    pub fn leaf(kind: TokenKind) -> Self {
        Pattern::Leaf { kind, value: None }
    }

    pub fn op(value: &'static str) -> Self {
        Pattern::Leaf {
            kind: TokenKind::Operator,
            value: Some(value),
        }
    }

    pub fn node(kind: NodeKind, children: Vec<Pattern>) -> Self {
        Pattern::Node { kind, children }
    }

    pub fn sequence(patterns: Vec<Pattern>) -> Self {
        Pattern::Sequence(patterns)
    }

    pub fn repeat(pattern: Pattern, min: usize, max: Option<usize>) -> Self {
        Pattern::Repeat {
            pattern: Box::new(pattern),
            min,
            max,
        }
    }

    pub fn optional(pattern: Pattern) -> Self {
        Self::repeat(pattern, 0, Some(1))
    }

    pub fn any_of(patterns: Vec<Pattern>) -> Self {
        Pattern::AnyOf(patterns)
    }

    pub fn capture(self, name: &'static str) -> Self {
        Pattern::Capture {
            name,
            pattern: Box::new(self),
        }
    }

    /// Match this pattern against a single element, which becomes the root of
    /// every captured path. Returns the bindings of the first successful match.
    pub fn matches(&self, element: &Element) -> Option<Bindings> {
        self.match_from(std::slice::from_ref(element), 0, &|_: usize| ChildPath::new())
            .into_iter()
            .find(|(end, _)| *end == 1)
            .map(|(_, bindings)| bindings)
    }

    /// All ways this pattern can consume `siblings` starting at `start`,
    /// as `(end, bindings)` pairs.
    fn match_from(
        &self,
        siblings: &[Element],
        start: usize,
        path_of: &dyn Fn(usize) -> ChildPath,
    ) -> Vec<(usize, Bindings)> {
        match self {
            Pattern::Leaf { .. } | Pattern::Node { .. } => siblings
                .get(start)
                .and_then(|element| self.match_one(element, path_of(start)))
                .map(|bindings| vec![(start + 1, bindings)])
                .unwrap_or_default(),

            Pattern::Sequence(patterns) => match_sequence(patterns, siblings, start, path_of),

            Pattern::Repeat { pattern, min, max } => {
                let mut results = Vec::new();
                let mut frontier = vec![(start, Bindings::new())];
                let mut count = 0;
                while !frontier.is_empty() {
                    if count >= *min {
                        results.extend(frontier.iter().cloned());
                    }
                    if max.is_some_and(|max| count >= max) {
                        break;
                    }
                    frontier = frontier
                        .into_iter()
                        .flat_map(|(position, bindings)| {
                            pattern
                                .match_from(siblings, position, path_of)
                                .into_iter()
                                // Zero-width repetitions would never terminate.
                                .filter(move |(end, _)| *end > position)
                                .map(move |(end, more)| (end, merge(bindings.clone(), more)))
                        })
                        .collect();
                    count += 1;
                }
                results
            }

            Pattern::AnyOf(patterns) => patterns
                .iter()
                .flat_map(|pattern| pattern.match_from(siblings, start, path_of))
                .collect(),

            Pattern::Capture { name, pattern } => pattern
                .match_from(siblings, start, path_of)
                .into_iter()
                .map(|(end, mut bindings)| {
                    let captured = if pattern.is_sequence() {
                        Captured::Sequence((start..end).map(path_of).collect())
                    } else {
                        Captured::Single(path_of(start))
                    };
                    bindings.insert(*name, captured);
                    (end, bindings)
                })
                .collect(),
        }
    }

    fn match_one(&self, element: &Element, path: ChildPath) -> Option<Bindings> {
        match (self, element) {
            (Pattern::Leaf { kind, value }, Element::Leaf(leaf)) => {
                let value_matches = value.is_none_or(|value| leaf.value == value);
                (leaf.kind == *kind && value_matches).then(Bindings::new)
            }
            (Pattern::Node { kind, children }, Element::Node(node)) if node.kind == *kind => {
                let child_path = |index: usize| {
                    let mut child = path.clone();
                    child.push(index);
                    child
                };
                match_sequence(children, &node.children, 0, &child_path)
                    .into_iter()
                    .find(|(end, _)| *end == node.children.len())
                    .map(|(_, bindings)| bindings)
            }
            _ => None,
        }
    }

    fn is_sequence(&self) -> bool {
        matches!(self, Pattern::Sequence(_) | Pattern::Repeat { .. })
    }
}

fn match_sequence(
    patterns: &[Pattern],
    siblings: &[Element],
    start: usize,
    path_of: &dyn Fn(usize) -> ChildPath,
) -> Vec<(usize, Bindings)> {
    let mut states = vec![(start, Bindings::new())];
    for pattern in patterns {
        states = states
            .into_iter()
            .flat_map(|(position, bindings)| {
                pattern
                    .match_from(siblings, position, path_of)
                    .into_iter()
                    .map(move |(end, more)| (end, merge(bindings.clone(), more)))
            })
            .collect();
        if states.is_empty() {
            break;
        }
    }
    states
}

fn merge(mut into: Bindings, from: Bindings) -> Bindings {
    into.extend(from);
    into
}

/// The two captures the rewriter needs from one matched expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    pub formatstring: ChildPath,
    pub interpolation_args: Captured,
}

/// One matched expression: where it is and what it captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Path of the expression node from the root of the tree
    pub path: ChildPath,
    pub captures: Captures,
}

pub struct Selector {
    pattern: Pattern,
}

impl Selector {
    pub fn new(pattern: Pattern) -> Self {
        Self { pattern }
    }

    /// Selects `'...' % name` and `'...' % (a, b, ...)`.
    ///
    /// ```text
    /// Term< formatstring=STRING '%' interpolation_args=NAME >
    /// Term< formatstring=STRING '%'
    ///       Atom< '(' ExprList< interpolation_args=((NAME ',')* NAME [',']) > ')' > >
    /// ```
    pub fn old_interpolation() -> Self {
        let formatstring = || Pattern::leaf(TokenKind::String).capture("formatstring");

        let bare_name = Pattern::node(
            NodeKind::Term,
            vec![
                formatstring(),
                Pattern::op("%"),
                Pattern::leaf(TokenKind::Name).capture("interpolation_args"),
            ],
        );

        let names = Pattern::sequence(vec![
            Pattern::repeat(
                Pattern::sequence(vec![Pattern::leaf(TokenKind::Name), Pattern::op(",")]),
                0,
                None,
            ),
            Pattern::leaf(TokenKind::Name),
            Pattern::optional(Pattern::op(",")),
        ]);
        let name_tuple = Pattern::node(
            NodeKind::Term,
            vec![
                formatstring(),
                Pattern::op("%"),
                Pattern::node(
                    NodeKind::Atom,
                    vec![
                        Pattern::op("("),
                        Pattern::node(NodeKind::ExprList, vec![names.capture("interpolation_args")]),
                        Pattern::op(")"),
                    ],
                ),
            ],
        );

        Self::new(Pattern::any_of(vec![bare_name, name_tuple]))
    }

    /// Every node under `root` (excluding `root` itself) that matches, in
    /// document order. All matches are collected before anything is rewritten.
    pub fn select(&self, root: &Node) -> Vec<Match> {
        let mut matches = Vec::new();
        let mut path = ChildPath::new();
        self.collect(root, &mut path, &mut matches);
        matches
    }

    fn collect(&self, node: &Node, path: &mut ChildPath, matches: &mut Vec<Match>) {
        for (index, child) in node.children.iter().enumerate() {
            let Element::Node(child_node) = child else {
                continue;
            };
            path.push(index);

            if let Some(captures) = self.pattern.matches(child).and_then(Self::captures) {
                info!(path = ?path, expression = %child_node, "selected expression");
                matches.push(Match {
                    path: path.clone(),
                    captures,
                });
            }
            self.collect(child_node, path, matches);

            path.pop();
        }
    }

    fn captures(mut bindings: Bindings) -> Option<Captures> {
        let formatstring = match bindings.remove("formatstring")? {
            Captured::Single(path) => path,
            Captured::Sequence(_) => return None,
        };
        let interpolation_args = bindings.remove("interpolation_args")?;
        Some(Captures {
            formatstring,
            interpolation_args,
        })
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::old_interpolation()
    }
}
