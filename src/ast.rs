use std::borrow::Cow;
use std::fmt;

/// Index path from a node down to one of its descendants.
pub type ChildPath = Vec<usize>;

/// Lexical category of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, including `True`, `False` and `None`
    Name,
    /// Reserved word other than the constant-like ones
    Keyword,
    Number,
    /// String literal with its prefix and quotes
    String,
    /// Punctuation and operators, brackets included
    Operator,
    /// Logical line break outside of brackets
    Newline,
    /// Character the tokenizer could not classify
    Unknown,
    /// Empty leaf holding trailing trivia
    EndMarker,
}

/// Syntactic category of an interior node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    /// Bracket group or run of adjacent string literals
    Atom,
    /// Contents of a parenthesised group with a top-level comma
    ExprList,
    /// `.name`, call or subscript following an operand
    Trailer,
    /// Operand with trailers, `await` or `**`
    Power,
    /// Unary `+`, `-` or `~`
    Factor,
    /// Multiplicative chain (`*`, `/`, `//`, `%`, `@`)
    Term,
}

/// A single token together with the trivia in front of it
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf<'a> {
    pub kind: TokenKind,
    /// Whitespace, comments and line joins preceding the token
    pub prefix: &'a str,
    pub value: Cow<'a, str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    pub kind: NodeKind,
    pub children: Vec<Element<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element<'a> {
    Leaf(Leaf<'a>),
    Node(Node<'a>),
}

impl<'a> Leaf<'a> {
    pub fn new(kind: TokenKind, prefix: &'a str, value: &'a str) -> Self {
        Self {
            kind,
            prefix,
            value: Cow::Borrowed(value),
        }
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == op
    }
}

impl<'a> Node<'a> {
    pub fn new(kind: NodeKind, children: Vec<Element<'a>>) -> Self {
        Self { kind, children }
    }

    /// Descendant element at `path`, or `None` if the path leaves the tree
    pub fn get(&self, path: &[usize]) -> Option<&Element<'a>> {
        let (&first, rest) = path.split_first()?;
        let child = self.children.get(first)?;
        if rest.is_empty() {
            Some(child)
        } else {
            child.as_node()?.get(rest)
        }
    }

    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Element<'a>> {
        let (&first, rest) = path.split_first()?;
        let child = self.children.get_mut(first)?;
        if rest.is_empty() {
            Some(child)
        } else {
            child.as_node_mut()?.get_mut(rest)
        }
    }

    /// Node at `path`; the empty path is the node itself
    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node<'a>> {
        if path.is_empty() {
            return Some(self);
        }
        self.get_mut(path)?.as_node_mut()
    }

    pub fn leaf(&self, path: &[usize]) -> Option<&Leaf<'a>> {
        self.get(path)?.as_leaf()
    }

    pub fn leaf_mut(&mut self, path: &[usize]) -> Option<&mut Leaf<'a>> {
        self.get_mut(path)?.as_leaf_mut()
    }
}

impl<'a> Element<'a> {
    pub fn as_leaf(&self) -> Option<&Leaf<'a>> {
        match self {
            Element::Leaf(leaf) => Some(leaf),
            Element::Node(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut Leaf<'a>> {
        match self {
            Element::Leaf(leaf) => Some(leaf),
            Element::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node<'a>> {
        match self {
            Element::Node(node) => Some(node),
            Element::Leaf(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node<'a>> {
        match self {
            Element::Node(node) => Some(node),
            Element::Leaf(_) => None,
        }
    }

    pub fn is_leaf_kind(&self, kind: TokenKind) -> bool {
        self.as_leaf().is_some_and(|leaf| leaf.kind == kind)
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.as_leaf().is_some_and(|leaf| leaf.is_operator(op))
    }
}

impl<'a> From<Leaf<'a>> for Element<'a> {
    fn from(leaf: Leaf<'a>) -> Self {
        Element::Leaf(leaf)
    }
}

impl<'a> From<Node<'a>> for Element<'a> {
    fn from(node: Node<'a>) -> Self {
        Element::Node(node)
    }
}

// Printing is the inverse of parsing: prefix and value of every leaf, in order.
impl fmt::Display for Leaf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix)?;
        f.write_str(&self.value)
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for child in &self.children {
            write!(f, "{child}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Leaf(leaf) => write!(f, "{leaf}"),
            Element::Node(node) => write!(f, "{node}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node<'static> {
        Node::new(
            NodeKind::Term,
            vec![
                Leaf::new(TokenKind::String, "", "'%s'").into(),
                Leaf::new(TokenKind::Operator, " ", "%").into(),
                Node::new(
                    NodeKind::Atom,
                    vec![
                        Leaf::new(TokenKind::Operator, " ", "(").into(),
                        Leaf::new(TokenKind::Name, "", "a").into(),
                        Leaf::new(TokenKind::Operator, "", ")").into(),
                    ],
                )
                .into(),
            ],
        )
    }

    #[test]
    fn test_display_concatenates_prefix_and_value() {
        assert_eq!(sample().to_string(), "'%s' % (a)");
    }

    #[test]
    fn test_get_follows_path() {
        let node = sample();
        assert_eq!(node.leaf(&[2, 1]).map(|l| l.value.as_ref()), Some("a"));
        assert!(node.get(&[2, 5]).is_none());
        assert!(node.get(&[0, 0]).is_none());
        assert!(node.get(&[]).is_none());
    }

    #[test]
    fn test_leaf_mut_replaces_value() {
        let mut node = sample();
        if let Some(leaf) = node.leaf_mut(&[0]) {
            leaf.value = Cow::Owned("f'{a}'".to_string());
        }
        node.children.truncate(1);
        assert_eq!(node.to_string(), "f'{a}'");
    }

    #[test]
    fn test_node_mut_empty_path_is_self() {
        let mut node = sample();
        assert_eq!(node.node_mut(&[]).map(|n| n.kind), Some(NodeKind::Term));
        assert_eq!(node.node_mut(&[2]).map(|n| n.kind), Some(NodeKind::Atom));
        assert!(node.node_mut(&[1]).is_none());
    }
}
