use std::borrow::Cow;
use std::collections::VecDeque;

use pest::{
    Parser,
    iterators::{Pair, Pairs},
};
use pest_derive::Parser;

use crate::ast::{Element, Leaf, Node, NodeKind, TokenKind};
use crate::error::Result;

#[derive(Parser)]
#[grammar = "src/python.pest"]
pub struct PythonParser;

/// Reserved words that can never start an operand.
/// `True`, `False` and `None` are plain names.
const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const MULTIPLICATIVE: &[&str] = &["*", "/", "//", "%", "@"];
const UNARY: &[&str] = &["+", "-", "~"];

impl PythonParser {
    /// Parse Python source into a lossless tree rooted at a `File` node
    pub fn parse_input<'a>(input: &'a str) -> Result<Node<'a>> {
        let mut pairs: Pairs<'a, Rule> = PythonParser::parse(Rule::file, input).map_err(Box::new)?;

        let (elements, trailing) = match pairs.next() {
            Some(file) => Self::parse_sequence(file.into_inner()),
            None => (Vec::new(), ""),
        };

        let mut children = fold(elements);
        children.push(
            Leaf {
                kind: TokenKind::EndMarker,
                prefix: trailing,
                value: Cow::Borrowed(""),
            }
            .into(),
        );
        Ok(Node::new(NodeKind::File, children))
    }

    /// Turn a run of prefix/token pairs into elements.
    /// Returns the elements and the trivia left after the last one.
    fn parse_sequence(pairs: Pairs<Rule>) -> (Vec<Element>, &str) {
        let mut prefix = "";
        let mut elements = Vec::new();

        for pair in pairs {
            match pair.as_rule() {
                Rule::prefix | Rule::inner_prefix => prefix = pair.as_str(),
                Rule::EOI => {}
                Rule::paren | Rule::bracket | Rule::brace => {
                    let group = Self::parse_group(pair, std::mem::take(&mut prefix));
                    elements.push(group.into());
                }
                rule => {
                    let value = pair.as_str();
                    let leaf = Leaf::new(Self::token_kind(rule, value), std::mem::take(&mut prefix), value);
                    elements.push(leaf.into());
                }
            }
        }

        (elements, prefix)
    }

    fn parse_group<'a>(pair: Pair<'a, Rule>, prefix: &'a str) -> Node<'a> {
        let is_paren = pair.as_rule() == Rule::paren;
        let lexeme = pair.as_str();
        // Brackets are single ASCII characters.
        let open = &lexeme[..1];
        let close = &lexeme[lexeme.len() - 1..];

        let (inner, close_prefix) = Self::parse_sequence(pair.into_inner());
        let inner = fold(inner);

        let mut children = Vec::with_capacity(inner.len() + 2);
        children.push(Leaf::new(TokenKind::Operator, prefix, open).into());
        if is_paren && inner.iter().any(|e| e.is_operator(",")) {
            children.push(Node::new(NodeKind::ExprList, inner).into());
        } else {
            children.extend(inner);
        }
        children.push(Leaf::new(TokenKind::Operator, close_prefix, close).into());

        Node::new(NodeKind::Atom, children)
    }

    fn token_kind(rule: Rule, value: &str) -> TokenKind {
        match rule {
            Rule::name if KEYWORDS.contains(&value) => TokenKind::Keyword,
            Rule::name => TokenKind::Name,
            Rule::string => TokenKind::String,
            Rule::number => TokenKind::Number,
            Rule::operator => TokenKind::Operator,
            Rule::newline => TokenKind::Newline,
            _ => TokenKind::Unknown,
        }
    }
}

/// Group a flat element sequence into `Term`, `Factor`, `Power` and `Trailer`
/// nodes following Python's precedence for those levels. Everything else
/// (comparisons, additive operators, commas, keywords) stays flat.
fn fold(elements: Vec<Element<'_>>) -> Vec<Element<'_>> {
    let mut folder = Folder {
        items: elements.into(),
    };
    let mut folded = Vec::new();
    let mut after_operand = false;

    while let Some(front) = folder.items.front() {
        // A sign directly after an operand is the binary operator.
        let unary = is_unary(front);
        if (!unary || !after_operand) && folder.starts_factor(0) {
            if let Some(term) = folder.term() {
                folded.push(term);
            }
            after_operand = true;
        } else if let Some(element) = folder.items.pop_front() {
            folded.push(element);
            after_operand = false;
        }
    }

    folded
}

/// Recursive descent over the pending elements.
///
/// Every method that consumes input is only called after `starts_factor`
/// confirmed a factor is present, so the `?`s never discard elements.
struct Folder<'a> {
    items: VecDeque<Element<'a>>,
}

impl<'a> Folder<'a> {
    fn starts_factor(&self, at: usize) -> bool {
        match self.items.get(at) {
            Some(e) if is_unary(e) => self.starts_factor(at + 1),
            Some(e) if is_keyword(e, "await") => self.items.get(at + 1).is_some_and(starts_atom),
            Some(e) => starts_atom(e),
            None => false,
        }
    }

    fn term(&mut self) -> Option<Element<'a>> {
        let mut children = vec![self.factor()?];
        while self.items.front().is_some_and(is_multiplicative) && self.starts_factor(1) {
            children.push(self.items.pop_front()?);
            children.push(self.factor()?);
        }
        Some(collapse(NodeKind::Term, children))
    }

    fn factor(&mut self) -> Option<Element<'a>> {
        if self.items.front().is_some_and(is_unary) {
            let op = self.items.pop_front()?;
            let operand = self.factor()?;
            return Some(Node::new(NodeKind::Factor, vec![op, operand]).into());
        }
        self.power()
    }

    fn power(&mut self) -> Option<Element<'a>> {
        let mut children = Vec::new();
        if self.items.front().is_some_and(|e| is_keyword(e, "await")) {
            children.push(self.items.pop_front()?);
        }
        children.push(self.atom()?);
        while let Some(trailer) = self.trailer() {
            children.push(trailer);
        }
        if self.items.front().is_some_and(|e| e.is_operator("**")) && self.starts_factor(1) {
            children.push(self.items.pop_front()?);
            children.push(self.factor()?);
        }
        Some(collapse(NodeKind::Power, children))
    }

    fn atom(&mut self) -> Option<Element<'a>> {
        let first = self.items.pop_front()?;
        if !first.is_leaf_kind(TokenKind::String) {
            return Some(first);
        }

        // Adjacent literals concatenate into one atom.
        let mut strings = vec![first];
        while self.items.front().is_some_and(|e| e.is_leaf_kind(TokenKind::String)) {
            strings.push(self.items.pop_front()?);
        }
        Some(collapse(NodeKind::Atom, strings))
    }

    fn trailer(&mut self) -> Option<Element<'a>> {
        let front = self.items.front()?;

        if is_call_or_subscript(front) {
            let Element::Node(mut node) = self.items.pop_front()? else {
                return None;
            };
            node.kind = NodeKind::Trailer;
            return Some(node.into());
        }

        if front.is_operator(".") && self.items.get(1).is_some_and(|e| e.is_leaf_kind(TokenKind::Name)) {
            let dot = self.items.pop_front()?;
            let name = self.items.pop_front()?;
            return Some(Node::new(NodeKind::Trailer, vec![dot, name]).into());
        }

        None
    }
}

fn collapse(kind: NodeKind, mut children: Vec<Element<'_>>) -> Element<'_> {
    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return only;
        }
    }
    Node::new(kind, children).into()
}

fn starts_atom(element: &Element) -> bool {
    match element {
        Element::Leaf(leaf) => {
            matches!(leaf.kind, TokenKind::Name | TokenKind::Number | TokenKind::String) || leaf.is_operator("...")
        }
        Element::Node(node) => node.kind == NodeKind::Atom,
    }
}

fn is_call_or_subscript(element: &Element) -> bool {
    element.as_node().is_some_and(|node| {
        node.kind == NodeKind::Atom
            && node
                .children
                .first()
                .is_some_and(|open| open.is_operator("(") || open.is_operator("["))
    })
}

fn is_unary(element: &Element) -> bool {
    UNARY.iter().any(|op| element.is_operator(op))
}

fn is_multiplicative(element: &Element) -> bool {
    MULTIPLICATIVE.iter().any(|op| element.is_operator(op))
}

fn is_keyword(element: &Element, keyword: &str) -> bool {
    element
        .as_leaf()
        .is_some_and(|leaf| leaf.kind == TokenKind::Keyword && leaf.value == keyword)
}
