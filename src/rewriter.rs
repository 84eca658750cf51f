use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Match, Regex};
use tracing::info;

use crate::ast::{Node, TokenKind};
use crate::error::{Error, Result};
use crate::selector::{Captured, Captures};

/// Marker that turns a string literal into an interpolated one
const INTERPOLATION_PREFIX: char = 'f';

static CONVERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("%[fds]").expect("conversion pattern is valid"));

/// Result of considering one matched expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// The literal now holds `literal` and the operator and operand are gone
    Rewritten { literal: String },
    /// The expression was left exactly as it was
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Placeholders recognised in the literal do not line up with the arguments
    CountMismatch { placeholders: usize, arguments: usize },
    /// A capture did not resolve to a leaf inside the expression
    UnresolvedCapture,
}

/// `%s`, `%d` and `%f` occurrences that are not directly preceded by another `%`.
///
/// `%%s` is therefore not a placeholder, but neither is the `%s` in `%%%s`:
/// only the single character before the conversion is inspected.
pub fn placeholders(text: &str) -> impl Iterator<Item = Match<'_>> {
    let bytes = text.as_bytes();
    CONVERSION
        .find_iter(text)
        .filter(move |m| m.start() == 0 || bytes[m.start() - 1] != b'%')
}

/// Replace each placeholder, left to right, with `{name}` for the next argument.
pub fn substitute(text: &str, arguments: &[String]) -> Result<String> {
    let mut arguments = arguments.iter();
    let mut result = String::with_capacity(text.len() + 8);
    let mut last_end = 0;
    let mut consumed = 0;

    for placeholder in placeholders(text) {
        let name = arguments
            .next()
            .ok_or(Error::ExhaustedArguments { consumed })?;
        result.push_str(&text[last_end..placeholder.start()]);
        result.push('{');
        result.push_str(name);
        result.push('}');
        last_end = placeholder.end();
        consumed += 1;
    }
    result.push_str(&text[last_end..]);

    let remaining = arguments.count();
    if remaining > 0 {
        return Err(Error::UnconsumedArguments { remaining });
    }
    Ok(result)
}

/// Turn one matched `'...' % operand` expression into an interpolated literal.
///
/// On a placeholder/argument count mismatch the node is returned untouched as
/// [`Rewrite::Skipped`]. An error means substitution disagreed with the
/// count, which is a bug; the node is untouched in that case too.
pub fn rewrite(node: &mut Node, captures: &Captures) -> Result<Rewrite> {
    let Some(arguments) = argument_names(node, &captures.interpolation_args) else {
        return Ok(Rewrite::Skipped(SkipReason::UnresolvedCapture));
    };
    let Some(literal) = node.leaf(&captures.formatstring) else {
        return Ok(Rewrite::Skipped(SkipReason::UnresolvedCapture));
    };
    let text = literal.value.as_ref();

    let count = placeholders(text).count();
    if count != arguments.len() {
        info!(
            expression = %node,
            placeholders = count,
            arguments = arguments.len(),
            "placeholders and arguments differ, leaving expression unchanged"
        );
        return Ok(Rewrite::Skipped(SkipReason::CountMismatch {
            placeholders: count,
            arguments: arguments.len(),
        }));
    }

    let mut replacement = substitute(text, &arguments)?;
    if !replacement.starts_with(INTERPOLATION_PREFIX) {
        replacement.insert(0, INTERPOLATION_PREFIX);
    }

    if let Some(leaf) = node.leaf_mut(&captures.formatstring) {
        leaf.value = Cow::Owned(replacement.clone());
    }
    // Everything after the literal is the operator and its operand.
    if let Some(&index) = captures.formatstring.first() {
        node.children.truncate(index + 1);
    }

    Ok(Rewrite::Rewritten {
        literal: replacement,
    })
}

/// Argument names in substitution order. A lone name yields itself; a tuple
/// yields its name tokens with the commas dropped.
fn argument_names(node: &Node, captured: &Captured) -> Option<Vec<String>> {
    match captured {
        Captured::Single(path) => {
            let leaf = node.leaf(path)?;
            Some(vec![leaf.value.to_string()])
        }
        Captured::Sequence(paths) => Some(
            paths
                .iter()
                .filter_map(|path| node.leaf(path))
                .filter(|leaf| leaf.kind == TokenKind::Name)
                .map(|leaf| leaf.value.to_string())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;
    use crate::selector::Selector;
    use pretty_assertions::assert_eq;

    /// Parse `source`, rewrite its single match and print the expression
    fn rewrite_one(source: &str) -> (String, Rewrite) {
        let mut tree = PythonParser::parse_input(source).unwrap();
        let matches = Selector::old_interpolation().select(&tree);
        assert_eq!(matches.len(), 1, "expected exactly one match in {source}");

        let node = tree.node_mut(&matches[0].path).unwrap();
        let outcome = rewrite(node, &matches[0].captures).unwrap();
        (node.to_string(), outcome)
    }

    fn count(text: &str) -> usize {
        placeholders(text).count()
    }

    #[test]
    fn test_placeholders_basic_conversions() {
        assert_eq!(count("'%s %d %f'"), 3);
        assert_eq!(count("'%r %x %i'"), 0);
        assert_eq!(count("'%s%s'"), 2);
        assert_eq!(count("%s"), 1);
    }

    #[test]
    fn test_placeholders_skip_escaped_percent() {
        assert_eq!(count("'100%%s'"), 0);
        assert_eq!(count("'%%s and %s'"), 1);
        // Only the immediately preceding character is considered.
        assert_eq!(count("'%%%s'"), 0);
    }

    #[test]
    fn test_placeholders_ignore_modifiers() {
        assert_eq!(count("'%.2f'"), 0);
        assert_eq!(count("'%20d'"), 0);
        assert_eq!(count("'%-5s'"), 0);
    }

    #[test]
    fn test_substitute_in_order() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(substitute("'%s-%d'", &args).unwrap(), "'{a}-{b}'");
    }

    #[test]
    fn test_substitute_reports_leftover_arguments() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            substitute("'%s'", &args),
            Err(Error::UnconsumedArguments { remaining: 1 })
        ));
    }

    #[test]
    fn test_substitute_reports_missing_arguments() {
        let args = vec!["a".to_string()];
        assert!(matches!(
            substitute("'%s %s'", &args),
            Err(Error::ExhaustedArguments { consumed: 1 })
        ));
    }

    #[test]
    fn test_rewrite_bare_name() {
        let (text, outcome) = rewrite_one("'hello %s' % name");
        assert_eq!(text, "f'hello {name}'");
        assert_eq!(
            outcome,
            Rewrite::Rewritten {
                literal: "f'hello {name}'".to_string()
            }
        );
    }

    #[test]
    fn test_rewrite_tuple() {
        let (text, _) = rewrite_one("'%s is %d years old' % (name, age)");
        assert_eq!(text, "f'{name} is {age} years old'");
    }

    #[test]
    fn test_rewrite_tuple_with_trailing_comma_and_comments() {
        let (text, _) = rewrite_one("'%s and %f' % (\n    first,  # one\n    second,\n)");
        assert_eq!(text, "f'{first} and {second}'");
    }

    #[test]
    fn test_rewrite_double_quoted_literal() {
        let (text, _) = rewrite_one("\"%d items\" % count");
        assert_eq!(text, "f\"{count} items\"");
    }

    #[test]
    fn test_rewrite_skips_precision_modifier() {
        let (text, outcome) = rewrite_one("'%.2f percent' % ratio");
        assert_eq!(text, "'%.2f percent' % ratio");
        assert_eq!(
            outcome,
            Rewrite::Skipped(SkipReason::CountMismatch {
                placeholders: 0,
                arguments: 1
            })
        );
    }

    #[test]
    fn test_rewrite_skips_too_few_arguments() {
        let (text, outcome) = rewrite_one("'%s and %s' % (a,)");
        assert_eq!(text, "'%s and %s' % (a,)");
        assert_eq!(
            outcome,
            Rewrite::Skipped(SkipReason::CountMismatch {
                placeholders: 2,
                arguments: 1
            })
        );
    }

    #[test]
    fn test_rewrite_skips_too_many_arguments() {
        let (text, outcome) = rewrite_one("'%s' % (a, b)");
        assert_eq!(text, "'%s' % (a, b)");
        assert_eq!(
            outcome,
            Rewrite::Skipped(SkipReason::CountMismatch {
                placeholders: 1,
                arguments: 2
            })
        );
    }

    #[test]
    fn test_rewrite_does_not_double_prefix() {
        let (text, _) = rewrite_one("f'{x} %s' % y");
        assert_eq!(text, "f'{x} {y}'");
    }

    #[test]
    fn test_rewrite_keeps_other_prefixes() {
        let (text, _) = rewrite_one("r'\\d %s' % pattern");
        assert_eq!(text, "fr'\\d {pattern}'");
    }

    #[test]
    fn test_rewrite_skip_is_stable() {
        let source = "'%20d' % width";
        let (first, _) = rewrite_one(source);
        let (second, outcome) = rewrite_one(&first);
        assert_eq!(second, source);
        assert!(matches!(outcome, Rewrite::Skipped(_)));
    }

    #[test]
    fn test_rewrite_unresolved_capture_is_skipped() {
        let mut tree = PythonParser::parse_input("'%s' % x").unwrap();
        let node = tree.node_mut(&[0]).unwrap();
        let captures = Captures {
            formatstring: vec![7],
            interpolation_args: Captured::Single(vec![2]),
        };
        assert_eq!(
            rewrite(node, &captures).unwrap(),
            Rewrite::Skipped(SkipReason::UnresolvedCapture)
        );
        assert_eq!(node.to_string(), "'%s' % x");
    }
}
