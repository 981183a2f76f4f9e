//! Lookahead over a statement window to predict which production applies.

use std::fmt;

use crate::tokenizer::{Token, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Assign,
    Parenthesis,
    Operator,
    Conditional,
    /// A lone identifier or constant.
    Atom,
    Unclassifiable,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeClass::Assign => "assignment",
            NodeClass::Parenthesis => "parenthesized expression",
            NodeClass::Operator => "operator expression",
            NodeClass::Conditional => "conditional",
            NodeClass::Atom => "operand",
            NodeClass::Unclassifiable => "unrecognized statement",
        };
        f.write_str(name)
    }
}

/// Classifies a window of tokens: the tokens up to and including the next
/// delimiter, or the whole remaining tail when no delimiter is left.
///
/// The rules are tried in a fixed order and the first match wins, so a
/// window opening with `(` is a parenthesis even if it holds an operator.
pub fn classify(window: &[Token]) -> NodeClass {
    let Some(first) = window.first() else {
        return NodeClass::Unclassifiable;
    };
    let second_kind = window.get(1).map(Token::kind);

    if first.is("(") {
        NodeClass::Parenthesis
    } else if first.kind() == TokenKind::Identifier && second_kind == Some(TokenKind::AssignSign)
    {
        NodeClass::Assign
    } else if first.kind() == TokenKind::ConditionalOperator {
        NodeClass::Conditional
    } else if window
        .iter()
        .any(|token| matches!(token.text(), "+" | "-" | "*" | "/"))
    {
        NodeClass::Operator
    } else if window.len() == 1
        && matches!(first.kind(), TokenKind::Constant | TokenKind::Identifier)
    {
        NodeClass::Atom
    } else {
        NodeClass::Unclassifiable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{partition, tokenize};

    fn window(source: &str) -> Vec<Token> {
        let (tokens, errors) = partition(&tokenize(source));
        assert!(errors.is_empty(), "{errors:?}");
        tokens
    }

    #[test]
    fn classifies_each_production() {
        assert_eq!(classify(&window("a := b;")), NodeClass::Assign);
        assert_eq!(classify(&window("(a + b)")), NodeClass::Parenthesis);
        assert_eq!(classify(&window("a * III")), NodeClass::Operator);
        assert_eq!(classify(&window("if a > b then c := a;")), NodeClass::Conditional);
        assert_eq!(classify(&window("XIV")), NodeClass::Atom);
        assert_eq!(classify(&window("b")), NodeClass::Atom);
    }

    #[test]
    fn first_matching_rule_wins() {
        // Assignment is checked before the operator scan.
        assert_eq!(classify(&window("a := a + b;")), NodeClass::Assign);
        // A parenthesized operator expression is a parenthesis.
        assert_eq!(classify(&window("(a * b) + III")), NodeClass::Parenthesis);
        // A conditional containing arithmetic is still a conditional.
        assert_eq!(
            classify(&window("if a > b then c := a - b;")),
            NodeClass::Conditional
        );
    }

    #[test]
    fn unclassifiable_windows() {
        assert_eq!(classify(&[]), NodeClass::Unclassifiable);
        assert_eq!(classify(&window(";")), NodeClass::Unclassifiable);
        assert_eq!(classify(&window("a;")), NodeClass::Unclassifiable);
        assert_eq!(classify(&window("a b")), NodeClass::Unclassifiable);
        assert_eq!(classify(&window("then a")), NodeClass::Unclassifiable);
        assert_eq!(classify(&window("> a")), NodeClass::Unclassifiable);
    }

    #[test]
    fn classification_is_idempotent() {
        for source in ["a := b;", "(a)", "a - b", "if a = b then a := b;", "a", "a b;"] {
            let tokens = window(source);
            assert_eq!(classify(&tokens), classify(&tokens), "{source}");
        }
    }
}
