use serde::Serialize;

use crate::tokenizer::Token;

/// A node of the concrete syntax tree.
///
/// Leaves and branches are told apart by shape alone: a node with children
/// is a branch (its token, if any, is the branch label), a node without
/// children is a leaf standing for exactly one source token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyntaxNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<Token>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// An atomic slot: operator, assignment or comparison sign, keyword or
    /// parenthesis mark.
    pub fn leaf(token: Token) -> Self {
        Self {
            token: Some(token),
            children: vec![],
        }
    }

    /// An operand slot holding a single identifier or constant. The extra
    /// branch layer marks a position that could hold a subtree instead.
    pub fn operand(token: Token) -> Self {
        Self::branch(vec![Self::leaf(token)])
    }

    pub fn branch(children: Vec<SyntaxNode>) -> Self {
        Self {
            token: None,
            children,
        }
    }

    /// The empty accumulator a statement sequence is collected into.
    pub(crate) fn root() -> Self {
        Self::branch(vec![])
    }

    pub(crate) fn push(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    #[allow(dead_code)]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[allow(dead_code)]
    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }

    /// Visits the tree in pre-order, passing each node with its depth (the
    /// node `walk` is called on has depth 0).
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(&SyntaxNode, usize),
    {
        self.walk_at(0, visitor);
    }

    fn walk_at<F>(&self, depth: usize, visitor: &mut F)
    where
        F: FnMut(&SyntaxNode, usize),
    {
        visitor(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visitor);
        }
    }

    /// Renders one node per line, indented by two spaces per level. Nodes
    /// without a token are printed as `{}`.
    pub fn render(&self) -> String {
        let mut lines = vec![];
        self.walk(&mut |node, depth| {
            let label = node.token().map(Token::text).unwrap_or("{}");
            lines.push(format!("{}{}", "  ".repeat(depth), label));
        });
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{Position, TokenKind};

    fn token(kind: TokenKind, text: &str, column: u32) -> Token {
        Token::new(
            kind,
            text,
            Position {
                offset: column as usize - 1,
                line: 1,
                column,
            },
        )
    }

    #[test]
    fn operand_wraps_a_single_leaf() {
        let node = SyntaxNode::operand(token(TokenKind::Identifier, "a", 1));
        assert!(node.is_branch());
        assert!(node.token().is_none());
        assert_eq!(node.children().len(), 1);
        assert!(node.children()[0].is_leaf());
        assert_eq!(node.children()[0].token().map(Token::text), Some("a"));
    }

    #[test]
    fn walk_is_pre_order_with_depth() {
        let node = SyntaxNode::branch(vec![
            SyntaxNode::operand(token(TokenKind::Identifier, "a", 1)),
            SyntaxNode::leaf(token(TokenKind::AssignSign, ":=", 3)),
            SyntaxNode::operand(token(TokenKind::Constant, "IV", 6)),
        ]);
        let mut visited = vec![];
        node.walk(&mut |node, depth| {
            visited.push((node.token().map(|t| t.text().to_string()), depth));
        });
        assert_eq!(
            visited,
            vec![
                (None, 0),
                (None, 1),
                (Some("a".to_string()), 2),
                (Some(":=".to_string()), 1),
                (None, 1),
                (Some("IV".to_string()), 2),
            ]
        );
    }

    #[test]
    fn render_indents_children() {
        let node = SyntaxNode::branch(vec![
            SyntaxNode::operand(token(TokenKind::Identifier, "a", 1)),
            SyntaxNode::leaf(token(TokenKind::OperatorsSign, "*", 3)),
            SyntaxNode::operand(token(TokenKind::Identifier, "b", 5)),
        ]);
        insta::assert_snapshot!(node.render(), @r"
        {}
          {}
            a
          *
          {}
            b
        ");
    }

    #[test]
    fn serializes_without_empty_fields() {
        let node = SyntaxNode::operand(token(TokenKind::Identifier, "a", 1));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "children": [{
                    "token": {
                        "kind": "Identifier",
                        "text": "a",
                        "position": { "offset": 0, "line": 1, "column": 1 }
                    }
                }]
            })
        );
    }
}
