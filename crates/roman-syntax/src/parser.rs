use serde::Serialize;
use tracing::{debug, trace};

use crate::classifier::{classify, NodeClass};
use crate::syntax_tree::SyntaxNode;
use crate::tokenizer::{partition, LexError, LexResult, Position, Token, TokenKind};

pub const DEFAULT_MAX_DEPTH: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// How many statement sequences may be nested inside each other before
    /// the analyzer gives up. Every parenthesis, conditional branch and
    /// chained operator opens one more level.
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("syntax error{}: {message}", describe_position(.position))]
pub struct SyntaxError {
    pub message: String,
    pub position: Option<Position>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

fn describe_position(position: &Option<Position>) -> String {
    position
        .map(|position| format!(" at {position}"))
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("lexical analysis found errors:\n{}", list_lex_errors(.0))]
    Lexical(Vec<LexError>),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("nothing to analyze: the source contains no statements")]
    Empty,
}

fn list_lex_errors(errors: &[LexError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the syntax tree of a whole program.
///
/// Parsing stops at the first defect; there is no recovery and no partial
/// tree.
#[derive(Clone, Debug, Default)]
pub struct SyntaxAnalyzer {
    options: ParserOptions,
}

impl SyntaxAnalyzer {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Refuses to parse if the tokenizer reported any error, listing all of
    /// them; otherwise parses every token as one statement sequence under a
    /// fresh root node.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn analyze(&self, results: &[LexResult]) -> Result<SyntaxNode, AnalyzeError> {
        let (tokens, errors) = partition(results);
        if !errors.is_empty() {
            return Err(AnalyzeError::Lexical(errors));
        }
        if tokens.is_empty() {
            return Err(AnalyzeError::Empty);
        }

        let mut root = SyntaxNode::root();
        self.parse_sequence(&tokens, &mut root, 0)?;
        debug!(
            tokens = tokens.len(),
            statements = root.children().len(),
            "Syntax analysis finished"
        );
        Ok(root)
    }

    /// The statement-sequence driver: classifies the next window, hands it to
    /// its production and appends the result to `parent` until no tokens are
    /// left.
    fn parse_sequence(
        &self,
        tokens: &[Token],
        parent: &mut SyntaxNode,
        depth: usize,
    ) -> Result<(), SyntaxError> {
        if depth > self.options.max_depth {
            return Err(SyntaxError::new(
                format!(
                    "expression too deeply nested: more than {} levels of parentheses, branches or chained operators",
                    self.options.max_depth
                ),
                position_at(tokens, 0),
            ));
        }

        let mut rest = tokens;
        while let Some(first) = rest.first() {
            // A bare expression may run to the end without a delimiter.
            let window_end = match rest.iter().position(is_delimiter) {
                Some(index) => index + 1,
                None if matches!(classify(rest), NodeClass::Operator | NodeClass::Parenthesis) => {
                    rest.len()
                }
                None => {
                    return Err(SyntaxError::new(
                        "statement is not terminated by ';'",
                        first.position(),
                    ))
                }
            };
            let window = &rest[..window_end];
            let class = classify(window);
            trace!(?class, window = ?texts(window), depth, "Parsing statement");

            let consumed = match class {
                NodeClass::Assign => {
                    parent.push(self.parse_assign(window, depth)?);
                    window_end
                }
                NodeClass::Operator => {
                    parent.push(self.parse_operator(window, depth)?);
                    window_end
                }
                NodeClass::Parenthesis => {
                    let end = locate_parenthesis_block(rest);
                    parent.push(self.parse_parenthesized(&rest[..end], depth)?);
                    end
                }
                NodeClass::Conditional => {
                    let end = locate_conditional_block(rest);
                    parent.push(self.parse_conditional(&rest[..end], depth)?);
                    end
                }
                NodeClass::Atom => {
                    parent.push(SyntaxNode::operand(first.clone()));
                    window_end
                }
                NodeClass::Unclassifiable => {
                    return Err(SyntaxError::new(
                        format!(
                            "expected an assignment, a conditional or an expression, found '{}'",
                            first.text()
                        ),
                        first.position(),
                    ))
                }
            };
            rest = &rest[consumed..];
        }
        Ok(())
    }

    fn parse_assign(&self, tokens: &[Token], depth: usize) -> Result<SyntaxNode, SyntaxError> {
        let target = expect(tokens, 0, is_kind(TokenKind::Identifier), "an identifier")?;
        let sign = expect(tokens, 1, is_kind(TokenKind::AssignSign), "':='")?;
        let mut node = SyntaxNode::branch(vec![
            SyntaxNode::operand(target.clone()),
            SyntaxNode::leaf(sign.clone()),
        ]);

        let value = &statement_body(tokens)[2..];
        trace!(value = ?texts(value), "Parsing assigned value");
        match classify(value) {
            NodeClass::Atom => node.push(SyntaxNode::operand(value[0].clone())),
            NodeClass::Operator | NodeClass::Parenthesis => {
                self.parse_sequence(value, &mut node, depth + 1)?
            }
            NodeClass::Assign | NodeClass::Conditional | NodeClass::Unclassifiable => {
                return Err(SyntaxError::new(
                    "only a variable, a constant, or a parenthesized or operator expression may be assigned",
                    position_at(tokens, 2),
                ))
            }
        }
        Ok(node)
    }

    /// `operand <comparison sign> operand`, nothing more.
    fn parse_comparison(&self, tokens: &[Token]) -> Result<SyntaxNode, SyntaxError> {
        let lhs = expect(tokens, 0, is_operand, "an identifier or a constant")?;
        let sign = expect(tokens, 1, is_kind(TokenKind::ComparisonSign), "a comparison sign")?;
        let rhs = expect(tokens, 2, is_operand, "an identifier or a constant")?;
        if let Some(extra) = tokens.get(3) {
            return Err(SyntaxError::new(
                format!(
                    "a comparison takes exactly two operands, found '{}' after it",
                    extra.text()
                ),
                extra.position(),
            ));
        }
        Ok(SyntaxNode::branch(vec![
            SyntaxNode::operand(lhs.clone()),
            SyntaxNode::leaf(sign.clone()),
            SyntaxNode::operand(rhs.clone()),
        ]))
    }

    /// One binary operation. Longer chains nest to the right through the
    /// driver re-classifying the right operand.
    fn parse_operator(&self, tokens: &[Token], depth: usize) -> Result<SyntaxNode, SyntaxError> {
        let body = statement_body(tokens);
        let (lhs, sign_index) = match body.first() {
            Some(open) if open.is("(") => {
                let close = matching_close(body).ok_or_else(|| unclosed(open))?;
                (self.parse_parenthesis(&body[..=close], depth)?, close + 1)
            }
            _ => {
                let operand = expect(tokens, 0, is_operand, "an identifier, a constant or '('")?;
                (SyntaxNode::operand(operand.clone()), 1)
            }
        };
        let sign = expect(
            tokens,
            sign_index,
            is_kind(TokenKind::OperatorsSign),
            "an arithmetic operator",
        )?;
        let mut node = SyntaxNode::branch(vec![lhs, SyntaxNode::leaf(sign.clone())]);

        let rhs = &body[sign_index + 1..];
        match classify(rhs) {
            NodeClass::Atom => node.push(SyntaxNode::operand(rhs[0].clone())),
            NodeClass::Operator | NodeClass::Parenthesis => {
                self.parse_sequence(rhs, &mut node, depth + 1)?
            }
            NodeClass::Assign | NodeClass::Conditional | NodeClass::Unclassifiable => {
                return Err(SyntaxError::new(
                    "the right operand must be a variable, a constant or an expression",
                    position_at(tokens, sign_index + 1),
                ))
            }
        }
        Ok(node)
    }

    /// Entry for windows that open with `(`. A group that is followed by more
    /// tokens is the left operand of an operator expression.
    fn parse_parenthesized(
        &self,
        tokens: &[Token],
        depth: usize,
    ) -> Result<SyntaxNode, SyntaxError> {
        let open = expect(tokens, 0, |token| token.is("("), "'('")?;
        let body = statement_body(tokens);
        if let Some(delimiter) = body.iter().find(|token| is_delimiter(token)) {
            return Err(SyntaxError::new(
                "parenthesized expression runs past the end of its statement",
                delimiter.position(),
            ));
        }

        let close = matching_close(body).ok_or_else(|| unclosed(open))?;
        if close + 1 == body.len() {
            self.parse_parenthesis(body, depth)
        } else {
            self.parse_operator(tokens, depth)
        }
    }

    /// `( inner )` where the closing mark matches the opening one.
    fn parse_parenthesis(&self, tokens: &[Token], depth: usize) -> Result<SyntaxNode, SyntaxError> {
        let [open, inner @ .., close] = tokens else {
            return Err(SyntaxError::new(
                "expected a parenthesized expression",
                position_at(tokens, 0),
            ));
        };
        let mut node = SyntaxNode::branch(vec![SyntaxNode::leaf(open.clone())]);
        match classify(inner) {
            NodeClass::Atom => node.push(SyntaxNode::operand(inner[0].clone())),
            NodeClass::Operator | NodeClass::Parenthesis => {
                self.parse_sequence(inner, &mut node, depth + 1)?
            }
            _ if inner.is_empty() => {
                return Err(SyntaxError::new("empty parentheses", close.position()))
            }
            NodeClass::Assign | NodeClass::Conditional | NodeClass::Unclassifiable => {
                return Err(SyntaxError::new(
                    "only a variable, a constant or an expression may be parenthesized",
                    inner[0].position(),
                ))
            }
        }
        node.push(SyntaxNode::leaf(close.clone()));
        Ok(node)
    }

    /// `if <comparison> then <statements> [else <statements>]`. Without an
    /// `else` the then-statements are children of the conditional node
    /// itself; with one, they are collected under a single child node.
    fn parse_conditional(&self, tokens: &[Token], depth: usize) -> Result<SyntaxNode, SyntaxError> {
        let keyword = expect(tokens, 0, |token| token.is("if"), "'if'")?;
        let then_index = tokens.iter().position(|token| token.is("then")).ok_or_else(|| {
            SyntaxError::new(
                "the predicate must be followed by the keyword 'then'",
                keyword.position(),
            )
        })?;
        let then_keyword = &tokens[then_index];
        let predicate = &tokens[1..then_index];
        if predicate.is_empty() {
            return Err(SyntaxError::new(
                "expected a comparison between 'if' and 'then'",
                then_keyword.position(),
            ));
        }

        let mut node = SyntaxNode::branch(vec![
            SyntaxNode::leaf(keyword.clone()),
            self.parse_comparison(predicate)?,
            SyntaxNode::leaf(then_keyword.clone()),
        ]);

        match tokens.iter().rposition(|token| token.is("else")) {
            Some(else_index) => {
                let else_keyword = &tokens[else_index];
                // The then-branch gets its own node so it stays apart from the
                // else-branch statements.
                let mut then_branch = SyntaxNode::root();
                self.parse_branch(
                    &tokens[then_index + 1..else_index],
                    then_keyword,
                    &mut then_branch,
                    depth,
                )?;
                node.push(then_branch);
                node.push(SyntaxNode::leaf(else_keyword.clone()));
                self.parse_branch(&tokens[else_index + 1..], else_keyword, &mut node, depth)?;
            }
            None => {
                self.parse_branch(&tokens[then_index + 1..], then_keyword, &mut node, depth)?;
            }
        }
        Ok(node)
    }

    fn parse_branch(
        &self,
        tokens: &[Token],
        keyword: &Token,
        parent: &mut SyntaxNode,
        depth: usize,
    ) -> Result<(), SyntaxError> {
        if tokens.is_empty() {
            return Err(SyntaxError::new(
                format!("expected a statement after '{}'", keyword.text()),
                keyword.position(),
            ));
        }
        self.parse_sequence(tokens, parent, depth + 1)
    }
}

/// Analyzes tokenizer output with the default options.
#[allow(dead_code)]
pub fn analyze(results: &[LexResult]) -> Result<SyntaxNode, AnalyzeError> {
    SyntaxAnalyzer::default().analyze(results)
}

/// Index one past the delimiter that closes a conditional starting at
/// `tokens[0]`, anchored on the last `else` of the stream.
pub fn locate_conditional_block(tokens: &[Token]) -> usize {
    locate_block(tokens, "else")
}

/// Index one past the delimiter that closes a parenthesized statement
/// starting at `tokens[0]`, anchored on the last `)` of the stream.
pub fn locate_parenthesis_block(tokens: &[Token]) -> usize {
    locate_block(tokens, ")")
}

fn locate_block(tokens: &[Token], anchor: &str) -> usize {
    let anchor_position = tokens
        .iter()
        .rev()
        .find(|token| token.is(anchor))
        .and_then(Token::position);
    let delimiter = match anchor_position {
        Some(anchor_position) => tokens.iter().position(|token| {
            is_delimiter(token) && token.position().is_some_and(|p| p > anchor_position)
        }),
        None => tokens.iter().position(is_delimiter),
    };
    // Without a closing delimiter the construct runs to the end of the stream.
    delimiter.map_or(tokens.len(), |index| index + 1)
}

fn matching_close(tokens: &[Token]) -> Option<usize> {
    let mut nesting = 0_usize;
    for (index, token) in tokens.iter().enumerate() {
        if token.is("(") {
            nesting += 1;
        } else if token.is(")") {
            nesting = nesting.checked_sub(1)?;
            if nesting == 0 {
                return Some(index);
            }
        }
    }
    None
}

fn unclosed(open: &Token) -> SyntaxError {
    SyntaxError::new("'(' is never closed", open.position())
}

/// Checks `tokens[index]`, reporting the last token's position when the
/// window is too short.
fn expect<'t>(
    tokens: &'t [Token],
    index: usize,
    accepts: impl Fn(&Token) -> bool,
    expected: &str,
) -> Result<&'t Token, SyntaxError> {
    match tokens.get(index) {
        Some(token) if accepts(token) => Ok(token),
        Some(token) => Err(SyntaxError::new(
            format!("expected {expected}, found '{}'", token.text()),
            token.position(),
        )),
        None => Err(SyntaxError::new(
            format!("expected {expected}, found the end of the statement"),
            position_at(tokens, index),
        )),
    }
}

fn position_at(tokens: &[Token], index: usize) -> Option<Position> {
    tokens
        .get(index)
        .or(tokens.last())
        .and_then(Token::position)
}

/// The window without its trailing delimiter, if it has one.
fn statement_body(tokens: &[Token]) -> &[Token] {
    match tokens.split_last() {
        Some((last, body)) if is_delimiter(last) => body,
        _ => tokens,
    }
}

fn is_delimiter(token: &Token) -> bool {
    token.kind() == TokenKind::Delimiter
}

fn is_operand(token: &Token) -> bool {
    matches!(token.kind(), TokenKind::Identifier | TokenKind::Constant)
}

fn is_kind(kind: TokenKind) -> impl Fn(&Token) -> bool {
    move |token: &Token| token.kind() == kind
}

fn texts(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(Token::text).collect()
}
