//! Parser lowering the token stream into a forest of syntax trees.
//!
//! Open parens begin a subtree, close parens end it, and identifier tokens
//! are classified into keywords, booleans, numbers, or plain identifiers.
//! The parser is the first place diagnostics are produced: unbalanced
//! parentheses abort the parse with a `SyntaxError` that is also recorded in
//! the diagnostics sink.

use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    diagnostics::Diagnostics,
    error::{Error, ErrorKind, RunResult},
    tokenize::{TokenKind, Tokenizer},
};

/// Reserved words recognized in the head position of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Keyword {
    If,
    Lambda,
    Define,
    Import,
}

/// A terminal syntax node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Leaf {
    Keyword(Keyword),
    Ident(Box<str>),
    /// A string literal with quotes stripped and escapes decoded.
    Str(Box<str>),
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// A syntax node: either a leaf or an ordered sequence of children.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ast {
    Leaf(Leaf),
    Tree(Vec<Ast>),
}

/// Parses source text into a forest of top-level syntax trees.
///
/// Every failure is recorded in `diagnostics` before being returned.
pub(crate) fn parse(source: &str, diagnostics: &mut Diagnostics) -> RunResult<Vec<Ast>> {
    let mut stack: Vec<Vec<Ast>> = vec![Vec::new()];
    for token in Tokenizer::new(source) {
        match token.kind {
            TokenKind::Whitespace | TokenKind::Comment => {}
            TokenKind::OpenParen => stack.push(Vec::new()),
            TokenKind::CloseParen => {
                let Some(children) = stack.pop() else {
                    unreachable!("parse stack always holds the top-level forest")
                };
                let Some(parent) = stack.last_mut() else {
                    return Err(report(
                        diagnostics,
                        "unmatched close parenthesis with no matching open parenthesis",
                    ));
                };
                parent.push(Ast::Tree(children));
            }
            TokenKind::String => match decode_string(token.text) {
                Ok(text) => push_leaf(&mut stack, Leaf::Str(text)),
                Err(err) => {
                    diagnostics.record(err.kind(), err.message());
                    return Err(err);
                }
            },
            TokenKind::Identifier => push_leaf(&mut stack, classify_identifier(token.text)),
        }
    }
    if stack.len() > 1 {
        return Err(report(
            diagnostics,
            "unclosed parenthesis: reached end of input inside an expression",
        ));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn push_leaf(stack: &mut [Vec<Ast>], leaf: Leaf) {
    if let Some(top) = stack.last_mut() {
        top.push(Ast::Leaf(leaf));
    }
}

fn report(diagnostics: &mut Diagnostics, message: &str) -> Error {
    diagnostics.record(ErrorKind::SyntaxError, message);
    Error::syntax_error(message)
}

/// Classifies an identifier token into the most specific leaf.
///
/// Order matters: boolean literals and reserved keywords win over numeric
/// parses, and an integer parse is attempted before a float parse so `42`
/// stays integral.
fn classify_identifier(text: &str) -> Leaf {
    match text {
        "true" => return Leaf::Bool(true),
        "false" => return Leaf::Bool(false),
        _ => {}
    }
    if let Ok(keyword) = Keyword::from_str(text) {
        return Leaf::Keyword(keyword);
    }
    if let Ok(int) = text.parse::<i64>() {
        return Leaf::Int(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        return Leaf::Float(float);
    }
    Leaf::Ident(text.into())
}

/// Strips the surrounding quotes from a string token and decodes escapes.
///
/// Recognized escapes are `\n`, `\t`, `\r`, `\"`, and `\\`; any other
/// escaped character stands for itself.
fn decode_string(token: &str) -> RunResult<Box<str>> {
    let body = token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|_| token.len() >= 2)
        .ok_or_else(|| Error::syntax_error("unterminated string literal"))?;
    let mut decoded = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some(other) => decoded.push(other),
            None => return Err(Error::syntax_error("string literal ends with a bare backslash")),
        }
    }
    Ok(decoded.into())
}
