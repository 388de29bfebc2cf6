//! Byte-stream tokenizer producing a lazy sequence of source slices.
//!
//! Tokens are maximal runs of a single character class and borrow directly
//! from the input; the tokenizer never allocates. Parens are always
//! single-character tokens, a string token runs from its opening quote
//! through the matching close quote (honoring backslash escapes), and a
//! comment token runs from `;` through the end of the line. Everything that
//! is not whitespace, a paren, a quote, or a comment is an identifier
//! character.

/// Classification of a token yielded by [`Tokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Whitespace,
    OpenParen,
    CloseParen,
    /// A string literal including both surrounding quotes. When the input
    /// ends before the closing quote the token extends to end of input; the
    /// parser rejects it there.
    String,
    /// A `;` comment through end of line, exclusive of the newline.
    Comment,
    Identifier,
}

/// A single token: its class and the source text it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lazy, restartable tokenizer over a source string.
///
/// Cloning the tokenizer clones its cursor, so a clone can re-scan from the
/// current position.
#[derive(Debug, Clone)]
pub(crate) struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Scans a string literal starting at the opening quote.
    ///
    /// A backslash consumes the following byte, so an escaped quote never
    /// terminates the literal.
    fn scan_string(&self, bytes: &[u8]) -> usize {
        let mut end = self.pos + 1;
        while end < bytes.len() {
            match bytes[end] {
                b'\\' => end = (end + 2).min(bytes.len()),
                b'"' => return end + 1,
                _ => end += 1,
            }
        }
        end
    }

    /// Scans to the end of the current line, exclusive of the newline.
    fn scan_comment(&self, bytes: &[u8]) -> usize {
        let mut end = self.pos + 1;
        while end < bytes.len() && bytes[end] != b'\n' {
            end += 1;
        }
        end
    }

    /// Scans a maximal run of bytes in the given class.
    fn scan_run(&self, bytes: &[u8], class: fn(u8) -> bool) -> usize {
        let mut end = self.pos + 1;
        while end < bytes.len() && class(bytes[end]) {
            end += 1;
        }
        end
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_identifier(byte: u8) -> bool {
    !is_whitespace(byte) && !matches!(byte, b'(' | b')' | b'"' | b';')
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.source.as_bytes();
        let first = *bytes.get(self.pos)?;
        let (kind, end) = match first {
            b'(' => (TokenKind::OpenParen, self.pos + 1),
            b')' => (TokenKind::CloseParen, self.pos + 1),
            b'"' => (TokenKind::String, self.scan_string(bytes)),
            b';' => (TokenKind::Comment, self.scan_comment(bytes)),
            b if is_whitespace(b) => (TokenKind::Whitespace, self.scan_run(bytes, is_whitespace)),
            _ => (TokenKind::Identifier, self.scan_run(bytes, is_identifier)),
        };
        let text = &self.source[self.pos..end];
        self.pos = end;
        Some(Token { kind, text })
    }
}
