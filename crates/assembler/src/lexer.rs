//! Tokenization for script source.
//!
//! Uses the logos crate to split source into raw lexemes. Classifying a
//! word as a keyword or an integer literal is left to the parser.

use logos::Logos;

/// Raw lexemes of script source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    /// A quoted string, quotes stripped.
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    Str(String),

    /// An opening quote with no closing quote before end of input.
    #[regex(r#""[^"]*"#)]
    UnterminatedStr,

    /// Any other whitespace-delimited run: keyword or integer literal.
    #[regex(r##"[^ \t\r\n\f"#]+"##, |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

/// Lexer wrapper that tracks line numbers
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    source: &'source str,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            source,
        }
    }

    fn line_at_pos(&self, pos: usize) -> usize {
        1 + self.source[..pos].bytes().filter(|b| *b == b'\n').count()
    }
}

impl<'source> Iterator for Lexer<'source> {
    type Item = (Token, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let line = self.line_at_pos(self.inner.span().start);

        // Every byte is covered by some pattern; anything logos still rejects
        // is surfaced as a word so the parser reports it.
        let token = token.unwrap_or_else(|_| Token::Word(self.inner.slice().to_string()));

        Some((token, line))
    }
}
