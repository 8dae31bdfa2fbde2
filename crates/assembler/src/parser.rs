//! Classify lexemes into typed script tokens.

use crate::lexer::{Lexer, Token};
use thiserror::Error;

/// Tokenizer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("non-ASCII character {ch:?} at line {line}")]
    NonAscii { ch: char, line: usize },

    #[error("leading zero in integer literal '{literal}' at line {line}")]
    LeadingZero { literal: String, line: usize },

    #[error("0x must be followed by hexadecimal digits: '{literal}' at line {line}")]
    InvalidHexDigit { literal: String, line: usize },

    #[error("invalid integer literal '{literal}' at line {line}")]
    InvalidInteger { literal: String, line: usize },

    #[error("unterminated string starting at line {line}")]
    UnterminatedString { line: usize },

    #[error("unknown keyword '{word}' at line {line}")]
    UnknownKeyword { word: String, line: usize },
}

pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Named opcodes of the script language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `OP_0` / `OP_FALSE`: push an empty value.
    False,
    /// `OP_1NEGATE`
    Negate1,
    /// `OP_1`..`OP_16` (`OP_TRUE` is `OP_1`).
    Small(u8),
    Verify,
    Dup,
    EqualVerify,
    Add,
    NumEqual,
    Hash160,
    CheckSig,
}

impl Keyword {
    /// Case-insensitive keyword lookup.
    pub fn from_word(word: &str) -> Option<Self> {
        let upper = word.to_ascii_uppercase();
        let keyword = match upper.as_str() {
            "OP_0" | "OP_FALSE" => Keyword::False,
            "OP_1NEGATE" => Keyword::Negate1,
            "OP_TRUE" => Keyword::Small(1),
            "OP_VERIFY" => Keyword::Verify,
            "OP_DUP" => Keyword::Dup,
            "OP_EQUALVERIFY" => Keyword::EqualVerify,
            "OP_ADD" => Keyword::Add,
            "OP_NUMEQUAL" => Keyword::NumEqual,
            "OP_HASH160" => Keyword::Hash160,
            "OP_CHECKSIG" => Keyword::CheckSig,
            other => {
                let n = other.strip_prefix("OP_")?;
                // OP_01 and OP_+1 are not keywords.
                if n.starts_with('0') || !n.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                match n.parse::<u8>().ok()? {
                    n @ 1..=16 => Keyword::Small(n),
                    _ => return None,
                }
            }
        };
        Some(keyword)
    }
}

/// An integer literal as written, range-checked by the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral {
    pub negative: bool,
    pub digits: String,
    pub radix: u32,
    pub line: usize,
}

impl IntLiteral {
    /// The value, or `None` if it does not fit a signed 64-bit integer.
    pub fn value(&self) -> Option<i64> {
        let signed = if self.negative {
            format!("-{}", self.digits)
        } else {
            self.digits.clone()
        };
        i64::from_str_radix(&signed, self.radix).ok()
    }
}

/// A typed token of script source.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptToken {
    Integer(IntLiteral),
    Str(String),
    Op(Keyword),
}

/// Script tokenizer.
pub struct Parser;

impl Parser {
    /// Tokenize the whole source, failing on the first syntax error.
    pub fn parse(source: &str) -> Result<Vec<ScriptToken>> {
        check_ascii(source)?;

        let mut tokens = Vec::new();
        for (token, line) in Lexer::new(source) {
            let token = match token {
                Token::Str(s) => ScriptToken::Str(s),
                Token::UnterminatedStr => return Err(SyntaxError::UnterminatedString { line }),
                Token::Word(word) => classify_word(&word, line)?,
                Token::Comment => continue,
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn check_ascii(source: &str) -> Result<()> {
    let mut line = 1;
    for ch in source.chars() {
        if !ch.is_ascii() {
            return Err(SyntaxError::NonAscii { ch, line });
        }
        if ch == '\n' {
            line += 1;
        }
    }
    Ok(())
}

fn classify_word(word: &str, line: usize) -> Result<ScriptToken> {
    let starts_numeric = word
        .bytes()
        .next()
        .is_some_and(|b| b == b'-' || b.is_ascii_digit());
    if starts_numeric {
        return parse_integer(word, line).map(ScriptToken::Integer);
    }

    Keyword::from_word(word)
        .map(ScriptToken::Op)
        .ok_or_else(|| SyntaxError::UnknownKeyword {
            word: word.to_string(),
            line,
        })
}

fn parse_integer(word: &str, line: usize) -> Result<IntLiteral> {
    let (negative, body) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let invalid = || SyntaxError::InvalidInteger {
        literal: word.to_string(),
        line,
    };

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SyntaxError::InvalidHexDigit {
                literal: word.to_string(),
                line,
            });
        }
        return Ok(IntLiteral {
            negative,
            digits: hex.to_string(),
            radix: 16,
            line,
        });
    }

    let mut bytes = body.bytes();
    match bytes.next() {
        None => return Err(invalid()),
        Some(b'0') => match bytes.next() {
            None => {}
            Some(b) if b.is_ascii_digit() => {
                return Err(SyntaxError::LeadingZero {
                    literal: word.to_string(),
                    line,
                })
            }
            Some(_) => return Err(invalid()),
        },
        Some(b) if b.is_ascii_digit() => {
            if !bytes.all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        Some(_) => return Err(invalid()),
    }

    Ok(IntLiteral {
        negative,
        digits: body.to_string(),
        radix: 10,
        line,
    })
}
