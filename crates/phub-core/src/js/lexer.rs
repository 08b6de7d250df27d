//! Tokenizer for the restricted script dialect
//!
//! Whitespace and newlines outside string literals are dropped here, so the
//! parser never has to care how a page was minified or padded.

use crate::error::{PhubError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(Punct),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Semi,
    Colon,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Bang,
    Shl,
    Shr,
    UShr,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Gt,
    Le,
    Ge,
    AndAnd,
    OrOr,
}

// Longest operators first so `>>>` wins over `>>` and `>`.
const OPERATORS: &[(&str, Punct)] = &[
    (">>>", Punct::UShr),
    ("===", Punct::StrictEq),
    ("!==", Punct::StrictNotEq),
    ("<<", Punct::Shl),
    (">>", Punct::Shr),
    ("==", Punct::Eq),
    ("!=", Punct::NotEq),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("&&", Punct::AndAnd),
    ("||", Punct::OrOr),
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("*=", Punct::StarAssign),
    ("/=", Punct::SlashAssign),
    ("%=", Punct::PercentAssign),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    (".", Punct::Dot),
    (",", Punct::Comma),
    (";", Punct::Semi),
    (":", Punct::Colon),
    ("?", Punct::Question),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("&", Punct::Amp),
    ("|", Punct::Pipe),
    ("^", Punct::Caret),
    ("!", Punct::Bang),
    ("=", Punct::Assign),
    ("<", Punct::Lt),
    (">", Punct::Gt),
];

/// Splits `src` into tokens
///
/// # Errors
/// `Parsing` on an unterminated string, a malformed number or a character
/// outside the dialect.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = src;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c == '"' || c == '\'' {
            let (value, len) = read_string(rest, c)?;
            tokens.push(Token::Str(value));
            rest = &rest[len..];
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) {
            let (value, len) = read_number(rest)?;
            tokens.push(Token::Number(value));
            rest = &rest[len..];
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..len].to_string()));
            rest = &rest[len..];
            continue;
        }

        let Some((op, punct)) = OPERATORS.iter().find(|(op, _)| rest.starts_with(op)) else {
            return Err(PhubError::Parsing(format!("unexpected character `{}` in script", c)));
        };
        tokens.push(Token::Punct(*punct));
        rest = &rest[op.len()..];
    }

    Ok(tokens)
}

/// Reads a quoted literal starting at `src[0]`; returns the value and consumed length
fn read_string(src: &str, quote: char) -> Result<(String, usize)> {
    let mut value = String::new();
    let mut chars = src.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((value, i + 1)),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'u' => {
                        let hex: String = chars.by_ref().take(4).map(|(_, h)| h).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                PhubError::Parsing(format!("bad unicode escape `\\u{}`", hex))
                            })?;
                        value.push(code);
                    }
                    other => value.push(other),
                }
            }
            c => value.push(c),
        }
    }

    Err(PhubError::Parsing("unterminated string literal".to_string()))
}

/// Reads a decimal (optionally with an exponent) or `0x` hex literal
fn read_number(src: &str) -> Result<(f64, usize)> {
    if let Some(hex) = src.strip_prefix("0x").or_else(|| src.strip_prefix("0X")) {
        let len = hex
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(hex.len());
        let value = i64::from_str_radix(&hex[..len], 16)
            .map_err(|_| PhubError::Parsing(format!("bad hex literal `0x{}`", &hex[..len])))?;
        return Ok((value as f64, len + 2));
    }

    let mut len = src
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(src.len());
    len += exponent_len(&src[len..]);
    let value = src[..len]
        .parse::<f64>()
        .map_err(|_| PhubError::Parsing(format!("bad number literal `{}`", &src[..len])))?;
    Ok((value, len))
}

/// Length of an `e[+-]digits` suffix, or 0 if `src` does not start with one
fn exponent_len(src: &str) -> usize {
    let Some(rest) = src.strip_prefix(['e', 'E']) else {
        return 0;
    };
    let sign = usize::from(rest.starts_with(['+', '-']));
    let digits = rest[sign..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len() - sign);
    if digits == 0 { 0 } else { 1 + sign + digits }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_assignment() {
        let tokens = tokenize("p += 0x10;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("p".to_string()),
                Token::Punct(Punct::PlusAssign),
                Token::Number(16.0),
                Token::Punct(Punct::Semi),
            ]
        );
    }

    #[test]
    fn test_tokenize_keeps_string_whitespace() {
        let tokens = tokenize(r#"a = "https:// x" + 'it\'s';"#).unwrap();
        assert_eq!(tokens[2], Token::Str("https:// x".to_string()));
        assert_eq!(tokens[4], Token::Str("it's".to_string()));
    }

    #[test]
    fn test_tokenize_longest_operator() {
        let tokens = tokenize("a>>>1>>2>3").unwrap();
        let puncts: Vec<Punct> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Punct(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(puncts, vec![Punct::UShr, Punct::Shr, Punct::Gt]);
    }

    #[test]
    fn test_tokenize_decimal() {
        assert_eq!(tokenize("1.5").unwrap(), vec![Token::Number(1.5)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
    }

    #[test]
    fn test_tokenize_exponent() {
        let tokens = tokenize("a = 1e3 + 2.5E-1 + 4e+2;").unwrap();
        assert_eq!(tokens[2], Token::Number(1000.0));
        assert_eq!(tokens[4], Token::Number(0.25));
        assert_eq!(tokens[6], Token::Number(400.0));
    }

    #[test]
    fn test_tokenize_exponent_needs_digits() {
        // `e` without digits stays an identifier
        let tokens = tokenize("1 + 2e").unwrap();
        assert_eq!(tokens[2], Token::Number(2.0));
        assert_eq!(tokens[3], Token::Ident("e".to_string()));
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        assert!(matches!(tokenize("a = 'oops"), Err(PhubError::Parsing(_))));
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        assert!(matches!(tokenize("a = #1"), Err(PhubError::Parsing(_))));
    }
}
