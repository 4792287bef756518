//! Tokenizer for path queries.

use super::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    Star,
    Pipe,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ColonColon,
    Dollar,
    Name(String),
    Str(String),
    Num(f64),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub tok: Tok,
    pub offset: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Split a query into tokens. The last token is always [`Tok::Eof`].
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while i < chars.len() {
        let (offset, c) = chars[i];
        let simple = |tok: Tok| Token { tok, offset };

        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '/' => {
                if peek(i + 1) == Some('/') {
                    tokens.push(simple(Tok::DoubleSlash));
                    i += 2;
                } else {
                    tokens.push(simple(Tok::Slash));
                    i += 1;
                }
            }
            '.' => {
                if peek(i + 1) == Some('.') {
                    tokens.push(simple(Tok::DotDot));
                    i += 2;
                } else if peek(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    let (num, next) = lex_number(&chars, i)?;
                    tokens.push(simple(Tok::Num(num)));
                    i = next;
                } else {
                    tokens.push(simple(Tok::Dot));
                    i += 1;
                }
            }
            '[' => {
                tokens.push(simple(Tok::LBracket));
                i += 1;
            }
            ']' => {
                tokens.push(simple(Tok::RBracket));
                i += 1;
            }
            '(' => {
                tokens.push(simple(Tok::LParen));
                i += 1;
            }
            ')' => {
                tokens.push(simple(Tok::RParen));
                i += 1;
            }
            '@' => {
                tokens.push(simple(Tok::At));
                i += 1;
            }
            ',' => {
                tokens.push(simple(Tok::Comma));
                i += 1;
            }
            '*' => {
                tokens.push(simple(Tok::Star));
                i += 1;
            }
            '|' => {
                tokens.push(simple(Tok::Pipe));
                i += 1;
            }
            '+' => {
                tokens.push(simple(Tok::Plus));
                i += 1;
            }
            '-' => {
                tokens.push(simple(Tok::Minus));
                i += 1;
            }
            '$' => {
                tokens.push(simple(Tok::Dollar));
                i += 1;
            }
            '=' => {
                tokens.push(simple(Tok::Eq));
                i += 1;
            }
            '!' => {
                if peek(i + 1) == Some('=') {
                    tokens.push(simple(Tok::Ne));
                    i += 2;
                } else {
                    return Err(QueryError::Syntax {
                        offset,
                        message: "expected '=' after '!'".to_string(),
                    });
                }
            }
            '<' => {
                if peek(i + 1) == Some('=') {
                    tokens.push(simple(Tok::Le));
                    i += 2;
                } else {
                    tokens.push(simple(Tok::Lt));
                    i += 1;
                }
            }
            '>' => {
                if peek(i + 1) == Some('=') {
                    tokens.push(simple(Tok::Ge));
                    i += 2;
                } else {
                    tokens.push(simple(Tok::Gt));
                    i += 1;
                }
            }
            ':' => {
                if peek(i + 1) == Some(':') {
                    tokens.push(simple(Tok::ColonColon));
                    i += 2;
                } else {
                    return Err(QueryError::Syntax {
                        offset,
                        message: "unexpected ':'".to_string(),
                    });
                }
            }
            '\'' | '"' => {
                let (s, next) = lex_string(&chars, i)?;
                tokens.push(simple(Tok::Str(s)));
                i = next;
            }
            c if c.is_ascii_digit() => {
                let (num, next) = lex_number(&chars, i)?;
                tokens.push(simple(Tok::Num(num)));
                i = next;
            }
            c if is_name_start(c) => {
                let mut name = String::new();
                while let Some(c) = peek(i) {
                    if is_name_char(c) {
                        name.push(c);
                        i += 1;
                    } else if c == ':'
                        && peek(i + 1).is_some_and(is_name_start)
                        && !name.contains(':')
                    {
                        // Namespace prefix, e.g. `java:hasAnnotation`.
                        name.push(':');
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(simple(Tok::Name(name)));
            }
            other => {
                return Err(QueryError::Syntax {
                    offset,
                    message: format!("unexpected character '{}'", other),
                });
            }
        }
    }

    tokens.push(Token {
        tok: Tok::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), QueryError> {
    let (offset, quote) = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            // A doubled quote stands for one literal quote.
            if chars.get(i + 1).map(|&(_, c)| c) == Some(quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            return Ok((out, i + 1));
        }
        out.push(c);
        i += 1;
    }
    Err(QueryError::Syntax {
        offset,
        message: "unterminated string literal".to_string(),
    })
}

fn lex_number(chars: &[(usize, char)], start: usize) -> Result<(f64, usize), QueryError> {
    let mut text = String::new();
    let mut i = start;
    let mut seen_dot = false;
    while let Some(&(_, c)) = chars.get(i) {
        if c.is_ascii_digit() {
            text.push(c);
        } else if c == '.' && !seen_dot && chars.get(i + 1).is_some_and(|&(_, c)| c.is_ascii_digit()) {
            seen_dot = true;
            text.push(c);
        } else {
            break;
        }
        i += 1;
    }
    text.parse::<f64>()
        .map(|n| (n, i))
        .map_err(|e| QueryError::Syntax {
            offset: chars[start].0,
            message: format!("bad number literal '{}': {}", text, e),
        })
}
