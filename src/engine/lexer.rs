//! Tokenizer for the engine's JavaScript subset.
//!
//! Tokens carry line/column (1-based) for diagnostics and byte spans so the
//! parser can slice function source text back out of the input.

/// A compile-time failure, positioned in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            message: message.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Const,
    Let,
    Var,
    Function,
    Return,
    This,
    True,
    False,
    Null,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Colon,
    Assign,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Semi => ";",
            Punct::Dot => ".",
            Punct::Colon => ":",
            Punct::Assign => "=",
            Punct::Arrow => "=>",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Bang => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Keyword(Keyword),
    Punct(Punct),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

fn keyword_of(ident: &str) -> Option<Keyword> {
    Some(match ident {
        "const" => Keyword::Const,
        "let" => Keyword::Let,
        "var" => Keyword::Var,
        "function" => Keyword::Function,
        "return" => Keyword::Return,
        "this" => Keyword::This,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "null" => Keyword::Null,
        "undefined" => Keyword::Undefined,
        _ => return None,
    })
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        next
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.src.len())
    }

    fn error(&self, line: u32, col: u32) -> SyntaxError {
        SyntaxError::new("SyntaxError: Invalid or unexpected token", line, col)
    }
}

/// Tokenize the whole source up front. The parser works over the resulting
/// buffer, which keeps arrow-function lookahead trivial.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lx = Lexer::new(src);
    let mut tokens = Vec::new();

    loop {
        // Skip whitespace and comments.
        loop {
            match lx.peek() {
                Some(c) if c.is_whitespace() => {
                    lx.bump();
                }
                Some('/') => {
                    let mut ahead = lx.chars.clone();
                    ahead.next();
                    match ahead.peek().map(|&(_, c)| c) {
                        Some('/') => {
                            while let Some(c) = lx.peek() {
                                if c == '\n' {
                                    break;
                                }
                                lx.bump();
                            }
                        }
                        Some('*') => {
                            let (line, col) = (lx.line, lx.col);
                            lx.bump();
                            lx.bump();
                            let mut closed = false;
                            while let Some((_, c)) = lx.bump() {
                                if c == '*' && lx.peek() == Some('/') {
                                    lx.bump();
                                    closed = true;
                                    break;
                                }
                            }
                            if !closed {
                                return Err(lx.error(line, col));
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }

        let (line, col) = (lx.line, lx.col);
        let Some((start, c)) = lx.bump() else { break };

        let kind = match c {
            '0'..='9' => {
                while lx.peek().is_some_and(|c| c.is_ascii_digit()) {
                    lx.bump();
                }
                if lx.peek() == Some('.') {
                    lx.bump();
                    while lx.peek().is_some_and(|c| c.is_ascii_digit()) {
                        lx.bump();
                    }
                }
                if matches!(lx.peek(), Some('e' | 'E')) {
                    lx.bump();
                    if matches!(lx.peek(), Some('+' | '-')) {
                        lx.bump();
                    }
                    while lx.peek().is_some_and(|c| c.is_ascii_digit()) {
                        lx.bump();
                    }
                }
                let end = lx.offset();
                let text = &lx.src[start..end];
                let num = text
                    .parse::<f64>()
                    .map_err(|_| lx.error(line, col))?;
                tokens.push(Token {
                    kind: TokenKind::Number(num),
                    line,
                    col,
                    start,
                    end,
                });
                continue;
            }
            '"' | '\'' => {
                let quote = c;
                let mut text = String::new();
                loop {
                    match lx.bump() {
                        Some((_, ch)) if ch == quote => break,
                        Some((_, '\n')) | None => return Err(lx.error(line, col)),
                        Some((_, '\\')) => match lx.bump() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, 't')) => text.push('\t'),
                            Some((_, 'r')) => text.push('\r'),
                            Some((_, '0')) => text.push('\0'),
                            Some((_, esc)) => text.push(esc),
                            None => return Err(lx.error(line, col)),
                        },
                        Some((_, ch)) => text.push(ch),
                    }
                }
                let end = lx.offset();
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    line,
                    col,
                    start,
                    end,
                });
                continue;
            }
            c if is_ident_start(c) => {
                while lx.peek().is_some_and(is_ident_part) {
                    lx.bump();
                }
                let end = lx.offset();
                let text = &lx.src[start..end];
                let kind = match keyword_of(text) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident(text.to_string()),
                };
                tokens.push(Token {
                    kind,
                    line,
                    col,
                    start,
                    end,
                });
                continue;
            }
            '(' => TokenKind::Punct(Punct::LParen),
            ')' => TokenKind::Punct(Punct::RParen),
            '{' => TokenKind::Punct(Punct::LBrace),
            '}' => TokenKind::Punct(Punct::RBrace),
            ',' => TokenKind::Punct(Punct::Comma),
            ';' => TokenKind::Punct(Punct::Semi),
            '.' => TokenKind::Punct(Punct::Dot),
            ':' => TokenKind::Punct(Punct::Colon),
            '=' => {
                if lx.peek() == Some('>') {
                    lx.bump();
                    TokenKind::Punct(Punct::Arrow)
                } else {
                    TokenKind::Punct(Punct::Assign)
                }
            }
            '+' => TokenKind::Punct(Punct::Plus),
            '-' => TokenKind::Punct(Punct::Minus),
            '*' => TokenKind::Punct(Punct::Star),
            '/' => TokenKind::Punct(Punct::Slash),
            '!' => TokenKind::Punct(Punct::Bang),
            _ => return Err(lx.error(line, col)),
        };

        let end = lx.offset();
        tokens.push(Token {
            kind,
            line,
            col,
            start,
            end,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers_and_idents() {
        assert_eq!(
            kinds("x 42 3.5"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Number(42.0),
                TokenKind::Number(3.5),
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("const this true"),
            vec![
                TokenKind::Keyword(Keyword::Const),
                TokenKind::Keyword(Keyword::This),
                TokenKind::Keyword(Keyword::True),
            ]
        );
    }

    #[test]
    fn test_arrow_vs_assign() {
        assert_eq!(
            kinds("= =>"),
            vec![
                TokenKind::Punct(Punct::Assign),
                TokenKind::Punct(Punct::Arrow),
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb" 'c'"#),
            vec![TokenKind::Str("a\nb".into()), TokenKind::Str("c".into())]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("1 // comment\n/* block */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a\n  b").unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 3));
    }

    #[test]
    fn test_invalid_token() {
        let err = tokenize("let x = #").unwrap_err();
        assert_eq!(err.message, "SyntaxError: Invalid or unexpected token");
        assert_eq!((err.line, err.col), (1, 9));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn test_spans_slice_source() {
        let src = "foo 12.5";
        let tokens = tokenize(src).unwrap();
        assert_eq!(&src[tokens[0].start..tokens[0].end], "foo");
        assert_eq!(&src[tokens[1].start..tokens[1].end], "12.5");
    }
}
