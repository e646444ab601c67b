//! Lexer implementation

use super::token::*;
use rsql_core::ComparisonOp;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for RSQL filter strings.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens ending in `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                ';' => {
                    self.advance();
                    TokenKind::Semicolon
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '=' => self.scan_equals_operator(),
                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Op(ComparisonOp::Ne)
                    } else {
                        TokenKind::Error("Expected '=' after '!'".to_string())
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Op(ComparisonOp::Le)
                    } else {
                        TokenKind::Op(ComparisonOp::Lt)
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Op(ComparisonOp::Ge)
                    } else {
                        TokenKind::Op(ComparisonOp::Gt)
                    }
                }
                '"' | '\'' => self.scan_string(c),
                c if is_word_char(c) => self.scan_word(),
                _ => {
                    self.advance();
                    TokenKind::Error(format!("Unexpected character '{}'", c))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// `==` or a named operator such as `=in=`.
    fn scan_equals_operator(&mut self) -> TokenKind {
        self.advance(); // consume '='
        match self.peek_char() {
            Some('=') => {
                self.advance();
                TokenKind::Op(ComparisonOp::Eq)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(c) = self.peek_char() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    name.push(c);
                    self.advance();
                }
                if self.peek_char() != Some('=') {
                    return TokenKind::Error(format!("Unterminated operator '={}'", name));
                }
                self.advance();
                let symbol = format!("={}=", name);
                match ComparisonOp::from_symbol(&symbol) {
                    Some(op) => TokenKind::Op(op),
                    None => TokenKind::Error(format!("Unknown operator '{}'", symbol)),
                }
            }
            _ => TokenKind::Error("Unexpected '='".to_string()),
        }
    }

    /// Scan a quoted string. A backslash escapes the next character.
    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return TokenKind::Error("Unterminated string".to_string()),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some(escaped) => value.push(escaped),
                        None => return TokenKind::Error("Unterminated string".to_string()),
                    }
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::Quoted(value)
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_word_char(c) {
                break;
            }
            self.advance();
        }
        TokenKind::Word(self.source[start..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(c)
        } else {
            None
        }
    }
}

/// Convenience: tokenize a source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    fn word(s: &str) -> TokenKind {
        TokenKind::Word(s.to_string())
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            kinds("name==target*"),
            vec![
                word("name"),
                TokenKind::Op(ComparisonOp::Eq),
                word("target*"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_named_and_symbolic_operators() {
        let ops: Vec<_> = kinds("a=in=b a=OUT=b a<b a<=b a>b a>=b a=lt=b a!=b")
            .into_iter()
            .filter_map(|k| match k {
                TokenKind::Op(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                ComparisonOp::In,
                ComparisonOp::Out,
                ComparisonOp::Lt,
                ComparisonOp::Le,
                ComparisonOp::Gt,
                ComparisonOp::Ge,
                ComparisonOp::Lt,
                ComparisonOp::Ne,
            ]
        );
    }

    #[test]
    fn test_dotted_selector_and_placeholder_are_single_words() {
        assert_eq!(
            kinds("attribute.test.dot==value.dot"),
            vec![
                word("attribute.test.dot"),
                TokenKind::Op(ComparisonOp::Eq),
                word("value.dot"),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("${NOW_TS}")[0], word("${NOW_TS}"));
    }

    #[test]
    fn test_quoted_strings_and_escapes() {
        assert_eq!(kinds("'a,b'")[0], TokenKind::Quoted("a,b".to_string()));
        assert_eq!(kinds("\"x;y\"")[0], TokenKind::Quoted("x;y".to_string()));
        assert_eq!(kinds(r"'it\'s'")[0], TokenKind::Quoted("it's".to_string()));
        assert_eq!(kinds("''")[0], TokenKind::Quoted(String::new()));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(&kinds("name=='abc")[2], TokenKind::Error(m) if m.contains("Unterminated")));
        assert!(matches!(&kinds("name=='abc\\")[2], TokenKind::Error(m) if m.contains("Unterminated")));
    }

    #[test]
    fn test_unknown_operator() {
        assert!(matches!(&kinds("name=like=x")[1], TokenKind::Error(m) if m.contains("=like=")));
        assert!(matches!(&kinds("name=x")[1], TokenKind::Error(_)));
        assert!(matches!(&kinds("name!x")[1], TokenKind::Error(_)));
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = tokenize("a==b;\n  c==d");
        let c = &tokens[4];
        assert_eq!(c.kind, word("c"));
        assert_eq!(c.span.line, 2);
        assert_eq!(c.span.column, 3);
        assert_eq!(&"a==b;\n  c==d"[c.span.start..c.span.end], "c");
    }

    #[test]
    fn test_empty_input_is_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
