//! Recursive descent parser for RSQL
//!
//! Grammar:
//! ```text
//! or_expr    := and_expr ((',' | 'or') and_expr)*
//! and_expr   := term ((';' | 'and') term)*
//! term       := '(' or_expr ')' | comparison
//! comparison := WORD OPERATOR arguments
//! arguments  := value | '(' value (',' value)* ')'
//! value      := WORD | QUOTED
//! ```
//! AND binds tighter than OR. The parser knows nothing about fields.

use super::ast::*;
use crate::lexer::{Lexer, Token, TokenKind};
use rsql_core::{ComparisonOp, SyntaxError};

// ============================================================================
// PARSER IMPLEMENTATION
// ============================================================================

/// Parser for RSQL filter strings.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the tokens of `source`.
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    /// Parse the whole token stream into one expression.
    pub fn parse(&mut self) -> Result<FilterExpr, SyntaxError> {
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            let message = match &token.kind {
                TokenKind::Error(msg) => msg.clone(),
                _ => String::new(),
            };
            return Err(SyntaxError::new(
                message,
                self.fragment(token),
                token.span.line,
                token.span.column,
            ));
        }

        if self.is_at_end() {
            return Err(self.error("Empty filter"));
        }

        let expr = self.parse_or_expr()?;

        if !self.is_at_end() {
            let message = if self.check(&TokenKind::RParen) {
                "Unbalanced ')'".to_string()
            } else {
                format!("Unexpected {}, expected ';' or ','", self.current().kind)
            };
            return Err(self.error(&message));
        }

        Ok(expr)
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    pub(crate) fn parse_or_expr(&mut self) -> Result<FilterExpr, SyntaxError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&TokenKind::Comma) || self.current().is_keyword("or") {
            self.advance();
            let right = self.parse_and_expr()?;
            left = FilterExpr::or(left, right);
        }

        Ok(left)
    }

    pub(crate) fn parse_and_expr(&mut self) -> Result<FilterExpr, SyntaxError> {
        let mut left = self.parse_term()?;

        while self.check(&TokenKind::Semicolon) || self.current().is_keyword("and") {
            self.advance();
            let right = self.parse_term()?;
            left = FilterExpr::and(left, right);
        }

        Ok(left)
    }

    pub(crate) fn parse_term(&mut self) -> Result<FilterExpr, SyntaxError> {
        if self.check(&TokenKind::LParen) {
            let open = self.pos;
            self.advance();
            let expr = self.parse_or_expr()?;
            if !self.check(&TokenKind::RParen) {
                let message = if self.is_at_end() {
                    "Unbalanced '(': missing ')'"
                } else {
                    "Expected ')'"
                };
                return Err(self.error_at(open, message));
            }
            self.advance();
            return Ok(FilterExpr::group(expr));
        }

        self.parse_comparison()
    }

    pub(crate) fn parse_comparison(&mut self) -> Result<FilterExpr, SyntaxError> {
        let selector = match &self.current().kind {
            TokenKind::Word(w) => w.clone(),
            _ => return Err(self.error("Expected field name")),
        };
        self.advance();

        let op = match self.current().kind {
            TokenKind::Op(op) => op,
            _ => {
                return Err(self.error(&format!(
                    "Expected comparison operator after '{}'",
                    selector
                )))
            }
        };
        self.advance();

        let arguments = self.parse_arguments(op)?;

        Ok(FilterExpr::Comparison(Comparison {
            selector,
            op,
            arguments,
        }))
    }

    fn parse_arguments(&mut self, op: ComparisonOp) -> Result<Vec<Argument>, SyntaxError> {
        if !self.check(&TokenKind::LParen) {
            return Ok(vec![self.expect_value(op)?]);
        }

        let open = self.pos;
        if !op.is_multi_value() {
            return Err(self.error(&format!("Operator '{}' takes a single value", op)));
        }
        self.advance();

        if self.check(&TokenKind::RParen) {
            return Err(self.error_at(open, "Empty argument list"));
        }

        let mut arguments = vec![self.expect_value(op)?];
        loop {
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                    arguments.push(self.expect_value(op)?);
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => {
                    return Err(self.error_at(open, "Unbalanced '(': missing ')' after argument list"))
                }
                _ => return Err(self.error("Expected ',' or ')' in argument list")),
            }
        }

        Ok(arguments)
    }

    fn expect_value(&mut self, op: ComparisonOp) -> Result<Argument, SyntaxError> {
        let argument = match &self.current().kind {
            TokenKind::Word(w) => Argument::bare(w.clone()),
            TokenKind::Quoted(s) => Argument::quoted(s.clone()),
            _ => return Err(self.error(&format!("Expected value after '{}'", op))),
        };
        self.advance();
        Ok(argument)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn fragment(&self, token: &Token) -> String {
        if token.kind == TokenKind::Eof {
            return "end of input".to_string();
        }
        self.source
            .get(token.span.start..token.span.end)
            .unwrap_or_default()
            .to_string()
    }

    pub(crate) fn error(&self, msg: &str) -> SyntaxError {
        self.error_at(self.pos, msg)
    }

    fn error_at(&self, pos: usize, msg: &str) -> SyntaxError {
        let token = &self.tokens[pos];
        SyntaxError::new(
            msg,
            self.fragment(token),
            token.span.line,
            token.span.column,
        )
    }
}

/// Parse an RSQL filter string.
pub fn parse(source: &str) -> Result<FilterExpr, SyntaxError> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let mut parser = Parser::new(source, tokens);
    parser.parse()
}

/// Parse and print in canonical form (for round-trip testing).
pub fn round_trip(source: &str) -> Result<String, SyntaxError> {
    let ast = parse(source)?;
    Ok(ast.to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(selector: &str, op: ComparisonOp, values: &[&str]) -> FilterExpr {
        FilterExpr::comparison(
            selector,
            op,
            values.iter().map(|v| Argument::bare(*v)).collect(),
        )
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match parse(source) {
            Ok(ast) => panic!("expected syntax error for {:?}, got {:?}", source, ast),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_single_comparison() -> Result<(), SyntaxError> {
        let ast = parse("name==target*")?;
        assert_eq!(ast, cmp("name", ComparisonOp::Eq, &["target*"]));
        Ok(())
    }

    #[test]
    fn test_and_binds_tighter_than_or() -> Result<(), SyntaxError> {
        let ast = parse("A==x;B==y,C==z")?;
        let expected = FilterExpr::or(
            FilterExpr::and(
                cmp("A", ComparisonOp::Eq, &["x"]),
                cmp("B", ComparisonOp::Eq, &["y"]),
            ),
            cmp("C", ComparisonOp::Eq, &["z"]),
        );
        assert_eq!(ast, expected);

        let ast = parse("A==x,B==y;C==z")?;
        let expected = FilterExpr::or(
            cmp("A", ComparisonOp::Eq, &["x"]),
            FilterExpr::and(
                cmp("B", ComparisonOp::Eq, &["y"]),
                cmp("C", ComparisonOp::Eq, &["z"]),
            ),
        );
        assert_eq!(ast, expected);
        Ok(())
    }

    #[test]
    fn test_parentheses_override_precedence() -> Result<(), SyntaxError> {
        let ast = parse("A==x;(B==y,C==z)")?;
        let expected = FilterExpr::and(
            cmp("A", ComparisonOp::Eq, &["x"]),
            FilterExpr::group(FilterExpr::or(
                cmp("B", ComparisonOp::Eq, &["y"]),
                cmp("C", ComparisonOp::Eq, &["z"]),
            )),
        );
        assert_eq!(ast, expected);
        Ok(())
    }

    #[test]
    fn test_keywords_and_whitespace() -> Result<(), SyntaxError> {
        let keywords = parse("  A==x  AND  B==y or C==z ")?;
        let symbols = parse("A==x;B==y,C==z")?;
        assert_eq!(keywords, symbols);
        Ok(())
    }

    #[test]
    fn test_keyword_in_value_position_is_a_value() -> Result<(), SyntaxError> {
        let ast = parse("name==and")?;
        assert_eq!(ast, cmp("name", ComparisonOp::Eq, &["and"]));
        Ok(())
    }

    #[test]
    fn test_in_list_and_quoting() -> Result<(), SyntaxError> {
        let ast = parse("tag=in=(a, 'b,c', null, \"d e\")")?;
        let expected = FilterExpr::comparison(
            "tag",
            ComparisonOp::In,
            vec![
                Argument::bare("a"),
                Argument::quoted("b,c"),
                Argument::bare("null"),
                Argument::quoted("d e"),
            ],
        );
        assert_eq!(ast, expected);
        Ok(())
    }

    #[test]
    fn test_in_accepts_single_value() -> Result<(), SyntaxError> {
        let ast = parse("tag=out=a")?;
        assert_eq!(ast, cmp("tag", ComparisonOp::Out, &["a"]));
        Ok(())
    }

    #[test]
    fn test_map_key_with_dots_is_one_selector() -> Result<(), SyntaxError> {
        let ast = parse("ATTRIBUTE.test.dot==value.dot")?;
        assert_eq!(ast, cmp("ATTRIBUTE.test.dot", ComparisonOp::Eq, &["value.dot"]));
        Ok(())
    }

    #[test]
    fn test_placeholder_value() -> Result<(), SyntaxError> {
        let ast = parse("lastcontrollerrequestat=le=${NOW_TS}")?;
        assert_eq!(
            ast,
            cmp("lastcontrollerrequestat", ComparisonOp::Le, &["${NOW_TS}"])
        );
        Ok(())
    }

    #[test]
    fn test_error_unbalanced_parentheses() {
        let err = syntax_error("(name==x");
        assert!(err.message.contains("Unbalanced"), "{}", err);
        assert_eq!(err.column, 1);

        let err = syntax_error("name==x)");
        assert!(err.message.contains("Unbalanced"), "{}", err);
        assert_eq!(err.fragment, ")");
    }

    #[test]
    fn test_error_missing_operator() {
        let err = syntax_error("name");
        assert!(err.message.contains("Expected comparison operator"));
        assert_eq!(err.fragment, "end of input");

        let err = syntax_error("name x");
        assert!(err.message.contains("Expected comparison operator"));
        assert_eq!(err.fragment, "x");
    }

    #[test]
    fn test_error_empty_argument_list() {
        let err = syntax_error("tag=in=()");
        assert!(err.message.contains("Empty argument list"));
    }

    #[test]
    fn test_error_unterminated_quote() {
        let err = syntax_error("name=='target");
        assert!(err.message.contains("Unterminated string"));
        assert_eq!(err.fragment, "'target");
        assert_eq!(err.column, 7);
    }

    #[test]
    fn test_error_list_on_single_value_operator() {
        let err = syntax_error("name==(a,b)");
        assert!(err.message.contains("single value"));
    }

    #[test]
    fn test_error_missing_value_and_empty_input() {
        assert!(syntax_error("name==").message.contains("Expected value"));
        assert!(syntax_error("").message.contains("Empty filter"));
        assert!(syntax_error("name==a;").message.contains("Expected field name"));
        assert!(syntax_error("name==a b==c").message.contains("Unexpected"));
    }

    #[test]
    fn test_error_unknown_operator() {
        let err = syntax_error("name=like=a");
        assert!(err.message.contains("=like="));
    }

    #[test]
    fn test_error_positions_are_one_based() {
        for source in ["", "(", "a", "a==", "a==(", "a==b)", "a=x=b"] {
            let err = syntax_error(source);
            assert!(err.line >= 1, "{:?}", source);
            assert!(err.column >= 1, "{:?}", source);
        }
    }

    #[test]
    fn test_round_trip_canonical_form() -> Result<(), SyntaxError> {
        assert_eq!(round_trip("a<b and (c=IN=(x,'y z'),d!=e)")?, "a=lt=b;(c=in=(x,'y z'),d!=e)");
        Ok(())
    }
}
