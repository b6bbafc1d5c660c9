//! A small recursive-descent parser for the expression language. Grounded on `til::function::Function`'s hand-rolled tokenizer +
//! precedence-climbing shape, generalized to the operator set CODA's
//! `size_expr`/`available_expr` strings need.
//!
//! Grammar (precedence lowest to highest):
//! ```text
//! expr    := or
//! or      := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := add ( ("=="|"!="|"<="|">="|"<"|">") add )?
//! add     := mul ( ("+"|"-") mul )*
//! mul     := unary ( ("*"|"/"|"%") unary )*
//! unary   := ("!"|"-") unary | postfix
//! postfix := primary ( "." ident | "[" expr "]" )*
//! primary := int | float | string | "true" | "false"
//!          | "this" | ident "(" (expr ("," expr)*)? ")" | ident
//!          | "(" expr ")"
//! ```
//! A bare `ident` not followed by `(` denotes the field of that name on
//! `this` (so an `available_expr` can just say `quality_flag == 0`).

use crate::error::{CodaError, Result};
use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Integer(i64),
    Float(f64),
    String(Vec<u8>),
    Ident(String),
    Symbol(&'static str),
    End,
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(b) = self.peek_byte() else {
                tokens.push(Token::End);
                break;
            };
            match b {
                b'0'..=b'9' => tokens.push(self.lex_number()?),
                b'"' => tokens.push(self.lex_string()?),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => tokens.push(self.lex_ident()),
                _ => tokens.push(self.lex_symbol()?),
            }
        }
        Ok(tokens)
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek_byte() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| parse_error(format!("malformed number literal '{text}'")))
        } else {
            text.parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| parse_error(format!("malformed number literal '{text}'")))
        }
    }

    fn lex_string(&mut self) -> Result<Token> {
        self.pos += 1; // opening quote
        let mut out = Vec::new();
        loop {
            match self.peek_byte() {
                None => return Err(parse_error("unterminated string literal")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek_byte() {
                        Some(b'n') => out.push(b'\n'),
                        Some(b't') => out.push(b'\t'),
                        Some(b'"') => out.push(b'"'),
                        Some(b'\\') => out.push(b'\\'),
                        Some(other) => out.push(other),
                        None => return Err(parse_error("unterminated string literal")),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(Token::String(out))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        Token::Ident(std::str::from_utf8(&self.bytes[start..self.pos]).unwrap().to_string())
    }

    fn lex_symbol(&mut self) -> Result<Token> {
        let two = self.bytes.get(self.pos..self.pos + 2);
        for sym in ["==", "!=", "<=", ">=", "&&", "||"] {
            if two == Some(sym.as_bytes()) {
                self.pos += 2;
                return Ok(Token::Symbol(sym));
            }
        }
        let one = self.bytes[self.pos];
        let sym: &'static str = match one {
            b'+' => "+",
            b'-' => "-",
            b'*' => "*",
            b'/' => "/",
            b'%' => "%",
            b'<' => "<",
            b'>' => ">",
            b'!' => "!",
            b'(' => "(",
            b')' => ")",
            b'[' => "[",
            b']' => "]",
            b'.' => ".",
            b',' => ",",
            _ => {
                return Err(parse_error(format!(
                    "unexpected character '{}'",
                    one as char
                )))
            }
        };
        self.pos += 1;
        Ok(Token::Symbol(sym))
    }
}

fn parse_error(message: impl Into<String>) -> CodaError {
    CodaError::expression("<expression parser>", message)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<()> {
        match self.advance() {
            Token::Symbol(s) if s == sym => Ok(()),
            other => Err(parse_error(format!("expected '{sym}', found {other:?}"))),
        }
    }

    fn at_symbol(&self, sym: &str) -> bool {
        matches!(self.peek(), Token::Symbol(s) if *s == sym)
    }

    fn parse_expr(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_and()?;
        while self.at_symbol("||") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_cmp()?;
        while self.at_symbol("&&") {
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expression> {
        let lhs = self.parse_add()?;
        type Wrap = fn(Box<Expression>, Box<Expression>) -> Expression;
        let ops: [(&str, Wrap); 6] = [
            ("==", Expression::Eq),
            ("!=", Expression::Ne),
            ("<=", Expression::Le),
            (">=", Expression::Ge),
            ("<", Expression::Lt),
            (">", Expression::Gt),
        ];
        for (sym, wrap) in ops {
            if self.at_symbol(sym) {
                self.advance();
                let rhs = self.parse_add()?;
                return Ok(wrap(Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_mul()?;
        loop {
            if self.at_symbol("+") {
                self.advance();
                lhs = Expression::Add(Box::new(lhs), Box::new(self.parse_mul()?));
            } else if self.at_symbol("-") {
                self.advance();
                lhs = Expression::Sub(Box::new(lhs), Box::new(self.parse_mul()?));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.at_symbol("*") {
                self.advance();
                lhs = Expression::Mul(Box::new(lhs), Box::new(self.parse_unary()?));
            } else if self.at_symbol("/") {
                self.advance();
                lhs = Expression::Div(Box::new(lhs), Box::new(self.parse_unary()?));
            } else if self.at_symbol("%") {
                self.advance();
                lhs = Expression::Mod(Box::new(lhs), Box::new(self.parse_unary()?));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.at_symbol("!") {
            self.advance();
            return Ok(Expression::Not(Box::new(self.parse_unary()?)));
        }
        if self.at_symbol("-") {
            self.advance();
            return Ok(Expression::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_symbol(".") {
                self.advance();
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    other => return Err(parse_error(format!("expected a field name, found {other:?}"))),
                };
                expr = Expression::FieldByName(Box::new(expr), name);
            } else if self.at_symbol("[") {
                self.advance();
                let index = self.parse_expr()?;
                self.expect_symbol("]")?;
                expr = Expression::ArrayIndex(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expression>> {
        self.expect_symbol("(")?;
        let mut args = Vec::new();
        if !self.at_symbol(")") {
            args.push(self.parse_expr()?);
            while self.at_symbol(",") {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect_symbol(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        match self.advance() {
            Token::Integer(v) => Ok(Expression::IntegerConstant(v)),
            Token::Float(v) => Ok(Expression::FloatConstant(v)),
            Token::String(v) => Ok(Expression::StringConstant(v)),
            Token::Symbol("(") => {
                let inner = self.parse_expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Token::Ident(name) => self.parse_ident(name),
            other => Err(parse_error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<Expression> {
        match name.as_str() {
            "true" => return Ok(Expression::BooleanConstant(true)),
            "false" => return Ok(Expression::BooleanConstant(false)),
            "this" => return Ok(Expression::This),
            _ => {}
        }
        if !self.at_symbol("(") {
            // a bare identifier denotes a field of `this`
            return Ok(Expression::FieldByName(Box::new(Expression::This), name));
        }
        let mut args = self.parse_call_args()?;
        let arity_error = |n: usize| parse_error(format!("'{name}' takes {n} argument(s)"));
        match name.as_str() {
            "root" => one_arg(args, &arity_error).map(Expression::Root),
            "parent" => one_arg(args, &arity_error).map(Expression::Parent),
            "not" => one_arg(args, &arity_error).map(Expression::Not),
            "exists" => one_arg(args, &arity_error).map(Expression::Exists),
            "num_elements" | "numelements" => one_arg(args, &arity_error).map(Expression::NumElements),
            "index" => one_arg(args, &arity_error).map(Expression::Index),
            "length" => one_arg(args, &arity_error).map(Expression::Length),
            "to_int" | "int" => one_arg(args, &arity_error).map(Expression::ToInteger),
            "to_float" | "float" => one_arg(args, &arity_error).map(Expression::ToFloat),
            "to_string" | "str" => one_arg(args, &arity_error).map(Expression::ToString),
            "unboundindex" => {
                if args.len() != 2 {
                    return Err(arity_error(2));
                }
                let index = args.pop().unwrap();
                let node = args.pop().unwrap();
                Ok(Expression::UnboundIndex(Box::new(node), Box::new(index)))
            }
            _ => Err(parse_error(format!("unknown function '{name}'"))),
        }
    }
}

fn one_arg(mut args: Vec<Expression>, arity_error: impl Fn(usize) -> CodaError) -> Result<Box<Expression>> {
    if args.len() != 1 {
        return Err(arity_error(1));
    }
    Ok(Box::new(args.pop().unwrap()))
}

pub fn parse(source: &str) -> Result<Expression> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::End => Ok(expr),
        other => Err(parse_error(format!("unexpected trailing token {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic_with_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(crate::expr::evaluate_integer(&expr, None).unwrap(), 7);
    }

    #[test]
    fn parses_bare_field_reference() {
        let expr = parse("quality_flag == 0").unwrap();
        match expr {
            Expression::Eq(lhs, _) => match *lhs {
                Expression::FieldByName(inner, name) => {
                    assert!(matches!(*inner, Expression::This));
                    assert_eq!(name, "quality_flag");
                }
                other => panic!("unexpected lhs {other:?}"),
            },
            other => panic!("unexpected expr {other:?}"),
        }
    }

    #[test]
    fn parses_dotted_path_and_index() {
        let expr = parse("this.records[2].value").unwrap();
        assert!(matches!(expr, Expression::FieldByName(_, ref n) if n == "value"));
    }

    #[test]
    fn parses_function_calls() {
        let expr = parse("exists(this.optional_field)").unwrap();
        assert!(matches!(expr, Expression::Exists(_)));
    }

    #[test]
    fn parses_unboundindex_with_two_args() {
        let expr = parse("unboundindex(this.data, i)").unwrap();
        assert!(matches!(expr, Expression::UnboundIndex(_, _)));
    }

    #[test]
    fn rejects_unknown_function() {
        assert!(parse("bogus(1)").is_err());
    }

    #[test]
    fn string_literal_with_escapes() {
        let expr = parse(r#""a\"b""#).unwrap();
        match expr {
            Expression::StringConstant(bytes) => assert_eq!(bytes, b"a\"b"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
