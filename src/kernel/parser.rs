// A small reader for clauses written the way the test suites write them:
//
//   not p(f(x0), a) or q(x0) or f(x1) != a
//
// Variables are x0, x1, ... and every other identifier is a symbol.
// The arity of a symbol is fixed by its first use.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::kernel::atom::Atom;
use crate::kernel::clause::Clause;
use crate::kernel::literal::Literal;
use crate::kernel::symbol_table::SymbolTable;
use crate::kernel::term::Term;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// There was nothing to parse.
    Empty,

    /// A character that cannot start any token, with its byte offset.
    UnexpectedChar(char, usize),

    /// A token that doesn't fit the grammar at this point.
    UnexpectedToken(String),

    /// The input ended inside a parenthesized argument list.
    UnbalancedParens(String),

    /// A symbol was used with a different number of arguments than before.
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A variable in a position where only a symbol makes sense.
    BadVariable(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty input"),
            ParseError::UnexpectedChar(c, pos) => {
                write!(f, "unexpected character '{}' at offset {}", c, pos)
            }
            ParseError::UnexpectedToken(t) => write!(f, "unexpected token '{}'", t),
            ParseError::UnbalancedParens(s) => write!(f, "unbalanced parentheses in '{}'", s),
            ParseError::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "symbol '{}' has arity {} but was used with {} arguments",
                name, expected, found
            ),
            ParseError::BadVariable(v) => write!(f, "variable '{}' used as a symbol", v),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Ident(String),
    LeftParen,
    RightParen,
    Comma,
    Equals,
    NotEquals,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Equals => write!(f, "="),
            Token::NotEquals => write!(f, "!="),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = vec![];
    let mut chars: Peekable<CharIndices> = input.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            ',' => tokens.push(Token::Comma),
            '=' => tokens.push(Token::Equals),
            '!' => match chars.next() {
                Some((_, '=')) => tokens.push(Token::NotEquals),
                _ => return Err(ParseError::UnexpectedChar('!', pos)),
            },
            c if c.is_alphanumeric() || c == '_' => {
                let mut ident = c.to_string();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(ParseError::UnexpectedChar(c, pos)),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    table: &'a mut SymbolTable,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, table: &'a mut SymbolTable) -> Result<Parser<'a>, ParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(Parser {
            input,
            tokens,
            pos: 0,
            table,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == keyword)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(ParseError::UnexpectedToken(t.to_string())),
        }
    }

    fn clause(&mut self) -> Result<Clause, ParseError> {
        let mut literals = vec![self.literal()?];
        while self.peek_keyword("or") {
            self.advance();
            literals.push(self.literal()?);
        }
        Ok(Clause::new(literals))
    }

    fn literal(&mut self) -> Result<Literal, ParseError> {
        let mut positive = true;
        if self.peek_keyword("not") {
            self.advance();
            positive = false;
        }
        let left = self.term()?;
        let equality = match self.peek() {
            Some(Token::Equals) => Some(true),
            Some(Token::NotEquals) => Some(false),
            _ => None,
        };
        if let Some(sign) = equality {
            self.advance();
            let right = self.term()?;
            return Ok(Literal::new(
                positive == sign,
                Term::apply(crate::kernel::symbol::Symbol::EQUALITY, vec![left, right]),
            ));
        }
        if let Some(i) = left.atomic_variable() {
            return Err(ParseError::BadVariable(format!("x{}", i)));
        }
        Ok(Literal::new(positive, left))
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        let name = match self.advance() {
            Some(Token::Ident(name)) => name,
            Some(t) => return Err(ParseError::UnexpectedToken(t.to_string())),
            None => return Err(ParseError::UnbalancedParens(self.input.to_string())),
        };
        if name == "or" || name == "not" {
            return Err(ParseError::UnexpectedToken(name));
        }
        let args = if self.peek() == Some(&Token::LeftParen) {
            self.advance();
            self.arguments()?
        } else {
            vec![]
        };
        if let Some(var) = Atom::parse_variable(&name) {
            if !args.is_empty() {
                return Err(ParseError::BadVariable(name));
            }
            return Ok(Term::new(var, vec![]));
        }
        let symbol = self.table.add(&name, args.len())?;
        Ok(Term::apply(symbol, args))
    }

    /// Parses "t1, t2, ... )" after the opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut args = vec![self.term()?];
        loop {
            match self.advance() {
                Some(Token::Comma) => args.push(self.term()?),
                Some(Token::RightParen) => return Ok(args),
                Some(t) => return Err(ParseError::UnexpectedToken(t.to_string())),
                None => return Err(ParseError::UnbalancedParens(self.input.to_string())),
            }
        }
    }
}

pub fn parse_clause(input: &str, table: &mut SymbolTable) -> Result<Clause, ParseError> {
    if input.trim() == "<empty>" {
        return Ok(Clause::empty());
    }
    let mut parser = Parser::new(input, table)?;
    let clause = parser.clause()?;
    parser.expect_end()?;
    Ok(clause)
}

pub fn parse_literal(input: &str, table: &mut SymbolTable) -> Result<Literal, ParseError> {
    let mut parser = Parser::new(input, table)?;
    let literal = parser.literal()?;
    parser.expect_end()?;
    Ok(literal)
}
