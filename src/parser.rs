//! Text syntax for formulas.
//!
//! Operators from loosest to tightest binding:
//!
//! | Syntax               | Meaning                        |
//! |----------------------|--------------------------------|
//! | `<=>`, `<->`, `==`   | equivalence (left-assoc)       |
//! | `=>`, `->`           | implication (right-assoc)      |
//! | `\|`, `\|\|`, `+`    | disjunction                    |
//! | `^`                  | exclusive or                   |
//! | `&`, `&&`, `*`       | conjunction                    |
//! | `!`, `~`             | negation (prefix)              |
//!
//! Atoms are `true`/`1`, `false`/`0`, parenthesized formulas, and identifiers
//! (`[A-Za-z_][A-Za-z0-9_.\[\]]*`). Implication is desugared to `!a | b` and
//! exclusive or to `!(a <=> b)`.
//!
//! ```
//! use bdd_lutmap::parser::parse_formula;
//!
//! let f = parse_formula("a & b | c").unwrap();
//! assert_eq!(f.to_string(), "((a & b) | c)");
//! ```

use log::trace;

use crate::error::{Error, Result};
use crate::formula::Formula;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    True,
    False,
    Not,
    And,
    Or,
    Xor,
    Implies,
    Equiv,
    LParen,
    RParen,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Not => "'!'".to_string(),
            Token::And => "'&'".to_string(),
            Token::Or => "'|'".to_string(),
            Token::Xor => "'^'".to_string(),
            Token::Implies => "'=>'".to_string(),
            Token::Equiv => "'<=>'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Token with its 1-based source position.
#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut column = 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            i += 1;
            line += 1;
            column = 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            column += 1;
            continue;
        }

        let start_column = column;
        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        let (token, len) = if rest.starts_with("<=>") || rest.starts_with("<->") {
            (Token::Equiv, 3)
        } else if rest.starts_with("==") {
            (Token::Equiv, 2)
        } else if rest.starts_with("=>") || rest.starts_with("->") {
            (Token::Implies, 2)
        } else if rest.starts_with("&&") {
            (Token::And, 2)
        } else if rest.starts_with("||") {
            (Token::Or, 2)
        } else {
            match c {
                '&' | '*' => (Token::And, 1),
                '|' | '+' => (Token::Or, 1),
                '^' => (Token::Xor, 1),
                '!' | '~' => (Token::Not, 1),
                '(' => (Token::LParen, 1),
                ')' => (Token::RParen, 1),
                '0' => (Token::False, 1),
                '1' => (Token::True, 1),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut end = i;
                    while end < chars.len()
                        && (chars[end].is_ascii_alphanumeric() || matches!(chars[end], '_' | '.' | '[' | ']'))
                    {
                        end += 1;
                    }
                    let word: String = chars[i..end].iter().collect();
                    let token = match word.as_str() {
                        "true" => Token::True,
                        "false" => Token::False,
                        _ => Token::Ident(word),
                    };
                    (token, end - i)
                }
                c => return Err(Error::parse(line, column, format!("unexpected character '{}'", c))),
            }
        };
        tokens.push(Spanned {
            token,
            line,
            column: start_column,
        });
        i += len;
        column += len;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
        column,
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let t = self.peek();
        Error::parse(
            t.line,
            t.column,
            format!("expected {}, found {}", expected, t.token.describe()),
        )
    }

    fn equiv(&mut self) -> Result<Formula> {
        let mut left = self.implies()?;
        while self.eat(&Token::Equiv) {
            let right = self.implies()?;
            left = Formula::equiv(left, right);
        }
        Ok(left)
    }

    fn implies(&mut self) -> Result<Formula> {
        let left = self.or()?;
        if self.eat(&Token::Implies) {
            let right = self.implies()?;
            return Ok(Formula::or(Formula::not(left), right));
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Formula> {
        let mut left = self.xor()?;
        while self.eat(&Token::Or) {
            let right = self.xor()?;
            left = Formula::or(left, right);
        }
        Ok(left)
    }

    fn xor(&mut self) -> Result<Formula> {
        let mut left = self.and()?;
        while self.eat(&Token::Xor) {
            let right = self.and()?;
            left = Formula::not(Formula::equiv(left, right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Formula> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = Formula::and(left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Formula> {
        if self.eat(&Token::Not) {
            return Ok(Formula::not(self.unary()?));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Formula> {
        match self.peek().token.clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(Formula::var(name))
            }
            Token::True => {
                self.advance();
                Ok(Formula::tt())
            }
            Token::False => {
                self.advance();
                Ok(Formula::ff())
            }
            Token::LParen => {
                self.advance();
                let inner = self.equiv()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.unexpected("')'"));
                }
                Ok(inner)
            }
            _ => Err(self.unexpected("a variable, a constant or '('")),
        }
    }
}

/// Parses a formula from text.
pub fn parse_formula(input: &str) -> Result<Formula> {
    let tokens = tokenize(input)?;
    trace!("parse_formula: {} tokens", tokens.len());
    let mut parser = Parser { tokens, pos: 0 };
    let formula = parser.equiv()?;
    if parser.peek().token != Token::Eof {
        return Err(parser.unexpected("end of input"));
    }
    Ok(formula)
}
