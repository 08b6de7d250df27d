//! Recursive-descent parser producing the statement AST
//!
//! The dialect is what the site's obfuscators emit: assignments (plain and
//! compound) to variables or properties, `if`/`else` with or without braces,
//! and expressions built from literals, member access, arithmetic, bitwise,
//! comparison, logical and ternary operators. Function calls are rejected.

use super::lexer::{Punct, Token};
use crate::error::{PhubError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Empty,
    Expr(Expr),
    Assign {
        target: Target,
        op: Option<BinOp>,
        value: Expr,
    },
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
}

/// Assignable place: a variable followed by zero or more property keys
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub root: String,
    pub path: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Gt,
    Le,
    Ge,
}

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Parses a token stream into a [`Program`]
pub fn parse(tokens: &[Token]) -> Result<Program> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_end() {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

/// Deepest nesting of statements and expressions; every operator of a
/// chain like `a + b + c` counts as one more level
const MAX_DEPTH: usize = 128;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

fn syntax(msg: impl Into<String>) -> PhubError {
    PhubError::Parsing(format!("script syntax: {}", msg.into()))
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek() {
            Some(Token::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.peek_punct() == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct) -> Result<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(syntax(format!("expected {:?}, found {:?}", punct, self.peek())))
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id == word)
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax("nesting too deep"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `parse` one nesting level deeper
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn statement(&mut self) -> Result<Stmt> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        if self.eat(Punct::Semi) {
            return Ok(Stmt::Empty);
        }

        if self.eat(Punct::LBrace) {
            let mut body = Vec::new();
            while !self.eat(Punct::RBrace) {
                if self.at_end() {
                    return Err(syntax("unterminated block"));
                }
                body.push(self.statement()?);
            }
            return Ok(Stmt::Block(body));
        }

        if self.is_keyword("if") {
            self.pos += 1;
            self.expect(Punct::LParen)?;
            let cond = self.expression()?;
            self.expect(Punct::RParen)?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.is_keyword("else") {
                self.pos += 1;
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                cond,
                then,
                otherwise,
            });
        }

        let expr = self.expression()?;
        let op = match self.peek_punct() {
            Some(Punct::Assign) => Some(None),
            Some(Punct::PlusAssign) => Some(Some(BinOp::Add)),
            Some(Punct::MinusAssign) => Some(Some(BinOp::Sub)),
            Some(Punct::StarAssign) => Some(Some(BinOp::Mul)),
            Some(Punct::SlashAssign) => Some(Some(BinOp::Div)),
            Some(Punct::PercentAssign) => Some(Some(BinOp::Rem)),
            _ => None,
        };

        let stmt = match op {
            Some(op) => {
                self.pos += 1;
                let target = into_target(expr)?;
                let value = self.expression()?;
                Stmt::Assign { target, op, value }
            }
            None => Stmt::Expr(expr),
        };

        // Semicolons are optional before `}`, `else` and end of input.
        self.eat(Punct::Semi);
        Ok(stmt)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.nested(Self::ternary)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let cond = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(Punct::Colon)?;
        let otherwise = self.expression()?;
        Ok(Expr::Ternary(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut left = self.logical_and()?;
        let mut links = 0;
        while self.eat(Punct::OrOr) {
            self.descend()?;
            links += 1;
            let right = self.logical_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut left = self.binary(0)?;
        let mut links = 0;
        while self.eat(Punct::AndAnd) {
            self.descend()?;
            links += 1;
            let right = self.binary(0)?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    /// Precedence climbing over the binary operator table, lowest level first
    fn binary(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[(Punct, BinOp)]] = &[
            &[(Punct::Pipe, BinOp::BitOr)],
            &[(Punct::Caret, BinOp::BitXor)],
            &[(Punct::Amp, BinOp::BitAnd)],
            &[
                (Punct::Eq, BinOp::Eq),
                (Punct::NotEq, BinOp::NotEq),
                (Punct::StrictEq, BinOp::StrictEq),
                (Punct::StrictNotEq, BinOp::StrictNotEq),
            ],
            &[
                (Punct::Lt, BinOp::Lt),
                (Punct::Gt, BinOp::Gt),
                (Punct::Le, BinOp::Le),
                (Punct::Ge, BinOp::Ge),
            ],
            &[
                (Punct::Shl, BinOp::Shl),
                (Punct::Shr, BinOp::Shr),
                (Punct::UShr, BinOp::UShr),
            ],
            &[(Punct::Plus, BinOp::Add), (Punct::Minus, BinOp::Sub)],
            &[
                (Punct::Star, BinOp::Mul),
                (Punct::Slash, BinOp::Div),
                (Punct::Percent, BinOp::Rem),
            ],
        ];

        if level == LEVELS.len() {
            return self.unary();
        }

        let mut left = self.binary(level + 1)?;
        let mut links = 0;
        loop {
            let Some(punct) = self.peek_punct() else {
                break;
            };
            let Some((_, op)) = LEVELS[level].iter().find(|(p, _)| *p == punct) else {
                break;
            };
            self.pos += 1;
            self.descend()?;
            links += 1;
            let right = self.binary(level + 1)?;
            left = Expr::Binary(*op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek_punct() {
            Some(Punct::Minus) => UnaryOp::Neg,
            Some(Punct::Plus) => UnaryOp::Plus,
            Some(Punct::Bang) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(Punct::Dot) {
                let Some(Token::Ident(name)) = self.next() else {
                    return Err(syntax("expected property name after `.`"));
                };
                let key = Expr::Str(name.clone());
                expr = Expr::Member(Box::new(expr), Box::new(key));
            } else if self.eat(Punct::LBracket) {
                let key = self.expression()?;
                self.expect(Punct::RBracket)?;
                expr = Expr::Member(Box::new(expr), Box::new(key));
            } else if self.peek_punct() == Some(Punct::LParen) {
                return Err(syntax("function calls are not supported"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.next().cloned() else {
            return Err(syntax("unexpected end of script"));
        };

        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Ident(id) => Ok(match id.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" | "undefined" => Expr::Null,
                _ => Expr::Ident(id),
            }),
            Token::Punct(Punct::LParen) => {
                let expr = self.expression()?;
                self.expect(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::LBracket) => {
                let mut items = Vec::new();
                while !self.eat(Punct::RBracket) {
                    items.push(self.expression()?);
                    if !self.eat(Punct::Comma) {
                        self.expect(Punct::RBracket)?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Token::Punct(Punct::LBrace) => {
                let mut fields = Vec::new();
                while !self.eat(Punct::RBrace) {
                    let key = match self.next() {
                        Some(Token::Ident(k)) | Some(Token::Str(k)) => k.clone(),
                        Some(Token::Number(n)) => n.to_string(),
                        other => return Err(syntax(format!("bad object key {:?}", other))),
                    };
                    self.expect(Punct::Colon)?;
                    fields.push((key, self.expression()?));
                    if !self.eat(Punct::Comma) {
                        self.expect(Punct::RBrace)?;
                        break;
                    }
                }
                Ok(Expr::Object(fields))
            }
            other => Err(syntax(format!("unexpected token {:?}", other))),
        }
    }
}

/// Turns the left-hand side of an assignment into a [`Target`]
fn into_target(expr: Expr) -> Result<Target> {
    let mut path = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Ident(root) => {
                path.reverse();
                return Ok(Target { root, path });
            }
            Expr::Member(object, key) => {
                path.push(*key);
                current = *object;
            }
            _ => return Err(syntax("invalid assignment target")),
        }
    }
}
