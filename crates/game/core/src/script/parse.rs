//! Tokenizer and precedence-climbing parser.
//!
//! ```text
//! seq     := ternary (';' ternary)* ';'?
//! ternary := or ('?' ternary ':' ternary)?
//! or      := and ('||' and)*
//! and     := eq ('&&' eq)*
//! eq      := cmp (('==' | '!=') cmp)*
//! cmp     := add (('<' | '<=' | '>' | '>=') add)*
//! add     := mul (('+' | '-') mul)*
//! mul     := unary (('*' | '/' | '%') unary)*
//! unary   := ('!' | '-') unary | primary
//! primary := number | string | true | false | null | name | name '(' args ')' | '(' seq ')'
//! ```

use super::ScriptError;
use super::ast::{BinOp, Expr, Func, UnOp, Var};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

const PUNCTUATION: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "(", ")", ",", ";", "?", ":", "+", "-", "*", "/", "%",
    "!", "<", ">",
];

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ScriptError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
        } else if c.is_ascii_digit() || (c == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let text = &source[start..pos];
            let value = text.parse().map_err(|_| ScriptError::Syntax {
                pos: start,
                message: format!("bad number `{text}`"),
            })?;
            tokens.push((start, Token::Number(value)));
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push((start, Token::Ident(source[start..pos].to_string())));
        } else if c == b'"' || c == b'\'' {
            let start = pos;
            pos += 1;
            let mut text = String::new();
            loop {
                match bytes.get(pos) {
                    None => {
                        return Err(ScriptError::Syntax {
                            pos: start,
                            message: "unterminated string".into(),
                        });
                    }
                    Some(&b) if b == c => {
                        pos += 1;
                        break;
                    }
                    Some(&b'\\') if pos + 1 < bytes.len() => {
                        text.push(bytes[pos + 1] as char);
                        pos += 2;
                    }
                    Some(_) => {
                        let ch = source[pos..].chars().next().unwrap_or_default();
                        text.push(ch);
                        pos += ch.len_utf8().max(1);
                    }
                }
            }
            tokens.push((start, Token::Str(text)));
        } else {
            let punct = PUNCTUATION
                .iter()
                .find(|p| source[pos..].starts_with(**p))
                .ok_or_else(|| ScriptError::Syntax {
                    pos,
                    message: format!(
                        "unexpected character `{}`",
                        source[pos..].chars().next().unwrap_or_default()
                    ),
                })?;
            tokens.push((pos, Token::Punct(*punct)));
            pos += punct.len();
        }
    }
    Ok(tokens)
}

/// Parses `source` into an expression tree, resolving every name.
pub fn parse(source: &str) -> Result<Expr, ScriptError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    if parser.tokens.is_empty() {
        return Err(ScriptError::Syntax {
            pos: 0,
            message: "empty script".into(),
        });
    }
    let expr = parser.seq()?;
    match parser.peek() {
        None => Ok(expr),
        Some(_) => Err(parser.error("unexpected trailing input")),
    }
}

/// Deepest nesting of parentheses, calls, ternaries or prefix operators.
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(p, _)| *p)
    }

    fn error(&self, message: &str) -> ScriptError {
        ScriptError::Syntax {
            pos: self.offset(),
            message: message.to_string(),
        }
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ScriptError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{punct}`")))
        }
    }

    fn nested(
        &mut self,
        rule: impl FnOnce(&mut Self) -> Result<Expr, ScriptError>,
    ) -> Result<Expr, ScriptError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let expr = rule(self);
        self.depth -= 1;
        expr
    }

    fn seq(&mut self) -> Result<Expr, ScriptError> {
        let mut items = vec![self.ternary()?];
        while self.eat(";") {
            if matches!(self.peek(), None | Some(Token::Punct(")"))) {
                break;
            }
            items.push(self.ternary()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Seq(items)
        })
    }

    fn ternary(&mut self) -> Result<Expr, ScriptError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.binary(0)?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let then = self.ternary()?;
        self.expect(":")?;
        let otherwise = self.ternary()?;
        Ok(Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Binary operators by precedence level, loosest first.
    const LEVELS: &'static [&'static [(&'static str, BinOp)]] = &[
        &[("||", BinOp::Or)],
        &[("&&", BinOp::And)],
        &[("==", BinOp::Eq), ("!=", BinOp::Ne)],
        &[
            ("<=", BinOp::Le),
            (">=", BinOp::Ge),
            ("<", BinOp::Lt),
            (">", BinOp::Gt),
        ],
        &[("+", BinOp::Add), ("-", BinOp::Sub)],
        &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
    ];

    fn binary(&mut self, level: usize) -> Result<Expr, ScriptError> {
        let Some(ops) = Self::LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        'outer: loop {
            for (punct, op) in *ops {
                if self.eat(punct) {
                    let rhs = self.binary(level + 1)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat("!") {
            return Ok(Expr::Unary(UnOp::Not, Box::new(self.nested(Self::unary)?)));
        }
        if self.eat("-") {
            return Ok(Expr::Unary(UnOp::Neg, Box::new(self.nested(Self::unary)?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let Some((_, token)) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("unexpected end of script"));
        };
        self.pos += 1;
        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Punct("(") => {
                let inner = self.seq()?;
                self.expect(")")?;
                Ok(inner)
            }
            Token::Punct(p) => {
                self.pos -= 1;
                Err(self.error(&format!("unexpected `{p}`")))
            }
            Token::Ident(name) => {
                let literal = match name.as_str() {
                    "true" => Some(Expr::Bool(true)),
                    "false" => Some(Expr::Bool(false)),
                    "null" => Some(Expr::Null),
                    _ => None,
                };
                if let Some(literal) = literal {
                    Ok(literal)
                } else if self.eat("(") {
                    self.call(name)
                } else {
                    name.parse::<Var>()
                        .map(Expr::Var)
                        .map_err(|_| ScriptError::UnknownVariable(name))
                }
            }
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, ScriptError> {
        let func: Func = name
            .parse()
            .map_err(|_| ScriptError::UnknownFunction(name.clone()))?;
        let mut args = Vec::new();
        if !self.eat(")") {
            loop {
                args.push(self.ternary()?);
                if self.eat(")") {
                    break;
                }
                self.expect(",")?;
            }
        }
        let arity = func.arity();
        if !arity.contains(&args.len()) {
            return Err(ScriptError::Arity {
                function: name,
                min: *arity.start(),
                max: *arity.end(),
                got: args.len(),
            });
        }
        Ok(Expr::Call(func, args))
    }
}
