//! Recursive-descent parser producing an [`Expr`] tree.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! formula        := additive EOF
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/" | "%") unary)*
//! unary          := ("+" | "-") unary | power
//! power          := primary ("**" unary)?
//! primary        := NUMBER | NAME | NAME "(" args ")" | "(" additive ")"
//! args           := additive ("," additive)* ","?
//! ```
//!
//! `**` is right-associative and binds tighter than a unary sign on its
//! left, so `-2 ** 2` is `-(2 ** 2)` and `2 ** -1` is `2 ** (-1)`.
//! Call targets and arities are validated while parsing.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaErrorKind};
use crate::functions::Function;
use crate::lexer::{Token, TokenKind};

/// Maximum nesting of parentheses, signs, powers, and calls.
pub(crate) const MAX_DEPTH: usize = 64;

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    let mut parser = Parser {
        tokens,
        index: 0,
        depth: 0,
    };
    let expr = parser.additive()?;

    let token = parser.peek();
    match token.kind {
        TokenKind::Eof => Ok(expr),
        TokenKind::Comma => {
            Err(FormulaError::disallowed(token.position, "tuple `,`"))
        }
        TokenKind::LParen => Err(FormulaError::new(
            FormulaErrorKind::IndirectCall {
                position: token.position,
            },
        )),
        _ => Err(FormulaError::syntax(
            token.position,
            format!("unexpected {}", describe(&token.kind)),
        )),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    index: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // The token list always ends with Eof and Eof is never consumed.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let index = self.index.min(self.tokens.len() - 1);
        if self.tokens[index].kind != TokenKind::Eof {
            self.index += 1;
        }
        &self.tokens[index]
    }

    fn enter(&mut self, position: usize) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::syntax(
                position,
                "formula is nested too deeply",
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.peek();
        let position = token.position;
        let op = match token.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.power(),
        };
        self.advance();

        self.enter(position)?;
        let operand = self.unary()?;
        self.leave();

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.primary()?;
        let token = self.peek();
        if token.kind != TokenKind::Power {
            return Ok(base);
        }
        let position = token.position;
        self.advance();

        self.enter(position)?;
        let exponent = self.unary()?;
        self.leave();

        Ok(Expr::Binary {
            op: BinaryOp::Pow,
            lhs: Box::new(base),
            rhs: Box::new(exponent),
        })
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance().clone();
        let expr = match token.kind {
            TokenKind::Number(value) => Expr::Literal(value),
            TokenKind::Ident(name) => {
                if self.peek().kind == TokenKind::LParen {
                    return self.call(&name, token.position);
                }
                if Function::from_name(&name).is_some() {
                    return Err(FormulaError::new(
                        FormulaErrorKind::FunctionAsValue {
                            position: token.position,
                            name,
                        },
                    ));
                }
                Expr::Variable(name)
            }
            TokenKind::LParen => {
                self.enter(token.position)?;
                let inner = self.additive()?;
                self.leave();
                self.expect_rparen(token.position)?;
                inner
            }
            TokenKind::Eof => {
                return Err(FormulaError::syntax(
                    token.position,
                    "unexpected end of formula",
                ));
            }
            other => {
                return Err(FormulaError::syntax(
                    token.position,
                    format!("unexpected {}", describe(&other)),
                ));
            }
        };

        // Calling the result of a literal or parenthesized expression.
        let next = self.peek();
        if next.kind == TokenKind::LParen {
            return Err(FormulaError::new(FormulaErrorKind::IndirectCall {
                position: next.position,
            }));
        }
        Ok(expr)
    }

    fn call(
        &mut self,
        name: &str,
        position: usize,
    ) -> Result<Expr, FormulaError> {
        let Some(function) = Function::from_name(name) else {
            return Err(FormulaError::new(FormulaErrorKind::UnknownFunction {
                position,
                name: name.to_string(),
            }));
        };

        // Consume "(".
        let open = self.advance().position;
        self.enter(open)?;

        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.additive()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
                // Trailing comma before ")".
                if self.peek().kind == TokenKind::RParen {
                    break;
                }
            }
        }
        self.leave();
        self.expect_rparen(open)?;

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(FormulaError::new(FormulaErrorKind::Arity {
                position,
                name: function.name(),
                expected: function.arity_description(),
                found: args.len(),
            }));
        }

        let expr = Expr::Call { function, args };
        let next = self.peek();
        if next.kind == TokenKind::LParen {
            return Err(FormulaError::new(FormulaErrorKind::IndirectCall {
                position: next.position,
            }));
        }
        Ok(expr)
    }

    fn expect_rparen(&mut self, open: usize) -> Result<(), FormulaError> {
        let token = self.peek();
        match token.kind {
            TokenKind::RParen => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Err(FormulaError::syntax(open, "unclosed `(`")),
            _ => Err(FormulaError::syntax(
                token.position,
                format!("expected `)`, found {}", describe(&token.kind)),
            )),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(v) => format!("number {v}"),
        TokenKind::Ident(name) => format!("name `{name}`"),
        TokenKind::Plus => "`+`".into(),
        TokenKind::Minus => "`-`".into(),
        TokenKind::Star => "`*`".into(),
        TokenKind::Slash => "`/`".into(),
        TokenKind::Percent => "`%`".into(),
        TokenKind::Power => "`**`".into(),
        TokenKind::LParen => "`(`".into(),
        TokenKind::RParen => "`)`".into(),
        TokenKind::Comma => "`,`".into(),
        TokenKind::Eof => "end of formula".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(source: &str) -> Result<Expr, FormulaError> {
        parse(&tokenize(source)?)
    }

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.into()))
    }

    fn lit(v: f64) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            parse_str("a + b * c").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: var("a"),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: var("b"),
                    rhs: var("c"),
                }),
            }
        );
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(
            parse_str("2 ** 3 ^ 2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Pow,
                lhs: lit(2.0),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs: lit(3.0),
                    rhs: lit(2.0),
                }),
            }
        );
    }

    #[test]
    fn unary_minus_applies_after_power() {
        assert_eq!(
            parse_str("-x ** 2").unwrap(),
            Expr::Unary {
                op: UnaryOp::Minus,
                operand: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    lhs: var("x"),
                    rhs: lit(2.0),
                }),
            }
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            parse_str("a - b - c").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    lhs: var("a"),
                    rhs: var("b"),
                }),
                rhs: var("c"),
            }
        );
    }

    #[test]
    fn calls_accept_trailing_comma() {
        assert_eq!(
            parse_str("max(a, b,)").unwrap(),
            Expr::Call {
                function: Function::Max,
                args: vec![
                    Expr::Variable("a".into()),
                    Expr::Variable("b".into()),
                ],
            }
        );
    }

    #[test]
    fn syntax_errors() {
        let sources =
            ["", "1 +", "(1 + 2", "1 2", "sqrt(4", "* 3", "()", "f(,)"];
        for source in sources {
            let err = parse_str(source).unwrap_err();
            // `f(,)` names an unknown function before the bad argument list.
            if source.starts_with('f') {
                assert!(err.is_validation(), "{source}: {err}");
            } else {
                assert!(err.is_syntax(), "{source}: {err}");
            }
        }
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = parse_str("open(1)").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.offending(), Some("open"));
        assert_eq!(err.position(), Some(0));
    }

    #[test]
    fn uppercase_function_names_are_not_allow_listed() {
        assert!(parse_str("EXP(1)").unwrap_err().is_validation());
    }

    #[test]
    fn indirect_calls_are_rejected() {
        for source in ["(sqrt)(4)", "(x)(4)", "2(3)", "sqrt(4)(2)"] {
            let err = parse_str(source).unwrap_err();
            assert!(err.is_validation(), "{source}: {err}");
        }
    }

    #[test]
    fn function_used_as_value_is_rejected() {
        let err = parse_str("sqrt + 1").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.offending(), Some("sqrt"));
    }

    #[test]
    fn arity_is_checked() {
        let sources =
            ["sqrt()", "sqrt(1, 2)", "pow(2)", "min(1)", "round(1, 2, 3)"];
        for source in sources {
            let err = parse_str(source).unwrap_err();
            assert!(err.is_validation(), "{source}: {err}");
        }
        assert!(parse_str("min(1, 2, 3, 4)").is_ok());
        assert!(parse_str("log(8, 2)").is_ok());
    }

    #[test]
    fn top_level_tuple_is_rejected() {
        let err = parse_str("1, 2").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn nesting_limit() {
        let depth = MAX_DEPTH + 1;
        let deep = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_str(&deep).unwrap_err().is_syntax());

        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(parse_str(&ok).unwrap(), Expr::Literal(1.0));

        let signs = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(parse_str(&signs).unwrap_err().is_syntax());
    }
}
