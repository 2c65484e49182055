//! Syntax tree of a compiled formula and its evaluation.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use crate::error::{FormulaError, FormulaErrorKind};
use crate::functions::{Function, power};

/// Source of variable values for one evaluation.
///
/// Implemented for the map types callers already hold so that building an
/// environment never requires copying into a dedicated structure.
pub trait Variables {
    /// Returns the value bound to `name`, if any.
    fn get(&self, name: &str) -> Option<f64>;
}

impl<S: BuildHasher> Variables for HashMap<String, f64, S> {
    fn get(&self, name: &str) -> Option<f64> {
        HashMap::get(self, name).copied()
    }
}

impl<S: BuildHasher> Variables for HashMap<&str, f64, S> {
    fn get(&self, name: &str) -> Option<f64> {
        HashMap::get(self, name).copied()
    }
}

impl Variables for BTreeMap<String, f64> {
    fn get(&self, name: &str) -> Option<f64> {
        BTreeMap::get(self, name).copied()
    }
}

impl Variables for [(&str, f64)] {
    fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|&(_, v)| v)
    }
}

impl<const N: usize> Variables for [(&str, f64); N] {
    fn get(&self, name: &str) -> Option<f64> {
        Variables::get(self.as_slice(), name)
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`, the identity.
    Plus,
    /// `-x`.
    Minus,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`; a zero divisor is a domain error.
    Div,
    /// `%`, floored: the result takes the sign of the divisor.
    Rem,
    /// `**` (or `^`), right-associative.
    Pow,
}

/// A node of the formula tree. The set of variants is the whole grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal.
    Literal(f64),
    /// A reference to a value in the evaluation environment.
    Variable(String),
    /// A prefix operator applied to one operand.
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// An infix operator applied to two operands.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A call to an allow-listed function; arity is checked when parsed.
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Evaluates the tree. Every variable must already be known to exist in
    /// `vars`; a missing one is still reported rather than defaulted.
    pub(crate) fn eval<V: Variables + ?Sized>(
        &self,
        vars: &V,
    ) -> Result<f64, FormulaError> {
        match self {
            Expr::Literal(value) => Ok(*value),
            Expr::Variable(name) => vars.get(name).ok_or_else(|| {
                FormulaError::new(FormulaErrorKind::UnknownVariable {
                    name: name.clone(),
                })
            }),
            Expr::Unary { op, operand } => {
                let value = operand.eval(vars)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                })
            }
            Expr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(vars)?;
                let b = rhs.eval(vars)?;
                binary(*op, a, b)
            }
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(vars))
                    .collect::<Result<Vec<_>, _>>()?;
                function.apply(&values)
            }
        }
    }

    /// Calls `f` on every variable name in the tree, left to right.
    pub(crate) fn visit_variables<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => f(name),
            Expr::Unary { operand, .. } => operand.visit_variables(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_variables(f);
                rhs.visit_variables(f);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.visit_variables(f);
                }
            }
        }
    }
}

fn binary(op: BinaryOp, a: f64, b: f64) -> Result<f64, FormulaError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(FormulaError::domain("/", "division by zero"));
            }
            Ok(a / b)
        }
        BinaryOp::Rem => {
            if b == 0.0 {
                return Err(FormulaError::domain("%", "modulo by zero"));
            }
            // Floored modulo: the result takes the sign of the divisor.
            let r = a % b;
            Ok(if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            })
        }
        BinaryOp::Pow => power(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: f64) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn floored_modulo_follows_divisor_sign() {
        assert_eq!(binary(BinaryOp::Rem, -7.0, 3.0).unwrap(), 2.0);
        assert_eq!(binary(BinaryOp::Rem, 7.0, -3.0).unwrap(), -2.0);
        assert_eq!(binary(BinaryOp::Rem, 7.0, 3.0).unwrap(), 1.0);
        assert_eq!(binary(BinaryOp::Rem, 6.0, -3.0).unwrap(), 0.0);
    }

    #[test]
    fn division_by_zero_is_domain_error() {
        assert!(binary(BinaryOp::Div, 1.0, 0.0).unwrap_err().is_domain());
        assert!(binary(BinaryOp::Rem, 1.0, 0.0).unwrap_err().is_domain());
    }

    #[test]
    fn eval_walks_tree() {
        // -(2 * x) + 1 with x = 4
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::Unary {
                op: UnaryOp::Minus,
                operand: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: lit(2.0),
                    rhs: Box::new(Expr::Variable("x".into())),
                }),
            }),
            rhs: lit(1.0),
        };
        assert_eq!(expr.eval(&[("x", 4.0)]).unwrap(), -7.0);
    }

    #[test]
    fn missing_variable_is_reported() {
        let expr = Expr::Variable("dbh".into());
        let err = expr.eval(&[("height", 1.0)]).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.offending(), Some("dbh"));
    }

    #[test]
    fn variable_sources() {
        let expr = Expr::Variable("x".into());

        let owned: HashMap<String, f64> = HashMap::from([("x".into(), 1.0)]);
        assert_eq!(expr.eval(&owned).unwrap(), 1.0);

        let borrowed: HashMap<&str, f64> = HashMap::from([("x", 2.0)]);
        assert_eq!(expr.eval(&borrowed).unwrap(), 2.0);

        let sorted: BTreeMap<String, f64> = BTreeMap::from([("x".into(), 3.0)]);
        assert_eq!(expr.eval(&sorted).unwrap(), 3.0);

        let pairs: &[(&str, f64)] = &[("y", 0.0), ("x", 4.0)];
        assert_eq!(expr.eval(pairs).unwrap(), 4.0);
    }
}
