//! Sandboxed evaluation of allometric biomass formulas.
//!
//! Species formulas are entered by end users, so they are parsed by a
//! dedicated recursive-descent parser into a closed syntax tree instead of
//! being handed to any general-purpose interpreter. The grammar only has
//! numbers, variables, `+ - * / % **` (`^` is accepted for `**`), unary
//! signs, and calls to a fixed set of math functions. It has no
//! assignment, no loops, no attribute or index access and no way to name
//! anything outside the allow-list, so evaluation is a terminating walk
//! with no side effects.
//!
//! ## Usage
//!
//! ```
//! use canopy_formula::{Formula, normalize};
//!
//! let text = normalize("0.0673 * (wood_density * dbh^2 * height)^0.976");
//! let formula = Formula::compile(&text).unwrap();
//! let agb = formula
//!     .evaluate(&[("wood_density", 0.6), ("dbh", 20.0), ("height", 15.0)])
//!     .unwrap();
//! assert!(agb > 0.0);
//! ```
//!
//! ## Errors
//!
//! - syntax errors while compiling malformed text
//! - validation errors while compiling text with forbidden constructs or
//!   functions, and while evaluating against an environment that lacks a
//!   referenced variable
//! - domain errors while evaluating, e.g. `log` of a non-positive value

mod ast;
mod defaults;
mod error;
mod functions;
mod lexer;
mod normalize;
mod parser;

use std::collections::BTreeSet;
use std::fmt;

use tracing::trace;

#[doc(inline)]
pub use crate::ast::{BinaryOp, Expr, UnaryOp, Variables};
#[doc(inline)]
pub use crate::defaults::{
    CHAVE_DEFAULT_FORMULA, SIMPLE_ALLOMETRIC_COEFFICIENT,
    simple_allometric_biomass,
};
#[doc(inline)]
pub use crate::error::FormulaError;
use crate::error::FormulaErrorKind;
#[doc(inline)]
pub use crate::functions::Function;
#[doc(inline)]
pub use crate::normalize::{Normalizer, normalize};

/// Longest accepted formula text in bytes.
///
/// Bounds the depth of left-nested operator chains such as `1+1+...+1`,
/// which the parser builds iteratively but evaluation walks recursively.
pub const MAX_FORMULA_LEN: usize = 4096;

/// A compiled, validated formula.
///
/// Compile once, then evaluate against any number of environments.
/// `Formula` holds no interior state and is `Send + Sync`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    root: Expr,
    variables: BTreeSet<String>,
}

impl Formula {
    /// Parses and validates `source`.
    ///
    /// Call targets, arities and disallowed constructs are checked here.
    /// Variable names are collected and checked at evaluation time, since
    /// they depend on the environment.
    pub fn compile(source: &str) -> Result<Self, FormulaError> {
        if source.len() > MAX_FORMULA_LEN {
            return Err(FormulaError::syntax(
                MAX_FORMULA_LEN,
                format!("formula is longer than {MAX_FORMULA_LEN} bytes"),
            ));
        }

        let tokens = lexer::tokenize(source)?;
        let root = parser::parse(&tokens)?;

        let mut variables = BTreeSet::new();
        root.visit_variables(&mut |name| {
            variables.insert(name.to_string());
        });

        trace!(formula = source, ?variables, "compiled formula");
        Ok(Self {
            source: source.to_string(),
            root,
            variables,
        })
    }

    /// The text this formula was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The syntax tree.
    pub fn expr(&self) -> &Expr {
        &self.root
    }

    /// Distinct variable names referenced by the formula, sorted.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Evaluates the formula against `vars`.
    ///
    /// Every referenced variable is checked before any arithmetic runs, so
    /// a missing variable never yields a partially computed result. A
    /// non-finite result is reported as a domain error.
    pub fn evaluate<V: Variables + ?Sized>(
        &self,
        vars: &V,
    ) -> Result<f64, FormulaError> {
        if let Some(missing) =
            self.variables.iter().find(|name| vars.get(name).is_none())
        {
            return Err(FormulaError::new(FormulaErrorKind::UnknownVariable {
                name: missing.clone(),
            }));
        }

        let value = self.root.eval(vars)?;
        if !value.is_finite() {
            return Err(FormulaError::domain(
                "result",
                format!("formula evaluated to {value}"),
            ));
        }
        Ok(value)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and validates `source`. See [`Formula::compile`].
pub fn compile(source: &str) -> Result<Formula, FormulaError> {
    Formula::compile(source)
}

/// Evaluates `formula` against `vars`. See [`Formula::evaluate`].
pub fn evaluate<V: Variables + ?Sized>(
    formula: &Formula,
    vars: &V,
) -> Result<f64, FormulaError> {
    formula.evaluate(vars)
}
