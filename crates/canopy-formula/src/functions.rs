//! The allow-listed function set.

use crate::error::FormulaError;

/// A function formulas may call. Anything else is rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Sqrt,
    Log,
    Log10,
    Exp,
    Pow,
    Abs,
    Min,
    Max,
    Round,
}

impl Function {
    /// Every allow-listed function.
    pub const ALL: [Function; 9] = [
        Function::Sqrt,
        Function::Log,
        Function::Log10,
        Function::Exp,
        Function::Pow,
        Function::Abs,
        Function::Min,
        Function::Max,
        Function::Round,
    ];

    /// Looks up a function by its exact (lowercase) name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Name as written in formulas.
    pub fn name(self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Exp => "exp",
            Function::Pow => "pow",
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
            Function::Round => "round",
        }
    }

    /// Accepted argument counts as `(min, max)`; `None` means unbounded.
    pub(crate) fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Sqrt
            | Function::Log10
            | Function::Exp
            | Function::Abs => (1, Some(1)),
            Function::Log | Function::Round => (1, Some(2)),
            Function::Pow => (2, Some(2)),
            Function::Min | Function::Max => (2, None),
        }
    }

    /// Human-readable form of [`Function::arity`] for error messages.
    pub(crate) fn arity_description(self) -> &'static str {
        match self.arity() {
            (1, Some(1)) => "1",
            (1, Some(2)) => "1 or 2",
            (2, Some(2)) => "2",
            _ => "at least 2",
        }
    }

    /// Applies the function to already-evaluated arguments.
    ///
    /// The argument count was checked when the formula was compiled.
    pub(crate) fn apply(self, args: &[f64]) -> Result<f64, FormulaError> {
        let name = self.name();
        match (self, args) {
            (Function::Sqrt, &[x]) => {
                if x < 0.0 {
                    return Err(FormulaError::domain(
                        name,
                        format!("cannot take the square root of {x}"),
                    ));
                }
                Ok(x.sqrt())
            }
            (Function::Log, &[x]) => ln(name, x),
            (Function::Log, &[x, base]) => {
                let numerator = ln(name, x)?;
                let denominator = ln(name, base)?;
                if denominator == 0.0 {
                    return Err(FormulaError::domain(
                        name,
                        "logarithm base must not be 1",
                    ));
                }
                Ok(numerator / denominator)
            }
            (Function::Log10, &[x]) => {
                if x <= 0.0 {
                    return Err(FormulaError::domain(
                        name,
                        format!("argument must be positive, got {x}"),
                    ));
                }
                Ok(x.log10())
            }
            (Function::Exp, &[x]) => {
                let value = x.exp();
                if value.is_infinite() && x.is_finite() {
                    return Err(FormulaError::domain(
                        name,
                        format!("exp({x}) overflows"),
                    ));
                }
                Ok(value)
            }
            (Function::Pow, &[base, exponent]) => power(base, exponent),
            (Function::Abs, &[x]) => Ok(x.abs()),
            (Function::Min, [first, rest @ ..]) => Ok(rest
                .iter()
                .fold(*first, |acc, &v| if v < acc { v } else { acc })),
            (Function::Max, [first, rest @ ..]) => Ok(rest
                .iter()
                .fold(*first, |acc, &v| if v > acc { v } else { acc })),
            (Function::Round, &[x]) => Ok(x.round_ties_even()),
            (Function::Round, &[x, digits]) => round_to(x, digits),
            _ => Err(FormulaError::domain(
                name,
                format!("called with {} argument(s)", args.len()),
            )),
        }
    }
}

fn ln(name: &'static str, x: f64) -> Result<f64, FormulaError> {
    if x <= 0.0 {
        return Err(FormulaError::domain(
            name,
            format!("argument must be positive, got {x}"),
        ));
    }
    Ok(x.ln())
}

/// `base ** exponent` with the failure modes of real exponentiation.
pub(crate) fn power(base: f64, exponent: f64) -> Result<f64, FormulaError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(FormulaError::domain(
            "**",
            "zero cannot be raised to a negative power",
        ));
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(FormulaError::domain(
            "**",
            format!("{base} ** {exponent} has no real result"),
        ));
    }
    let value = base.powf(exponent);
    if value.is_infinite() && base.is_finite() && exponent.is_finite() {
        return Err(FormulaError::domain(
            "**",
            format!("{base} ** {exponent} overflows"),
        ));
    }
    Ok(value)
}

/// Rounds half to even at `digits` decimal places (negative digits round to
/// tens, hundreds, ...).
fn round_to(x: f64, digits: f64) -> Result<f64, FormulaError> {
    if digits.fract() != 0.0 || !digits.is_finite() {
        return Err(FormulaError::domain(
            "round",
            format!("number of digits must be a whole number, got {digits}"),
        ));
    }
    let scale = 10f64.powf(digits.abs());
    if !scale.is_finite() {
        // Far beyond f64 precision in either direction.
        return Ok(if digits > 0.0 { x } else { 0.0 * x });
    }
    let rounded = if digits >= 0.0 {
        (x * scale).round_ties_even() / scale
    } else {
        (x / scale).round_ties_even() * scale
    };
    Ok(if rounded.is_finite() { rounded } else { x })
}
