//! Textual canonicalization of user-entered formulas.
//!
//! Species formulas are typed in by people copying equations from papers,
//! so the same formula shows up as `LN(D)`, `ln (D)` or `Log(D)`, with `^`
//! or `**` for powers. Normalization rewrites those spellings into the
//! canonical ones the evaluator expects. It never validates anything.

use std::sync::LazyLock;

use regex::Regex;

use crate::defaults::CHAVE_DEFAULT_FORMULA;

static LN_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bln\s*\(").expect("valid regex")
});
static EXP_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bexp\b").expect("valid regex"));
static LOG_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blog\b").expect("valid regex"));

/// Rewrites formula text into canonical syntax, substituting a default
/// formula for blank input.
///
/// The default is injected rather than global so services and tests can
/// run with a different fallback equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    default_formula: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CHAVE_DEFAULT_FORMULA)
    }
}

impl Normalizer {
    /// Creates a normalizer that returns `default_formula` for blank input.
    pub fn new(default_formula: impl Into<String>) -> Self {
        Self {
            default_formula: default_formula.into(),
        }
    }

    /// The formula substituted for blank input.
    pub fn default_formula(&self) -> &str {
        &self.default_formula
    }

    /// Canonicalizes `raw`.
    ///
    /// - blank input yields the default formula unchanged
    /// - `ln(` in any case, with optional spaces before `(`, becomes `log(`
    /// - `^` becomes `**`
    /// - whole-word `exp` / `log` in any case become lowercase
    ///
    /// Total and deterministic: always returns a string.
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return self.default_formula.clone();
        }

        let text = LN_CALL.replace_all(trimmed, "log(");
        let text = text.replace('^', "**");
        let text = EXP_WORD.replace_all(&text, "exp");
        let text = LOG_WORD.replace_all(&text, "log");
        text.into_owned()
    }
}

/// Normalizes `raw` with the built-in Chave default for blank input.
pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}
