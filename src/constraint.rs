//! Constraint Engine
//!
//! Numeric predicates checked against the result of an increment before
//! it is committed. Clauses are parsed from the tokens that follow the
//! delta argument:
//!
//! ```text
//! CONSTRAINT <= n | >= n | < n | > n | NON_NEGATIVE | NON_ZERO
//! ```
//!
//! Strict comparisons are only available for floats.

use std::fmt;

use crate::error::{Result, TallyError};

/// A predicate over the post-increment value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint<T> {
    LessOrEqual(T),
    GreaterOrEqual(T),
    Less(T),
    Greater(T),
    NonNegative,
    NonZero,
}

/// Number types usable with `IncrBy` / `IncrByFloat`
pub trait Numeric: Copy + PartialOrd + fmt::Debug {
    const ZERO: Self;

    /// Whether `<` and `>` clauses are accepted
    const SUPPORTS_STRICT: bool;

    /// Parse a value from its text form
    fn parse_bytes(bytes: &[u8]) -> Option<Self>;

    /// Error for bytes that do not parse
    fn parse_error() -> TallyError;

    /// Sum, or `None` when the result is not representable
    fn checked_add(self, other: Self) -> Option<Self>;

    /// Text form written back to the store
    fn to_stored(self) -> String;

    /// Parse a request argument; failure is a protocol error
    fn parse_arg(bytes: &[u8]) -> Result<Self> {
        Self::parse_bytes(bytes).ok_or_else(|| TallyError::protocol(Self::parse_error().to_string()))
    }
}

impl Numeric for i64 {
    const ZERO: Self = 0;
    const SUPPORTS_STRICT: bool = false;

    fn parse_bytes(bytes: &[u8]) -> Option<Self> {
        std::str::from_utf8(bytes).ok()?.parse().ok()
    }

    fn parse_error() -> TallyError {
        TallyError::NonInteger
    }

    fn checked_add(self, other: Self) -> Option<Self> {
        i64::checked_add(self, other)
    }

    fn to_stored(self) -> String {
        self.to_string()
    }
}

impl Numeric for f64 {
    const ZERO: Self = 0.0;
    const SUPPORTS_STRICT: bool = true;

    fn parse_bytes(bytes: &[u8]) -> Option<Self> {
        let value: f64 = std::str::from_utf8(bytes).ok()?.parse().ok()?;
        value.is_finite().then_some(value)
    }

    fn parse_error() -> TallyError {
        TallyError::NonFloat
    }

    fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self + other;
        sum.is_finite().then_some(sum)
    }

    fn to_stored(self) -> String {
        format!("{:.4}", self)
    }
}

impl<T: Numeric> Constraint<T> {
    /// Evaluate the predicate
    pub fn check(&self, value: T) -> bool {
        match *self {
            Constraint::LessOrEqual(bound) => value <= bound,
            Constraint::GreaterOrEqual(bound) => value >= bound,
            Constraint::Less(bound) => value < bound,
            Constraint::Greater(bound) => value > bound,
            Constraint::NonNegative => value >= T::ZERO,
            Constraint::NonZero => value != T::ZERO,
        }
    }
}

/// Check constraints in order, stopping at the first failure
pub fn check_all<T: Numeric>(constraints: &[Constraint<T>], value: T) -> Result<()> {
    if constraints.iter().all(|c| c.check(value)) {
        Ok(())
    } else {
        Err(TallyError::ConstraintViolated)
    }
}

/// Parse `CONSTRAINT` clauses.
///
/// Tokens between clauses that are not `CONSTRAINT` are skipped.
pub fn parse_clauses<T: Numeric>(args: &[Vec<u8>]) -> Result<Vec<Constraint<T>>> {
    let mut constraints = Vec::new();
    let mut tokens = args.iter();

    while let Some(token) = tokens.next() {
        if !token.eq_ignore_ascii_case(b"CONSTRAINT") {
            continue;
        }

        let kind = tokens
            .next()
            .ok_or_else(|| TallyError::protocol("missing constraint type"))?;
        let kind = String::from_utf8_lossy(kind).to_ascii_uppercase();

        let constraint = match kind.as_str() {
            "<=" | "LE" | "LESS_OR_EQUAL" => Constraint::LessOrEqual(criteria::<T>(&mut tokens)?),
            ">=" | "GE" | "GREATER_OR_EQUAL" => {
                Constraint::GreaterOrEqual(criteria::<T>(&mut tokens)?)
            }
            "<" | "LT" | "LESS" if T::SUPPORTS_STRICT => Constraint::Less(criteria::<T>(&mut tokens)?),
            ">" | "GT" | "GREATER" if T::SUPPORTS_STRICT => {
                Constraint::Greater(criteria::<T>(&mut tokens)?)
            }
            "NON_NEGATIVE" => Constraint::NonNegative,
            "NON_ZERO" => Constraint::NonZero,
            _ => {
                return Err(TallyError::protocol(format!(
                    "unsupported constraint type '{}'",
                    kind
                )))
            }
        };
        constraints.push(constraint);
    }

    Ok(constraints)
}

fn criteria<T: Numeric>(tokens: &mut std::slice::Iter<'_, Vec<u8>>) -> Result<T> {
    let token = tokens
        .next()
        .ok_or_else(|| TallyError::protocol("missing constraint criteria"))?;
    T::parse_arg(token)
}
