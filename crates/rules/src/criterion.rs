//! Typed, weighted comparisons between a context value and a literal.
//!
//! A [`Criterion`] names the context it reads, the operator, the declared
//! type of its literal and a weight in `[0, 1]`. Evaluation reads
//! `literal <op> context`, so `LessThan 25` holds once the context exceeds 25.
//! Numeric types support every operator, all other types only equality and
//! inequality.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use dds_core::{Context, DdsError, Result, ValueType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    EqualTo,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    NotEqualTo,
}

impl ComparisonType {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonType::EqualTo => "==",
            ComparisonType::LessThan => "<",
            ComparisonType::GreaterThan => ">",
            ComparisonType::LessOrEqual => "<=",
            ComparisonType::GreaterOrEqual => ">=",
            ComparisonType::NotEqualTo => "!=",
        }
    }

    /// Whether the operator is defined for non-numeric types.
    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonType::EqualTo | ComparisonType::NotEqualTo)
    }

    /// Whether `lhs <op> rhs` holds, given `lhs.cmp(rhs)`.
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonType::EqualTo => ordering == Ordering::Equal,
            ComparisonType::LessThan => ordering == Ordering::Less,
            ComparisonType::GreaterThan => ordering == Ordering::Greater,
            ComparisonType::LessOrEqual => ordering != Ordering::Greater,
            ComparisonType::GreaterOrEqual => ordering != Ordering::Less,
            ComparisonType::NotEqualTo => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug)]
pub struct Criterion {
    context_name: String,
    comparison: ComparisonType,
    value_type: ValueType,
    comparison_value: String,
    weight: f64,
    /// Outcome of the most recent successful refresh.
    is_true: AtomicBool,
}

impl Criterion {
    /// Build a criterion over the named context.
    ///
    /// The weight must lie in `[0, 1]`. Whether `value_type` matches the
    /// context's declared type is only checked when the criterion is evaluated.
    pub fn new(
        context_name: impl Into<String>,
        comparison: ComparisonType,
        value_type: ValueType,
        comparison_value: impl Into<String>,
        weight: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(DdsError::InvalidWeight(weight));
        }
        Ok(Self {
            context_name: context_name.into(),
            comparison,
            value_type,
            comparison_value: comparison_value.into(),
            weight,
            is_true: AtomicBool::new(false),
        })
    }

    /// Build a criterion whose literal type is taken from `context`.
    pub fn for_context(
        context: &Context,
        comparison: ComparisonType,
        comparison_value: impl Into<String>,
        weight: f64,
    ) -> Result<Self> {
        Self::new(
            context.name(),
            comparison,
            context.value_type(),
            comparison_value,
            weight,
        )
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn comparison(&self) -> ComparisonType {
        self.comparison
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn comparison_value(&self) -> &str {
        &self.comparison_value
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Cached outcome of the last refresh; `false` until the first one.
    pub fn is_true(&self) -> bool {
        self.is_true.load(AtomicOrdering::Acquire)
    }

    /// Compare the literal against `context`'s current value.
    pub fn evaluate(&self, context: &Context) -> Result<bool> {
        if context.value_type() != self.value_type {
            return Err(DdsError::TypeMismatch {
                criterion: self.to_string(),
                expected: self.value_type,
                found: context.value_type(),
            });
        }
        if !self.value_type.is_numeric() && !self.comparison.is_equality() {
            return Err(DdsError::UnsupportedOperator {
                operator: self.comparison.symbol().to_string(),
                value_type: self.value_type,
            });
        }

        let literal = self
            .value_type
            .parse(&self.comparison_value)
            .map_err(|e| e.in_criterion(self))?;
        let current = context.typed_value().map_err(|e| e.in_criterion(self))?;

        if self.value_type.is_numeric() {
            // NaN compares unequal to everything.
            Ok(match literal.numeric_cmp(&current) {
                Some(ordering) => self.comparison.holds(ordering),
                None => self.comparison == ComparisonType::NotEqualTo,
            })
        } else {
            let equal = current == literal;
            Ok(match self.comparison {
                ComparisonType::NotEqualTo => !equal,
                _ => equal,
            })
        }
    }

    /// Re-evaluate against `context`, cache the outcome and return it.
    ///
    /// On error the cached outcome is left as it was.
    pub fn update(&self, context: &Context) -> Result<bool> {
        let outcome = self.evaluate(context)?;
        self.is_true.store(outcome, AtomicOrdering::Release);
        Ok(outcome)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.context_name, self.comparison, self.comparison_value, self.value_type
        )
    }
}
