// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    borrow::Borrow,
    collections::HashMap,
    f64::consts::PI,
    fmt,
    hash::Hash,
    num::NonZeroI32,
    ops::{Add, Div, Mul, Neg, Sub},
    str::FromStr,
};

use lexical::{format, to_string_with_options, WriteFloatOptions};
use num_complex::Complex64;
use once_cell::sync::Lazy;

use crate::{
    instruction::MemoryReference,
    parser::{parse_expression_text, ParseError},
    quil::{Quil, ToQuilError},
};

/// Build a [`Complex64`] with no imaginary part.
#[macro_export]
macro_rules! real {
    ($value:expr) => {
        num_complex::Complex64::new($value, 0f64)
    };
}

/// Build a [`Complex64`] with no real part.
#[macro_export]
macro_rules! imag {
    ($value:expr) => {
        num_complex::Complex64::new(0f64, $value)
    };
}

/// The different possible types of errors that could occur during expression evaluation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("There wasn't enough information to completely evaluate the expression.")]
    Incomplete,
    #[error("The operation expected a real number but received a complex one.")]
    NumberNotReal,
    #[error("The operation expected a number but received a different type of expression.")]
    NotANumber,
}

/// The type of Quil expressions used as gate parameters, waveform parameters and frame
/// attribute values.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Address(MemoryReference),
    Infix(InfixExpression),
    Number(Complex64),
    PiConstant(),
    Prefix(PrefixExpression),
    Variable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfixExpression {
    pub left: Box<Expression>,
    pub operator: InfixOperator,
    pub right: Box<Expression>,
}

impl InfixExpression {
    pub fn new(left: Expression, operator: InfixOperator, right: Expression) -> Self {
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrefixExpression {
    pub operator: PrefixOperator,
    pub expression: Box<Expression>,
}

impl PrefixExpression {
    pub fn new(operator: PrefixOperator, expression: Expression) -> Self {
        Self {
            operator,
            expression: Box::new(expression),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InfixOperator {
    Caret,
    Plus,
    Minus,
    Slash,
    Star,
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InfixOperator::*;
        write!(
            f,
            "{}",
            match self {
                Caret => "^",
                Plus => "+",
                // NOTE: spaces included to distinguish from hyphenated identifiers
                Minus => " - ",
                Slash => "/",
                Star => "*",
            }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    Plus,
    Minus,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOperator::Plus => write!(f, "+"),
            PrefixOperator::Minus => write!(f, "-"),
        }
    }
}

macro_rules! impl_expr_op {
    ($name:ident, $function:ident, $operator:ident) => {
        impl $name for Expression {
            type Output = Self;
            fn $function(self, other: Self) -> Self {
                Self::Infix(InfixExpression::new(self, InfixOperator::$operator, other))
            }
        }
    };
}

impl_expr_op!(Add, add, Plus);
impl_expr_op!(Sub, sub, Minus);
impl_expr_op!(Mul, mul, Star);
impl_expr_op!(Div, div, Slash);

impl Neg for Expression {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Prefix(PrefixExpression::new(PrefixOperator::Minus, self))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::Number(real!(value))
    }
}

impl From<MemoryReference> for Expression {
    fn from(reference: MemoryReference) -> Self {
        Self::Address(reference)
    }
}

/// Compute the result of an infix expression where both operands are complex.
#[inline]
pub(crate) fn calculate_infix(
    left: Complex64,
    operator: InfixOperator,
    right: Complex64,
) -> Complex64 {
    use InfixOperator::*;
    match operator {
        Caret => left.powc(right),
        Plus => left + right,
        Minus => left - right,
        Slash => left / right,
        Star => left * right,
    }
}

impl Expression {
    /// Evaluate an expression, substituting the given variables and memory values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use quil_cal::expression::Expression;
    /// use std::str::FromStr;
    /// use std::collections::HashMap;
    /// use num_complex::Complex64;
    ///
    /// let expression = Expression::from_str("%beta + theta[0]").unwrap();
    ///
    /// let mut variables = HashMap::with_capacity(1);
    /// variables.insert(String::from("beta"), Complex64::from(1.0));
    ///
    /// let mut memory_references = HashMap::with_capacity(1);
    /// memory_references.insert("theta", vec![2.0]);
    ///
    /// let evaluated = expression.evaluate(&variables, &memory_references).unwrap();
    ///
    /// assert_eq!(evaluated, Complex64::from(3.0))
    /// ```
    pub fn evaluate<K1, K2>(
        &self,
        variables: &HashMap<K1, Complex64>,
        memory_references: &HashMap<K2, Vec<f64>>,
    ) -> Result<Complex64, EvaluationError>
    where
        K1: Borrow<str> + Hash + Eq,
        K2: Borrow<str> + Hash + Eq,
    {
        use Expression::*;

        match self {
            Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                let left_evaluated = left.evaluate(variables, memory_references)?;
                let right_evaluated = right.evaluate(variables, memory_references)?;
                Ok(calculate_infix(left_evaluated, *operator, right_evaluated))
            }
            Prefix(PrefixExpression {
                operator,
                expression,
            }) => {
                let value = expression.evaluate(variables, memory_references)?;
                if matches!(operator, PrefixOperator::Minus) {
                    Ok(-value)
                } else {
                    Ok(value)
                }
            }
            Variable(identifier) => match variables.get(identifier.as_str()) {
                Some(&value) => Ok(value),
                None => Err(EvaluationError::Incomplete),
            },
            Address(memory_reference) => memory_references
                .get(memory_reference.name.as_str())
                .and_then(|values| {
                    let value = values.get(memory_reference.index as usize)?;
                    Some(real!(*value))
                })
                .ok_or(EvaluationError::Incomplete),
            PiConstant() => Ok(real!(PI)),
            Number(number) => Ok(*number),
        }
    }

    /// Evaluate an expression which refers to no variables or memory.
    pub fn evaluate_constant(&self) -> Result<Complex64, EvaluationError> {
        self.evaluate::<String, String>(&HashMap::new(), &HashMap::new())
    }

    /// If this is a real number, return it.
    pub fn to_real(&self) -> Result<f64, EvaluationError> {
        match self {
            Expression::PiConstant() => Ok(PI),
            Expression::Number(value) if value.im == 0f64 => Ok(value.re),
            Expression::Number(_) => Err(EvaluationError::NumberNotReal),
            _ => Err(EvaluationError::NotANumber),
        }
    }

    /// Fold every constant subexpression into a single [`Expression::Number`].
    ///
    /// Subexpressions which refer to variables or memory are left in place.
    pub fn into_simplified(self) -> Self {
        if let Ok(value) = self.evaluate_constant() {
            return Expression::Number(value);
        }
        match self {
            Expression::Infix(InfixExpression {
                left,
                operator,
                right,
            }) => Expression::Infix(InfixExpression::new(
                left.into_simplified(),
                operator,
                right.into_simplified(),
            )),
            Expression::Prefix(PrefixExpression {
                operator,
                expression,
            }) => Expression::Prefix(PrefixExpression::new(
                operator,
                expression.into_simplified(),
            )),
            other => other,
        }
    }

    /// Replace every `%variable` that appears in `substitutions` with its expression.
    pub fn substitute_variables(&self, substitutions: &HashMap<String, Expression>) -> Self {
        match self {
            Expression::Variable(name) => substitutions
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            Expression::Infix(InfixExpression {
                left,
                operator,
                right,
            }) => Expression::Infix(InfixExpression::new(
                left.substitute_variables(substitutions),
                *operator,
                right.substitute_variables(substitutions),
            )),
            Expression::Prefix(PrefixExpression {
                operator,
                expression,
            }) => Expression::Prefix(PrefixExpression::new(
                *operator,
                expression.substitute_variables(substitutions),
            )),
            other => other.clone(),
        }
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expression_text(s)
    }
}

static FORMAT_REAL_OPTIONS: Lazy<WriteFloatOptions> = Lazy::new(|| {
    WriteFloatOptions::builder()
        .negative_exponent_break(NonZeroI32::new(-5))
        .positive_exponent_break(NonZeroI32::new(15))
        .trim_floats(true)
        .build()
        .expect("options are valid")
});

static FORMAT_IMAGINARY_OPTIONS: Lazy<WriteFloatOptions> = Lazy::new(|| {
    WriteFloatOptions::builder()
        .negative_exponent_break(NonZeroI32::new(-5))
        .positive_exponent_break(NonZeroI32::new(15))
        .trim_floats(false) // Per the quil spec, the imaginary part of a complex number is always a floating point number
        .build()
        .expect("options are valid")
});

/// Format a num_complex::Complex64 value in a way that omits the real or imaginary part when
/// reasonable. That is:
///
/// - When imaginary is set but real is 0, show only imaginary
/// - When imaginary is 0, show real only
/// - When both are non-zero, show with the correct operator in between
#[inline(always)]
pub(crate) fn format_complex(value: &Complex64) -> String {
    const FORMAT: u128 = format::STANDARD;
    if value.re == 0f64 && value.im == 0f64 {
        "0".to_owned()
    } else if value.im == 0f64 {
        to_string_with_options::<_, FORMAT>(value.re, &FORMAT_REAL_OPTIONS)
    } else if value.re == 0f64 {
        to_string_with_options::<_, FORMAT>(value.im, &FORMAT_IMAGINARY_OPTIONS) + "i"
    } else {
        let mut out = to_string_with_options::<_, FORMAT>(value.re, &FORMAT_REAL_OPTIONS);
        if value.im > 0f64 {
            out.push('+')
        }
        out.push_str(&to_string_with_options::<_, FORMAT>(
            value.im,
            &FORMAT_IMAGINARY_OPTIONS,
        ));
        out.push('i');
        out
    }
}

impl Quil for Expression {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> Result<(), ToQuilError> {
        use Expression::*;
        match self {
            Address(memory_reference) => memory_reference.write(f, fall_back_to_debug),
            Infix(InfixExpression {
                left,
                operator,
                right,
            }) => {
                format_inner_expression(f, fall_back_to_debug, left)?;
                write!(f, "{operator}")?;
                format_inner_expression(f, fall_back_to_debug, right)
            }
            Number(value) => {
                if !(value.re.is_finite() && value.im.is_finite()) {
                    if fall_back_to_debug {
                        write!(f, "{value:?}")?;
                        return Ok(());
                    }
                    let offender = if value.re.is_finite() {
                        value.im
                    } else {
                        value.re
                    };
                    return Err(ToQuilError::NonFiniteNumber(offender));
                }
                write!(f, "{}", format_complex(value)).map_err(Into::into)
            }
            PiConstant() => write!(f, "pi").map_err(Into::into),
            Prefix(PrefixExpression {
                operator,
                expression,
            }) => {
                write!(f, "{operator}")?;
                format_inner_expression(f, fall_back_to_debug, expression)
            }
            Variable(identifier) => write!(f, "%{identifier}").map_err(Into::into),
        }
    }
}

/// Utility function to wrap infix expressions that are part of an expression in parentheses, so
/// that correct precedence rules are enforced.
fn format_inner_expression(
    f: &mut impl std::fmt::Write,
    fall_back_to_debug: bool,
    expression: &Expression,
) -> crate::quil::ToQuilResult<()> {
    match expression {
        Expression::Infix(InfixExpression {
            left,
            operator,
            right,
        }) => {
            write!(f, "(")?;
            format_inner_expression(f, fall_back_to_debug, left)?;
            write!(f, "{operator}")?;
            format_inner_expression(f, fall_back_to_debug, right)?;
            write!(f, ")")?;
            Ok(())
        }
        _ => expression.write(f, fall_back_to_debug),
    }
}
