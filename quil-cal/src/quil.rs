//! Writing items back out as Quil-T text.

/// Indent of a `DEFCAL` body instruction or a `DEFFRAME` attribute.
pub const INDENT: &str = "    ";

/// An item with a Quil-T text form.
pub trait Quil {
    /// The item as Quil-T, or an error if it has no valid Quil-T form.
    fn to_quil(&self) -> ToQuilResult<String> {
        let mut text = String::new();
        self.write(&mut text, false)?;
        Ok(text)
    }

    /// The item as Quil-T, with debug output standing in for any part that has no valid form.
    /// Intended for error messages and logs.
    fn to_quil_or_debug(&self) -> String
    where
        Self: std::fmt::Debug,
    {
        let mut text = String::new();
        match self.write(&mut text, true) {
            Ok(()) => text,
            Err(_) => format!("{self:?}"),
        }
    }

    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()>;
}

pub type ToQuilResult<T> = Result<T, ToQuilError>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToQuilError {
    #[error("failed to write Quil: {0}")]
    FormatError(#[from] std::fmt::Error),

    #[error("{0} has no Quil representation")]
    NonFiniteNumber(f64),
}

/// Write `values` separated by `separator`.
pub(crate) fn write_join_quil<'i, T>(
    f: &mut impl std::fmt::Write,
    fall_back_to_debug: bool,
    values: impl IntoIterator<Item = &'i T>,
    separator: &str,
) -> ToQuilResult<()>
where
    T: Quil + 'i,
{
    for (index, value) in values.into_iter().enumerate() {
        if index > 0 {
            write!(f, "{separator}")?;
        }
        value.write(f, fall_back_to_debug)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    #[test]
    fn non_finite_numbers_have_no_quil() {
        let expression = Expression::from(f64::INFINITY);
        assert!(matches!(
            expression.to_quil(),
            Err(ToQuilError::NonFiniteNumber(value)) if value.is_infinite()
        ));
        assert!(!expression.to_quil_or_debug().is_empty());
    }

    #[test]
    fn join() {
        let values = [Expression::from(1.0), Expression::PiConstant()];
        let mut text = String::new();
        write_join_quil(&mut text, false, &values, ", ").unwrap();
        assert_eq!(text, "1, pi");
    }
}
