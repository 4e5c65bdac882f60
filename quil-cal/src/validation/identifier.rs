//! Types and functions related to validating Quil identifiers
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::reserved::ReservedToken;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum IdentifierValidationError {
    #[error("{0} is a reserved token")]
    Reserved(ReservedToken),

    #[error("{0} is not a valid identifier")]
    Invalid(String),
}

/// A regex that matches only valid Quil identifiers. A trailing `-` is rejected separately,
/// since the `regex` crate has no lookbehind.
static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9\-_]*$").expect("regex should be valid"));

/// Returns an error if the given identifier is not a valid Quil Identifier
pub fn validate_identifier(ident: &str) -> Result<(), IdentifierValidationError> {
    if IDENTIFIER_REGEX.is_match(ident) && !ident.ends_with('-') {
        Ok(())
    } else {
        Err(IdentifierValidationError::Invalid(ident.to_string()))
    }
}

/// Returns an error if the given identifier is reserved, or if it is not a valid Quil identifier
pub fn validate_user_identifier(ident: &str) -> Result<(), IdentifierValidationError> {
    ReservedToken::from_str(ident).map_or(validate_identifier(ident), |t| {
        Err(IdentifierValidationError::Reserved(t))
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ro", true)]
    #[case("freq", true)]
    #[case("q0_unclassified", true)]
    #[case("detuning-hz", true)]
    #[case("trailing-", false)]
    #[case("0ro", false)]
    #[case("", false)]
    #[case("with space", false)]
    fn identifiers(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(validate_identifier(input).is_ok(), valid);
    }

    #[rstest]
    #[case("DECLARE")]
    #[case("pi")]
    fn reserved_identifiers(#[case] input: &str) {
        assert!(matches!(
            validate_user_identifier(input),
            Err(IdentifierValidationError::Reserved(_))
        ));
    }
}
