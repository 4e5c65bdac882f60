//! Reserved words of the Quil-T subset this crate reads and writes.

use std::{fmt::Display, str::FromStr};

/// An enum that can represent any reserved token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservedToken {
    Keyword(ReservedKeyword),
    Constant(ReservedConstant),
}

#[derive(Clone, Debug)]
pub struct NotReservedToken(String);

impl FromStr for ReservedToken {
    type Err = NotReservedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(keyword) = ReservedKeyword::from_str(s) {
            Ok(Self::Keyword(keyword))
        } else if let Ok(constant) = ReservedConstant::from_str(s) {
            Ok(Self::Constant(constant))
        } else {
            Err(NotReservedToken(format!("{s} is not a reserved token")))
        }
    }
}

impl Display for ReservedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "{keyword}"),
            Self::Constant(constant) => write!(f, "{constant}"),
        }
    }
}

/// Keywords which start an instruction. The parser dispatches on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE")]
pub enum ReservedKeyword {
    Capture,
    Declare,
    #[strum(to_string = "DEFCAL")]
    DefCal,
    #[strum(to_string = "DEFFRAME")]
    DefFrame,
    Delay,
    Fence,
    Measure,
    Nonblocking,
    Pragma,
    Pulse,
    SetFrequency,
    SetPhase,
    SetScale,
    ShiftFrequency,
    ShiftPhase,
}

/// Every reserved constant
#[derive(Clone, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReservedConstant {
    #[strum(serialize = "i")]
    Imaginary,
    Pi,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::{ReservedKeyword, ReservedToken};

    #[rstest]
    #[case("SHIFT-FREQUENCY", ReservedKeyword::ShiftFrequency)]
    #[case("SET-SCALE", ReservedKeyword::SetScale)]
    #[case("DEFCAL", ReservedKeyword::DefCal)]
    #[case("DEFFRAME", ReservedKeyword::DefFrame)]
    #[case("NONBLOCKING", ReservedKeyword::Nonblocking)]
    fn keyword_spelling(#[case] text: &str, #[case] keyword: ReservedKeyword) {
        assert_eq!(ReservedKeyword::from_str(text), Ok(keyword));
        assert_eq!(keyword.to_string(), text);
    }

    #[test]
    fn constants_are_reserved() {
        assert!(ReservedToken::from_str("pi").is_ok());
        assert!(ReservedToken::from_str("ro").is_err());
    }
}
