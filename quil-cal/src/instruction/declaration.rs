use crate::quil::Quil;
use crate::validation::identifier::{validate_user_identifier, IdentifierValidationError};

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum ScalarType {
    Bit,
    Integer,
    Octet,
    Real,
}

impl Quil for ScalarType {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        _fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        use ScalarType::*;
        write!(
            f,
            "{}",
            match self {
                Bit => "BIT",
                Integer => "INTEGER",
                Octet => "OCTET",
                Real => "REAL",
            }
        )
        .map_err(Into::into)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Vector {
    pub data_type: ScalarType,
    pub length: u64,
}

impl Vector {
    pub fn new(data_type: ScalarType, length: u64) -> Self {
        Self { data_type, length }
    }
}

impl Quil for Vector {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        self.data_type.write(f, fall_back_to_debug)?;
        write!(f, "[{}]", self.length).map_err(Into::into)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub name: String,
    pub size: Vector,
}

impl Declaration {
    pub fn new(name: String, size: Vector) -> Self {
        Self { name, size }
    }

    /// Builds a declaration after checking that `name` is usable as a memory region name.
    pub fn try_new(name: String, size: Vector) -> Result<Self, IdentifierValidationError> {
        validate_user_identifier(&name)?;
        Ok(Self::new(name, size))
    }
}

impl Quil for Declaration {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        write!(f, "DECLARE {} ", self.name)?;
        self.size.write(f, fall_back_to_debug)
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemoryReference {
    pub name: String,
    pub index: u64,
}

impl MemoryReference {
    pub fn new(name: String, index: u64) -> Self {
        Self { name, index }
    }
}

impl Quil for MemoryReference {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        _fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        write!(f, "{}[{}]", self.name, self.index).map_err(Into::into)
    }
}

impl std::fmt::Display for MemoryReference {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}[{}]", self.name, self.index)
    }
}

#[cfg(test)]
mod test_declaration {
    use super::{Declaration, ScalarType, Vector};
    use crate::quil::Quil;
    use rstest::rstest;

    #[rstest]
    #[case(
        Declaration {
            name: "ro".to_string(),
            size: Vector { data_type: ScalarType::Bit, length: 1 },
        },
        "DECLARE ro BIT[1]"
    )]
    #[case(
        Declaration {
            name: "freq".to_string(),
            size: Vector { data_type: ScalarType::Real, length: 1 },
        },
        "DECLARE freq REAL[1]"
    )]
    #[case(
        Declaration {
            name: "q0_unclassified".to_string(),
            size: Vector { data_type: ScalarType::Real, length: 2 },
        },
        "DECLARE q0_unclassified REAL[2]"
    )]
    fn test_display(#[case] declaration: Declaration, #[case] expected: &str) {
        assert_eq!(declaration.to_quil_or_debug(), expected);
    }

    #[test]
    fn reserved_name_is_rejected() {
        let size = Vector::new(ScalarType::Real, 1);
        assert!(Declaration::try_new("PULSE".to_string(), size.clone()).is_err());
        assert!(Declaration::try_new("scale".to_string(), size).is_ok());
    }
}
