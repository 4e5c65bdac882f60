use crate::quil::Quil;

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Qubit {
    Fixed(u64),
    Variable(String),
}

impl Qubit {
    /// The index of a fixed qubit.
    pub fn as_fixed(&self) -> Option<u64> {
        match self {
            Qubit::Fixed(index) => Some(*index),
            Qubit::Variable(_) => None,
        }
    }
}

impl From<u64> for Qubit {
    fn from(index: u64) -> Self {
        Qubit::Fixed(index)
    }
}

impl Quil for Qubit {
    fn write(
        &self,
        writer: &mut impl std::fmt::Write,
        _fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        use Qubit::*;
        match self {
            Fixed(value) => write!(writer, "{value}").map_err(Into::into),
            Variable(value) => write!(writer, "{value}").map_err(Into::into),
        }
    }
}
