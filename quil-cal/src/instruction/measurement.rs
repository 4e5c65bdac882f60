use super::{MemoryReference, Qubit};
use crate::quil::{Quil, ToQuilResult};

/// `MEASURE`. With a `target` the result is recorded into classical memory; without one the
/// measurement is only for its effect on the qubit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Measurement {
    pub qubit: Qubit,
    pub target: Option<MemoryReference>,
}

impl Measurement {
    pub fn new(qubit: Qubit, target: Option<MemoryReference>) -> Self {
        Self { qubit, target }
    }
}

impl Quil for Measurement {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        write!(f, "MEASURE ")?;
        self.qubit.write(f, fall_back_to_debug)?;
        match &self.target {
            Some(target) => write!(f, " {target}").map_err(Into::into),
            None => Ok(()),
        }
    }
}
