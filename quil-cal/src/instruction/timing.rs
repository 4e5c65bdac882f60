use super::{write_qubits, Qubit};
use crate::expression::Expression;
use crate::quil::{Quil, ToQuilResult};

/// `DELAY`: wait on some qubits, or only on the named frames of those qubits.
///
/// The simulated QPU has no notion of idle decay, so a delay only ever affects scheduling.
#[derive(Clone, Debug, PartialEq)]
pub struct Delay {
    pub duration: Expression,
    pub frame_names: Vec<String>,
    pub qubits: Vec<Qubit>,
}

impl Delay {
    pub fn new(duration: Expression, frame_names: Vec<String>, qubits: Vec<Qubit>) -> Self {
        Self {
            duration,
            frame_names,
            qubits,
        }
    }
}

impl Quil for Delay {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        write!(f, "DELAY")?;
        write_qubits(f, fall_back_to_debug, &self.qubits)?;
        for name in &self.frame_names {
            write!(f, " \"{name}\"")?;
        }
        write!(f, " ")?;
        self.duration.write(f, fall_back_to_debug)
    }
}

/// `FENCE`: synchronize the listed qubits, or all of them when the list is empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fence {
    pub qubits: Vec<Qubit>,
}

impl Fence {
    pub fn new(qubits: Vec<Qubit>) -> Self {
        Self { qubits }
    }
}

impl Quil for Fence {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        write!(f, "FENCE")?;
        write_qubits(f, fall_back_to_debug, &self.qubits)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::instruction::{Instruction, MemoryReference};

    #[rstest]
    #[case::on_frames(
        Instruction::Delay(Delay::new(
            Expression::from(4e-8),
            vec!["rf".to_string(), "ro_tx".to_string()],
            vec![Qubit::Fixed(0)],
        )),
        "DELAY 0 \"rf\" \"ro_tx\" 4e-8"
    )]
    #[case::from_memory(
        Instruction::Delay(Delay::new(
            Expression::Address(MemoryReference::new("wait".to_string(), 0)),
            vec![],
            vec![Qubit::Fixed(0), Qubit::Variable("q".to_string())],
        )),
        "DELAY 0 q wait[0]"
    )]
    #[case::global_fence(Instruction::Fence(Fence::new(vec![])), "FENCE")]
    #[case::fence(
        Instruction::Fence(Fence::new(vec![Qubit::Fixed(1), Qubit::Fixed(2)])),
        "FENCE 1 2"
    )]
    fn timing_instructions_are_written(#[case] instruction: Instruction, #[case] expected: &str) {
        assert_eq!(instruction.to_quil().unwrap(), expected);
    }
}
