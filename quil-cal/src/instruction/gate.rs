use super::{write_expression_parameter_string, write_qubits, Qubit};
use crate::{
    expression::Expression,
    quil::Quil,
    validation::identifier::{validate_identifier, IdentifierValidationError},
};

/// A struct encapsulating all the properties of a Quil Quantum Gate.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    pub name: String,
    pub parameters: Vec<Expression>,
    pub qubits: Vec<Qubit>,
}

#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum GateError {
    #[error("invalid name: {0}")]
    InvalidIdentifier(#[from] IdentifierValidationError),

    #[error("a gate must operate on 1 or more qubits")]
    EmptyQubits,
}

impl Gate {
    /// Build a new gate
    ///
    /// # Errors
    ///
    /// Returns an error if the given name isn't a valid Quil identifier or if no qubits are given.
    pub fn new(
        name: &str,
        parameters: Vec<Expression>,
        qubits: Vec<Qubit>,
    ) -> Result<Self, GateError> {
        if qubits.is_empty() {
            return Err(GateError::EmptyQubits);
        }

        validate_identifier(name)?;

        Ok(Self {
            name: name.to_string(),
            parameters,
            qubits,
        })
    }
}

impl Quil for Gate {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        write!(f, "{}", self.name)?;
        write_expression_parameter_string(f, fall_back_to_debug, &self.parameters)?;
        write_qubits(f, fall_back_to_debug, &self.qubits)
    }
}

#[cfg(test)]
mod tests {
    use super::{Gate, GateError};
    use crate::expression::Expression;
    use crate::instruction::Qubit;
    use crate::quil::Quil;
    use crate::validation::identifier::IdentifierValidationError;

    #[test]
    fn rotation_display() {
        let gate = Gate::new(
            "RX",
            vec![Expression::PiConstant() / Expression::from(2.0)],
            vec![Qubit::Fixed(3)],
        )
        .unwrap();
        assert_eq!(gate.to_quil().unwrap(), "RX(pi/2) 3");
    }

    #[test]
    fn gate_requires_qubits() {
        assert_eq!(
            Gate::new("X", vec![], vec![]),
            Err(GateError::EmptyQubits)
        );
    }

    #[test]
    fn gate_requires_valid_name() {
        let error = Gate::new("1X", vec![], vec![Qubit::Fixed(0)]).unwrap_err();
        assert_eq!(
            error.clone(),
            GateError::InvalidIdentifier(IdentifierValidationError::Invalid("1X".to_string()))
        );
        assert_eq!(error.to_string(), "invalid name: 1X is not a valid identifier");
    }
}
