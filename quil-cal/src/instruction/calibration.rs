use crate::{
    expression::Expression,
    instruction::{
        write_expression_parameter_string, write_qubits, Gate, Instruction, Measurement, Qubit,
    },
    quil::{Quil, INDENT},
    validation::identifier::{validate_identifier, IdentifierValidationError},
};

pub trait CalibrationSignature {
    type Signature<'a>: PartialEq
    where
        Self: 'a;

    fn signature(&self) -> Self::Signature<'_>;
    fn has_signature(&self, signature: &Self::Signature<'_>) -> bool;
}

/// Write the body of a `DEFCAL`, one indented instruction per line.
fn write_calibration_body(
    f: &mut impl std::fmt::Write,
    fall_back_to_debug: bool,
    instructions: &[Instruction],
) -> crate::quil::ToQuilResult<()> {
    write!(f, ":")?;
    for instruction in instructions {
        write!(f, "\n{INDENT}")?;
        instruction.write(f, fall_back_to_debug)?;
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationDefinition {
    pub identifier: CalibrationIdentifier,
    pub instructions: Vec<Instruction>,
}

impl CalibrationDefinition {
    /// Builds a new calibration definition.
    pub fn new(identifier: CalibrationIdentifier, instructions: Vec<Instruction>) -> Self {
        Self {
            identifier,
            instructions,
        }
    }
}

impl CalibrationSignature for CalibrationDefinition {
    type Signature<'a> = <CalibrationIdentifier as CalibrationSignature>::Signature<'a>;

    fn signature(&self) -> Self::Signature<'_> {
        self.identifier.signature()
    }

    fn has_signature(&self, signature: &Self::Signature<'_>) -> bool {
        self.identifier.has_signature(signature)
    }
}

impl Quil for CalibrationDefinition {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        self.identifier.write(f, fall_back_to_debug)?;
        write_calibration_body(f, fall_back_to_debug, &self.instructions)
    }
}

/// Unique identifier for a calibration definition within a program
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationIdentifier {
    /// The name of the gate
    pub name: String,

    /// The parameters of the gate - these are the variables in the calibration definition
    pub parameters: Vec<Expression>,

    /// The qubits on which the gate is applied
    pub qubits: Vec<Qubit>,
}

impl CalibrationIdentifier {
    /// Builds a new calibration identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the given name isn't a valid Quil identifier.
    pub fn new(
        name: String,
        parameters: Vec<Expression>,
        qubits: Vec<Qubit>,
    ) -> Result<Self, IdentifierValidationError> {
        validate_identifier(name.as_str())?;
        Ok(Self {
            name,
            parameters,
            qubits,
        })
    }

    /// Whether this calibration applies to the given gate:
    ///
    /// 1. It has the same name
    /// 2. It has the same qubit count (any mix of fixed & variable)
    /// 3. It has the same parameter count (both specified and unspecified)
    /// 4. All fixed qubits in the calibration definition match those in the gate
    /// 5. All specified parameters in the calibration definition match those in the gate
    pub fn matches(&self, gate: &Gate) -> bool {
        if self.name != gate.name
            || self.parameters.len() != gate.parameters.len()
            || self.qubits.len() != gate.qubits.len()
        {
            return false;
        }

        let fixed_qubits_match =
            self.qubits
                .iter()
                .zip(&gate.qubits)
                .all(|(calibration_qubit, gate_qubit)| {
                    match (calibration_qubit, gate_qubit) {
                        // If they're both fixed, test if they're fixed to the same qubit
                        (Qubit::Fixed(calibration_fixed_qubit), Qubit::Fixed(gate_fixed_qubit)) => {
                            calibration_fixed_qubit == gate_fixed_qubit
                        }
                        // If the calibration is variable, it matches any fixed qubit
                        (Qubit::Variable(_), _) => true,
                        // If the calibration is fixed, but the gate's qubit is variable, it's not a match
                        (Qubit::Fixed(_), _) => false,
                    }
                });
        if !fixed_qubits_match {
            return false;
        }

        self.parameters
            .iter()
            .zip(&gate.parameters)
            .all(|(calibration_parameter, gate_parameter)| {
                match (
                    calibration_parameter.clone().into_simplified(),
                    gate_parameter.clone().into_simplified(),
                ) {
                    // If the calibration is variable, it matches any parameter
                    (Expression::Variable(_), _) => true,
                    (calibration, gate) => calibration == gate,
                }
            })
    }

    /// The number of qubits which are fixed to a specific index.
    pub fn fixed_qubit_count(&self) -> usize {
        self.qubits
            .iter()
            .filter(|qubit| matches!(qubit, Qubit::Fixed(_)))
            .count()
    }
}

impl CalibrationSignature for CalibrationIdentifier {
    type Signature<'a> = (&'a str, &'a [Expression], &'a [Qubit]);

    fn signature(&self) -> Self::Signature<'_> {
        let Self {
            name,
            parameters,
            qubits,
        } = self;
        (name.as_str(), parameters.as_slice(), qubits.as_slice())
    }

    fn has_signature(&self, signature: &Self::Signature<'_>) -> bool {
        &self.signature() == signature
    }
}

impl Quil for CalibrationIdentifier {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        write!(f, "DEFCAL {}", self.name)?;
        write_expression_parameter_string(f, fall_back_to_debug, &self.parameters)?;
        write_qubits(f, fall_back_to_debug, &self.qubits)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasureCalibrationDefinition {
    pub identifier: MeasureCalibrationIdentifier,
    pub instructions: Vec<Instruction>,
}

impl MeasureCalibrationDefinition {
    pub fn new(identifier: MeasureCalibrationIdentifier, instructions: Vec<Instruction>) -> Self {
        Self {
            identifier,
            instructions,
        }
    }
}

impl CalibrationSignature for MeasureCalibrationDefinition {
    type Signature<'a> = <MeasureCalibrationIdentifier as CalibrationSignature>::Signature<'a>;

    fn signature(&self) -> Self::Signature<'_> {
        self.identifier.signature()
    }

    fn has_signature(&self, signature: &Self::Signature<'_>) -> bool {
        self.identifier.has_signature(signature)
    }
}

impl Quil for MeasureCalibrationDefinition {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        self.identifier.write(f, fall_back_to_debug)?;
        let Some(target) = &self.identifier.target else {
            return write_calibration_body(f, fall_back_to_debug, &self.instructions);
        };
        write!(f, ":")?;
        for instruction in &self.instructions {
            write!(f, "\n{INDENT}")?;
            match instruction {
                Instruction::Capture(capture)
                    if capture.memory_reference.name == *target
                        && capture.memory_reference.index == 0 =>
                {
                    capture.write_to_variable(f, fall_back_to_debug)?
                }
                _ => instruction.write(f, fall_back_to_debug)?,
            }
        }
        Ok(())
    }
}

/// A unique identifier for a measurement calibration definition within a program
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureCalibrationIdentifier {
    /// The qubit which is being measured.
    pub qubit: Qubit,

    /// The name the definition uses for the variable it will write the measurement result to, if
    /// this is a measurement for record.
    ///
    /// If this is missing, this is a calibration for a measurement for effect.
    pub target: Option<String>,
}

impl MeasureCalibrationIdentifier {
    pub const fn new(qubit: Qubit, target: Option<String>) -> Self {
        Self { qubit, target }
    }

    /// Whether this calibration applies to the given measurement, and if so, whether the qubit
    /// matched exactly rather than through a variable.
    pub fn matches(&self, measurement: &Measurement) -> Option<bool> {
        if measurement.target.is_some() != self.target.is_some() {
            return None;
        }
        match &self.qubit {
            fixed @ Qubit::Fixed(_) if &measurement.qubit == fixed => Some(true),
            Qubit::Variable(_) => Some(false),
            Qubit::Fixed(_) => None,
        }
    }
}

impl CalibrationSignature for MeasureCalibrationIdentifier {
    type Signature<'a> = (&'a Qubit, Option<&'a str>);

    fn signature(&self) -> Self::Signature<'_> {
        let Self { qubit, target } = self;
        (qubit, target.as_deref())
    }

    fn has_signature(&self, signature: &Self::Signature<'_>) -> bool {
        &self.signature() == signature
    }
}

impl Quil for MeasureCalibrationIdentifier {
    fn write(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> crate::quil::ToQuilResult<()> {
        write!(f, "DEFCAL MEASURE ")?;
        self.qubit.write(f, fall_back_to_debug)?;
        if let Some(target) = &self.target {
            write!(f, " {target}")?;
        }
        Ok(())
    }
}
