use indexmap::IndexMap;

use super::{MemoryReference, Qubit, WaveformInvocation};
use crate::expression::{EvaluationError, Expression};
use crate::quil::{Quil, ToQuilResult, INDENT};

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    Expression(Expression),
}

impl Quil for AttributeValue {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        use AttributeValue::*;
        match self {
            String(value) => write!(f, "{value:?}").map_err(Into::into),
            Expression(value) => value.write(f, fall_back_to_debug),
        }
    }
}

/// Frame attributes, in the order they were defined.
pub type FrameAttributes = IndexMap<String, AttributeValue>;

/// Attribute names understood by QPU control systems.
pub mod attribute {
    pub const DIRECTION: &str = "DIRECTION";
    pub const INITIAL_FREQUENCY: &str = "INITIAL-FREQUENCY";
    pub const CENTER_FREQUENCY: &str = "CENTER-FREQUENCY";
    pub const HARDWARE_OBJECT: &str = "HARDWARE-OBJECT";
    pub const SAMPLE_RATE: &str = "SAMPLE-RATE";
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameAttributeError {
    #[error("frame attribute {0} is not defined")]
    Missing(String),
    #[error("frame attribute {0} is not a number")]
    NotANumber(String),
    #[error("frame attribute {name} could not be evaluated: {source}")]
    Evaluation {
        name: String,
        source: EvaluationError,
    },
}

/// Read a real-valued attribute such as `SAMPLE-RATE` out of a frame's attributes.
pub fn real_attribute(attributes: &FrameAttributes, name: &str) -> Result<f64, FrameAttributeError> {
    match attributes.get(name) {
        None => Err(FrameAttributeError::Missing(name.to_string())),
        Some(AttributeValue::String(_)) => Err(FrameAttributeError::NotANumber(name.to_string())),
        Some(AttributeValue::Expression(expression)) => expression
            .evaluate_constant()
            .and_then(|value| Expression::Number(value).to_real())
            .map_err(|source| FrameAttributeError::Evaluation {
                name: name.to_string(),
                source,
            }),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameDefinition {
    pub identifier: FrameIdentifier,
    pub attributes: FrameAttributes,
}

impl FrameDefinition {
    pub fn new(identifier: FrameIdentifier, attributes: FrameAttributes) -> Self {
        Self {
            identifier,
            attributes,
        }
    }

    /// The rate, in Hz, at which waveforms on this frame are sampled.
    pub fn sample_rate(&self) -> Result<f64, FrameAttributeError> {
        real_attribute(&self.attributes, attribute::SAMPLE_RATE)
    }

    /// The frequency, in Hz, the frame is set to before any program runs.
    pub fn initial_frequency(&self) -> Result<f64, FrameAttributeError> {
        real_attribute(&self.attributes, attribute::INITIAL_FREQUENCY)
    }
}

impl Quil for FrameDefinition {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        write!(f, "DEFFRAME ")?;
        self.identifier.write(f, fall_back_to_debug)?;
        write!(f, ":")?;
        for (key, value) in &self.attributes {
            write!(f, "\n{INDENT}{key}: ")?;
            value.write(f, fall_back_to_debug)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct FrameIdentifier {
    pub name: String,
    pub qubits: Vec<Qubit>,
}

impl FrameIdentifier {
    pub fn new(name: String, qubits: Vec<Qubit>) -> Self {
        Self { name, qubits }
    }
}

impl Quil for FrameIdentifier {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        let mut qubits = self.qubits.iter();
        if let Some(first) = qubits.next() {
            first.write(f, fall_back_to_debug)?;
            for qubit in qubits {
                write!(f, " ")?;
                qubit.write(f, fall_back_to_debug)?;
            }
        }
        write!(f, " \"{}\"", self.name).map_err(Into::into)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub blocking: bool,
    pub frame: FrameIdentifier,
    pub memory_reference: MemoryReference,
    pub waveform: WaveformInvocation,
}

impl Capture {
    pub fn new(
        blocking: bool,
        frame: FrameIdentifier,
        memory_reference: MemoryReference,
        waveform: WaveformInvocation,
    ) -> Self {
        Self {
            blocking,
            frame,
            memory_reference,
            waveform,
        }
    }
}

impl Capture {
    /// Write everything up to the destination, with a trailing space.
    fn write_without_destination(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> ToQuilResult<()> {
        if !self.blocking {
            write!(f, "NONBLOCKING ")?;
        }
        write!(f, "CAPTURE ")?;
        self.frame.write(f, fall_back_to_debug)?;
        write!(f, " ")?;
        self.waveform.write(f, fall_back_to_debug)?;
        write!(f, " ").map_err(Into::into)
    }

    /// Write the destination as a bare region name, the form measurement calibrations use for
    /// their target variable.
    pub(crate) fn write_to_variable(
        &self,
        f: &mut impl std::fmt::Write,
        fall_back_to_debug: bool,
    ) -> ToQuilResult<()> {
        self.write_without_destination(f, fall_back_to_debug)?;
        write!(f, "{}", self.memory_reference.name).map_err(Into::into)
    }
}

impl Quil for Capture {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        self.write_without_destination(f, fall_back_to_debug)?;
        self.memory_reference.write(f, fall_back_to_debug)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    pub blocking: bool,
    pub frame: FrameIdentifier,
    pub waveform: WaveformInvocation,
}

impl Pulse {
    pub fn new(blocking: bool, frame: FrameIdentifier, waveform: WaveformInvocation) -> Self {
        Self {
            blocking,
            frame,
            waveform,
        }
    }
}

impl Quil for Pulse {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        if !self.blocking {
            write!(f, "NONBLOCKING ")?;
        }
        write!(f, "PULSE ")?;
        self.frame.write(f, fall_back_to_debug)?;
        write!(f, " ")?;
        self.waveform.write(f, fall_back_to_debug)
    }
}

/// Declares a frame instruction carrying a single expression operand, such as
/// `SHIFT-FREQUENCY 0 "rf" freq[0]`.
macro_rules! frame_expression_instruction {
    ($(#[$meta:meta])* $name:ident, $field:ident, $keyword:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            pub frame: FrameIdentifier,
            pub $field: Expression,
        }

        impl $name {
            pub fn new(frame: FrameIdentifier, $field: Expression) -> Self {
                Self { frame, $field }
            }
        }

        impl Quil for $name {
            fn write(
                &self,
                f: &mut impl std::fmt::Write,
                fall_back_to_debug: bool,
            ) -> ToQuilResult<()> {
                write!(f, concat!($keyword, " "))?;
                self.frame.write(f, fall_back_to_debug)?;
                write!(f, " ")?;
                self.$field.write(f, fall_back_to_debug)
            }
        }
    };
}

frame_expression_instruction!(
    /// Set the frame's frequency, in Hz.
    SetFrequency,
    frequency,
    "SET-FREQUENCY"
);
frame_expression_instruction!(
    /// Shift the frame's frequency, in Hz, relative to its current value.
    ShiftFrequency,
    frequency,
    "SHIFT-FREQUENCY"
);
frame_expression_instruction!(
    /// Set the frame's phase, in radians.
    SetPhase,
    phase,
    "SET-PHASE"
);
frame_expression_instruction!(
    /// Shift the frame's phase, in radians.
    ShiftPhase,
    phase,
    "SHIFT-PHASE"
);
frame_expression_instruction!(
    /// Set the amplitude scale applied to every waveform played on the frame.
    SetScale,
    scale,
    "SET-SCALE"
);

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::instruction::WaveformInvocation;

    fn rf() -> FrameIdentifier {
        FrameIdentifier::new("rf".to_string(), vec![Qubit::Fixed(0)])
    }

    #[test]
    fn frame_definition_keeps_attribute_order() {
        let mut attributes = FrameAttributes::new();
        attributes.insert(
            attribute::DIRECTION.to_string(),
            AttributeValue::String("tx".to_string()),
        );
        attributes.insert(
            attribute::SAMPLE_RATE.to_string(),
            AttributeValue::Expression(Expression::from(1e6)),
        );
        let definition = FrameDefinition::new(rf(), attributes);
        assert_eq!(
            definition.to_quil().unwrap(),
            "DEFFRAME 0 \"rf\":\n    DIRECTION: \"tx\"\n    SAMPLE-RATE: 1000000"
        );
        assert_eq!(definition.sample_rate(), Ok(1e6));
    }

    #[test]
    fn missing_and_non_numeric_attributes() {
        let mut attributes = FrameAttributes::new();
        attributes.insert(
            attribute::SAMPLE_RATE.to_string(),
            AttributeValue::String("fast".to_string()),
        );
        let definition = FrameDefinition::new(rf(), attributes);
        assert_eq!(
            definition.sample_rate(),
            Err(FrameAttributeError::NotANumber("SAMPLE-RATE".to_string()))
        );
        assert_eq!(
            definition.initial_frequency(),
            Err(FrameAttributeError::Missing(
                "INITIAL-FREQUENCY".to_string()
            ))
        );
    }

    #[test]
    fn pulse_and_frame_instructions() {
        let pulse = Pulse::new(
            false,
            rf(),
            WaveformInvocation::new("flat".to_string(), HashMap::new()),
        );
        assert_eq!(pulse.to_quil().unwrap(), "NONBLOCKING PULSE 0 \"rf\" flat");

        let shift = ShiftFrequency::new(
            rf(),
            Expression::Address(MemoryReference::new("freq".to_string(), 0)),
        );
        assert_eq!(
            shift.to_quil().unwrap(),
            "SHIFT-FREQUENCY 0 \"rf\" freq[0]"
        );

        let scale = SetScale::new(
            rf(),
            Expression::Address(MemoryReference::new("scale".to_string(), 0)),
        );
        assert_eq!(scale.to_quil().unwrap(), "SET-SCALE 0 \"rf\" scale[0]");
    }
}
