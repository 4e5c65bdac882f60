use std::collections::HashMap;

use crate::{
    expression::{EvaluationError, Expression},
    quil::{Quil, ToQuilResult},
};

/// The waveform parameter holding the waveform's length in seconds.
pub const DURATION_PARAMETER: &str = "duration";

#[derive(Clone, Debug, PartialEq)]
pub struct WaveformInvocation {
    pub name: String,
    pub parameters: HashMap<String, Expression>,
}

impl WaveformInvocation {
    pub fn new(name: String, parameters: HashMap<String, Expression>) -> Self {
        Self { name, parameters }
    }

    /// The value of a constant, real-valued parameter, if it is present.
    pub fn real_parameter(&self, name: &str) -> Option<Result<f64, EvaluationError>> {
        self.parameters.get(name).map(|expression| {
            expression
                .evaluate_constant()
                .and_then(|value| Expression::Number(value).to_real())
        })
    }

    /// The waveform duration, in seconds, if it is specified.
    pub fn duration(&self) -> Option<Result<f64, EvaluationError>> {
        self.real_parameter(DURATION_PARAMETER)
    }

    /// Overwrite the waveform duration, in seconds.
    pub fn set_duration(&mut self, seconds: f64) {
        self.parameters
            .insert(DURATION_PARAMETER.to_string(), Expression::from(seconds));
    }
}

impl Quil for WaveformInvocation {
    fn write(&self, f: &mut impl std::fmt::Write, fall_back_to_debug: bool) -> ToQuilResult<()> {
        let mut key_value_pairs = self
            .parameters
            .iter()
            .collect::<Vec<(&String, &Expression)>>();

        key_value_pairs.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));

        write!(f, "{}", self.name)?;
        if key_value_pairs.is_empty() {
            return Ok(());
        }

        write!(f, "(")?;
        for (index, (key, value)) in key_value_pairs.into_iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: ")?;
            value.write(f, fall_back_to_debug)?;
        }
        write!(f, ")").map_err(Into::into)
    }
}

#[cfg(test)]
mod waveform_invocation_tests {
    use std::collections::HashMap;

    use crate::expression::Expression;
    use crate::instruction::WaveformInvocation;
    use crate::quil::Quil;

    #[test]
    fn format_no_parameters() {
        let wfi = WaveformInvocation {
            name: "CZ".into(),
            parameters: HashMap::new(),
        };
        assert_eq!(wfi.to_quil().unwrap(), "CZ".to_string());
    }

    #[test]
    fn format_sorts_parameters() {
        let wfi = WaveformInvocation::new(
            "flat".into(),
            HashMap::from([
                ("scale".to_string(), Expression::from(0.5)),
                ("iq".to_string(), Expression::from(1.0)),
            ]),
        );
        assert_eq!(wfi.to_quil().unwrap(), "flat(iq: 1, scale: 0.5)");
    }

    #[test]
    fn duration_can_be_overwritten() {
        let mut wfi = WaveformInvocation::new("gaussian".into(), HashMap::new());
        assert_eq!(wfi.duration(), None);
        wfi.set_duration(4e-8);
        assert_eq!(wfi.duration(), Some(Ok(4e-8)));
    }
}
